//! Built-in defaults that every configuration layer is merged over.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("client.instrumentation_key", "")?
        .set_default("client.sampling_percentage", 100.0)?
        .set_default("client.auto_collect_exceptions", true)?
        .set_default("client.max_buffer_size", 250_i64)
}
