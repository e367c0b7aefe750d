//! Configuration loader: assembles sources in precedence order and validates.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::merge::merge_policy;
use crate::config::sources::{environment, explicit_file, global_file};
use crate::config::BeaconConfig;
use crate::error::ConfigError;

/// Loads [`BeaconConfig`] from defaults, files and the environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration.
    ///
    /// Precedence (highest to lowest):
    /// 1. `BEACON_*` environment variables
    /// 2. `explicit_file`, when given
    /// 3. User-level config file
    /// 4. Defaults
    pub fn load(explicit_file: Option<&Path>) -> Result<BeaconConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = match explicit_file {
            Some(path) => explicit_file::add_to_builder(builder, path)?,
            None => builder,
        };
        let builder = environment::add_to_builder(builder);

        let config: BeaconConfig = builder.build()?.try_deserialize()?;
        config.client.validate()?;
        debug!(
            sampling_percentage = config.client.sampling_percentage,
            has_instrumentation_key = !config.client.instrumentation_key.is_empty(),
            "Loaded beacon configuration"
        );
        Ok(config)
    }

    /// Load configuration from a single file on top of defaults, ignoring other layers.
    pub fn load_from_file(path: &Path) -> Result<BeaconConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = explicit_file::add_to_builder(builder, path)?;
        let config: BeaconConfig = builder.build()?.try_deserialize()?;
        config.client.validate()?;
        Ok(config)
    }

    /// Location of the user-level config file, if the platform has one.
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
