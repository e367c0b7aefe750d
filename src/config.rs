//! Configuration System
//!
//! Layered configuration for the telemetry client: built-in defaults, the
//! user-level config file, an explicit file, then `BEACON_*` environment
//! variables. Later layers win.

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeaconConfig {
    /// Telemetry client settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings the telemetry client reads when building and sampling envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Routing key written to every envelope (`iKey` and the envelope name)
    #[serde(default)]
    pub instrumentation_key: String,

    /// Percentage of telemetry retained, 0..=100
    #[serde(default = "default_sampling_percentage")]
    pub sampling_percentage: f64,

    /// Properties merged into every item; item properties win on conflict
    #[serde(default)]
    pub common_properties: BTreeMap<String, String>,

    /// Install the exception monitor when the client starts
    #[serde(default = "default_true")]
    pub auto_collect_exceptions: bool,

    /// Buffered envelopes that trigger an automatic flush
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: usize,
}

fn default_sampling_percentage() -> f64 {
    100.0
}

fn default_true() -> bool {
    true
}

fn default_max_buffer_size() -> usize {
    250
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            instrumentation_key: String::new(),
            sampling_percentage: default_sampling_percentage(),
            common_properties: BTreeMap::new(),
            auto_collect_exceptions: default_true(),
            max_buffer_size: default_max_buffer_size(),
        }
    }
}

impl ClientConfig {
    pub fn new(instrumentation_key: impl Into<String>) -> Self {
        Self {
            instrumentation_key: instrumentation_key.into(),
            ..Self::default()
        }
    }

    /// Parse a `Key=Value;Key=Value` connection string. Keys are case-insensitive.
    pub fn from_connection_string(connection_string: &str) -> Result<Self, ConfigError> {
        let mut instrumentation_key = None;
        for segment in connection_string.split(';').map(str::trim) {
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                ConfigError::InvalidConnectionString(format!("segment without '=': {segment}"))
            })?;
            if key.trim().eq_ignore_ascii_case("instrumentationkey") {
                instrumentation_key = Some(value.trim().to_string());
            }
        }

        let instrumentation_key = instrumentation_key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ConfigError::InvalidConnectionString("missing InstrumentationKey".to_string())
            })?;
        Ok(Self::new(instrumentation_key))
    }

    /// Validate client configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.sampling_percentage) {
            return Err(ConfigError::InvalidSamplingPercentage(
                self.sampling_percentage,
            ));
        }
        Ok(())
    }
}
