//! Logging
//!
//! The library only emits `tracing` events. Embedding applications call
//! [`init_logging`] once to install a subscriber; `BEACON_LOG`,
//! `BEACON_LOG_FORMAT` and `BEACON_LOG_OUTPUT` override the configured values.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::error::ConfigError;

const ENV_FILTER: &str = "BEACON_LOG";
const ENV_FORMAT: &str = "BEACON_LOG_FORMAT";
const ENV_OUTPUT: &str = "BEACON_LOG_OUTPUT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::InvalidLogging(format!(
                "unknown log format '{other}' (expected text or json)"
            ))),
        }
    }
}

/// Where log lines go. Crash reports also print to stderr, hence the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    File,
}

impl FromStr for LogOutput {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            other => Err(ConfigError::InvalidLogging(format!(
                "unknown log output '{other}' (expected stdout, stderr or file)"
            ))),
        }
    }
}

/// `[logging]` section of the beacon configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level directive: trace, debug, info, warn, error or off
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Used when `output` is `file`
    pub file: PathBuf,
    /// ANSI colors for text output on a terminal stream
    pub color: bool,
    /// Per-target levels, e.g. `beacon::sampling = "debug"`
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            output: LogOutput::Stderr,
            file: PathBuf::from("beacon.log"),
            color: true,
            modules: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Apply `BEACON_LOG_FORMAT` and `BEACON_LOG_OUTPUT` on top of this config.
    fn with_env_overrides(&self) -> Result<Self, ConfigError> {
        let mut resolved = self.clone();
        if let Ok(format) = std::env::var(ENV_FORMAT) {
            resolved.format = format.parse()?;
        }
        if let Ok(output) = std::env::var(ENV_OUTPUT) {
            resolved.output = output.parse()?;
        }
        Ok(resolved)
    }

    fn env_filter(&self) -> Result<EnvFilter, ConfigError> {
        if let Ok(filter) = EnvFilter::try_from_env(ENV_FILTER) {
            return Ok(filter);
        }
        let mut filter = EnvFilter::new(&self.level);
        if self.level == "off" {
            return Ok(filter);
        }
        for (target, level) in &self.modules {
            let directive = format!("{target}={level}").parse().map_err(|e| {
                ConfigError::InvalidLogging(format!("bad directive for {target}: {e}"))
            })?;
            filter = filter.add_directive(directive);
        }
        Ok(filter)
    }

    fn open_file(&self) -> Result<Mutex<File>, ConfigError> {
        if let Some(dir) = self.file.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                ConfigError::InvalidLogging(format!("cannot create {}: {e}", dir.display()))
            })?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)
            .map(Mutex::new)
            .map_err(|e| {
                ConfigError::InvalidLogging(format!("cannot open {}: {e}", self.file.display()))
            })
    }
}

/// Install the global subscriber.
///
/// Precedence, highest first: environment variables, `config`, defaults.
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ConfigError> {
    let config = config.cloned().unwrap_or_default().with_env_overrides()?;
    let filter = config.env_filter()?;
    let json = config.format == LogFormat::Json;
    let ansi = config.color && !json && config.output != LogOutput::File;

    let registry = Registry::default().with(filter);
    let layer = fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_ansi(ansi);

    let installed = match (config.output, json) {
        (LogOutput::Stdout, false) => registry.with(layer.with_writer(std::io::stdout)).try_init(),
        (LogOutput::Stdout, true) => registry
            .with(layer.json().with_writer(std::io::stdout))
            .try_init(),
        (LogOutput::Stderr, false) => registry.with(layer.with_writer(std::io::stderr)).try_init(),
        (LogOutput::Stderr, true) => registry
            .with(layer.json().with_writer(std::io::stderr))
            .try_init(),
        (LogOutput::File, false) => registry
            .with(layer.with_writer(config.open_file()?))
            .try_init(),
        (LogOutput::File, true) => registry
            .with(layer.json().with_writer(config.open_file()?))
            .try_init(),
    };

    installed.map_err(|e| ConfigError::InvalidLogging(format!("subscriber not installed: {e}")))
}
