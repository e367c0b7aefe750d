//! Error types for the beacon telemetry core.

use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid sampling percentage: {0} (must be within 0..=100)")]
    InvalidSamplingPercentage(f64),

    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Invalid logging configuration: {0}")]
    InvalidLogging(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Exception monitor lifecycle errors
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Exception tracking should be configured from the telemetry client; a monitor already exists in this process")]
    AlreadyConfigured,
}

/// Transport collaborator errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Envelope serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sink rejected batch: {0}")]
    Rejected(String),
}

/// Top-level client error
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Exception monitor error: {0}")]
    Monitor(#[from] MonitorError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}
