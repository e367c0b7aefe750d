//! Beacon: Telemetry Normalization Core
//!
//! Builds schema-conformant telemetry envelopes, applies consistent
//! trace-id based sampling, and captures fatal process errors before exit.

pub mod client;
pub mod config;
pub mod context;
pub mod contracts;
pub mod envelope;
pub mod error;
pub mod exceptions;
pub mod logging;
pub mod sampling;
pub mod types;

pub use client::{FlushOptions, TelemetryClient, TelemetrySink};
pub use config::{BeaconConfig, ClientConfig, ConfigLoader};
pub use context::{CorrelationContext, TelemetryContext};
pub use envelope::create_envelope;
pub use error::{ClientError, ConfigError, MonitorError, SinkError};
pub use exceptions::{ExceptionMonitor, HostRuntime, ProcessHost};
pub use logging::{init_logging, LoggingConfig};
pub use sampling::{sampling_hash, should_sample};
