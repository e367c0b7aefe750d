//! Exception Monitor
//!
//! Captures fatal errors (panics and background task failures nobody
//! observed), reports them through the telemetry client, and flushes
//! synchronously before the process goes down.
//!
//! ```no_run
//! use std::sync::Arc;
//! use beacon::client::{MemorySink, TelemetryClient};
//! use beacon::config::ClientConfig;
//! use beacon::exceptions::{ExceptionMonitor, ProcessHost};
//!
//! let sink = Arc::new(MemorySink::new());
//! let client = Arc::new(TelemetryClient::new(ClientConfig::new("ikey"), sink).unwrap());
//! let _monitor = ExceptionMonitor::install(client, Arc::new(ProcessHost::new())).unwrap();
//! ```

mod host;
mod monitor;
mod strategy;

pub use host::{
    FatalChannel, FatalHandler, HostRuntime, ListenerId, ProcessHost, PROCESS_HOST_VERSION,
};
pub use monitor::{ExceptionMonitor, MonitorState};
pub use strategy::{MonitorStrategy, UNIFIED_MONITOR_MIN_VERSION};
