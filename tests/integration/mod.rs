//! Integration tests for the beacon telemetry core

mod exception_monitor;
mod sampling_pipeline;
mod test_utils;
