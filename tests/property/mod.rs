//! Property-based tests for hashing, sampling and envelope construction

mod envelope_properties;
mod sampling_hash;
