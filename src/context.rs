//! Ambient context read by the envelope factory and the sampling processor.

use std::collections::BTreeMap;

use crate::contracts::tags;

/// Default tags stamped on every envelope the client builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryContext {
    pub tags: BTreeMap<String, String>,
}

impl TelemetryContext {
    /// Context populated from the running process: host, OS and SDK version.
    pub fn from_process() -> Self {
        let host = host_name();
        let mut tags = BTreeMap::new();
        tags.insert(tags::CLOUD_ROLE_INSTANCE.to_string(), host.clone());
        tags.insert(tags::DEVICE_ID.to_string(), host);
        tags.insert(
            tags::DEVICE_OS_VERSION.to_string(),
            format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
        );
        tags.insert(tags::DEVICE_TYPE.to_string(), "Other".to_string());
        tags.insert(
            tags::INTERNAL_SDK_VERSION.to_string(),
            format!("rust:{}", env!("CARGO_PKG_VERSION")),
        );
        Self { tags }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".into())
}

/// Trace identity shared by every service participating in one distributed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationContext {
    pub trace_id: String,
    /// Bit 0 set means an upstream decision sampled this trace in.
    pub trace_flags: u8,
    pub parent_id: Option<String>,
    pub operation_name: Option<String>,
}

impl CorrelationContext {
    pub const SAMPLED_FLAG: u8 = 0x01;

    pub fn new(trace_id: impl Into<String>, trace_flags: u8) -> Self {
        Self {
            trace_id: trace_id.into(),
            trace_flags,
            parent_id: None,
            operation_name: None,
        }
    }

    pub fn is_sampled(&self) -> bool {
        self.trace_flags & Self::SAMPLED_FLAG == Self::SAMPLED_FLAG
    }
}
