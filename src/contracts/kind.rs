//! Telemetry kinds and severity levels.

use serde::{Deserialize, Serialize};

/// The kinds of telemetry the client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryKind {
    Event,
    Exception,
    Trace,
    Metric,
    Request,
    Dependency,
    Availability,
    PageView,
}

impl TelemetryKind {
    pub const ALL: [TelemetryKind; 8] = [
        TelemetryKind::Event,
        TelemetryKind::Exception,
        TelemetryKind::Trace,
        TelemetryKind::Metric,
        TelemetryKind::Request,
        TelemetryKind::Dependency,
        TelemetryKind::Availability,
        TelemetryKind::PageView,
    ];

    /// Type name used in the envelope `name` field.
    pub fn envelope_type(self) -> &'static str {
        match self {
            TelemetryKind::Event => "Event",
            TelemetryKind::Exception => "Exception",
            TelemetryKind::Trace => "Message",
            TelemetryKind::Metric => "Metric",
            TelemetryKind::Request => "Request",
            TelemetryKind::Dependency => "RemoteDependency",
            TelemetryKind::Availability => "Availability",
            TelemetryKind::PageView => "PageView",
        }
    }

    /// Type tag carried in `data.baseType`.
    pub fn base_type(self) -> &'static str {
        match self {
            TelemetryKind::Event => "EventData",
            TelemetryKind::Exception => "ExceptionData",
            TelemetryKind::Trace => "MessageData",
            TelemetryKind::Metric => "MetricData",
            TelemetryKind::Request => "RequestData",
            TelemetryKind::Dependency => "RemoteDependencyData",
            TelemetryKind::Availability => "AvailabilityData",
            TelemetryKind::PageView => "PageViewData",
        }
    }

    pub fn from_base_type(base_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.base_type() == base_type)
    }
}

/// Severity of exceptions and trace messages.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SeverityLevel {
    Verbose,
    Information,
    Warning,
    #[default]
    Error,
    Critical,
}
