//! Typed telemetry records produced by application code.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::contracts::kind::{SeverityLevel, TelemetryKind};

pub type Properties = BTreeMap<String, String>;
pub type Measurements = BTreeMap<String, f64>;

/// Message carried by the error synthesized when a failure arrives without one.
pub const FALLBACK_ERROR_MESSAGE: &str = "An asynchronous task failed without providing an error. \
     Beacon generated this error so the failure is still reported.";

/// A telemetry record plus the fields every kind shares.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryItem {
    pub data: TelemetryData,
    /// Defaults to the time the envelope is built.
    pub time: Option<DateTime<Utc>>,
    pub properties: Properties,
    pub measurements: Measurements,
    /// Replaces context default tags key by key.
    pub tag_overrides: BTreeMap<String, String>,
}

impl TelemetryItem {
    pub fn new(data: impl Into<TelemetryData>) -> Self {
        Self {
            data: data.into(),
            time: None,
            properties: Properties::new(),
            measurements: Measurements::new(),
            tag_overrides: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> TelemetryKind {
        self.data.kind()
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn with_measurement(mut self, key: impl Into<String>, value: f64) -> Self {
        self.measurements.insert(key.into(), value);
        self
    }

    pub fn with_tag_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tag_overrides.insert(key.into(), value.into());
        self
    }

    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }
}

/// One variant per telemetry kind, each carrying only its own fields.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryData {
    Event(EventTelemetry),
    Exception(ExceptionTelemetry),
    Trace(TraceTelemetry),
    Metric(MetricTelemetry),
    Request(RequestTelemetry),
    Dependency(DependencyTelemetry),
    Availability(AvailabilityTelemetry),
    PageView(PageViewTelemetry),
}

impl TelemetryData {
    pub fn kind(&self) -> TelemetryKind {
        match self {
            TelemetryData::Event(_) => TelemetryKind::Event,
            TelemetryData::Exception(_) => TelemetryKind::Exception,
            TelemetryData::Trace(_) => TelemetryKind::Trace,
            TelemetryData::Metric(_) => TelemetryKind::Metric,
            TelemetryData::Request(_) => TelemetryKind::Request,
            TelemetryData::Dependency(_) => TelemetryKind::Dependency,
            TelemetryData::Availability(_) => TelemetryKind::Availability,
            TelemetryData::PageView(_) => TelemetryKind::PageView,
        }
    }
}

macro_rules! telemetry_variant {
    ($variant:ident, $record:ty) => {
        impl From<$record> for TelemetryData {
            fn from(record: $record) -> Self {
                TelemetryData::$variant(record)
            }
        }

        impl From<$record> for TelemetryItem {
            fn from(record: $record) -> Self {
                TelemetryItem::new(record)
            }
        }
    };
}

telemetry_variant!(Event, EventTelemetry);
telemetry_variant!(Exception, ExceptionTelemetry);
telemetry_variant!(Trace, TraceTelemetry);
telemetry_variant!(Metric, MetricTelemetry);
telemetry_variant!(Request, RequestTelemetry);
telemetry_variant!(Dependency, DependencyTelemetry);
telemetry_variant!(Availability, AvailabilityTelemetry);
telemetry_variant!(PageView, PageViewTelemetry);

#[derive(Debug, Clone, PartialEq)]
pub struct EventTelemetry {
    pub name: String,
}

impl EventTelemetry {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionTelemetry {
    pub exception: ErrorInfo,
    /// Defaults to `Error` in the envelope.
    pub severity: Option<SeverityLevel>,
}

impl ExceptionTelemetry {
    pub fn new(exception: ErrorInfo) -> Self {
        Self {
            exception,
            severity: None,
        }
    }

    pub fn with_severity(mut self, severity: SeverityLevel) -> Self {
        self.severity = Some(severity);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceTelemetry {
    pub message: String,
    pub severity: Option<SeverityLevel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricTelemetry {
    pub name: String,
    pub value: f64,
    pub count: Option<u32>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub std_dev: Option<f64>,
}

impl MetricTelemetry {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            count: None,
            min: None,
            max: None,
            std_dev: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestTelemetry {
    /// Generated when absent.
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub source: Option<String>,
    pub duration_ms: f64,
    pub result_code: String,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DependencyTelemetry {
    /// Passed through as-is; a nameless dependency stays nameless.
    pub name: Option<String>,
    pub id: Option<String>,
    pub data: Option<String>,
    pub target: Option<String>,
    pub duration_ms: f64,
    pub success: bool,
    pub result_code: Option<String>,
    pub dependency_type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityTelemetry {
    /// Generated when absent.
    pub id: Option<String>,
    pub name: String,
    pub duration_ms: f64,
    pub success: bool,
    pub run_location: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageViewTelemetry {
    pub id: Option<String>,
    pub name: String,
    pub url: Option<String>,
    pub duration_ms: Option<f64>,
}

/// Captured description of an error: its type, message and textual stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub type_name: String,
    pub message: String,
    pub stack: Option<String>,
}

impl ErrorInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Describe a Rust error. The stack is captured when `RUST_BACKTRACE` enables it.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        let backtrace = Backtrace::capture();
        Self {
            type_name: short_type_name(std::any::type_name::<E>()).to_string(),
            message,
            stack: (backtrace.status() == BacktraceStatus::Captured)
                .then(|| backtrace.to_string()),
        }
    }

    /// Describe a panic. The stack is always captured.
    pub fn from_panic(info: &std::panic::PanicHookInfo<'_>) -> Self {
        let payload = info.payload();
        let mut message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_string()
        };
        if let Some(location) = info.location() {
            message.push_str(&format!(
                " at {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            ));
        }
        Self {
            type_name: "panic".to_string(),
            message,
            stack: Some(Backtrace::force_capture().to_string()),
        }
    }

    /// The well-known error reported when a failure carried no error value.
    pub fn fallback() -> Self {
        Self::new("Error", FALLBACK_ERROR_MESSAGE)
            .with_stack(Backtrace::force_capture().to_string())
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
