//! Wire data contract: envelopes, kind-specific payloads, and the typed
//! telemetry records application code hands to the client.

mod domain;
mod envelope;
mod kind;
mod telemetry;

pub mod tags;

pub(crate) use domain::DOMAIN_SCHEMA_VERSION;
pub use domain::{
    AvailabilityData, BaseData, DataPoint, DataPointType, EventData, ExceptionData,
    ExceptionDetails, MessageData, MetricData, PageViewData, RemoteDependencyData, RequestData,
    StackFrame,
};
pub use envelope::{Data, Envelope, ENVELOPE_SCHEMA_VERSION, ENVELOPE_VENDOR_PREFIX};
pub use kind::{SeverityLevel, TelemetryKind};
pub use telemetry::{
    AvailabilityTelemetry, DependencyTelemetry, ErrorInfo, EventTelemetry, ExceptionTelemetry,
    Measurements, MetricTelemetry, PageViewTelemetry, Properties, RequestTelemetry,
    TelemetryData, TelemetryItem, TraceTelemetry, FALLBACK_ERROR_MESSAGE,
};
