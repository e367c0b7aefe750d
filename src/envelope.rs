//! Envelope Factory: maps typed telemetry records onto the wire envelope.
//!
//! Construction is total. Malformed or partial input degrades to defaults
//! instead of failing, so every record yields a structurally valid envelope.

pub mod stack;
pub mod timespan;

use std::collections::BTreeMap;

use chrono::Utc;

use crate::config::ClientConfig;
use crate::context::{CorrelationContext, TelemetryContext};
use crate::contracts::{
    tags, AvailabilityData, AvailabilityTelemetry, BaseData, Data, DataPoint, DataPointType,
    DependencyTelemetry, Envelope, EventData, EventTelemetry, ExceptionData, ExceptionDetails,
    ExceptionTelemetry, Measurements, MessageData, MetricData, MetricTelemetry, PageViewData,
    PageViewTelemetry, Properties, RemoteDependencyData, RequestData, RequestTelemetry,
    TelemetryData, TelemetryItem, TelemetryKind, TraceTelemetry, DOMAIN_SCHEMA_VERSION,
    ENVELOPE_SCHEMA_VERSION, ENVELOPE_VENDOR_PREFIX,
};
use crate::types::{format_time, new_trace_id};

pub use stack::{parse_stack, NO_FILENAME, NO_METHOD};
pub use timespan::ms_to_time_span;

/// Sample rate applied when no configuration is supplied.
pub const DEFAULT_SAMPLE_RATE: f64 = 100.0;

/// Dependency names are cut to this many characters.
const MAX_DEPENDENCY_NAME_CHARS: usize = 1024;

/// Build the envelope for one telemetry item.
///
/// Item properties win over `common_properties` on identical keys. Context
/// tags are the base; `tag_overrides` replace them key by key; operation tags
/// still missing afterwards are filled from `correlation`.
pub fn create_envelope(
    item: &TelemetryItem,
    common_properties: Option<&Properties>,
    context: Option<&TelemetryContext>,
    correlation: Option<&CorrelationContext>,
    config: Option<&ClientConfig>,
) -> Envelope {
    let kind = item.kind();
    let i_key = config
        .map(|c| c.instrumentation_key.clone())
        .unwrap_or_default();
    let sample_rate = config
        .map(|c| normalize_sample_rate(c.sampling_percentage))
        .unwrap_or(DEFAULT_SAMPLE_RATE);

    let properties = merge_properties(common_properties, &item.properties);
    let base_data = build_base_data(&item.data, properties, item.measurements.clone());

    Envelope {
        ver: ENVELOPE_SCHEMA_VERSION,
        name: envelope_name(&i_key, kind),
        time: format_time(&item.time.unwrap_or_else(Utc::now)),
        i_key,
        tags: merge_tags(context, &item.tag_overrides, correlation),
        sample_rate: Some(sample_rate),
        data: Data {
            base_type: kind.base_type().to_string(),
            base_data,
        },
    }
}

/// `<vendor>.<key without dashes>.<TypeName>`
pub fn envelope_name(instrumentation_key: &str, kind: TelemetryKind) -> String {
    format!(
        "{}.{}.{}",
        ENVELOPE_VENDOR_PREFIX,
        instrumentation_key.replace('-', ""),
        kind.envelope_type()
    )
}

fn normalize_sample_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        DEFAULT_SAMPLE_RATE
    } else {
        rate.clamp(0.0, 100.0)
    }
}

fn merge_properties(common: Option<&Properties>, item: &Properties) -> Properties {
    let mut merged = common.cloned().unwrap_or_default();
    merged.extend(item.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

fn merge_tags(
    context: Option<&TelemetryContext>,
    overrides: &BTreeMap<String, String>,
    correlation: Option<&CorrelationContext>,
) -> BTreeMap<String, String> {
    let mut merged = context.map(|c| c.tags.clone()).unwrap_or_default();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

    if let Some(ctx) = correlation {
        fill_tag(&mut merged, tags::OPERATION_ID, Some(&ctx.trace_id));
        fill_tag(&mut merged, tags::OPERATION_PARENT_ID, ctx.parent_id.as_deref());
        fill_tag(&mut merged, tags::OPERATION_NAME, ctx.operation_name.as_deref());
    }
    merged
}

fn fill_tag(tags: &mut BTreeMap<String, String>, key: &str, value: Option<&str>) {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return;
    };
    let slot = tags.entry(key.to_string()).or_default();
    if slot.is_empty() {
        *slot = value.to_string();
    }
}

fn build_base_data(
    data: &TelemetryData,
    properties: Properties,
    measurements: Measurements,
) -> BaseData {
    match data {
        TelemetryData::Event(event) => event_data(event, properties, measurements),
        TelemetryData::Exception(exception) => {
            exception_data(exception, properties, measurements)
        }
        TelemetryData::Trace(trace) => message_data(trace, properties, measurements),
        TelemetryData::Metric(metric) => metric_data(metric, properties),
        TelemetryData::Request(request) => request_data(request, properties, measurements),
        TelemetryData::Dependency(dependency) => {
            dependency_data(dependency, properties, measurements)
        }
        TelemetryData::Availability(availability) => {
            availability_data(availability, properties, measurements)
        }
        TelemetryData::PageView(page_view) => {
            page_view_data(page_view, properties, measurements)
        }
    }
}

fn event_data(
    event: &EventTelemetry,
    properties: Properties,
    measurements: Measurements,
) -> BaseData {
    BaseData::Event(EventData {
        ver: DOMAIN_SCHEMA_VERSION,
        name: event.name.clone(),
        properties,
        measurements,
    })
}

fn exception_data(
    exception: &ExceptionTelemetry,
    properties: Properties,
    measurements: Measurements,
) -> BaseData {
    let error = &exception.exception;
    let parsed_stack = error.stack.as_deref().map(parse_stack).unwrap_or_default();
    let details = ExceptionDetails {
        type_name: error.type_name.clone(),
        message: error.message.clone(),
        has_full_stack: !parsed_stack.is_empty(),
        stack: error.stack.clone(),
        parsed_stack,
    };
    BaseData::Exception(ExceptionData {
        ver: DOMAIN_SCHEMA_VERSION,
        exceptions: vec![details],
        severity_level: exception.severity.unwrap_or_default(),
        properties,
        measurements,
    })
}

fn message_data(
    trace: &TraceTelemetry,
    properties: Properties,
    measurements: Measurements,
) -> BaseData {
    BaseData::Message(MessageData {
        ver: DOMAIN_SCHEMA_VERSION,
        message: trace.message.clone(),
        severity_level: trace.severity,
        properties,
        measurements,
    })
}

fn metric_data(metric: &MetricTelemetry, properties: Properties) -> BaseData {
    let aggregated = metric.count.is_some()
        || metric.min.is_some()
        || metric.max.is_some()
        || metric.std_dev.is_some();
    let point = DataPoint {
        name: metric.name.clone(),
        kind: if aggregated {
            DataPointType::Aggregation
        } else {
            DataPointType::Measurement
        },
        value: metric.value,
        count: metric.count,
        min: metric.min,
        max: metric.max,
        std_dev: metric.std_dev,
    };
    BaseData::Metric(MetricData {
        ver: DOMAIN_SCHEMA_VERSION,
        metrics: vec![point],
        properties,
    })
}

fn request_data(
    request: &RequestTelemetry,
    properties: Properties,
    measurements: Measurements,
) -> BaseData {
    BaseData::Request(RequestData {
        ver: DOMAIN_SCHEMA_VERSION,
        id: request
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(new_trace_id),
        name: request.name.clone(),
        duration: ms_to_time_span(request.duration_ms),
        response_code: request.result_code.clone(),
        success: request.success,
        source: request.source.clone(),
        url: request.url.clone(),
        properties,
        measurements,
    })
}

fn dependency_data(
    dependency: &DependencyTelemetry,
    properties: Properties,
    measurements: Measurements,
) -> BaseData {
    BaseData::RemoteDependency(RemoteDependencyData {
        ver: DOMAIN_SCHEMA_VERSION,
        name: dependency
            .name
            .as_ref()
            .map(|name| name.chars().take(MAX_DEPENDENCY_NAME_CHARS).collect()),
        id: dependency.id.clone(),
        result_code: dependency.result_code.clone().unwrap_or_default(),
        duration: ms_to_time_span(dependency.duration_ms),
        success: dependency.success,
        data: dependency.data.clone(),
        target: dependency.target.clone(),
        type_name: dependency.dependency_type_name.clone(),
        properties,
        measurements,
    })
}

fn availability_data(
    availability: &AvailabilityTelemetry,
    properties: Properties,
    measurements: Measurements,
) -> BaseData {
    BaseData::Availability(AvailabilityData {
        ver: DOMAIN_SCHEMA_VERSION,
        id: availability
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(new_trace_id),
        name: availability.name.clone(),
        duration: ms_to_time_span(availability.duration_ms),
        success: availability.success,
        run_location: availability.run_location.clone(),
        message: availability.message.clone(),
        properties,
        measurements,
    })
}

fn page_view_data(
    page_view: &PageViewTelemetry,
    properties: Properties,
    measurements: Measurements,
) -> BaseData {
    BaseData::PageView(PageViewData {
        ver: DOMAIN_SCHEMA_VERSION,
        id: page_view.id.clone(),
        name: page_view.name.clone(),
        url: page_view.url.clone(),
        duration: page_view.duration_ms.map(ms_to_time_span),
        properties,
        measurements,
    })
}
