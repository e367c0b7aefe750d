//! Kind-specific payloads carried in `data.baseData`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::contracts::kind::SeverityLevel;

/// Domain schema version shared by every payload.
pub(crate) const DOMAIN_SCHEMA_VERSION: i32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BaseData {
    Event(EventData),
    Exception(ExceptionData),
    Message(MessageData),
    Metric(MetricData),
    Request(RequestData),
    RemoteDependency(RemoteDependencyData),
    Availability(AvailabilityData),
    PageView(PageViewData),
}

impl BaseData {
    pub fn properties(&self) -> &BTreeMap<String, String> {
        match self {
            BaseData::Event(d) => &d.properties,
            BaseData::Exception(d) => &d.properties,
            BaseData::Message(d) => &d.properties,
            BaseData::Metric(d) => &d.properties,
            BaseData::Request(d) => &d.properties,
            BaseData::RemoteDependency(d) => &d.properties,
            BaseData::Availability(d) => &d.properties,
            BaseData::PageView(d) => &d.properties,
        }
    }
}

/// Structured event record, grouped and searched by its properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    pub ver: i32,
    pub name: String,
    pub properties: BTreeMap<String, String>,
    pub measurements: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionData {
    pub ver: i32,
    pub exceptions: Vec<ExceptionDetails>,
    pub severity_level: SeverityLevel,
    pub properties: BTreeMap<String, String>,
    pub measurements: BTreeMap<String, f64>,
}

/// One exception in a chain, with its parsed call stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    pub type_name: String,
    pub message: String,
    pub has_full_stack: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub parsed_stack: Vec<StackFrame>,
}

/// A single stack frame. `method` and `file_name` are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub level: usize,
    pub method: String,
    pub assembly: String,
    pub file_name: String,
    pub line: u32,
}

/// Trace message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    pub ver: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_level: Option<SeverityLevel>,
    pub properties: BTreeMap<String, String>,
    pub measurements: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricData {
    pub ver: i32,
    pub metrics: Vec<DataPoint>,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataPointType {
    Measurement,
    Aggregation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub name: String,
    pub kind: DataPointType,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
}

/// Incoming request handled by the application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestData {
    pub ver: i32,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub duration: String,
    pub response_code: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub properties: BTreeMap<String, String>,
    pub measurements: BTreeMap<String, f64>,
}

/// Outgoing call to a remote component.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDependencyData {
    pub ver: i32,
    /// Left unset when the caller supplied no name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub result_code: String,
    pub duration: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub properties: BTreeMap<String, String>,
    pub measurements: BTreeMap<String, f64>,
}

/// Result of an availability (ping) test.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityData {
    pub ver: i32,
    pub id: String,
    pub name: String,
    pub duration: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub properties: BTreeMap<String, String>,
    pub measurements: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewData {
    pub ver: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    pub properties: BTreeMap<String, String>,
    pub measurements: BTreeMap<String, f64>,
}
