//! The canonical envelope handed to the transport collaborator.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::contracts::domain::BaseData;
use crate::contracts::kind::TelemetryKind;

/// Schema version written to every envelope.
pub const ENVELOPE_SCHEMA_VERSION: i32 = 1;

/// Vendor prefix of the envelope `name` field.
pub const ENVELOPE_VENDOR_PREFIX: &str = "Microsoft.ApplicationInsights";

/// System variables for a telemetry item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub ver: i32,

    /// `<vendor>.<instrumentationKey>.<TypeName>`
    pub name: String,

    /// UTC ISO 8601 with a trailing `Z`.
    pub time: String,

    #[serde(rename = "iKey")]
    pub i_key: String,

    pub tags: BTreeMap<String, String>,

    /// Percentage of telemetry retained. `None` is equivalent to 100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<f64>,

    pub data: Data,
}

impl Envelope {
    /// Telemetry kind derived from `data.baseType`.
    pub fn kind(&self) -> Option<TelemetryKind> {
        TelemetryKind::from_base_type(&self.data.base_type)
    }
}

/// Typed payload wrapper.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    pub base_type: String,
    pub base_data: BaseData,
}
