//! Shared helpers: timestamp formatting and unique id generation.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// Generate a collision-resistant id shaped like a W3C trace id (32 lowercase hex chars).
pub fn new_trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Format a timestamp the way the ingestion schema expects: UTC ISO 8601 with a trailing `Z`.
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
