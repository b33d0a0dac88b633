//! Timestamp helpers shared by bridge responses.

use chrono::{SecondsFormat, Utc};

/// Current UTC time formatted as RFC 3339 with second precision
/// (for example `2024-05-01T12:30:00Z`).
pub fn rfc3339_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Get the current timestamp in milliseconds since Unix epoch.
pub fn current_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}
