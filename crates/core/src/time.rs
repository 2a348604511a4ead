//! Epoch-millisecond helpers shared by the scheduler, the store and the CLI.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::CoreError;

/// Execution times and sample dates are epoch milliseconds.
pub type EpochMillis = i64;

pub fn now_millis() -> EpochMillis {
    Utc::now().timestamp_millis()
}

pub fn millis_to_datetime(ms: EpochMillis) -> Result<DateTime<Utc>, CoreError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| CoreError::InvalidTimestamp(ms.to_string()))
}

/// RFC 3339 rendering for logs and error messages. Falls back to the raw
/// number when the value is out of chrono's range.
pub fn format_millis(ms: EpochMillis) -> String {
    match millis_to_datetime(ms) {
        Ok(dt) => dt.to_rfc3339(),
        Err(_) => ms.to_string(),
    }
}

/// Parse either a raw epoch-millisecond integer or an RFC 3339 timestamp.
pub fn parse_timestamp(raw: &str) -> Result<EpochMillis, CoreError> {
    let trimmed = raw.trim();
    if let Ok(ms) = trimmed.parse::<i64>() {
        return Ok(ms);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc).timestamp_millis())
        .map_err(|e| CoreError::InvalidTimestamp(format!("{trimmed}: {e}")))
}
