//! Wall-clock helpers.

use chrono::Utc;

/// Current time as nanoseconds since the Unix epoch.
#[must_use]
pub fn now_nanos() -> u64 {
    Utc::now()
        .timestamp_nanos_opt()
        .map_or(0, |ns| u64::try_from(ns).unwrap_or(0))
}

/// Current time as milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}
