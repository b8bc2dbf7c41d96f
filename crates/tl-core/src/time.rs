//! Time utilities for ttylog
//!
//! Provides the wall-clock helpers used for line timestamps, file names and
//! file headers.

use chrono::{DateTime, Local, TimeZone};
use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is set before the Unix epoch.
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn local_from_millis(millis: u64) -> DateTime<Local> {
    let millis = i64::try_from(millis).unwrap_or(i64::MAX);
    Local
        .timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(Local::now)
}

/// Format a millisecond timestamp as local `HH:MM:SS.mmm`.
pub fn format_clock(millis: u64) -> String {
    local_from_millis(millis).format("%H:%M:%S%.3f").to_string()
}

/// Format a millisecond timestamp as local `YYYY-MM-DD HH:MM:SS`.
pub fn format_datetime(millis: u64) -> String {
    local_from_millis(millis)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// File-name stamp for a recording, e.g. `143005_07MAR25`.
pub fn file_stamp(millis: u64) -> String {
    local_from_millis(millis)
        .format("%H%M%S_%d%b%y")
        .to_string()
        .to_uppercase()
}
