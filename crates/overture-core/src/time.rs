//! Timestamp format of version entries.

use chrono::{DateTime, Utc};

const ENTRY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S+00:00";

/// Format a timestamp as `YYYY-MM-DDTHH:MM:SS+00:00`.
#[must_use]
pub fn format_utc(time: DateTime<Utc>) -> String {
    time.format(ENTRY_TIME_FORMAT).to_string()
}
