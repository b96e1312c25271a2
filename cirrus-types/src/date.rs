//! Backend date format.
//!
//! The backend exchanges dates as UTC ISO-8601 strings with millisecond
//! precision, e.g. `2024-01-01T00:00:00.000Z`. Both directions are plain
//! functions; there is no shared formatter instance.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// The `chrono` format string matching the backend's date layout.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Formats a date in the backend's wire layout.
#[must_use]
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a date in the backend's wire layout.
///
/// Falls back to general RFC 3339 so that offsets other than `Z` and
/// missing fractional seconds are still accepted.
pub fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, DATE_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| Error::InvalidDate(format!("{s}: {e}")))
}
