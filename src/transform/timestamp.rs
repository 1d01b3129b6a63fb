//! Datetime parsing for source timestamp columns

use crate::record::RawValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};

/// Datetime layouts emitted by the sources, tried in order
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Date-only layouts, read as midnight
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse a source datetime string
///
/// Offsets (`Z`, `-06:00`) are dropped and the wall-clock time kept.
pub fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    let s = input.trim();

    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.naive_local());
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Normalize a raw timestamp cell
///
/// Blank cells are `Ok(None)`. A non-blank value that is not a parseable
/// datetime string is an error message naming the value.
pub fn normalize(value: &RawValue) -> Result<Option<NaiveDateTime>, String> {
    if value.is_blank() {
        return Ok(None);
    }

    match value {
        RawValue::Text(s) => parse_datetime(s)
            .map(|ts| Some(ts.with_nanosecond(0).unwrap_or(ts)))
            .ok_or_else(|| format!("'{s}' is not a recognised datetime")),
        other => Err(format!("expected a datetime string, found {other}")),
    }
}
