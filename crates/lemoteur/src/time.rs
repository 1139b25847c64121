//! Reference timestamp normalization
//!
//! Episode reference times are normalized once, at the HTTP boundary, to a
//! single UTC representation. Offset-less inputs are taken to be UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::error::{EngineError, Result};

/// Explicit offsets, with or without a colon (`+05:00`, `+0500`)
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%z",
];

/// No offset: read as UTC
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp into UTC
///
/// Supported formats (attempted in order):
/// 1. RFC 3339 with offset: `"2024-01-15T10:30:00Z"`, `"2024-01-15T10:30:00+05:00"`
/// 2. ISO 8601 with an offset, colon optional, seconds optional:
///    `"2024-01-15T10:30:00+0500"`, `"2024-01-15T10:30+05:00"`
/// 3. ISO 8601 without offset (or with `Z`), seconds and fraction optional:
///    `"2024-01-15T10:30:00.123"`, `"2024-01-15T10:30Z"`
/// 4. Space-separated variants of 2 and 3: `"2024-01-15 10:30:00"`
/// 5. Date only (midnight UTC): `"2024-01-15"`
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    // A trailing `Z` is UTC, the same as no offset at all.
    let naive = raw
        .strip_suffix('Z')
        .or_else(|| raw.strip_suffix('z'))
        .unwrap_or(raw);
    for format in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// Normalize an optional client-supplied reference time
///
/// Missing or blank input means "now". Anything unparseable is a
/// validation error; no fallback timestamp is substituted.
pub fn normalize_reference_time(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(Utc::now()),
        Some(value) => parse_timestamp(value).ok_or_else(|| {
            EngineError::validation(format!(
                "reference_time '{}' is not a valid ISO 8601 timestamp",
                value
            ))
        }),
    }
}

/// Format a UTC timestamp for the engine wire format
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}
