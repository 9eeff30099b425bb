//! Lenient date parsing for request payloads.
//!
//! Clients send dates in a handful of shapes. All of them are read as UTC:
//!
//! - RFC 3339 (`2024-05-01T09:30:00Z`, `2024-05-01T09:30:00+02:00`)
//! - `2024-05-01T09:30:00`
//! - `2024-05-01 09:30:00`
//! - `2024-05-01` (midnight)

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Error returned for a date string in none of the accepted formats
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date '{0}': expected RFC 3339, YYYY-MM-DDTHH:MM:SS, YYYY-MM-DD HH:MM:SS or YYYY-MM-DD")]
pub struct DateParseError(pub String);

/// Parses a date in any of the accepted formats.
pub fn parse_flexible(input: &str) -> Result<DateTime<Utc>, DateParseError> {
    let input = input.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| DateParseError(input.to_string()))
}

/// `#[serde(deserialize_with = "flexible")]` for required dates.
pub fn flexible<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flexible(&raw).map_err(serde::de::Error::custom)
}

/// `#[serde(default, deserialize_with = "flexible_option")]` for optional dates.
///
/// `null` and the empty string both read as `None`.
pub fn flexible_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_flexible(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
