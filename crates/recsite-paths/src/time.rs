//! Timestamp parsing and US Eastern projection.
//!
//! Meeting records carry UTC instants. Paths and page text show them in
//! `America/New_York` local time, optionally rounded to a 5-minute boundary.

use chrono::{
    DateTime, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta, TimeZone, Timelike, Utc,
};
use chrono_tz::America::New_York;

/// Rounding step for meeting start times.
const ROUND_TO_SECS: i64 = 5 * 60;

/// Human-readable display format.
const DISPLAY_FORMAT: &str = "%A, %B %-d, %Y at %-I:%M %p";

/// Formats accepted for timestamps without an explicit offset (read as UTC).
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Error returned for timestamps that are not ISO-8601.
#[derive(Debug, thiserror::Error)]
#[error("Invalid timestamp {value:?}: {source}")]
pub struct TimestampError {
    value: String,
    #[source]
    source: chrono::ParseError,
}

/// Parse an ISO-8601 timestamp into a UTC instant.
///
/// Accepts `Z`, an explicit offset, or no offset at all (interpreted as UTC).
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = value.trim();
    let rfc3339 = match DateTime::parse_from_rfc3339(trimmed) {
        Ok(dt) => return Ok(dt.with_timezone(&Utc)),
        Err(e) => e,
    };
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimestampError {
            value: value.to_owned(),
            source: rfc3339,
        })
}

/// Format a UTC instant the way it is stored (`2024-01-01T15:02:31Z`).
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Round an instant to the nearest 5 minutes in Eastern local time.
///
/// Sub-second precision is dropped first. A remainder of exactly two and a
/// half minutes rounds down; anything past it rounds up, rolling the date at
/// midnight.
pub fn round_start(instant: DateTime<Utc>) -> NaiveDateTime {
    let local = instant.with_timezone(&New_York).naive_local();
    let seconds = i64::from(local.num_seconds_from_midnight());
    let remainder = seconds % ROUND_TO_SECS;
    let mut rounded = seconds - remainder;
    if remainder * 2 > ROUND_TO_SECS {
        rounded += ROUND_TO_SECS;
    }
    local.date().and_time(NaiveTime::MIN) + TimeDelta::seconds(rounded)
}

/// Render an instant for page text, e.g. `Monday, January 1, 2024 at 10:05 AM EST`.
///
/// With `rounded`, the time is rounded the same way as path segments.
pub fn display_time(instant: DateTime<Utc>, rounded: bool) -> String {
    let local = instant.with_timezone(&New_York);
    if !rounded {
        return local.format(&format!("{DISPLAY_FORMAT} %Z")).to_string();
    }

    let naive = round_start(instant);
    // A rounded time inside the spring-forward gap has no local instant; keep
    // the abbreviation of the original one.
    let zone = New_York
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or(local)
        .format("%Z")
        .to_string();
    format!("{} {zone}", naive.format(DISPLAY_FORMAT))
}

/// Serde adapter for UTC instants stored as ISO-8601 strings.
///
/// Use with `#[serde(with = "recsite_paths::time::iso8601")]`.
pub mod iso8601 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        instant: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(*instant))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let value = String::deserialize(deserializer)?;
        super::parse_timestamp(&value).map_err(serde::de::Error::custom)
    }
}
