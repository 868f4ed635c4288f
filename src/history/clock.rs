//! Timestamp alignment, formatting and differencing.

use super::{Timestamp, ValidationError};

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveDateTime, Utc};

pub const FIVE_MINUTES_SECS: i64 = 300;
pub const HOUR_SECS: i64 = 3600;

pub const FIVE_MINUTES_MS: i64 = FIVE_MINUTES_SECS * 1000;
pub const HOUR_MS: i64 = HOUR_SECS * 1000;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Truncate a datetime to the start of its containing window.
pub fn truncate_to_window(dt: DateTime<Utc>, window_seconds: i64) -> DateTime<Utc> {
    let ts = dt.timestamp();
    let truncated = ts - ts.rem_euclid(window_seconds);
    DateTime::from_timestamp(truncated, 0).unwrap_or(dt)
}

/// The 5-minute slot containing `instant`.
pub fn floor_to_five_minutes(instant: DateTime<Utc>) -> Timestamp {
    Timestamp::from_datetime(truncate_to_window(instant, FIVE_MINUTES_SECS))
}

/// The next 5-minute boundary after `instant`.
///
/// Seconds are dropped first, and an instant already on a boundary moves to
/// the following one: 12:10 and 12:14:59 both align to 12:15.
pub fn align_up_to_next_five_minutes(instant: DateTime<Utc>) -> Timestamp {
    let slot = truncate_to_window(instant, FIVE_MINUTES_SECS);
    Timestamp::from_datetime(slot + ChronoDuration::seconds(FIVE_MINUTES_SECS))
}

/// Render `instant` as `YYYY-MM-DDTHH:MMZ`.
pub fn format_minute_precision(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%MZ").to_string()
}

/// `b - a` in milliseconds.
pub fn ms_between(a: Timestamp, b: Timestamp) -> i64 {
    (b.as_datetime() - a.as_datetime()).num_milliseconds()
}

/// Start of the hour containing `ts`.
pub fn hour_start(ts: Timestamp) -> Timestamp {
    Timestamp::from_datetime(truncate_to_window(ts.as_datetime(), HOUR_SECS))
}

/// UTC date containing `ts`.
pub fn date_of(ts: Timestamp) -> NaiveDate {
    ts.as_datetime().date_naive()
}

/// Parse a minute-precision timestamp.
///
/// Accepts the canonical `YYYY-MM-DDTHH:MMZ` plus the older forms still found
/// in history files: `YYYY-MM-DDTHH:MM` and the hour-only `YYYY-MM-DDTHH`.
/// Every field must be zero-padded, so each instant has one spelling per form.
pub fn parse_timestamp(s: &str) -> Result<Timestamp, ValidationError> {
    let minute = if has_shape(s, "0000-00-00T00:00Z") {
        s[..16].to_string()
    } else if has_shape(s, "0000-00-00T00:00") {
        s.to_string()
    } else if has_shape(s, "0000-00-00T00") {
        format!("{}:00", s)
    } else {
        return Err(ValidationError::MalformedTimestamp(s.to_string()));
    };

    NaiveDateTime::parse_from_str(&minute, "%Y-%m-%dT%H:%M")
        .map(|dt| Timestamp::from_datetime(dt.and_utc()))
        .map_err(|_| ValidationError::MalformedTimestamp(s.to_string()))
}

/// Parse a `YYYY-MM-DD` daily summary key.
pub fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    if !has_shape(s, "0000-00-00") {
        return Err(ValidationError::MalformedDate(s.to_string()));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ValidationError::MalformedDate(s.to_string()))
}

/// `0` in `shape` stands for any ASCII digit; other characters must match exactly.
fn has_shape(s: &str, shape: &str) -> bool {
    s.len() == shape.len()
        && s.bytes().zip(shape.bytes()).all(|(c, expected)| match expected {
            b'0' => c.is_ascii_digit(),
            _ => c == expected,
        })
}
