//! Timestamp parsing and normalization.
//!
//! Timestamps are kept in the source's local time. Offsets on RFC 3339 input
//! are dropped rather than applied, so `10:00:00+02:00` stays `10:00:00`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Format used for the normalized `event_date` field and summary timestamps.
pub const NORMALIZED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Date-time layouts accepted on input, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp string into a naive (source-local) date-time.
///
/// A comma is accepted as the sub-second separator (`12:00:01,250`). A bare
/// date is read as midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    parse_datetime(raw).or_else(|| {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    })
}

/// Like [`parse_timestamp`], but a time of day is required.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value = trimmed.replace(',', ".");

    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(&value, format) {
            return Some(ts);
        }
    }

    DateTime::parse_from_rfc3339(&value)
        .ok()
        .map(|dt| dt.naive_local())
}

/// Render a timestamp in the normalized layout.
///
/// Fractional seconds are only written when non-zero.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(NORMALIZED_FORMAT).to_string()
}

/// Signed number of seconds from `start` to `end`, with microsecond precision.
#[expect(
    clippy::cast_precision_loss,
    reason = "session spans are far below 2^52 microseconds"
)]
pub fn seconds_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let delta = end - start;
    delta
        .num_microseconds()
        .map_or_else(|| delta.num_seconds() as f64, |us| us as f64 / 1_000_000.0)
}
