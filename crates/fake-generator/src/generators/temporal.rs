//! Date, time and timestamp generators.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rand::Rng;

/// Lower bound of random dates and timestamps.
pub fn default_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Upper bound of random dates and timestamps.
pub fn default_end() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2030, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .unwrap_or_default()
}

/// Generate a random timestamp with second precision in `[start, end]`.
pub fn generate_timestamp_range<R: Rng>(
    rng: &mut R,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> NaiveDateTime {
    let start_ts = start.and_utc().timestamp();
    let end_ts = end.and_utc().timestamp();
    if start_ts >= end_ts {
        return start;
    }
    let random_ts = rng.random_range(start_ts..=end_ts);
    DateTime::from_timestamp(random_ts, 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or(start)
}

/// Generate a random date in `[start, end]`.
pub fn generate_date_range<R: Rng>(rng: &mut R, start: NaiveDate, end: NaiveDate) -> NaiveDate {
    let days = (end - start).num_days();
    if days <= 0 {
        return start;
    }
    let offset = rng.random_range(0..=days);
    start + chrono::Duration::days(offset)
}

/// Generate a random time of day with second precision.
pub fn generate_time<R: Rng>(rng: &mut R) -> NaiveTime {
    let secs = rng.random_range(0..86_400u32);
    NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap_or_default()
}

/// Parse a timestamp string in various formats.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    // Try RFC 3339 / ISO 8601 with offset
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    // Try common date-only format
    parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Parse an `HH:MM:SS` time.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S").ok()
}
