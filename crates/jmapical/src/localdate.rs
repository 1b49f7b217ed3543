//! LocalDateTime and UTC-Date string codecs.
//!
//! A LocalDateTime is an RFC 3339 date-time without a zone designator
//! (`2022-03-07T09:15:00`); a UTC-Date carries a trailing `Z`.

use chrono_tz::Tz;
use jmapical_rfc::core::{Date, DateTime, DateTimeForm};
use jmapical_rfc::tz;

/// Formats the wall-clock fields of a date-time as a LocalDateTime.
#[must_use]
pub fn localdate_from_datetime(dt: &DateTime) -> String {
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        dt.year, dt.month, dt.day, dt.hour, dt.minute, dt.second
    )
}

/// Formats a date as a LocalDateTime at midnight.
#[must_use]
pub fn localdate_from_date(d: Date) -> String {
    localdate_from_datetime(&DateTime::from_date(d))
}

/// Formats a date-time as a UTC-Date, converting zoned times to UTC.
///
/// `None` if the wall-clock fields are invalid or the zone is unknown.
#[must_use]
pub fn utcdate_from_datetime(dt: &DateTime) -> Option<String> {
    let utc = tz::convert_to_utc(dt)?;
    Some(format!("{}Z", localdate_from_datetime(&utc)))
}

/// Parses a LocalDateTime string into a date-time in the given zone.
///
/// For all-day events the time-of-day must be zero. A `None` zone
/// yields a floating time.
///
/// Returns `None` on malformed input.
#[must_use]
pub fn localdate_to_datetime(s: &str, zone: Option<Tz>, is_all_day: bool) -> Option<DateTime> {
    let (year, month, day, hour, minute, second) = parse_localdate(s)?;

    if is_all_day && (hour != 0 || minute != 0 || second != 0) {
        return None;
    }

    let form = match zone {
        Some(tz) if tz::is_utc(tz) => DateTimeForm::Utc,
        Some(tz) => DateTimeForm::Zoned {
            tzid: tz.name().to_string(),
        },
        None => DateTimeForm::Floating,
    };

    let dt = DateTime {
        year,
        month,
        day,
        hour,
        minute,
        second,
        form,
    };
    // Reject dates like February 30th.
    dt.naive()?;
    Some(dt)
}

/// Parses a UTC-Date string (trailing `Z` required).
#[must_use]
pub fn utcdate_to_datetime(s: &str) -> Option<DateTime> {
    let local = s.strip_suffix('Z')?;
    localdate_to_datetime(local, Some(chrono_tz::Tz::UTC), false)
}

/// Splits a strict `%Y-%m-%dT%H:%M:%S` string into its fields.
fn parse_localdate(s: &str) -> Option<(i32, u8, u8, u8, u8, u8)> {
    let bytes = s.as_bytes();
    if bytes.len() != 19 {
        return None;
    }
    if bytes[4] != b'-' || bytes[7] != b'-' || bytes[10] != b'T' || bytes[13] != b':' || bytes[16] != b':'
    {
        return None;
    }

    let year = s[0..4].parse().ok()?;
    let month = s[5..7].parse().ok()?;
    let day = s[8..10].parse().ok()?;
    let hour = s[11..13].parse().ok()?;
    let minute = s[14..16].parse().ok()?;
    let second = s[17..19].parse().ok()?;
    Some((year, month, day, hour, minute, second))
}
