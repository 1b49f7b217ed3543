//! Timezone resolution and conversion for iCalendar date-times.
//!
//! Olson lookups go through chrono-tz. `Etc/UTC` and `UTC` resolve to
//! the UTC singleton explicitly; chrono-tz knows them as aliases, but
//! the translator's contract names them outright.

use chrono::{LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::core::{Component, ComponentKind, DateTime, DateTimeForm, ICalendar, Property, Value};

/// Resolves an Olson TZID to a timezone.
///
/// Returns `None` for identifiers the IANA database does not know.
#[must_use]
pub fn tz_from_tzid(tzid: &str) -> Option<Tz> {
    if tzid == "Etc/UTC" || tzid == "UTC" {
        return Some(Tz::UTC);
    }
    tzid.parse::<Tz>().ok()
}

/// Returns whether a timezone is the UTC singleton.
#[must_use]
pub fn is_utc(tz: Tz) -> bool {
    matches!(tz, Tz::UTC | Tz::Etc__UTC)
}

/// Converts a date-time to an absolute UTC instant.
///
/// Floating times are interpreted as UTC, which is how iCalendar
/// libraries treat them for interval arithmetic. Times inside a DST gap
/// are shifted forward; ambiguous times resolve to the earlier mapping.
///
/// `None` if the wall-clock fields are invalid or the zone is unknown.
#[must_use]
pub fn utc_instant(dt: &DateTime) -> Option<chrono::DateTime<Utc>> {
    let naive = dt.naive()?;
    match &dt.form {
        DateTimeForm::Floating | DateTimeForm::Utc => Some(Utc.from_utc_datetime(&naive)),
        DateTimeForm::Zoned { tzid } => {
            let tz = tz_from_tzid(tzid)?;
            from_local(naive, tz).map(|t| t.with_timezone(&Utc))
        }
    }
}

fn from_local(naive: NaiveDateTime, tz: Tz) -> Option<chrono::DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => {
            // DST gap: shift forward one hour and retry.
            let shifted = naive + chrono::Duration::hours(1);
            match tz.from_local_datetime(&shifted) {
                LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => Some(t),
                LocalResult::None => None,
            }
        }
    }
}

/// Converts a date-time into the given zone, keeping the instant.
#[must_use]
pub fn convert_to_zone(dt: &DateTime, tz: Tz) -> Option<DateTime> {
    let instant = utc_instant(dt)?;
    let local = instant.with_timezone(&tz).naive_local();
    let form = if is_utc(tz) {
        DateTimeForm::Utc
    } else {
        DateTimeForm::Zoned {
            tzid: tz.name().to_string(),
        }
    };
    Some(DateTime::from_naive(local, form))
}

/// Converts a date-time to its UTC wall-clock representation.
#[must_use]
pub fn convert_to_utc(dt: &DateTime) -> Option<DateTime> {
    let instant = utc_instant(dt)?;
    Some(DateTime::from_naive(instant.naive_utc(), DateTimeForm::Utc))
}

/// Adds a signed number of seconds to a date-time, in wall-clock terms.
#[must_use]
pub fn add_seconds(dt: &DateTime, seconds: i64) -> Option<DateTime> {
    let naive = dt.naive()? + chrono::Duration::seconds(seconds);
    Some(DateTime::from_naive(naive, dt.form.clone()))
}

/// Builds a minimal VTIMEZONE component for a TZID.
///
/// The observance block reflects the offset in force around the given
/// date-time. This is enough for interoperability with consumers that
/// resolve Olson names themselves; it does not enumerate transitions.
#[must_use]
pub fn vtimezone_for(tzid: &str, around: &DateTime) -> Option<Component> {
    let tz = tz_from_tzid(tzid)?;
    let naive = around.naive()?;
    let offset = tz.offset_from_utc_datetime(&naive).fix();
    let offset_str = format_utc_offset(offset.local_minus_utc());

    let mut observance = Component::new(ComponentKind::Standard);
    observance.add_property(Property::datetime(
        "DTSTART",
        DateTime::floating(1970, 1, 1, 0, 0, 0),
    ));
    observance.add_property(Property::text("TZOFFSETFROM", offset_str.clone()));
    observance.add_property(Property::text("TZOFFSETTO", offset_str));

    let mut vtimezone = Component::timezone();
    vtimezone.add_property(Property::text("TZID", tzid));
    vtimezone.add_child(observance);
    Some(vtimezone)
}

fn format_utc_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let abs = seconds.abs();
    format!("{sign}{:02}{:02}", abs / 3600, (abs % 3600) / 60)
}

/// Appends a VTIMEZONE for every TZID referenced by the calendar's
/// events that is not covered yet. UTC needs no VTIMEZONE.
pub fn add_required_timezones(ical: &mut ICalendar) {
    let mut have: Vec<String> = ical
        .timezones()
        .iter()
        .filter_map(|tz| tz.get_property("TZID").and_then(Property::as_text))
        .map(str::to_string)
        .collect();

    let mut needed: Vec<(String, DateTime)> = Vec::new();
    for event in ical.events() {
        collect_tzids(event, &mut needed);
    }

    for (tzid, around) in needed {
        if have.iter().any(|h| h == &tzid) {
            continue;
        }
        if tz_from_tzid(&tzid).is_some_and(is_utc) {
            continue;
        }
        if let Some(vtimezone) = vtimezone_for(&tzid, &around) {
            have.push(tzid);
            ical.add_timezone(vtimezone);
        }
    }
}

fn collect_tzids(component: &Component, out: &mut Vec<(String, DateTime)>) {
    for prop in &component.properties {
        if let Some(tzid) = prop.get_param_value("TZID") {
            let around = match &prop.value {
                Value::DateTime(dt) => dt.clone(),
                Value::DateTimeList(list) if !list.is_empty() => list[0].clone(),
                _ => DateTime::floating(1970, 1, 1, 0, 0, 0),
            };
            out.push((tzid.to_string(), around));
        }
    }
    for child in &component.children {
        collect_tzids(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_aliases_resolve() {
        assert_eq!(tz_from_tzid("Etc/UTC"), Some(Tz::UTC));
        assert_eq!(tz_from_tzid("UTC"), Some(Tz::UTC));
        assert!(tz_from_tzid("Not/AZone").is_none());
    }

    #[test]
    fn zoned_to_utc_instant() {
        // Winter: Europe/Berlin is UTC+1.
        let dt = DateTime::zoned(2022, 1, 1, 9, 0, 0, "Europe/Berlin");
        let instant = utc_instant(&dt).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2022, 1, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn dst_instant() {
        // Summer: Europe/Berlin is UTC+2.
        let dt = DateTime::zoned(2022, 7, 1, 9, 0, 0, "Europe/Berlin");
        let instant = utc_instant(&dt).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2022, 7, 1, 7, 0, 0).unwrap());
    }

    #[test]
    fn floating_treated_as_utc() {
        let dt = DateTime::floating(2022, 1, 1, 9, 0, 0);
        let instant = utc_instant(&dt).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2022, 1, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn convert_between_zones() {
        let dt = DateTime::zoned(2022, 1, 1, 9, 0, 0, "Europe/Berlin");
        let ny = convert_to_zone(&dt, tz_from_tzid("America/New_York").unwrap()).unwrap();
        assert_eq!(ny.hour, 3);
        assert_eq!(ny.tzid(), Some("America/New_York"));
    }

    #[test]
    fn convert_to_utc_form() {
        let dt = DateTime::zoned(2022, 1, 1, 9, 0, 0, "Europe/Berlin");
        let utc = convert_to_utc(&dt).unwrap();
        assert!(utc.is_utc());
        assert_eq!(utc.hour, 8);
    }

    #[test]
    fn vtimezone_structure() {
        let around = DateTime::zoned(2022, 1, 1, 9, 0, 0, "Europe/Berlin");
        let vtz = vtimezone_for("Europe/Berlin", &around).unwrap();
        assert_eq!(vtz.get_property("TZID").unwrap().as_text(), Some("Europe/Berlin"));
        let standard = &vtz.children[0];
        assert_eq!(
            standard.get_property("TZOFFSETTO").unwrap().as_text(),
            Some("+0100")
        );
    }

    #[test]
    fn required_timezones_added_once() {
        let mut ical = ICalendar::default();
        let mut event = Component::event();
        let mut dtstart = Property::datetime(
            "DTSTART",
            DateTime::zoned(2022, 1, 1, 9, 0, 0, "Europe/Berlin"),
        );
        dtstart.add_param(crate::core::Parameter::tzid("Europe/Berlin"));
        event.add_property(dtstart);
        ical.add_event(event);

        add_required_timezones(&mut ical);
        add_required_timezones(&mut ical);
        assert_eq!(ical.timezones().len(), 1);
    }
}
