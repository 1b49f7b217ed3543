//! Time/Zone translator: start, duration, end, `timeZone`, all-day
//! semantics, and the end-location timezone.

use chrono_tz::Tz;
use jmapical_rfc::core::{Component, DateTime, DateTimeForm, Duration, Parameter, Property, Value};
use jmapical_rfc::parse::values::parse_duration;
use jmapical_rfc::tz;
use serde_json::{Map, Value as Json};

use crate::context::Context;
use crate::localdate;
use crate::util::xname;

/// Determines the Olson TZID of a date(-time) property.
///
/// A TZID parameter wins if it resolves; an unresolvable TZID is
/// treated as absent. Without a parameter, a UTC value implies
/// `Etc/UTC`.
#[must_use]
pub fn tzid_from_property(prop: &Property) -> Option<String> {
    if let Some(tzid) = prop.get_param_value("TZID") {
        if tz::tz_from_tzid(tzid).is_some() {
            return Some(tzid.to_string());
        }
        return None;
    }
    match &prop.value {
        Value::DateTime(dt) if dt.is_utc() => Some("Etc/UTC".to_string()),
        Value::DateTimeList(list) if list.first().is_some_and(DateTime::is_utc) => {
            Some("Etc/UTC".to_string())
        }
        _ => None,
    }
}

/// Determines the Olson TZID of the named property in a component.
#[must_use]
pub fn tzid_of(comp: &Component, prop_name: &str) -> Option<String> {
    tzid_from_property(comp.get_property(prop_name)?)
}

fn datetime_of(prop: &Property) -> Option<DateTime> {
    match &prop.value {
        Value::DateTime(dt) => Some(dt.clone()),
        Value::Date(d) => Some(DateTime::from_date(*d)),
        _ => None,
    }
}

/// Returns the event start, with DATE values as floating midnights.
#[must_use]
pub fn dtstart_from_ical(comp: &Component) -> Option<DateTime> {
    datetime_of(comp.get_property("DTSTART")?)
}

/// Returns the event end, derived from DTEND or DTSTART + DURATION.
#[must_use]
pub fn dtend_from_ical(comp: &Component) -> Option<DateTime> {
    if let Some(prop) = comp.get_property("DTEND") {
        return datetime_of(prop);
    }
    let start = dtstart_from_ical(comp)?;
    let duration = *comp.get_property("DURATION")?.as_duration()?;
    tz::add_seconds(&start, duration.as_seconds())
}

/// Computes the JSCalendar `duration` string: the positive interval
/// between start and end in their own zones, or `PT0S`.
#[must_use]
pub fn duration_from_ical(comp: &Component) -> String {
    let zero = || Duration::zero().to_string();

    let Some(start) = dtstart_from_ical(comp) else {
        return zero();
    };
    let Some(end) = dtend_from_ical(comp) else {
        return zero();
    };
    let (Some(t0), Some(t1)) = (tz::utc_instant(&start), tz::utc_instant(&end)) else {
        return zero();
    };

    let seconds = (t1 - t0).num_seconds();
    if seconds <= 0 {
        return zero();
    }
    Duration::from_seconds(seconds).to_string()
}

/// Builds a date(-time) property in the given zone. All-day values
/// become `VALUE=DATE`.
#[must_use]
pub fn build_dtprop(name: &str, dt: &DateTime, zone: Option<Tz>, is_date: bool) -> Property {
    if is_date {
        return Property::date(name, dt.date());
    }

    let dt = match zone {
        Some(z) if tz::is_utc(z) => dt.clone().with_form(DateTimeForm::Utc),
        Some(z) => dt.clone().with_form(DateTimeForm::Zoned {
            tzid: z.name().to_string(),
        }),
        None => dt.clone().with_form(DateTimeForm::Floating),
    };
    let tzid = dt.tzid().map(str::to_string);

    let mut prop = Property::datetime(name, dt);
    if let Some(tzid) = tzid {
        prop.add_param(Parameter::tzid(tzid));
    }
    prop
}

/// Adds a date(-time) property, optionally purging same-named ones
/// first. Writing DTEND purges DURATION and vice versa.
pub fn dtprop_to_ical(
    comp: &mut Component,
    name: &str,
    dt: &DateTime,
    zone: Option<Tz>,
    is_date: bool,
    purge: bool,
) {
    if purge {
        comp.remove_properties(name);
    }
    if name == "DTEND" {
        comp.remove_properties("DURATION");
    } else if name == "DURATION" {
        comp.remove_properties("DTEND");
    }
    comp.add_property(build_dtprop(name, dt, zone, is_date));
}

/// Returns whether a location entry denotes the end timezone:
/// `rel: "end"` with a `timeZone` key.
#[must_use]
pub fn location_is_end_timezone(loc: &Json) -> bool {
    loc.get("rel").and_then(Json::as_str) == Some("end") && loc.get("timeZone").is_some()
}

/// Writes DTSTART plus either DURATION or DTEND, as defined by the
/// event's `start`, `duration`, `timeZone` and end-location.
pub fn startend_to_ical(ctx: &mut Context, comp: &mut Component, event: &Map<String, Json>) {
    // Start zone previously on the component (kept for cloned
    // exceptions whose patch does not touch the start).
    let tz_old = tzid_of(comp, "DTSTART").and_then(|t| tz::tz_from_tzid(&t));

    // timeZone
    match event.get("timeZone") {
        Some(Json::Null) => ctx.tz_start = None,
        Some(Json::String(s)) => match tz::tz_from_tzid(s) {
            Some(z) => ctx.tz_start = Some(z),
            None => {
                ctx.invalid_prop(Some("timeZone"));
                ctx.tz_start = None;
            }
        },
        Some(_) => {
            ctx.invalid_prop(Some("timeZone"));
            ctx.tz_start = tz_old;
        }
        None => {
            // Mandatory unless the event is all-day.
            if !ctx.is_all_day {
                ctx.invalid_prop(Some("timeZone"));
            }
            ctx.tz_start = tz_old;
        }
    }
    if ctx.is_all_day && ctx.tz_start.is_some() {
        ctx.invalid_prop(Some("timeZone"));
    }

    // End zone: the first location with rel=end and a timeZone.
    let mut endzone_id: Option<String> = None;
    ctx.tz_end = ctx.tz_start;
    if let Some(Json::Object(locations)) = event.get("locations") {
        for (id, loc) in locations {
            if !location_is_end_timezone(loc) {
                continue;
            }
            endzone_id = Some(id.clone());
            ctx.begin_prop_key("locations", id);

            match loc.get("timeZone") {
                Some(Json::Null) | None => ctx.tz_end = None,
                Some(Json::String(s)) => match tz::tz_from_tzid(s) {
                    Some(z) => ctx.tz_end = Some(z),
                    None => ctx.invalid_prop(Some("timeZone")),
                },
                Some(_) => ctx.invalid_prop(Some("timeZone")),
            }

            // Both endpoints float, or neither does.
            if ctx.tz_start.is_none() != ctx.tz_end.is_none() {
                ctx.invalid_prop(Some("timeZone"));
            }
            if ctx.is_all_day && ctx.tz_end.is_some() {
                ctx.invalid_prop(Some("timeZone"));
            }

            ctx.end_prop();
            break;
        }
    }
    if endzone_id.is_none() {
        ctx.tz_end = ctx.tz_start;
    }

    // duration
    let mut duration = Duration::zero();
    match event.get("duration") {
        Some(Json::String(s)) => match parse_duration(s, 0, 0) {
            Ok(d) => duration = d,
            Err(_) => ctx.invalid_prop(Some("duration")),
        },
        Some(Json::Null) | None => {}
        Some(_) => ctx.invalid_prop(Some("duration")),
    }
    if ctx.is_all_day && duration.has_time() {
        ctx.invalid_prop(Some("duration"));
    }

    // start
    let old_start = dtstart_from_ical(comp);
    let parsed_start = match event.get("start") {
        Some(Json::String(s)) => {
            let dt = localdate::localdate_to_datetime(s, ctx.tz_start, ctx.is_all_day);
            if dt.is_none() {
                ctx.invalid_prop(Some("start"));
            }
            dt
        }
        _ => {
            ctx.invalid_prop(Some("start"));
            None
        }
    };

    if ctx.has_invalid() {
        return;
    }
    let Some(dtstart) = parsed_start.or(old_start) else {
        ctx.invalid_prop(Some("start"));
        return;
    };

    // Purge and rebuild the start and end properties.
    comp.remove_properties("DTSTART");
    comp.remove_properties("DTEND");
    comp.remove_properties("DURATION");

    let is_date = ctx.is_all_day && ctx.tz_start.is_none();
    dtprop_to_ical(comp, "DTSTART", &dtstart, ctx.tz_start, is_date, true);

    if ctx.tz_start == ctx.tz_end {
        comp.add_property(Property::duration("DURATION", duration));
    } else {
        // Differing zones: encode as an explicit DTEND in the end zone,
        // carrying the end-location id.
        let end_zone = ctx.tz_end.unwrap_or(chrono_tz::Tz::UTC);
        let dtend = tz::add_seconds(&dtstart, duration.as_seconds())
            .and_then(|wall| tz::convert_to_zone(&wall, end_zone));
        if let Some(dtend) = dtend {
            let mut prop = build_dtprop("DTEND", &dtend, ctx.tz_end, false);
            if let Some(id) = &endzone_id {
                prop.set_param(Parameter::new(xname::ID, id));
            }
            comp.remove_properties("DURATION");
            comp.add_property(prop);
        } else {
            ctx.invalid_prop(Some("start"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jmapical_rfc::core::Date;
    use serde_json::json;

    fn event_with(props: Json) -> Map<String, Json> {
        props.as_object().cloned().unwrap()
    }

    #[test]
    fn duration_between_zones() {
        let mut comp = Component::event();
        comp.add_property(build_dtprop(
            "DTSTART",
            &DateTime::zoned(2022, 1, 1, 9, 0, 0, "Europe/Berlin"),
            tz::tz_from_tzid("Europe/Berlin"),
            false,
        ));
        comp.add_property(build_dtprop(
            "DTEND",
            &DateTime::zoned(2022, 1, 1, 6, 0, 0, "America/New_York"),
            tz::tz_from_tzid("America/New_York"),
            false,
        ));
        assert_eq!(duration_from_ical(&comp), "PT3H");
    }

    #[test]
    fn duration_defaults_to_zero() {
        let mut comp = Component::event();
        comp.add_property(Property::date("DTSTART", Date::new(2022, 3, 7)));
        assert_eq!(duration_from_ical(&comp), "PT0S");
    }

    #[test]
    fn duration_from_duration_property() {
        let mut comp = Component::event();
        comp.add_property(build_dtprop(
            "DTSTART",
            &DateTime::zoned(2022, 1, 1, 9, 0, 0, "Europe/Berlin"),
            tz::tz_from_tzid("Europe/Berlin"),
            false,
        ));
        comp.add_property(Property::duration("DURATION", Duration::minutes(90)));
        assert_eq!(duration_from_ical(&comp), "PT1H30M");
    }

    #[test]
    fn write_same_zone_uses_duration() {
        let mut ctx = Context::write();
        let mut comp = Component::event();
        let event = event_with(json!({
            "timeZone": "Europe/Berlin",
            "start": "2022-01-01T09:00:00",
            "duration": "PT1H",
        }));
        startend_to_ical(&mut ctx, &mut comp, &event);
        assert!(!ctx.has_invalid());

        let dtstart = comp.get_property("DTSTART").unwrap();
        assert_eq!(dtstart.get_param_value("TZID"), Some("Europe/Berlin"));
        assert_eq!(dtstart.raw_value, "20220101T090000");
        assert!(comp.get_property("DTEND").is_none());
        assert_eq!(comp.get_property("DURATION").unwrap().raw_value, "PT1H");
    }

    #[test]
    fn write_differing_zones_uses_dtend() {
        let mut ctx = Context::write();
        let mut comp = Component::event();
        let event = event_with(json!({
            "timeZone": "Europe/Berlin",
            "start": "2022-01-01T09:00:00",
            "duration": "PT3H",
            "locations": {
                "end1": {"rel": "end", "timeZone": "America/New_York"},
            },
        }));
        startend_to_ical(&mut ctx, &mut comp, &event);
        assert!(!ctx.has_invalid(), "{:?}", ctx.invalid_props());

        let dtend = comp.get_property("DTEND").unwrap();
        assert_eq!(dtend.get_param_value("TZID"), Some("America/New_York"));
        // 12:00 Berlin == 06:00 New York in winter.
        assert_eq!(dtend.raw_value, "20220101T060000");
        assert_eq!(dtend.get_param_value(xname::ID), Some("end1"));
        assert!(comp.get_property("DURATION").is_none());
    }

    #[test]
    fn write_all_day_uses_date_value() {
        let mut ctx = Context::write();
        ctx.is_all_day = true;
        let mut comp = Component::event();
        let event = event_with(json!({
            "timeZone": null,
            "start": "2022-03-07T00:00:00",
            "duration": "P1D",
        }));
        startend_to_ical(&mut ctx, &mut comp, &event);
        assert!(!ctx.has_invalid());

        let dtstart = comp.get_property("DTSTART").unwrap();
        assert_eq!(dtstart.get_param_value("VALUE"), Some("DATE"));
        assert_eq!(dtstart.raw_value, "20220307");
    }

    #[test]
    fn all_day_with_time_of_day_is_error() {
        let mut ctx = Context::write();
        ctx.is_all_day = true;
        let mut comp = Component::event();
        let event = event_with(json!({
            "timeZone": null,
            "start": "2022-03-07T09:00:00",
            "duration": "PT2H",
        }));
        startend_to_ical(&mut ctx, &mut comp, &event);
        assert!(ctx.invalid_props().contains(&"start".to_string()));
        assert!(ctx.invalid_props().contains(&"duration".to_string()));
    }

    #[test]
    fn floating_mismatch_is_error() {
        let mut ctx = Context::write();
        let mut comp = Component::event();
        let event = event_with(json!({
            "timeZone": null,
            "start": "2022-01-01T09:00:00",
            "locations": {"e": {"rel": "end", "timeZone": "Europe/Berlin"}},
        }));
        startend_to_ical(&mut ctx, &mut comp, &event);
        assert!(ctx
            .invalid_props()
            .contains(&"locations/e/timeZone".to_string()));
    }
}
