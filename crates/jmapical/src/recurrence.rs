//! Recurrence translator: `RRULE` ↔ `recurrenceRule`.

use jmapical_rfc::core::{
    Component, DateTime, Frequency, MonthNum, Property, RRule, RRuleUntil, Skip, Weekday,
    WeekdayNum,
};
use jmapical_rfc::tz;
use serde_json::{json, Map, Value as Json};

use crate::context::Context;
use crate::error::ErrorKind;
use crate::localdate;

/// Converts the component's RRULE into a `recurrenceRule` object, or
/// JSON null without one.
#[must_use]
pub fn recurrence_from_ical(ctx: &Context, comp: &Component) -> Json {
    let Some(prop) = comp.get_property("RRULE") else {
        return Json::Null;
    };
    let Some(rule) = prop.value.as_recur() else {
        return Json::Null;
    };

    let mut recur = Map::new();

    if let Some(freq) = rule.freq {
        recur.insert(
            "frequency".to_string(),
            json!(freq.as_str().to_ascii_lowercase()),
        );
    }

    if let Some(interval) = rule.interval {
        if interval > 1 {
            recur.insert("interval".to_string(), json!(interval));
        }
    }

    if let Some(ref rscale) = rule.rscale {
        recur.insert("rscale".to_string(), json!(rscale.to_ascii_lowercase()));
    }

    match rule.skip {
        Some(Skip::Backward) => {
            recur.insert("skip".to_string(), json!("backward"));
        }
        Some(Skip::Forward) => {
            recur.insert("skip".to_string(), json!("forward"));
        }
        Some(Skip::Omit) | None => {}
    }

    let wkst = rule.wkst.unwrap_or(Weekday::Monday);
    if wkst != Weekday::Monday {
        recur.insert(
            "firstDayOfWeek".to_string(),
            json!(wkst.as_str().to_ascii_lowercase()),
        );
    }

    if !rule.by_day.is_empty() {
        let days: Vec<Json> = rule
            .by_day
            .iter()
            .map(|wd| {
                let mut day = Map::new();
                day.insert(
                    "day".to_string(),
                    json!(wd.weekday.as_str().to_ascii_lowercase()),
                );
                if let Some(nth) = wd.ordinal {
                    day.insert("nthOfPeriod".to_string(), json!(nth));
                }
                Json::Object(day)
            })
            .collect();
        recur.insert("byDay".to_string(), Json::Array(days));
    }

    if !rule.by_month.is_empty() {
        let months: Vec<Json> = rule.by_month.iter().map(|m| json!(m.to_string())).collect();
        recur.insert("byMonth".to_string(), Json::Array(months));
    }

    insert_by_numbers(&mut recur, "byDate", &rule.by_monthday);
    insert_by_numbers(&mut recur, "byYearDay", &rule.by_yearday);
    insert_by_numbers(&mut recur, "byWeekNo", &rule.by_weekno);
    insert_by_numbers(&mut recur, "byHour", &rule.by_hour);
    insert_by_numbers(&mut recur, "byMinute", &rule.by_minute);
    insert_by_numbers(&mut recur, "bySecond", &rule.by_second);
    insert_by_numbers(&mut recur, "bySetPosition", &rule.by_setpos);

    if let Some(count) = rule.count {
        // COUNT takes precedence over UNTIL.
        recur.insert("count".to_string(), json!(count));
    } else if let Some(ref until) = rule.until {
        let dt = match until {
            RRuleUntil::Date(d) => DateTime::from_date(*d),
            RRuleUntil::DateTime(dt) => dt.clone(),
        };
        // UNTIL is UTC on the wire; surface it in the start zone.
        let local = match ctx.tzid_start.as_deref().and_then(tz::tz_from_tzid) {
            Some(zone) => tz::convert_to_zone(&dt, zone).unwrap_or(dt),
            None => dt,
        };
        recur.insert(
            "until".to_string(),
            json!(localdate::localdate_from_datetime(&local)),
        );
    }

    if recur.is_empty() {
        Json::Null
    } else {
        Json::Object(recur)
    }
}

/// Sorted ascending, per the JSCalendar by-array contract.
fn insert_by_numbers<T: Copy + Ord + Into<i64>>(recur: &mut Map<String, Json>, key: &str, list: &[T]) {
    if list.is_empty() {
        return;
    }
    let mut values: Vec<i64> = list.iter().map(|&v| v.into()).collect();
    values.sort_unstable();
    recur.insert(key.to_string(), json!(values));
}

/// Writes the `recurrenceRule` object as the component's RRULE.
pub fn recurrence_to_ical(ctx: &mut Context, comp: &mut Component, recur: &Json) {
    comp.remove_properties("RRULE");

    let Json::Object(recur) = recur else {
        return;
    };

    ctx.begin_prop("recurrenceRule");
    let mut rule = RRule::new();

    // frequency
    match recur.get("frequency") {
        Some(Json::String(s)) => match Frequency::parse(s) {
            Some(freq) => rule.freq = Some(freq),
            None => ctx.invalid_prop(Some("frequency")),
        },
        _ => ctx.invalid_prop(Some("frequency")),
    }

    // interval
    match recur.get("interval") {
        None => {}
        Some(Json::Number(n)) if n.as_i64().is_some_and(|v| v >= 1) => {
            #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "checked >= 1")]
            let interval = n.as_i64().unwrap() as u32;
            rule.interval = Some(interval);
        }
        Some(_) => ctx.invalid_prop(Some("interval")),
    }

    // skip
    let mut has_skip = false;
    match recur.get("skip") {
        None => {}
        Some(Json::String(s)) => match Skip::parse(s) {
            Some(skip) => {
                rule.skip = Some(skip);
                has_skip = true;
            }
            None => ctx.invalid_prop(Some("skip")),
        },
        Some(_) => ctx.invalid_prop(Some("skip")),
    }

    // rscale (mandatory when skip is present)
    match recur.get("rscale") {
        None => {
            if has_skip {
                ctx.invalid_prop(Some("rscale"));
            }
        }
        Some(Json::String(s)) if !s.is_empty() => {
            rule.rscale = Some(s.to_ascii_uppercase());
        }
        Some(_) => ctx.invalid_prop(Some("rscale")),
    }

    // firstDayOfWeek
    match recur.get("firstDayOfWeek") {
        None => {}
        Some(Json::String(s)) => match Weekday::parse(s) {
            Some(day) => rule.wkst = Some(day),
            None => ctx.invalid_prop(Some("firstDayOfWeek")),
        },
        Some(_) => ctx.invalid_prop(Some("firstDayOfWeek")),
    }

    // byDay
    match recur.get("byDay") {
        None => {}
        Some(Json::Array(days)) if !days.is_empty() => {
            for (i, entry) in days.iter().enumerate() {
                ctx.begin_prop_idx("byDay", i);
                let day = entry
                    .get("day")
                    .and_then(Json::as_str)
                    .and_then(Weekday::parse);
                if day.is_none() {
                    ctx.invalid_prop(Some("day"));
                }

                let mut ordinal = None;
                match entry.get("nthOfPeriod") {
                    None => {}
                    Some(Json::Number(n)) if n.as_i64().is_some_and(|v| v != 0) => {
                        #[expect(clippy::cast_possible_truncation, reason = "BYDAY ordinals are small")]
                        let nth = n.as_i64().unwrap() as i8;
                        ordinal = Some(nth);
                    }
                    Some(_) => ctx.invalid_prop(Some("nthOfPeriod")),
                }

                if let Some(weekday) = day {
                    rule.by_day.push(WeekdayNum { ordinal, weekday });
                }
                ctx.end_prop();
            }
        }
        Some(_) => ctx.invalid_prop(Some("byDay")),
    }

    // byMonth
    match recur.get("byMonth") {
        None => {}
        Some(Json::Array(months)) if !months.is_empty() => {
            for (i, entry) in months.iter().enumerate() {
                match entry.as_str().and_then(MonthNum::parse) {
                    Some(month) => rule.by_month.push(month),
                    None => {
                        ctx.begin_prop_idx("byMonth", i);
                        ctx.invalid_prop(None);
                        ctx.end_prop();
                    }
                }
            }
        }
        Some(_) => ctx.invalid_prop(Some("byMonth")),
    }

    rule.by_monthday = read_by_numbers(ctx, recur, "byDate", -31, 31, false);
    rule.by_yearday = read_by_numbers(ctx, recur, "byYearDay", -366, 366, false);
    rule.by_weekno = read_by_numbers(ctx, recur, "byWeekNo", -53, 53, false);
    rule.by_hour = read_by_numbers(ctx, recur, "byHour", 0, 23, true);
    rule.by_minute = read_by_numbers(ctx, recur, "byMinute", 0, 59, true);
    rule.by_second = read_by_numbers(ctx, recur, "bySecond", 0, 59, true);
    rule.by_setpos = read_by_numbers(ctx, recur, "bySetPosition", -366, 366, false);

    // count XOR until
    if recur.contains_key("count") && recur.contains_key("until") {
        ctx.invalid_prop(Some("count"));
        ctx.invalid_prop(Some("until"));
    } else {
        match recur.get("count") {
            None => {}
            Some(Json::Number(n)) if n.as_i64().is_some_and(|v| v > 0) => {
                #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "checked > 0")]
                let count = n.as_i64().unwrap() as u32;
                rule.count = Some(count);
            }
            Some(_) => ctx.invalid_prop(Some("count")),
        }

        match recur.get("until") {
            None => {}
            Some(Json::String(s)) => {
                match localdate::localdate_to_datetime(s, ctx.tz_start, ctx.is_all_day) {
                    Some(local) => {
                        // Stored in UTC on the wire; all-day boundaries
                        // stay date-only.
                        if ctx.is_all_day && ctx.tz_start.is_none() {
                            rule.until = Some(RRuleUntil::Date(local.date()));
                        } else {
                            let utc = tz::convert_to_utc(&local).unwrap_or(local);
                            rule.until = Some(RRuleUntil::DateTime(utc));
                        }
                    }
                    None => ctx.invalid_prop(Some("until")),
                }
            }
            Some(_) => ctx.invalid_prop(Some("until")),
        }
    }

    if !ctx.has_invalid() {
        if rule.freq.is_some() {
            comp.add_property(Property::recur("RRULE", rule));
        } else {
            // The built rule has no frequency; the rule is unusable.
            ctx.fatal = Some(ErrorKind::Unknown);
            ctx.invalid_prop(None);
        }
    }

    ctx.end_prop();
}

fn read_by_numbers<T>(
    ctx: &mut Context,
    recur: &Map<String, Json>,
    field: &str,
    lower: i64,
    upper: i64,
    allow_zero: bool,
) -> Vec<T>
where
    T: TryFrom<i64>,
{
    let mut out = Vec::new();
    match recur.get(field) {
        None => {}
        Some(Json::Array(values)) if !values.is_empty() => {
            for (i, entry) in values.iter().enumerate() {
                let ok = entry
                    .as_i64()
                    .filter(|&v| (allow_zero || v != 0) && v >= lower && v <= upper)
                    .and_then(|v| T::try_from(v).ok());
                match ok {
                    Some(v) => out.push(v),
                    None => {
                        ctx.begin_prop_idx(field, i);
                        ctx.invalid_prop(None);
                        ctx.end_prop();
                    }
                }
            }
        }
        Some(_) => ctx.invalid_prop(Some(field)),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use jmapical_rfc::parse::values::parse_rrule;
    use serde_json::json;

    fn comp_with_rrule(rule: &str) -> Component {
        let mut comp = Component::event();
        comp.add_property(Property::recur("RRULE", parse_rrule(rule, 1, 1).unwrap()));
        comp
    }

    #[test]
    fn read_basic_rule() {
        let ctx = Context::read(None);
        let comp = comp_with_rrule("FREQ=DAILY;COUNT=5");
        let recur = recurrence_from_ical(&ctx, &comp);
        assert_eq!(recur, json!({"frequency": "daily", "count": 5}));
    }

    #[test]
    fn read_sorts_numeric_arrays() {
        let ctx = Context::read(None);
        let comp = comp_with_rrule("FREQ=MONTHLY;BYMONTHDAY=15,-1,2");
        let recur = recurrence_from_ical(&ctx, &comp);
        assert_eq!(recur["byDate"], json!([-1, 2, 15]));
    }

    #[test]
    fn read_byday_keeps_order() {
        let ctx = Context::read(None);
        let comp = comp_with_rrule("FREQ=WEEKLY;BYDAY=FR,MO");
        let recur = recurrence_from_ical(&ctx, &comp);
        assert_eq!(
            recur["byDay"],
            json!([{"day": "fr"}, {"day": "mo"}])
        );
    }

    #[test]
    fn read_until_in_start_zone() {
        let mut ctx = Context::read(None);
        ctx.tzid_start = Some("Europe/Berlin".to_string());
        let comp = comp_with_rrule("FREQ=DAILY;UNTIL=20220105T080000Z");
        let recur = recurrence_from_ical(&ctx, &comp);
        assert_eq!(recur["until"], json!("2022-01-05T09:00:00"));
    }

    #[test]
    fn read_default_wkst_omitted() {
        let ctx = Context::read(None);
        let comp = comp_with_rrule("FREQ=WEEKLY;WKST=MO");
        let recur = recurrence_from_ical(&ctx, &comp);
        assert!(recur.get("firstDayOfWeek").is_none());

        let comp = comp_with_rrule("FREQ=WEEKLY;WKST=SU");
        let recur = recurrence_from_ical(&ctx, &comp);
        assert_eq!(recur["firstDayOfWeek"], json!("su"));
    }

    #[test]
    fn write_basic_rule() {
        let mut ctx = Context::write();
        ctx.tz_start = tz::tz_from_tzid("Europe/Berlin");
        let mut comp = Component::event();
        recurrence_to_ical(
            &mut ctx,
            &mut comp,
            &json!({"frequency": "daily", "count": 5}),
        );
        assert!(!ctx.has_invalid());
        assert_eq!(comp.get_property("RRULE").unwrap().raw_value, "FREQ=DAILY;COUNT=5");
    }

    #[test]
    fn write_until_converts_to_utc() {
        let mut ctx = Context::write();
        ctx.tz_start = tz::tz_from_tzid("Europe/Berlin");
        let mut comp = Component::event();
        recurrence_to_ical(
            &mut ctx,
            &mut comp,
            &json!({"frequency": "daily", "until": "2022-01-05T09:00:00"}),
        );
        assert!(!ctx.has_invalid());
        assert_eq!(
            comp.get_property("RRULE").unwrap().raw_value,
            "FREQ=DAILY;UNTIL=20220105T080000Z"
        );
    }

    #[test]
    fn write_rejects_count_and_until() {
        let mut ctx = Context::write();
        let mut comp = Component::event();
        recurrence_to_ical(
            &mut ctx,
            &mut comp,
            &json!({"frequency": "daily", "count": 3, "until": "2022-01-05T09:00:00"}),
        );
        let props = ctx.invalid_props();
        assert!(props.contains(&"recurrenceRule/count".to_string()));
        assert!(props.contains(&"recurrenceRule/until".to_string()));
    }

    #[test]
    fn write_validates_ranges() {
        let mut ctx = Context::write();
        let mut comp = Component::event();
        recurrence_to_ical(
            &mut ctx,
            &mut comp,
            &json!({"frequency": "monthly", "byDate": [0, 32, 10]}),
        );
        let props = ctx.invalid_props();
        assert!(props.contains(&"recurrenceRule/byDate/0".to_string()));
        assert!(props.contains(&"recurrenceRule/byDate/1".to_string()));
        assert!(comp.get_property("RRULE").is_none());
    }

    #[test]
    fn write_skip_requires_rscale() {
        let mut ctx = Context::write();
        let mut comp = Component::event();
        recurrence_to_ical(
            &mut ctx,
            &mut comp,
            &json!({"frequency": "yearly", "skip": "forward"}),
        );
        assert!(ctx
            .invalid_props()
            .contains(&"recurrenceRule/rscale".to_string()));
    }

    #[test]
    fn round_trip_leap_month() {
        let mut ctx = Context::write();
        let mut comp = Component::event();
        let input = json!({
            "frequency": "yearly",
            "rscale": "chinese",
            "skip": "forward",
            "byMonth": ["3L"],
        });
        recurrence_to_ical(&mut ctx, &mut comp, &input);
        assert!(!ctx.has_invalid());

        let read_ctx = Context::read(None);
        assert_eq!(recurrence_from_ical(&read_ctx, &comp), input);
    }
}
