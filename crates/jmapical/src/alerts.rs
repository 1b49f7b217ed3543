//! Alerts translator: `VALARM` ↔ `alerts`, pairing snooze alarms via
//! `RELATED-TO;RELTYPE=SNOOZE`.

use std::collections::HashMap;

use jmapical_rfc::build::serialize_component;
use jmapical_rfc::core::{
    Component, ComponentKind, DateTime, Duration, Parameter, Property, Trigger,
};
use jmapical_rfc::parse::values::parse_duration;
use jmapical_rfc::tz;
use serde_json::{json, Map, Value as Json};

use crate::context::Context;
use crate::localdate;
use crate::time;
use crate::util;
use crate::Options;

/// Returns whether an alarm is a snooze: `RELATED-TO` with
/// `RELTYPE=SNOOZE` and a non-empty target uid.
fn snooze_target(alarm: &Component) -> Option<&str> {
    let prop = alarm.get_property("RELATED-TO")?;
    let uid = prop.value_as_string();
    if uid.is_empty() {
        return None;
    }
    let reltype = prop.get_param_value("RELTYPE")?;
    reltype.eq_ignore_ascii_case("SNOOZE").then_some(uid)
}

/// Converts the component's VALARMs into the `alerts` map, or JSON null
/// without any.
#[must_use]
pub fn alerts_from_ical(ctx: &mut Context, comp: &Component) -> Json {
    let mut alerts = Map::new();

    // Partition into regular alarms and the snoozes pointing at them.
    let mut snoozes: HashMap<String, &Component> = HashMap::new();
    let mut regular: Vec<&Component> = Vec::new();
    for alarm in comp.children_of_kind(ComponentKind::Alarm) {
        let action = alarm
            .get_property("ACTION")
            .map(Property::value_as_string)
            .unwrap_or_default();
        if action.eq_ignore_ascii_case("NONE") {
            continue;
        }
        match snooze_target(alarm) {
            Some(uid) => {
                snoozes.insert(uid.to_string(), alarm);
            }
            None => regular.push(alarm),
        }
    }

    for alarm in regular {
        let id = alarm
            .uid()
            .map_or_else(|| util::sha1_key(&serialize_component(alarm)), str::to_string);
        ctx.begin_prop_key("alerts", &id);

        let mut trigger = Trigger::Duration(Duration::zero());
        let mut related_end = false;
        if let Some(prop) = alarm.get_property("TRIGGER") {
            if let Some(t) = prop.as_trigger() {
                trigger = t.clone();
            }
            if let Some(related) = prop.get_param_value("RELATED") {
                match related.to_ascii_uppercase().as_str() {
                    "START" => {}
                    "END" => related_end = true,
                    _ => {
                        // Unusable anchor; skip this alarm.
                        ctx.end_prop();
                        continue;
                    }
                }
            }
        }

        // Offset between the alarm and its anchor.
        let duration = match &trigger {
            Trigger::Duration(d) => *d,
            Trigger::DateTime(at) => {
                let anchor = if related_end {
                    time::dtend_from_ical(comp)
                } else {
                    time::dtstart_from_ical(comp)
                };
                let diff = anchor
                    .as_ref()
                    .and_then(tz::utc_instant)
                    .zip(tz::utc_instant(at))
                    .map(|(t_ref, t_at)| (t_at - t_ref).num_seconds());
                match diff {
                    Some(seconds) => Duration::from_seconds(seconds),
                    None => {
                        ctx.end_prop();
                        continue;
                    }
                }
            }
        };

        let mut alert = Map::new();

        let action = alarm
            .get_property("ACTION")
            .map(Property::value_as_string)
            .unwrap_or_default();
        let action = if action.eq_ignore_ascii_case("EMAIL") {
            "email"
        } else {
            "display"
        };
        alert.insert("action".to_string(), json!(action));

        let relative_to = match (duration.negative, related_end) {
            (true, false) => "before-start",
            (false, false) => "after-start",
            (true, true) => "before-end",
            (false, true) => "after-end",
        };
        alert.insert("relativeTo".to_string(), json!(relative_to));
        alert.insert("offset".to_string(), json!(duration.abs().to_string()));

        if let Some(prop) = alarm.get_property("ACKNOWLEDGED") {
            if let Some(dt) = prop.as_datetime() {
                if let Some(stamp) = localdate::utcdate_from_datetime(dt) {
                    alert.insert("acknowledged".to_string(), json!(stamp));
                }
            }
        }

        if let Some(snooze) = alarm.uid().and_then(|uid| snoozes.get(uid)) {
            let snoozed_at = snooze
                .get_property("TRIGGER")
                .and_then(Property::as_trigger)
                .and_then(|t| match t {
                    Trigger::DateTime(dt) => localdate::utcdate_from_datetime(dt),
                    Trigger::Duration(_) => None,
                });
            if let Some(stamp) = snoozed_at {
                alert.insert("snoozed".to_string(), json!(stamp));
            }
        }

        alerts.insert(id, Json::Object(alert));
        ctx.end_prop();
    }

    if alerts.is_empty() {
        Json::Null
    } else {
        Json::Object(alerts)
    }
}

/// Writes the `alerts` map as VALARM sub-components, with snooze
/// siblings for snoozed alerts.
pub fn alerts_to_ical(
    ctx: &mut Context,
    comp: &mut Component,
    alerts: &Json,
    options: &Options,
) {
    comp.remove_children(ComponentKind::Alarm);

    let Json::Object(alerts) = alerts else {
        return;
    };

    for (id, alert) in alerts {
        ctx.begin_prop_key("alerts", id);

        if !util::is_valid_jmap_id(id) {
            ctx.invalid_prop(None);
            ctx.end_prop();
            continue;
        }

        let mut alarm = Component::alarm();
        alarm.add_property(Property::text("UID", id));

        // offset
        let mut offset = Duration::zero();
        match alert.get("offset") {
            Some(Json::String(s)) => match parse_duration(s, 0, 0) {
                Ok(d) => offset = d,
                Err(_) => ctx.invalid_prop(Some("offset")),
            },
            _ => ctx.invalid_prop(Some("offset")),
        }

        // relativeTo picks the anchor and the trigger sign.
        let mut related_end = false;
        let mut negative = true;
        match alert.get("relativeTo") {
            None | Some(Json::Null) => {}
            Some(Json::String(s)) => match s.as_str() {
                "before-start" => {}
                "after-start" => negative = false,
                "before-end" => related_end = true,
                "after-end" => {
                    related_end = true;
                    negative = false;
                }
                _ => ctx.invalid_prop(Some("relativeTo")),
            },
            Some(_) => ctx.invalid_prop(Some("relativeTo")),
        }

        let mut trigger = Property::trigger(Trigger::Duration(offset.with_sign(negative)));
        trigger.add_param(Parameter::related(related_end));
        alarm.add_property(trigger);

        // snoozed: a sibling VALARM pointing back at this alert.
        match alert.get("snoozed") {
            None | Some(Json::Null) => {}
            Some(Json::String(stamp)) => match localdate::utcdate_to_datetime(stamp) {
                Some(at) => comp.add_child(build_snooze(id, &at)),
                None => ctx.invalid_prop(Some("snoozed")),
            },
            Some(_) => ctx.invalid_prop(Some("snoozed")),
        }

        // acknowledged
        match alert.get("acknowledged") {
            None | Some(Json::Null) => {}
            Some(Json::String(stamp)) => match localdate::utcdate_to_datetime(stamp) {
                Some(at) => {
                    alarm.add_property(Property::datetime("ACKNOWLEDGED", at));
                }
                None => ctx.invalid_prop(Some("acknowledged")),
            },
            Some(_) => ctx.invalid_prop(Some("acknowledged")),
        }

        // action
        let mut email_action = false;
        match alert.get("action") {
            None | Some(Json::Null) => {}
            Some(Json::String(action)) => match action.as_str() {
                "email" => email_action = true,
                "display" => {}
                _ => ctx.invalid_prop(Some("action")),
            },
            Some(_) => ctx.invalid_prop(Some("action")),
        }
        alarm.add_property(Property::text(
            "ACTION",
            if email_action { "EMAIL" } else { "DISPLAY" },
        ));

        if email_action {
            // Email alerts address the calendar user and need a summary.
            if let Some(addr) = &options.calendar_user_address {
                let uri = if addr.len() >= 7 && addr[..7].eq_ignore_ascii_case("mailto:") {
                    addr.clone()
                } else {
                    util::mail_addr_to_uri(addr)
                };
                alarm.add_property(Property::cal_address("ATTENDEE", uri));
            }
            let summary = comp.summary().unwrap_or("Your event alert").to_string();
            alarm.add_property(Property::text("SUMMARY", summary));
        }

        // DESCRIPTION is required for display and email alike.
        let description = comp.description().unwrap_or("").to_string();
        alarm.add_property(Property::text("DESCRIPTION", description));

        comp.add_child(alarm);
        ctx.end_prop();
    }
}

fn build_snooze(alert_id: &str, at: &DateTime) -> Component {
    let mut snooze = Component::alarm();
    let mut related = Property::text("RELATED-TO", alert_id);
    related.add_param(Parameter::reltype("SNOOZE"));
    snooze.add_property(related);
    snooze.add_property(Property::trigger(Trigger::DateTime(at.clone())));
    snooze
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alarm_with(action: &str, trigger: Trigger) -> Component {
        let mut alarm = Component::alarm();
        alarm.add_property(Property::text("ACTION", action));
        alarm.add_property(Property::trigger(trigger));
        alarm
    }

    #[test]
    fn relative_trigger_maps_to_offset() {
        let mut comp = Component::event();
        let mut alarm = alarm_with("DISPLAY", Trigger::Duration(Duration::minutes(15).negate()));
        alarm.add_property(Property::text("UID", "a1"));
        comp.add_child(alarm);

        let mut ctx = Context::read(None);
        let alerts = alerts_from_ical(&mut ctx, &comp);
        assert_eq!(
            alerts["a1"],
            json!({"action": "display", "relativeTo": "before-start", "offset": "PT15M"})
        );
    }

    #[test]
    fn absolute_trigger_subtracts_anchor() {
        let mut comp = Component::event();
        comp.add_property(time::build_dtprop(
            "DTSTART",
            &DateTime::utc(2022, 1, 1, 10, 30, 0),
            Some(chrono_tz::Tz::UTC),
            false,
        ));
        let mut alarm = alarm_with(
            "DISPLAY",
            Trigger::DateTime(DateTime::utc(2022, 1, 1, 10, 15, 0)),
        );
        alarm.add_property(Property::text("UID", "a1"));
        comp.add_child(alarm);

        let mut ctx = Context::read(None);
        let alerts = alerts_from_ical(&mut ctx, &comp);
        assert_eq!(alerts["a1"]["relativeTo"], json!("before-start"));
        assert_eq!(alerts["a1"]["offset"], json!("PT15M"));
    }

    #[test]
    fn snooze_pairs_by_uid() {
        let mut comp = Component::event();
        let mut alarm = alarm_with("DISPLAY", Trigger::Duration(Duration::minutes(15).negate()));
        alarm.add_property(Property::text("UID", "alert1"));
        comp.add_child(alarm);
        comp.add_child(build_snooze(
            "alert1",
            &DateTime::utc(2022, 1, 1, 10, 15, 0),
        ));

        let mut ctx = Context::read(None);
        let alerts = alerts_from_ical(&mut ctx, &comp);
        assert_eq!(alerts["alert1"]["snoozed"], json!("2022-01-01T10:15:00Z"));
        assert_eq!(alerts.as_object().unwrap().len(), 1);
    }

    #[test]
    fn action_none_is_skipped() {
        let mut comp = Component::event();
        let mut alarm = alarm_with("NONE", Trigger::Duration(Duration::minutes(5)));
        alarm.add_property(Property::text("UID", "a1"));
        comp.add_child(alarm);

        let mut ctx = Context::read(None);
        assert_eq!(alerts_from_ical(&mut ctx, &comp), Json::Null);
    }

    #[test]
    fn write_display_alert() {
        let mut comp = Component::event();
        comp.add_property(Property::text("SUMMARY", "Standup"));
        let alerts = json!({
            "a1": {"action": "display", "relativeTo": "before-start", "offset": "PT15M"},
        });
        let mut ctx = Context::write();
        alerts_to_ical(&mut ctx, &mut comp, &alerts, &Options::default());
        assert!(!ctx.has_invalid());

        let alarms = comp.children_of_kind(ComponentKind::Alarm);
        assert_eq!(alarms.len(), 1);
        let trigger = alarms[0].get_property("TRIGGER").unwrap();
        assert_eq!(trigger.raw_value, "-PT15M");
        assert_eq!(trigger.get_param_value("RELATED"), Some("START"));
        assert!(alarms[0].get_property("DESCRIPTION").is_some());
    }

    #[test]
    fn write_email_alert_addresses_calendar_user() {
        let mut comp = Component::event();
        let alerts = json!({
            "a1": {"action": "email", "relativeTo": "after-end", "offset": "PT0S"},
        });
        let mut ctx = Context::write();
        let options = Options {
            calendar_user_address: Some("user@example.com".to_string()),
            ..Options::default()
        };
        alerts_to_ical(&mut ctx, &mut comp, &alerts, &options);

        let alarms = comp.children_of_kind(ComponentKind::Alarm);
        let attendee = alarms[0].get_property("ATTENDEE").unwrap();
        assert_eq!(attendee.raw_value, "mailto:user@example.com");
        assert_eq!(
            alarms[0].get_property("SUMMARY").unwrap().as_text(),
            Some("Your event alert")
        );
        let trigger = alarms[0].get_property("TRIGGER").unwrap();
        assert_eq!(trigger.get_param_value("RELATED"), Some("END"));
        assert_eq!(trigger.raw_value, "PT0S");
    }

    #[test]
    fn write_snoozed_creates_sibling() {
        let mut comp = Component::event();
        let alerts = json!({
            "a1": {
                "action": "display",
                "relativeTo": "before-start",
                "offset": "PT15M",
                "snoozed": "2022-01-01T10:15:00Z",
            },
        });
        let mut ctx = Context::write();
        alerts_to_ical(&mut ctx, &mut comp, &alerts, &Options::default());

        let alarms = comp.children_of_kind(ComponentKind::Alarm);
        assert_eq!(alarms.len(), 2);
        let snooze = alarms
            .iter()
            .find(|a| a.get_property("RELATED-TO").is_some())
            .unwrap();
        let related = snooze.get_property("RELATED-TO").unwrap();
        assert_eq!(related.as_text(), Some("a1"));
        assert_eq!(related.get_param_value("RELTYPE"), Some("SNOOZE"));
        assert_eq!(
            snooze.get_property("TRIGGER").unwrap().raw_value,
            "20220101T101500Z"
        );
    }
}
