//! iCalendar serializer with canonical ordering.
//!
//! Properties and parameters are emitted in a fixed order so that the
//! serialized text of a property is a stable canonical form. Synthetic
//! JSCalendar ids are derived by hashing exactly this text, so the
//! ordering here is part of the id contract.

use super::escape::{escape_param_value, escape_text};
use super::fold::fold_line;
use crate::core::{Component, ComponentKind, ICalendar, Parameter, Property, Value};

/// Serializes an iCalendar document.
#[must_use]
pub fn serialize(ical: &ICalendar) -> String {
    serialize_component(&ical.root)
}

/// Serializes a component, including BEGIN/END lines.
#[must_use]
pub fn serialize_component(component: &Component) -> String {
    let mut result = String::new();

    result.push_str(&fold_line(&format!("BEGIN:{}", component.name)));

    for prop in canonical_property_order(&component.properties, component.kind) {
        result.push_str(&serialize_property(prop));
    }

    for child in canonical_component_order(&component.children) {
        result.push_str(&serialize_component(child));
    }

    result.push_str(&fold_line(&format!("END:{}", component.name)));

    result
}

/// Serializes a single property as a folded, CRLF-terminated content
/// line. This is the canonical textual form of a property.
#[must_use]
pub fn serialize_property(prop: &Property) -> String {
    let mut line = prop.name.clone();

    for param in canonical_param_order(&prop.params) {
        line.push(';');
        line.push_str(&serialize_parameter(param));
    }

    line.push(':');
    line.push_str(&serialize_value(prop));

    fold_line(&line)
}

fn serialize_parameter(param: &Parameter) -> String {
    let values: Vec<String> = param.values.iter().map(|v| escape_param_value(v)).collect();
    format!("{}={}", param.name, values.join(","))
}

/// Text values are re-escaped; everything else keeps its raw form.
fn serialize_value(prop: &Property) -> String {
    match &prop.value {
        Value::Text(s) => escape_text(s),
        Value::TextList(list) => list
            .iter()
            .map(|s| escape_text(s))
            .collect::<Vec<_>>()
            .join(","),
        _ => prop.raw_value.clone(),
    }
}

/// Returns properties ordered canonically for their component kind;
/// unknown and X-properties follow in their original order.
fn canonical_property_order(props: &[Property], kind: Option<ComponentKind>) -> Vec<&Property> {
    let order: &[&str] = match kind {
        Some(ComponentKind::Calendar) => &["VERSION", "PRODID", "CALSCALE", "METHOD"],
        Some(ComponentKind::Event) => &[
            "UID",
            "DTSTAMP",
            "DTSTART",
            "DTEND",
            "DURATION",
            "RRULE",
            "RDATE",
            "EXDATE",
            "RECURRENCE-ID",
            "SUMMARY",
            "DESCRIPTION",
            "LOCATION",
            "GEO",
            "CLASS",
            "STATUS",
            "PRIORITY",
            "TRANSP",
            "ORGANIZER",
            "ATTENDEE",
            "CATEGORIES",
            "RELATED-TO",
            "URL",
            "ATTACH",
            "CREATED",
            "LAST-MODIFIED",
            "SEQUENCE",
            "COLOR",
            "CONFERENCE",
        ],
        Some(ComponentKind::Timezone) => &["TZID", "LAST-MODIFIED", "TZURL"],
        Some(ComponentKind::Standard | ComponentKind::Daylight) => &[
            "DTSTART",
            "TZOFFSETFROM",
            "TZOFFSETTO",
            "RRULE",
            "RDATE",
            "TZNAME",
        ],
        Some(ComponentKind::Alarm) => &[
            "UID",
            "ACTION",
            "TRIGGER",
            "DESCRIPTION",
            "SUMMARY",
            "DURATION",
            "REPEAT",
            "ATTACH",
            "ATTENDEE",
            "RELATED-TO",
            "ACKNOWLEDGED",
        ],
        _ => &[],
    };

    let mut ordered: Vec<&Property> = Vec::with_capacity(props.len());

    for &name in order {
        for prop in props {
            if prop.name.eq_ignore_ascii_case(name) {
                ordered.push(prop);
            }
        }
    }
    for prop in props {
        if !order.iter().any(|&n| prop.name.eq_ignore_ascii_case(n)) {
            ordered.push(prop);
        }
    }

    ordered
}

/// Returns parameters in canonical order.
fn canonical_param_order(params: &[Parameter]) -> Vec<&Parameter> {
    const ORDER: [&str; 20] = [
        "VALUE",
        "TZID",
        "ENCODING",
        "FMTTYPE",
        "LANGUAGE",
        "ALTREP",
        "LABEL",
        "CN",
        "CUTYPE",
        "ROLE",
        "PARTSTAT",
        "RSVP",
        "EMAIL",
        "DELEGATED-FROM",
        "DELEGATED-TO",
        "SENT-BY",
        "MEMBER",
        "RELATED",
        "RELTYPE",
        "SIZE",
    ];

    let mut ordered: Vec<&Parameter> = Vec::with_capacity(params.len());

    for name in &ORDER {
        for param in params {
            if param.name.eq_ignore_ascii_case(name) {
                ordered.push(param);
            }
        }
    }
    for param in params {
        if !ORDER.iter().any(|n| param.name.eq_ignore_ascii_case(n)) {
            ordered.push(param);
        }
    }

    ordered
}

/// Returns children ordered: timezones, then events (by UID and
/// RECURRENCE-ID), then standard/daylight blocks, alarms, and the rest.
fn canonical_component_order(children: &[Component]) -> Vec<&Component> {
    let mut timezones: Vec<&Component> = Vec::new();
    let mut events: Vec<&Component> = Vec::new();
    let mut standard: Vec<&Component> = Vec::new();
    let mut daylight: Vec<&Component> = Vec::new();
    let mut alarms: Vec<&Component> = Vec::new();
    let mut other: Vec<&Component> = Vec::new();

    for child in children {
        match child.kind {
            Some(ComponentKind::Timezone) => timezones.push(child),
            Some(ComponentKind::Event) => events.push(child),
            Some(ComponentKind::Standard) => standard.push(child),
            Some(ComponentKind::Daylight) => daylight.push(child),
            Some(ComponentKind::Alarm) => alarms.push(child),
            _ => other.push(child),
        }
    }

    events.sort_by(|a, b| cmp_by_uid_recurrence(a, b));

    let mut result = Vec::with_capacity(children.len());
    result.extend(timezones);
    result.extend(events);
    result.extend(standard);
    result.extend(daylight);
    result.extend(alarms);
    result.extend(other);
    result
}

fn cmp_by_uid_recurrence(a: &Component, b: &Component) -> std::cmp::Ordering {
    let uid_a = a.uid().unwrap_or("");
    let uid_b = b.uid().unwrap_or("");

    uid_a.cmp(uid_b).then_with(|| {
        let rid_a = a
            .get_property("RECURRENCE-ID")
            .map_or("", |p| p.raw_value.as_str());
        let rid_b = b
            .get_property("RECURRENCE-ID")
            .map_or("", |p| p.raw_value.as_str());
        rid_a.cmp(rid_b)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn serialize_simple_event() {
        let mut ical = ICalendar::new("-//Test//Test//EN");
        let mut event = Component::event();
        event.add_property(Property::text("UID", "ev1"));
        event.add_property(Property::text("SUMMARY", "Planning, part 2"));
        ical.add_event(event);

        let out = serialize(&ical);
        assert!(out.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(out.ends_with("END:VCALENDAR\r\n"));
        assert!(out.contains("UID:ev1\r\n"));
        assert!(out.contains("SUMMARY:Planning\\, part 2\r\n"));
    }

    #[test]
    fn properties_in_canonical_order() {
        let mut event = Component::event();
        event.add_property(Property::text("SUMMARY", "s"));
        event.add_property(Property::text("UID", "u"));
        let out = serialize_component(&event);
        assert!(out.find("UID:").unwrap() < out.find("SUMMARY:").unwrap());
    }

    #[test]
    fn property_form_is_stable_under_param_insertion_order() {
        let mut a = Property::cal_address("ATTENDEE", "mailto:x@example.com");
        a.add_param(Parameter::cn("X"));
        a.add_param(Parameter::partstat("ACCEPTED"));

        let mut b = Property::cal_address("ATTENDEE", "mailto:x@example.com");
        b.add_param(Parameter::partstat("ACCEPTED"));
        b.add_param(Parameter::cn("X"));

        assert_eq!(serialize_property(&a), serialize_property(&b));
    }

    #[test]
    fn round_trip_parse_serialize_parse() {
        let input = "\
BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Test//Test//EN\r\n\
BEGIN:VEVENT\r\n\
UID:rt@example.com\r\n\
DTSTAMP:20220101T120000Z\r\n\
DTSTART;TZID=Europe/Berlin:20220101T090000\r\n\
SUMMARY:Round trip\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let first = parse::parse(input).unwrap();
        let reparsed = parse::parse(&serialize(&first)).unwrap();
        assert_eq!(first.events()[0].uid(), reparsed.events()[0].uid());
        assert_eq!(
            first.events()[0].get_property("DTSTART"),
            reparsed.events()[0].get_property("DTSTART")
        );
    }
}
