//! End-to-end translation tests over literal iCalendar and JSCalendar
//! inputs.

use jmapical::rfc::build::serialize;
use jmapical::rfc::parse::parse;
use serde_json::{json, Value};

fn wrap_vevent(body: &str) -> String {
    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Test//Test//EN\r\n\
         BEGIN:VEVENT\r\n\
         {body}\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

fn to_jmap_str(ical_text: &str) -> Value {
    let ical = parse(ical_text).expect("input should parse");
    jmapical::to_jmap(&ical, None)
        .expect("conversion should succeed")
        .expect("a main event should exist")
}

#[test]
fn all_day_single_event() {
    let event = to_jmap_str(&wrap_vevent(
        "UID:holiday-1@example.com\r\n\
         DTSTAMP:20220101T120000Z\r\n\
         DTSTART;VALUE=DATE:20220307\r\n\
         SUMMARY:Holiday\r\n",
    ));

    assert_eq!(event["@type"], json!("jsevent"));
    assert_eq!(event["uid"], json!("holiday-1@example.com"));
    assert_eq!(event["isAllDay"], json!(true));
    assert_eq!(event["start"], json!("2022-03-07T00:00:00"));
    assert_eq!(event["timeZone"], Value::Null);
    assert_eq!(event["duration"], json!("PT0S"));
    assert_eq!(event["title"], json!("Holiday"));
}

#[test]
fn differing_end_timezone() {
    let event = to_jmap_str(&wrap_vevent(
        "UID:flight-1@example.com\r\n\
         DTSTAMP:20220101T120000Z\r\n\
         DTSTART;TZID=Europe/Berlin:20220101T090000\r\n\
         DTEND;TZID=America/New_York:20220101T060000\r\n\
         SUMMARY:Flight\r\n",
    ));

    assert_eq!(event["start"], json!("2022-01-01T09:00:00"));
    assert_eq!(event["timeZone"], json!("Europe/Berlin"));
    assert_eq!(event["duration"], json!("PT3H"));

    let locations = event["locations"].as_object().expect("locations map");
    let end_location = locations
        .values()
        .find(|loc| loc["rel"] == json!("end"))
        .expect("an end-timezone location");
    assert_eq!(end_location["timeZone"], json!("America/New_York"));
}

#[test]
fn exdate_becomes_excluded_override() {
    let event = to_jmap_str(&wrap_vevent(
        "UID:daily-1@example.com\r\n\
         DTSTAMP:20220101T120000Z\r\n\
         DTSTART;TZID=Europe/Berlin:20220101T090000\r\n\
         DURATION:PT1H\r\n\
         RRULE:FREQ=DAILY;COUNT=5\r\n\
         EXDATE;TZID=Europe/Berlin:20220103T090000\r\n\
         SUMMARY:Standup\r\n",
    ));

    assert_eq!(
        event["recurrenceOverrides"]["2022-01-03T09:00:00"],
        json!({"excluded": true})
    );
    assert_eq!(event["recurrenceRule"]["frequency"], json!("daily"));
    assert_eq!(event["recurrenceRule"]["count"], json!(5));
}

#[test]
fn delegation_chain_resolves_status() {
    let event = to_jmap_str(&wrap_vevent(
        "UID:delegated-1@example.com\r\n\
         DTSTAMP:20220101T120000Z\r\n\
         DTSTART:20220101T090000Z\r\n\
         SUMMARY:Board meeting\r\n\
         ORGANIZER:mailto:chair@example.com\r\n\
         ATTENDEE;PARTSTAT=DELEGATED;DELEGATED-TO=\"mailto:b@example.com\":mailto:a@example.com\r\n\
         ATTENDEE;PARTSTAT=ACCEPTED:mailto:b@example.com\r\n",
    ));

    let participants = event["participants"].as_object().expect("participants");
    let a = participants
        .values()
        .find(|p| p["sendTo"]["imip"] == json!("mailto:a@example.com"))
        .expect("participant a");
    assert_eq!(a["participationStatus"], json!("accepted"));
}

#[test]
fn snooze_alarm_pairs_with_alert() {
    let event = to_jmap_str(&wrap_vevent(
        "UID:alarmed-1@example.com\r\n\
         DTSTAMP:20220101T120000Z\r\n\
         DTSTART:20220101T103000Z\r\n\
         SUMMARY:Ping\r\n\
         BEGIN:VALARM\r\n\
         UID:alert-x\r\n\
         ACTION:DISPLAY\r\n\
         TRIGGER:-PT15M\r\n\
         END:VALARM\r\n\
         BEGIN:VALARM\r\n\
         RELATED-TO;RELTYPE=SNOOZE:alert-x\r\n\
         TRIGGER;VALUE=DATE-TIME:20220101T101500Z\r\n\
         END:VALARM\r\n",
    ));

    assert_eq!(
        event["alerts"]["alert-x"],
        json!({
            "action": "display",
            "relativeTo": "before-start",
            "offset": "PT15M",
            "snoozed": "2022-01-01T10:15:00Z",
        })
    );
}

#[test]
fn organizer_only_participant_collapses() {
    let event = json!({
        "uid": "orga-1@example.com",
        "isAllDay": false,
        "title": "1:1",
        "start": "2022-01-01T09:00:00",
        "timeZone": "Europe/Berlin",
        "duration": "PT30M",
        "replyTo": {"imip": "mailto:a@x.org"},
        "participants": {
            "p": {
                "sendTo": {"imip": "mailto:a@x.org"},
                "name": "Alice",
                "roles": {"owner": true},
            },
        },
    });

    let ical = jmapical::to_ical(&event).expect("conversion should succeed");
    let vevent = ical.events()[0];
    let organizer = vevent.get_property("ORGANIZER").expect("ORGANIZER");
    assert_eq!(organizer.raw_value, "mailto:a@x.org");
    assert_eq!(organizer.get_param_value("CN"), Some("Alice"));
    assert!(vevent.get_property("ATTENDEE").is_none());

    // Round-trip keeps one organizer participant.
    let back = jmapical::to_jmap(&ical, None).unwrap().unwrap();
    let participants = back["participants"].as_object().expect("participants");
    assert_eq!(participants.len(), 1);
    let p = participants.values().next().unwrap();
    assert_eq!(p["name"], json!("Alice"));
    assert_eq!(p["roles"], json!({"owner": true}));
    assert_eq!(back["replyTo"], json!({"imip": "mailto:a@x.org"}));
}

#[test]
fn uid_is_mandatory() {
    let err = jmapical::to_ical(&json!({"title": "No uid"})).unwrap_err();
    assert_eq!(err, jmapical::ConversionError::Uid);
    assert_eq!(err.kind(), jmapical::ErrorKind::Uid);
}

#[test]
fn invalid_properties_are_collected() {
    let event = json!({
        "uid": "broken-1@example.com",
        "isAllDay": false,
        "title": "Broken",
        "start": "2022-01-01T09:00:00",
        "timeZone": "Not/AZone",
        "priority": 12,
        "privacy": "sealed",
    });

    let err = jmapical::to_ical(&event).unwrap_err();
    let props = err.props();
    assert!(props.contains(&"timeZone".to_string()));
    assert!(props.contains(&"priority".to_string()));
    assert!(props.contains(&"privacy".to_string()));
}

#[test]
fn to_jmap_all_selects_main_events() {
    let text = "BEGIN:VCALENDAR\r\n\
        VERSION:2.0\r\n\
        PRODID:-//Test//Test//EN\r\n\
        BEGIN:VEVENT\r\n\
        UID:a@example.com\r\n\
        DTSTAMP:20220101T120000Z\r\n\
        DTSTART:20220101T090000Z\r\n\
        SUMMARY:Master\r\n\
        END:VEVENT\r\n\
        BEGIN:VEVENT\r\n\
        UID:a@example.com\r\n\
        DTSTAMP:20220101T120000Z\r\n\
        RECURRENCE-ID:20220102T090000Z\r\n\
        DTSTART:20220102T100000Z\r\n\
        SUMMARY:Exception\r\n\
        END:VEVENT\r\n\
        BEGIN:VEVENT\r\n\
        UID:b@example.com\r\n\
        DTSTAMP:20220101T120000Z\r\n\
        DTSTART:20220103T090000Z\r\n\
        SUMMARY:Second\r\n\
        END:VEVENT\r\n\
        END:VCALENDAR\r\n";

    let ical = parse(text).unwrap();
    let events = jmapical::to_jmap_all(&ical, None).unwrap();
    assert_eq!(events.len(), 2);

    let first = jmapical::to_jmap(&ical, None).unwrap().unwrap();
    assert_eq!(first["uid"], events[0]["uid"]);
}

#[test]
fn uidless_single_event_is_promoted() {
    let text = wrap_vevent(
        "DTSTAMP:20220101T120000Z\r\n\
         DTSTART:20220101T090000Z\r\n\
         SUMMARY:Orphan\r\n",
    );
    let ical = parse(&text).unwrap();
    let events = jmapical::to_jmap_all(&ical, None).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["title"], json!("Orphan"));
    assert!(events[0].get("uid").is_none());
}

#[test]
fn round_trip_preserves_event_modulo_volatile_fields() {
    let input = json!({
        "uid": "rt-1@example.com",
        "isAllDay": false,
        "title": "Round trip",
        "description": "With description",
        "start": "2022-06-15T10:00:00",
        "timeZone": "Europe/Berlin",
        "duration": "PT1H",
        "status": "confirmed",
        "privacy": "private",
        "freeBusyStatus": "busy",
        "color": "turquoise",
        "priority": 2,
        "keywords": {"work": true},
        "recurrenceRule": {"frequency": "weekly", "count": 10},
        "replyTo": {"imip": "mailto:organizer@example.com"},
        "participants": {
            "org": {
                "sendTo": {"imip": "mailto:organizer@example.com"},
                "name": "Orga",
                "roles": {"owner": true, "attendee": true},
                "participationStatus": "accepted",
            },
            "att": {
                "sendTo": {"imip": "mailto:attendee@example.com"},
                "name": "Atti",
                "roles": {"attendee": true},
                "kind": "individual",
                "participationStatus": "needs-action",
                "expectReply": true,
            },
        },
        "alerts": {
            "alert1": {"action": "display", "relativeTo": "before-start", "offset": "PT10M"},
        },
        "links": {
            "link1": {"href": "https://example.com/agenda.pdf", "rel": "enclosure", "type": "application/pdf"},
        },
        "useDefaultAlerts": true,
    });

    let ical = jmapical::to_ical(&input).expect("to_ical");
    let back = jmapical::to_jmap(&ical, None).unwrap().unwrap();

    for key in [
        "uid",
        "isAllDay",
        "title",
        "description",
        "start",
        "timeZone",
        "duration",
        "status",
        "privacy",
        "freeBusyStatus",
        "color",
        "priority",
        "keywords",
        "recurrenceRule",
        "useDefaultAlerts",
        "alerts",
    ] {
        assert_eq!(back[key], input[key], "property {key} should round-trip");
    }

    // Sequence resets, stamps are rewritten.
    assert_eq!(back["sequence"], json!(0));
    assert!(back["updated"].is_string());

    // Participants round-trip under their ids.
    assert_eq!(back["replyTo"], input["replyTo"]);
    let participants = back["participants"].as_object().unwrap();
    assert_eq!(
        participants["att"]["sendTo"],
        json!({"imip": "mailto:attendee@example.com"})
    );
    assert_eq!(participants["att"]["expectReply"], json!(true));
    assert_eq!(participants["org"]["participationStatus"], json!("accepted"));

    // Links round-trip under their ids.
    assert_eq!(back["links"]["link1"]["href"], input["links"]["link1"]["href"]);
    assert_eq!(back["links"]["link1"]["type"], input["links"]["link1"]["type"]);
}

#[test]
fn recurrence_override_round_trip() {
    let input = json!({
        "uid": "rt-2@example.com",
        "isAllDay": false,
        "title": "Series",
        "start": "2022-01-01T09:00:00",
        "timeZone": "Europe/Berlin",
        "duration": "PT1H",
        "recurrenceRule": {"frequency": "daily", "count": 5},
        "recurrenceOverrides": {
            "2022-01-03T09:00:00": {"excluded": true},
            "2022-01-06T09:00:00": {},
            "2022-01-04T09:00:00": {"title": "Series (moved)", "start": "2022-01-04T11:00:00"},
        },
    });

    let ical = jmapical::to_ical(&input).expect("to_ical");

    // One master plus one exception VEVENT.
    assert_eq!(ical.events().len(), 2);
    let master = ical
        .events()
        .into_iter()
        .find(|e| e.get_property("RECURRENCE-ID").is_none())
        .unwrap();
    assert!(master.get_property("EXDATE").is_some());
    assert!(master.get_property("RDATE").is_some());

    let back = jmapical::to_jmap(&ical, None).unwrap().unwrap();
    let overrides = back["recurrenceOverrides"].as_object().unwrap();
    assert_eq!(
        overrides["2022-01-03T09:00:00"],
        json!({"excluded": true})
    );
    assert_eq!(overrides["2022-01-06T09:00:00"], json!({}));
    let patched = &overrides["2022-01-04T09:00:00"];
    assert_eq!(patched["title"], json!("Series (moved)"));
    assert_eq!(patched["start"], json!("2022-01-04T11:00:00"));
}

#[test]
fn forbidden_override_keys_drop_the_override() {
    let input = json!({
        "uid": "rt-3@example.com",
        "isAllDay": false,
        "title": "Series",
        "start": "2022-01-01T09:00:00",
        "timeZone": "Europe/Berlin",
        "duration": "PT1H",
        "recurrenceRule": {"frequency": "daily", "count": 5},
        "recurrenceOverrides": {
            "2022-01-04T09:00:00": {"uid": "sneaky@example.com", "title": "changed"},
        },
    });

    let ical = jmapical::to_ical(&input).expect("to_ical");
    assert_eq!(ical.events().len(), 1);
}

#[test]
fn written_ical_parses_and_serializes() {
    let input = json!({
        "uid": "wire-1@example.com",
        "isAllDay": false,
        "title": "Wire format",
        "start": "2022-06-15T10:00:00",
        "timeZone": "Europe/Berlin",
        "duration": "PT1H",
    });

    let ical = jmapical::to_ical(&input).expect("to_ical");
    let text = serialize(&ical);
    assert!(text.contains("BEGIN:VCALENDAR\r\n"));
    assert!(text.contains("CALSCALE:GREGORIAN\r\n"));
    assert!(text.contains("DTSTART;TZID=Europe/Berlin:20220615T100000\r\n"));
    assert!(text.contains("BEGIN:VTIMEZONE\r\n"));
    assert!(text.contains("TZID:Europe/Berlin\r\n"));

    let reparsed = parse(&text).expect("generated text should parse");
    let back = jmapical::to_jmap(&reparsed, None).unwrap().unwrap();
    assert_eq!(back["title"], json!("Wire format"));
    assert_eq!(back["start"], json!("2022-06-15T10:00:00"));
}

#[test]
fn property_filter_projects_output() {
    let text = wrap_vevent(
        "UID:filter-1@example.com\r\n\
         DTSTAMP:20220101T120000Z\r\n\
         DTSTART;TZID=Europe/Berlin:20220101T090000\r\n\
         DURATION:PT1H\r\n\
         RRULE:FREQ=DAILY;COUNT=3\r\n\
         EXDATE;TZID=Europe/Berlin:20220102T090000\r\n\
         SUMMARY:Filtered\r\n",
    );
    let ical = parse(&text).unwrap();

    let event = jmapical::to_jmap(&ical, Some(&["title", "recurrenceOverrides"]))
        .unwrap()
        .unwrap();
    assert_eq!(event["title"], json!("Filtered"));
    assert_eq!(
        event["recurrenceOverrides"]["2022-01-02T09:00:00"],
        json!({"excluded": true})
    );
    // Everything not requested was stripped after the filter was lifted
    // for the override computation.
    assert!(event.get("start").is_none());
    assert!(event.get("duration").is_none());
}

#[test]
fn x_jmap_ids_survive_round_trips() {
    let input = json!({
        "uid": "ids-1@example.com",
        "isAllDay": false,
        "title": "Stable ids",
        "start": "2022-06-15T10:00:00",
        "timeZone": "Europe/Berlin",
        "duration": "PT1H",
        "locations": {
            "loc-main": {"name": "Office"},
        },
        "links": {
            "link-a": {"href": "https://example.com/x"},
        },
        "virtualLocations": {
            "vloc-1": {"uri": "https://meet.example.com/1", "name": "Call"},
        },
    });

    let ical = jmapical::to_ical(&input).expect("to_ical");
    let back = jmapical::to_jmap(&ical, None).unwrap().unwrap();

    assert!(back["locations"].get("loc-main").is_some());
    assert!(back["links"].get("link-a").is_some());
    assert_eq!(
        back["virtualLocations"]["vloc-1"]["uri"],
        json!("https://meet.example.com/1")
    );
}
