//! The event translator hub: dispatches every JSCalendar property to
//! its aspect translator, in both directions.

use jmapical_rfc::core::{Component, DateTime, DateTimeForm, Parameter, Property};
use serde_json::{json, Map, Value as Json};

use crate::context::Context;
use crate::error::ErrorKind;
use crate::localdate;
use crate::util::xname;
use crate::Options;
use crate::{alerts, links, locations, overrides, participants, recurrence, time};

const KNOWN_METHODS: [&str; 8] = [
    "PUBLISH",
    "REQUEST",
    "REPLY",
    "ADD",
    "CANCEL",
    "REFRESH",
    "COUNTER",
    "DECLINECOUNTER",
];

/// Converts a VEVENT into a JSCalendar event object.
///
/// `parent` is the enclosing VCALENDAR component; exceptions are found
/// among its children. With `ctx.master` set, the component is treated
/// as a recurrence exception and the master-only properties are
/// suppressed.
#[must_use]
#[expect(clippy::too_many_lines, reason = "one arm per JSCalendar property")]
pub fn event_from_ical(ctx: &mut Context, parent: &Component, comp: &Component) -> Json {
    let is_exc = ctx.master.is_some();

    // Building override patches needs the complete master, so the
    // property filter is suspended and re-applied at the end.
    let suspended = if ctx.wantprops.is_some() && ctx.want("recurrenceOverrides") && !is_exc {
        ctx.wantprops.take()
    } else {
        None
    };

    let mut event = Map::new();
    event.insert("@type".to_string(), json!("jsevent"));

    // The start timezone and all-day flag steer every date conversion.
    ctx.tzid_start = time::tzid_of(comp, "DTSTART");
    ctx.is_all_day = comp
        .get_property("DTSTART")
        .is_some_and(|p| p.as_date().is_some());
    if ctx.is_all_day && ctx.tzid_start.is_some() {
        // All-day with a TZID is bogus data; drop the zone.
        ctx.tzid_start = None;
    }

    if ctx.want("isAllDay") && !is_exc {
        event.insert("isAllDay".to_string(), Json::Bool(ctx.is_all_day));
    }

    let uid = comp.uid();
    if let Some(uid) = uid {
        if !is_exc {
            event.insert("uid".to_string(), json!(uid));
        }
    }
    if ctx.uid.is_none() {
        ctx.uid = uid.map(str::to_string);
    }

    if ctx.want("relatedTo") && !is_exc {
        event.insert("relatedTo".to_string(), relatedto_from_ical(comp));
    }

    if ctx.want("prodId") && !is_exc {
        let prodid = parent.get_property("PRODID").and_then(Property::as_text);
        event.insert(
            "prodId".to_string(),
            prodid.map_or(Json::Null, Json::from),
        );
    }

    if ctx.want("created") {
        let created = comp
            .get_property("CREATED")
            .and_then(Property::as_datetime)
            .and_then(localdate::utcdate_from_datetime);
        event.insert("created".to_string(), created.map_or(Json::Null, Json::from));
    }

    if ctx.want("updated") {
        let updated = comp
            .get_property("DTSTAMP")
            .and_then(Property::as_datetime)
            .and_then(localdate::utcdate_from_datetime);
        event.insert("updated".to_string(), updated.map_or(Json::Null, Json::from));
    }

    if ctx.want("sequence") {
        let sequence = comp
            .get_property("SEQUENCE")
            .and_then(Property::as_integer)
            .unwrap_or(0);
        event.insert("sequence".to_string(), json!(sequence));
    }

    if ctx.want("priority") {
        if let Some(priority) = comp.get_property("PRIORITY").and_then(Property::as_integer) {
            event.insert("priority".to_string(), json!(priority));
        }
    }

    if ctx.want("title") {
        event.insert("title".to_string(), json!(comp.summary().unwrap_or("")));
    }

    if ctx.want("description") {
        event.insert(
            "description".to_string(),
            json!(comp.description().unwrap_or("")),
        );
    }
    if ctx.want("descriptionContentType") {
        event.insert("descriptionContentType".to_string(), json!("text/plain"));
    }

    if ctx.want("method") {
        if let Some(method) = parent.get_property("METHOD").and_then(Property::as_text) {
            let upper = method.to_ascii_uppercase();
            if KNOWN_METHODS.contains(&upper.as_str()) {
                event.insert("method".to_string(), json!(upper.to_ascii_lowercase()));
            }
        }
    }

    if ctx.want("color") {
        if let Some(color) = comp.get_property("COLOR").and_then(Property::as_text) {
            event.insert("color".to_string(), json!(color));
        }
    }

    if ctx.want("keywords") {
        event.insert("keywords".to_string(), keywords_from_ical(comp));
    }

    if ctx.want("links") {
        event.insert("links".to_string(), links::links_from_ical(ctx, comp));
    }

    if ctx.want("locale") {
        event.insert("locale".to_string(), locale_from_ical(comp));
    }

    if ctx.want("locations") {
        let mut extra_links = Map::new();
        let locs = locations::locations_from_ical(ctx, comp, &mut extra_links);
        event.insert("locations".to_string(), locs);
        if !extra_links.is_empty() {
            match event.get_mut("links") {
                Some(Json::Object(existing)) => existing.append(&mut extra_links),
                _ => {
                    event.insert("links".to_string(), Json::Object(extra_links));
                }
            }
        }
    }

    if ctx.want("virtualLocations") {
        event.insert(
            "virtualLocations".to_string(),
            locations::virtual_locations_from_ical(comp),
        );
    }

    if ctx.want("start") {
        if let Some(dtstart) = time::dtstart_from_ical(comp) {
            event.insert(
                "start".to_string(),
                json!(localdate::localdate_from_datetime(&dtstart)),
            );
        }
    }

    if ctx.want("timeZone") {
        let tzid = ctx.tzid_start.clone().filter(|_| !ctx.is_all_day);
        event.insert("timeZone".to_string(), tzid.map_or(Json::Null, Json::from));
    }

    if ctx.want("duration") {
        event.insert("duration".to_string(), json!(time::duration_from_ical(comp)));
    }

    if ctx.want("recurrenceRule") && !is_exc {
        event.insert(
            "recurrenceRule".to_string(),
            recurrence::recurrence_from_ical(ctx, comp),
        );
    }

    if ctx.want("status") {
        let status = comp
            .get_property("STATUS")
            .map(Property::value_as_string)
            .map(str::to_ascii_uppercase);
        let status = match status.as_deref() {
            Some("TENTATIVE") => Some("tentative"),
            Some("CONFIRMED") => Some("confirmed"),
            Some("CANCELLED") => Some("cancelled"),
            _ => None,
        };
        if let Some(status) = status {
            event.insert("status".to_string(), json!(status));
        }
    }

    if ctx.want("freeBusyStatus") {
        let transparent = comp
            .get_property("TRANSP")
            .map(Property::value_as_string)
            .is_some_and(|t| t.eq_ignore_ascii_case("TRANSPARENT"));
        event.insert(
            "freeBusyStatus".to_string(),
            json!(if transparent { "free" } else { "busy" }),
        );
    }

    if ctx.want("privacy") {
        let class = comp
            .get_property("CLASS")
            .map(Property::value_as_string)
            .map(str::to_ascii_uppercase);
        let privacy = match class.as_deref() {
            Some("CONFIDENTIAL") => "secret",
            Some("PRIVATE") => "private",
            _ => "public",
        };
        event.insert("privacy".to_string(), json!(privacy));
    }

    if ctx.want("replyTo") && !is_exc {
        if let Some(organizer) = comp.get_property("ORGANIZER") {
            event.insert(
                "replyTo".to_string(),
                participants::rsvpto_from_property(organizer),
            );
        }
    }

    if ctx.want("participants") {
        event.insert(
            "participants".to_string(),
            participants::participants_from_ical(comp),
        );
    }

    if ctx.want("useDefaultAlerts") {
        let flag = comp
            .get_property(xname::USE_DEFAULT_ALERTS)
            .map(Property::value_as_string)
            .is_some_and(|v| v.eq_ignore_ascii_case("TRUE"));
        if flag {
            event.insert("useDefaultAlerts".to_string(), Json::Bool(true));
        }
    }

    if ctx.want("alerts") {
        event.insert("alerts".to_string(), alerts::alerts_from_ical(ctx, comp));
    }

    // Overrides run last: the patches diff against the event built
    // above.
    if ctx.want("recurrenceOverrides") && !is_exc {
        let overrides = overrides::overrides_from_ical(ctx, parent, comp, &event);
        event.insert("recurrenceOverrides".to_string(), overrides);
    }

    if let Some(want) = suspended {
        event.retain(|key, _| want.contains(key));
        ctx.wantprops = Some(want);
    }

    Json::Object(event)
}

/// Writes a complete JSCalendar event into a VEVENT.
///
/// `cal` is the VCALENDAR root; calendar-level properties (PRODID,
/// METHOD) and exception VEVENTs land there. The component is purged
/// per aspect before rewriting.
#[expect(clippy::too_many_lines, reason = "one arm per JSCalendar property")]
pub fn event_to_ical(
    ctx: &mut Context,
    cal: &mut Component,
    comp: &mut Component,
    event: &Json,
    options: &Options,
) {
    let Some(event) = event.as_object() else {
        ctx.fatal = Some(ErrorKind::Unknown);
        return;
    };
    let is_exc = ctx.is_exception;

    // `excluded` belongs in override patches only.
    if let Some(excluded) = event.get("excluded") {
        if excluded != &Json::Bool(false) {
            ctx.invalid_prop(Some("excluded"));
        }
    }

    if let Some(uid) = ctx.uid.clone() {
        comp.set_property(Property::text("UID", uid));
    }

    match event.get("@type") {
        None | Some(Json::Null) => {}
        Some(Json::String(jtype)) if jtype == "jsevent" => {}
        Some(_) => ctx.invalid_prop(Some("@type")),
    }

    match event.get("isAllDay") {
        Some(Json::Bool(all_day)) => ctx.is_all_day = *all_day,
        _ => ctx.invalid_prop(Some("isAllDay")),
    }

    time::startend_to_ical(ctx, comp, event);

    // relatedTo
    match event.get("relatedTo") {
        None => {}
        Some(value) if value.is_null() || value.as_object().is_some_and(|m| !m.is_empty()) => {
            relatedto_to_ical(ctx, comp, value);
        }
        Some(_) => ctx.invalid_prop(Some("relatedTo")),
    }

    // prodId lives on the VCALENDAR.
    if !is_exc {
        let prodid = match event.get("prodId") {
            Some(Json::Null) => None,
            None => Some(options.prod_id.clone()),
            Some(Json::String(prodid)) => Some(prodid.clone()),
            Some(_) => {
                ctx.invalid_prop(Some("prodId"));
                Some(options.prod_id.clone())
            }
        };
        if let Some(prodid) = prodid {
            cal.set_property(Property::text("PRODID", prodid));
        }
    }

    // created and updated are stamped now, sequence resets.
    let now = utc_now();
    time::dtprop_to_ical(comp, "CREATED", &now, Some(chrono_tz::Tz::UTC), false, true);
    time::dtprop_to_ical(comp, "DTSTAMP", &now, Some(chrono_tz::Tz::UTC), false, true);
    comp.set_property(Property::integer("SEQUENCE", 0));

    // priority
    match event.get("priority") {
        None | Some(Json::Null) => {}
        Some(Json::Number(n)) if n.as_i64().is_some_and(|v| (0..=9).contains(&v)) => {
            #[expect(clippy::cast_possible_truncation, reason = "checked 0..=9")]
            let priority = n.as_i64().unwrap_or_default() as i32;
            comp.set_property(Property::integer("PRIORITY", priority));
        }
        Some(_) => ctx.invalid_prop(Some("priority")),
    }

    // title
    match event.get("title") {
        Some(Json::String(title)) => comp.set_property(Property::text("SUMMARY", title)),
        _ => ctx.invalid_prop(Some("title")),
    }

    // description and descriptionContentType
    let content_type = match event.get("descriptionContentType") {
        None | Some(Json::Null) => None,
        Some(Json::String(ct)) => Some(ct.clone()),
        Some(_) => {
            ctx.invalid_prop(Some("descriptionContentType"));
            None
        }
    };
    match event.get("description") {
        None | Some(Json::Null) => {}
        Some(Json::String(desc)) => {
            if !desc.is_empty() {
                if content_type
                    .as_deref()
                    .is_some_and(|ct| !ct.eq_ignore_ascii_case("text/plain"))
                {
                    ctx.invalid_prop(Some("descriptionContentType"));
                }
                comp.set_property(Property::text("DESCRIPTION", desc));
            }
        }
        Some(_) => ctx.invalid_prop(Some("description")),
    }

    // method lives on the VCALENDAR.
    match event.get("method") {
        None | Some(Json::Null) => {}
        Some(Json::String(method)) => {
            let upper = method.to_ascii_uppercase();
            if KNOWN_METHODS.contains(&upper.as_str()) {
                cal.set_property(Property::text("METHOD", upper));
            } else {
                ctx.invalid_prop(Some("method"));
            }
        }
        Some(_) => ctx.invalid_prop(Some("method")),
    }

    // color
    match event.get("color") {
        None | Some(Json::Null) => {}
        Some(Json::String(color)) => {
            if !color.is_empty() {
                comp.set_property(Property::text("COLOR", color));
            }
        }
        Some(_) => ctx.invalid_prop(Some("color")),
    }

    // keywords
    match event.get("keywords") {
        None => {}
        Some(keywords) if keywords.is_null() || keywords.is_object() => {
            keywords_to_ical(ctx, comp, keywords);
        }
        Some(_) => ctx.invalid_prop(Some("keywords")),
    }

    // links
    match event.get("links") {
        None => {}
        Some(value) if value.is_null() || value.as_object().is_some_and(|m| !m.is_empty()) => {
            links::links_to_ical(ctx, comp, value, "links");
        }
        Some(_) => ctx.invalid_prop(Some("links")),
    }

    // locale: LANGUAGE on SUMMARY.
    match event.get("locale") {
        None => {}
        Some(Json::Null) => {
            clear_language(comp, "SUMMARY");
            clear_language(comp, "DESCRIPTION");
        }
        Some(Json::String(locale)) => {
            clear_language(comp, "SUMMARY");
            clear_language(comp, "DESCRIPTION");
            if !locale.is_empty() {
                if let Some(summary) = comp.get_property_mut("SUMMARY") {
                    summary.add_param(Parameter::language(locale));
                }
            }
        }
        Some(_) => ctx.invalid_prop(Some("locale")),
    }

    // locations
    match event.get("locations") {
        None => {}
        Some(value) if value.is_null() || value.as_object().is_some_and(|m| !m.is_empty()) => {
            let links = event.get("links").cloned().unwrap_or(Json::Null);
            locations::locations_to_ical(ctx, comp, value, &links);
        }
        Some(_) => ctx.invalid_prop(Some("locations")),
    }

    // virtualLocations
    match event.get("virtualLocations") {
        None => {}
        Some(value) if value.is_null() || value.as_object().is_some_and(|m| !m.is_empty()) => {
            locations::virtual_locations_to_ical(ctx, comp, value);
        }
        Some(_) => ctx.invalid_prop(Some("virtualLocations")),
    }

    // recurrenceRule
    if !is_exc {
        match event.get("recurrenceRule") {
            None => {}
            Some(value) if value.is_null() || value.is_object() => {
                recurrence::recurrence_to_ical(ctx, comp, value);
            }
            Some(_) => ctx.invalid_prop(Some("recurrenceRule")),
        }
    }

    // status (defaults to confirmed)
    let status = match event.get("status") {
        None => Some("CONFIRMED"),
        Some(Json::Null) => None,
        Some(Json::String(status)) => match status.as_str() {
            "confirmed" => Some("CONFIRMED"),
            "cancelled" => Some("CANCELLED"),
            "tentative" => Some("TENTATIVE"),
            _ => {
                ctx.invalid_prop(Some("status"));
                None
            }
        },
        Some(_) => {
            ctx.invalid_prop(Some("status"));
            None
        }
    };
    if let Some(status) = status {
        comp.set_property(Property::text("STATUS", status));
    }

    // freeBusyStatus
    match event.get("freeBusyStatus") {
        None | Some(Json::Null) => {}
        Some(Json::String(fbs)) => {
            let transp = match fbs.as_str() {
                "free" => Some("TRANSPARENT"),
                "busy" => Some("OPAQUE"),
                _ => {
                    ctx.invalid_prop(Some("freeBusyStatus"));
                    None
                }
            };
            if let Some(transp) = transp {
                comp.set_property(Property::text("TRANSP", transp));
            }
        }
        Some(_) => ctx.invalid_prop(Some("freeBusyStatus")),
    }

    // privacy
    match event.get("privacy") {
        None | Some(Json::Null) => {}
        Some(Json::String(privacy)) => {
            let class = match privacy.as_str() {
                "public" => Some("PUBLIC"),
                "private" => Some("PRIVATE"),
                "secret" => Some("CONFIDENTIAL"),
                _ => {
                    ctx.invalid_prop(Some("privacy"));
                    None
                }
            };
            if let Some(class) = class {
                comp.set_property(Property::text("CLASS", class));
            }
        }
        Some(_) => ctx.invalid_prop(Some("privacy")),
    }

    // replyTo and participants
    participants::participants_to_ical(ctx, comp, event);

    // participantId: readonly

    // useDefaultAlerts
    match event.get("useDefaultAlerts") {
        None | Some(Json::Null) => {}
        Some(Json::Bool(flag)) => {
            comp.remove_properties(xname::USE_DEFAULT_ALERTS);
            if *flag {
                comp.add_property(Property::text(xname::USE_DEFAULT_ALERTS, "TRUE"));
            }
        }
        Some(_) => ctx.invalid_prop(Some("useDefaultAlerts")),
    }

    // alerts
    match event.get("alerts") {
        None => {}
        Some(value) if value.is_null() || value.as_object().is_some_and(|m| !m.is_empty()) => {
            alerts::alerts_to_ical(ctx, comp, value, options);
        }
        Some(_) => ctx.invalid_prop(Some("alerts")),
    }

    // recurrenceOverrides runs last: patches apply against the event
    // written above.
    if !is_exc {
        if let Some(value) = event.get("recurrenceOverrides") {
            overrides::overrides_to_ical(ctx, cal, comp, value, options);
        }
    }

    if ctx.has_invalid() {
        return;
    }

    // ORGANIZER and ATTENDEE come in pairs, unless the organizer's
    // attendee record was collapsed into the ORGANIZER itself.
    let has_organizer = comp.get_property("ORGANIZER").is_some();
    let has_attendee = comp.get_property("ATTENDEE").is_some() || ctx.organizer_collapsed;
    if has_organizer != has_attendee {
        ctx.invalid_prop(Some("replyTo"));
        ctx.invalid_prop(Some("participants"));
    }
}

fn utc_now() -> DateTime {
    DateTime::from_naive(chrono::Utc::now().naive_utc(), DateTimeForm::Utc)
}

/// CATEGORIES ↔ `keywords`.
fn keywords_from_ical(comp: &Component) -> Json {
    let mut keywords = Map::new();
    for prop in comp.get_properties("CATEGORIES") {
        match &prop.value {
            jmapical_rfc::core::Value::TextList(list) => {
                for keyword in list {
                    keywords.insert(keyword.clone(), Json::Bool(true));
                }
            }
            _ => {
                keywords.insert(prop.value_as_string().to_string(), Json::Bool(true));
            }
        }
    }
    if keywords.is_empty() {
        Json::Null
    } else {
        Json::Object(keywords)
    }
}

fn keywords_to_ical(ctx: &mut Context, comp: &mut Component, keywords: &Json) {
    comp.remove_properties("CATEGORIES");

    let Json::Object(keywords) = keywords else {
        return;
    };
    for (keyword, val) in keywords {
        if val == &Json::Bool(true) {
            comp.add_property(Property::text("CATEGORIES", keyword));
        } else {
            ctx.begin_prop("keywords");
            ctx.invalid_prop(Some(keyword));
            ctx.end_prop();
        }
    }
}

/// RELATED-TO ↔ `relatedTo` (uid → relation set).
fn relatedto_from_ical(comp: &Component) -> Json {
    let mut related_to = Map::new();

    for prop in comp.get_properties("RELATED-TO") {
        let uid = prop.value_as_string();
        if uid.is_empty() {
            continue;
        }

        let mut relation = Map::new();
        for reltype in prop.param_values("RELTYPE") {
            if !reltype.is_empty() {
                relation.insert(reltype.to_ascii_lowercase(), Json::Bool(true));
            }
        }

        let relation = if relation.is_empty() {
            Json::Null
        } else {
            Json::Object(relation)
        };
        // Duplicate uids: last writer wins.
        related_to.insert(uid.to_string(), json!({ "relation": relation }));
    }

    if related_to.is_empty() {
        Json::Null
    } else {
        Json::Object(related_to)
    }
}

fn relatedto_to_ical(ctx: &mut Context, comp: &mut Component, related_to: &Json) {
    comp.remove_properties("RELATED-TO");

    let Json::Object(related_to) = related_to else {
        return;
    };

    for (uid, relation_obj) in related_to {
        ctx.begin_prop_key("relatedTo", uid);
        let relation = relation_obj.get("relation");
        match relation {
            None | Some(Json::Null) => {
                comp.add_property(Property::text("RELATED-TO", uid));
            }
            Some(Json::Object(relation)) if !relation.is_empty() => {
                let mut prop = Property::text("RELATED-TO", uid);
                for (reltype, val) in relation {
                    if val == &Json::Bool(true) {
                        prop.add_param(Parameter::reltype(reltype.to_ascii_uppercase()));
                    } else {
                        ctx.begin_prop_key("relation", reltype);
                        ctx.invalid_prop(None);
                        ctx.end_prop();
                    }
                }
                comp.add_property(prop);
            }
            Some(_) => ctx.invalid_prop(Some("relation")),
        }
        ctx.end_prop();
    }
}

/// LANGUAGE on SUMMARY (falling back to DESCRIPTION) ↔ `locale`.
fn locale_from_ical(comp: &Component) -> Json {
    let language = comp
        .get_property("SUMMARY")
        .and_then(|p| p.get_param_value("LANGUAGE"))
        .or_else(|| {
            comp.get_property("DESCRIPTION")
                .and_then(|p| p.get_param_value("LANGUAGE"))
        });
    language.map_or(Json::Null, Json::from)
}

fn clear_language(comp: &mut Component, prop_name: &str) {
    if let Some(prop) = comp.get_property_mut(prop_name) {
        prop.remove_param("LANGUAGE");
    }
}
