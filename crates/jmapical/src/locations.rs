//! Locations translator: `LOCATION`/`GEO`/`X-APPLE-STRUCTURED-LOCATION`
//! /`X-JMAP-LOCATION` ↔ `locations`, and `CONFERENCE` ↔
//! `virtualLocations`.

use jmapical_rfc::build::serialize_property;
use jmapical_rfc::core::{Component, Parameter, Property, Value};
use jmapical_rfc::parse::values::unescape_text;
use jmapical_rfc::tz;
use serde_json::{json, Map, Value as Json};

use crate::context::Context;
use crate::time;
use crate::util::{self, xname};

/// Returns the stable id of a property: `X-JMAP-ID` if present, else
/// the SHA-1 of its canonical iCalendar text.
#[must_use]
pub fn xjmapid_of(prop: &Property) -> String {
    prop.get_param_value(xname::ID).map_or_else(
        || util::sha1_key(&serialize_property(prop)),
        str::to_string,
    )
}

/// Converts a LOCATION or X-JMAP-LOCATION property into a Location
/// object. An ALTREP parameter is absorbed as a synthesized link plus a
/// `linkIds` back-reference.
fn location_from_ical(prop: &Property, links: &mut Map<String, Json>) -> Json {
    let mut loc = Map::new();

    let name = match &prop.value {
        Value::Text(s) => s.clone(),
        _ => unescape_text(prop.value_as_string()),
    };
    loc.insert("name".to_string(), json!(name));

    let rel = prop.get_param_value(xname::REL).unwrap_or("unknown");
    loc.insert("rel".to_string(), json!(rel));

    let desc = prop.get_param_value(xname::DESCRIPTION);
    loc.insert(
        "description".to_string(),
        desc.map_or(Json::Null, Json::from),
    );

    let tzid = prop.get_param_value(xname::TZID);
    loc.insert("timeZone".to_string(), tzid.map_or(Json::Null, Json::from));

    let coords = prop.get_param_value(xname::GEO);
    loc.insert(
        "coordinates".to_string(),
        coords.map_or(Json::Null, Json::from),
    );

    let mut link_ids = Map::new();
    for val in prop.param_values(xname::LINK_ID) {
        link_ids.insert(val.to_string(), Json::Bool(true));
    }
    if let Some(altrep) = prop.get_param_value("ALTREP") {
        let link_id = util::sha1_key(altrep);
        links.insert(link_id.clone(), json!({"href": altrep}));
        link_ids.insert(link_id, Json::Bool(true));
    }
    loc.insert(
        "linkIds".to_string(),
        if link_ids.is_empty() {
            Json::Null
        } else {
            Json::Object(link_ids)
        },
    );

    Json::Object(loc)
}

/// Converts a GEO property value (`lat;lon`) into a geo: URI.
fn coordinates_from_ical(prop: &Property) -> Option<String> {
    // Use the verbatim coordinate text, not a reparsed float.
    let val = prop.value_as_string();
    let (lat, lon) = val.split_once(';')?;
    Some(format!("geo:{lat},{lon}"))
}

/// Collects the `locations` map. Links synthesized from ALTREP
/// parameters are added to `links`.
#[must_use]
pub fn locations_from_ical(
    ctx: &mut Context,
    comp: &Component,
    links: &mut Map<String, Json>,
) -> Json {
    let mut locations = Map::new();

    // A differing DTEND zone becomes a rel=end location.
    let tzid_start = time::tzid_of(comp, "DTSTART");
    let tzid_end = time::tzid_of(comp, "DTEND");
    if let (Some(start), Some(end)) = (tzid_start, tzid_end) {
        if start != end {
            if let Some(prop) = comp.get_property("DTEND") {
                locations.insert(
                    xjmapid_of(prop),
                    json!({"timeZone": end, "rel": "end"}),
                );
            }
        }
    }

    // LOCATION
    if let Some(prop) = comp.get_property("LOCATION") {
        let id = xjmapid_of(prop);
        ctx.begin_prop_key("locations", &id);
        locations.insert(id.clone(), location_from_ical(prop, links));
        ctx.end_prop();
    }

    // GEO
    if let Some(prop) = comp.get_property("GEO") {
        if let Some(coords) = coordinates_from_ical(prop) {
            locations.insert(xjmapid_of(prop), json!({"coordinates": coords}));
        }
    }

    // X-APPLE-STRUCTURED-LOCATION and X-JMAP-LOCATION
    for prop in &comp.properties {
        if prop.name == xname::APPLE_STRUCTURED_LOCATION {
            let uri = prop.value_as_string();
            if !uri.starts_with("geo:") {
                continue;
            }
            let mut loc = Map::new();
            loc.insert("coordinates".to_string(), json!(uri));
            if let Some(title) = prop.get_param_value(xname::APPLE_TITLE) {
                loc.insert("name".to_string(), json!(title));
            }
            locations.insert(xjmapid_of(prop), Json::Object(loc));
        } else if prop.name == xname::LOCATION {
            let id = xjmapid_of(prop);
            ctx.begin_prop_key("locations", &id);
            locations.insert(id.clone(), location_from_ical(prop, links));
            ctx.end_prop();
        }
    }

    if locations.is_empty() {
        Json::Null
    } else {
        Json::Object(locations)
    }
}

/// Collects the `virtualLocations` map from CONFERENCE properties.
#[must_use]
pub fn virtual_locations_from_ical(comp: &Component) -> Json {
    let mut locations = Map::new();

    for prop in comp.get_properties("CONFERENCE") {
        let uri = prop.value_as_string();
        if uri.is_empty() {
            continue;
        }

        let mut loc = Map::new();
        loc.insert("uri".to_string(), json!(uri));
        if let Some(name) = prop.get_param_value("LABEL") {
            loc.insert("name".to_string(), json!(name));
        }
        if let Some(desc) = prop.get_param_value(xname::DESCRIPTION) {
            loc.insert("description".to_string(), json!(desc));
        }

        locations.insert(xjmapid_of(prop), Json::Object(loc));
    }

    if locations.is_empty() {
        Json::Null
    } else {
        Json::Object(locations)
    }
}

/// Validates one location entry; records property errors and returns
/// whether the location is usable.
fn validate_location(ctx: &mut Context, loc: &Map<String, Json>, links: &Json) -> bool {
    let before = ctx.invalid_count();

    // At least one property besides rel must be set.
    if loc.is_empty() || (loc.len() == 1 && loc.contains_key("rel")) {
        ctx.invalid_prop(None);
        return false;
    }

    for field in ["name", "description", "rel", "coordinates"] {
        if let Some(val) = loc.get(field) {
            if !val.is_null() && !val.is_string() {
                ctx.invalid_prop(Some(field));
            }
        }
    }

    match loc.get("timeZone") {
        None | Some(Json::Null) => {}
        Some(Json::String(tzid)) => {
            if tz::tz_from_tzid(tzid).is_none() {
                ctx.invalid_prop(Some("timeZone"));
            }
        }
        Some(_) => ctx.invalid_prop(Some("timeZone")),
    }

    match loc.get("linkIds") {
        None | Some(Json::Null) => {}
        Some(Json::Object(link_ids)) => {
            for (link_id, val) in link_ids {
                let resolvable = util::is_valid_jmap_id(link_id)
                    && links.get(link_id).is_some()
                    && val == &Json::Bool(true);
                if !resolvable {
                    ctx.begin_prop_key("linkIds", link_id);
                    ctx.invalid_prop(None);
                    ctx.end_prop();
                }
            }
        }
        Some(_) => ctx.invalid_prop(Some("linkIds")),
    }

    ctx.invalid_count() == before
}

fn location_to_ical(comp: &mut Component, id: &str, loc: &Map<String, Json>) {
    let name = loc.get("name").and_then(Json::as_str).unwrap_or("");
    let rel = loc
        .get("rel")
        .and_then(Json::as_str)
        .filter(|rel| *rel != "unknown");

    // The first location becomes LOCATION; the rest keep their data in
    // X-JMAP-LOCATION properties.
    let mut prop = if comp.get_property("LOCATION").is_none() {
        Property::text("LOCATION", name)
    } else {
        Property::text(xname::LOCATION, name)
    };

    prop.set_param(Parameter::new(xname::ID, id));
    if let Some(rel) = rel {
        prop.add_param(Parameter::new(xname::REL, rel));
    }
    if let Some(desc) = loc.get("description").and_then(Json::as_str) {
        prop.add_param(Parameter::new(xname::DESCRIPTION, desc));
    }
    if let Some(tzid) = loc.get("timeZone").and_then(Json::as_str) {
        prop.add_param(Parameter::new(xname::TZID, tzid));
    }
    if let Some(coords) = loc.get("coordinates").and_then(Json::as_str) {
        prop.add_param(Parameter::new(xname::GEO, coords));
    }
    if let Some(Json::Object(link_ids)) = loc.get("linkIds") {
        for link_id in link_ids.keys() {
            prop.add_param(Parameter::new(xname::LINK_ID, link_id));
        }
    }

    comp.add_property(prop);
}

/// Writes the `locations` map. End-timezone locations are absorbed by
/// the time/zone translator and skipped here; invalid locations are
/// skipped without blocking the rest.
pub fn locations_to_ical(
    ctx: &mut Context,
    comp: &mut Component,
    locations: &Json,
    links: &Json,
) {
    comp.remove_properties("LOCATION");
    comp.remove_properties("GEO");
    comp.remove_properties(xname::LOCATION);
    comp.remove_properties(xname::APPLE_STRUCTURED_LOCATION);

    let Json::Object(locations) = locations else {
        return;
    };

    for (id, loc) in locations {
        ctx.begin_prop_key("locations", id);

        if !util::is_valid_jmap_id(id) {
            ctx.invalid_prop(None);
            ctx.end_prop();
            continue;
        }
        if time::location_is_end_timezone(loc) {
            ctx.end_prop();
            continue;
        }
        let Some(loc) = loc.as_object() else {
            ctx.invalid_prop(None);
            ctx.end_prop();
            continue;
        };
        if !validate_location(ctx, loc, links) {
            ctx.end_prop();
            continue;
        }

        location_to_ical(comp, id, loc);
        ctx.end_prop();
    }
}

/// Writes the `virtualLocations` map as CONFERENCE properties.
pub fn virtual_locations_to_ical(ctx: &mut Context, comp: &mut Component, locations: &Json) {
    comp.remove_properties("CONFERENCE");

    let Json::Object(locations) = locations else {
        return;
    };

    for (id, loc) in locations {
        ctx.begin_prop_key("virtualLocations", id);

        if !util::is_valid_jmap_id(id) {
            ctx.invalid_prop(None);
            ctx.end_prop();
            continue;
        }

        let Some(uri) = loc.get("uri").and_then(Json::as_str) else {
            ctx.invalid_prop(Some("uri"));
            ctx.end_prop();
            continue;
        };

        let mut prop = Property::uri("CONFERENCE", uri);
        prop.set_param(Parameter::new(xname::ID, id));

        match loc.get("name") {
            None | Some(Json::Null) => {}
            Some(Json::String(name)) => prop.add_param(Parameter::label(name)),
            Some(_) => ctx.invalid_prop(Some("name")),
        }
        match loc.get("description") {
            None | Some(Json::Null) => {}
            Some(Json::String(desc)) => {
                prop.add_param(Parameter::new(xname::DESCRIPTION, desc));
            }
            Some(_) => ctx.invalid_prop(Some("description")),
        }

        comp.add_property(prop);
        ctx.end_prop();
    }
}
