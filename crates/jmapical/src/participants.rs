//! Participants translator: `ORGANIZER` + `ATTENDEE` ↔ `replyTo` +
//! `participants`, including delegation chains, memberships and RSVP
//! URIs.

use std::collections::HashMap;

use jmapical_rfc::core::{Component, Parameter, Property};
use serde_json::{json, Map, Value as Json};

use crate::context::Context;
use crate::localdate;
use crate::util::{self, xname};

/// Maximum delegation hops before a chain is declared cyclic.
const MAX_DELEGATE_HOPS: usize = 64;

/// Reads the RSVP method map from a CAL-ADDRESS property: each
/// `X-JMAP-RSVP-URI` parameter holds `method:uri`; an entry without a
/// method is `web`. The property value itself is appended as `imip` or
/// `other` unless already listed.
#[must_use]
pub fn rsvpto_from_property(prop: &Property) -> Json {
    let mut rsvp_to = Map::new();

    for val in prop.param_values(xname::RSVP_URI) {
        let method_split = val.find(':').and_then(|first| {
            val[first + 1..]
                .find(':')
                .map(|_| (&val[..first], &val[first + 1..]))
        });
        match method_split {
            Some((method, uri)) => {
                rsvp_to.insert(method.to_string(), json!(uri));
            }
            None => {
                rsvp_to.insert("web".to_string(), json!(val));
            }
        }
    }

    let caladdress = prop.value_as_string();
    let defined = rsvp_to
        .values()
        .filter_map(Json::as_str)
        .any(|uri| util::match_uri(caladdress, uri));
    if !defined {
        if caladdress.len() >= 7 && caladdress[..7].eq_ignore_ascii_case("mailto:") {
            rsvp_to.insert("imip".to_string(), json!(caladdress));
        } else {
            rsvp_to.insert("other".to_string(), json!(caladdress));
        }
    }

    if rsvp_to.is_empty() {
        Json::Null
    } else {
        Json::Object(rsvp_to)
    }
}

/// Converts one ATTENDEE into a Participant object.
fn participant_from_ical(
    prop: &Property,
    attendee_by_uri: &HashMap<String, &Property>,
    id_by_uri: &HashMap<String, String>,
    organizer: Option<&Property>,
) -> Json {
    let mut p = Map::new();

    // sendTo
    let send_to = rsvpto_from_property(prop);
    p.insert("sendTo".to_string(), send_to.clone());

    // email
    let email = prop
        .get_param_value("EMAIL")
        .map(str::to_string)
        .or_else(|| {
            send_to
                .get("imip")
                .and_then(Json::as_str)
                .and_then(util::mail_addr_from_uri)
        });
    p.insert("email".to_string(), email.map_or(Json::Null, Json::from));

    // name
    let name = prop.get_param_value("CN").unwrap_or("");
    p.insert("name".to_string(), json!(name));

    // kind
    if let Some(cutype) = prop.get_param_value("CUTYPE") {
        let kind = match cutype.to_ascii_uppercase().as_str() {
            "INDIVIDUAL" => "individual",
            "GROUP" => "group",
            "RESOURCE" => "resource",
            "ROOM" => "location",
            _ => "unknown",
        };
        p.insert("kind".to_string(), json!(kind));
    }

    // attendance
    let role = prop
        .get_param_value("ROLE")
        .map(str::to_ascii_uppercase);
    let is_chair = role.as_deref() == Some("CHAIR");
    if let Some(role) = &role {
        let attendance = match role.as_str() {
            "OPT-PARTICIPANT" => "optional",
            "NON-PARTICIPANT" => "none",
            _ => "required",
        };
        p.insert("attendance".to_string(), json!(attendance));
    }

    // roles
    let mut roles = Map::new();
    for val in prop.param_values(xname::ROLE) {
        roles.insert(val.to_ascii_lowercase(), Json::Bool(true));
    }
    if !roles.contains_key("owner") {
        if let Some(organizer) = organizer {
            if organizer
                .value_as_string()
                .eq_ignore_ascii_case(prop.value_as_string())
            {
                roles.insert("owner".to_string(), Json::Bool(true));
                roles.insert("attendee".to_string(), Json::Bool(true));
            }
        }
    }
    if is_chair {
        roles.insert("chair".to_string(), Json::Bool(true));
    }
    if roles.is_empty() {
        roles.insert("attendee".to_string(), Json::Bool(true));
    }
    p.insert("roles".to_string(), Json::Object(roles));

    // locationId
    if let Some(locid) = prop.get_param_value(xname::LOCATION_ID) {
        p.insert("locationId".to_string(), json!(locid));
    }

    // participationStatus, following the delegation chain.
    if let Some(partstat) = participation_status(prop, attendee_by_uri) {
        p.insert("participationStatus".to_string(), json!(partstat));
    }

    // expectReply
    if let Some(rsvp) = prop.get_param_value("RSVP") {
        p.insert(
            "expectReply".to_string(),
            Json::Bool(rsvp.eq_ignore_ascii_case("TRUE")),
        );
    }

    // delegatedTo / delegatedFrom
    for (param, field) in [("DELEGATED-TO", "delegatedTo"), ("DELEGATED-FROM", "delegatedFrom")] {
        let mut ids = Map::new();
        for uri in prop.param_values(param) {
            if let Some(id) = id_by_uri.get(&util::normalized_uri(uri)) {
                ids.insert(id.clone(), Json::Bool(true));
            }
        }
        if !ids.is_empty() {
            p.insert(field.to_string(), Json::Object(ids));
        }
    }

    // memberOf: members that are not attendees get synthetic ids.
    let mut member_of = Map::new();
    for uri in prop.param_values("MEMBER") {
        let uri = util::normalized_uri(uri);
        let id = id_by_uri
            .get(&uri)
            .cloned()
            .unwrap_or_else(|| util::sha1_key(&uri));
        member_of.insert(id, Json::Bool(true));
    }
    if !member_of.is_empty() {
        p.insert("memberOf".to_string(), Json::Object(member_of));
    }

    // linkIds
    let mut link_ids = Map::new();
    for val in prop.param_values(xname::LINK_ID) {
        link_ids.insert(val.to_string(), Json::Bool(true));
    }
    if !link_ids.is_empty() {
        p.insert("linkIds".to_string(), Json::Object(link_ids));
    }

    // scheduleSequence
    if let Some(val) = prop.get_param_value(xname::SEQUENCE) {
        if let Ok(seq) = val.parse::<i64>() {
            if seq >= 0 {
                p.insert("scheduleSequence".to_string(), json!(seq));
            }
        }
    }

    // scheduleUpdated
    if let Some(val) = prop.get_param_value(xname::DTSTAMP) {
        if let Ok(dt) = jmapical_rfc::parse::values::parse_datetime(val, None, 0, 0) {
            if dt.is_utc() {
                if let Some(stamp) = localdate::utcdate_from_datetime(&dt) {
                    p.insert("scheduleUpdated".to_string(), json!(stamp));
                }
            }
        }
    }

    Json::Object(p)
}

/// Resolves the participation status, chasing DELEGATED chains through
/// the attendee index. Cyclic or over-long chains resolve to none.
/// `None` means the field is omitted.
fn participation_status(
    prop: &Property,
    attendee_by_uri: &HashMap<String, &Property>,
) -> Option<String> {
    let mut current = prop;
    let mut hops = 0;

    loop {
        let partstat = current.get_param_value("PARTSTAT")?;
        match partstat.to_ascii_uppercase().as_str() {
            "ACCEPTED" => return Some("accepted".to_string()),
            "DECLINED" => return Some("declined".to_string()),
            "TENTATIVE" => return Some("tentative".to_string()),
            "NEEDS-ACTION" => return Some("needs-action".to_string()),
            "DELEGATED" => {
                let delegate = current
                    .param_values("DELEGATED-TO")
                    .first()
                    .map(|uri| util::normalized_uri(uri))
                    .and_then(|uri| attendee_by_uri.get(&uri).copied());
                match delegate {
                    Some(next) => {
                        hops += 1;
                        if hops > MAX_DELEGATE_HOPS {
                            return None;
                        }
                        current = next;
                    }
                    None => return None,
                }
            }
            _ => return None,
        }
    }
}

/// Builds a Participant for an ORGANIZER without an ATTENDEE record.
#[must_use]
pub fn participant_from_organizer(organizer: &Property) -> Json {
    let mut p = Map::new();

    let name = organizer.get_param_value("CN").unwrap_or("");
    p.insert("name".to_string(), json!(name));
    p.insert("roles".to_string(), json!({"owner": true}));

    let caladdress = organizer.value_as_string();
    if caladdress.len() >= 7 && caladdress[..7].eq_ignore_ascii_case("mailto:") {
        p.insert("sendTo".to_string(), json!({"imip": caladdress}));
        p.insert(
            "email".to_string(),
            util::mail_addr_from_uri(caladdress).map_or(Json::Null, Json::from),
        );
    } else {
        p.insert("sendTo".to_string(), json!({"other": caladdress}));
        p.insert("email".to_string(), Json::Null);
    }

    Json::Object(p)
}

/// Converts the component's ORGANIZER/ATTENDEE graph into the
/// `participants` map, or JSON null without attendees or organizer.
#[must_use]
pub fn participants_from_ical(comp: &Component) -> Json {
    let attendees = comp.get_properties("ATTENDEE");
    let organizer = comp.get_property("ORGANIZER");

    // URI-keyed indices for delegate and id lookups.
    let mut attendee_by_uri: HashMap<String, &Property> = HashMap::new();
    let mut id_by_uri: HashMap<String, String> = HashMap::new();
    for &prop in &attendees {
        let uri = util::normalized_uri(prop.value_as_string());
        let id = prop
            .get_param_value(xname::ID)
            .map_or_else(|| util::sha1_key(&uri), str::to_string);
        attendee_by_uri.entry(uri.clone()).or_insert(prop);
        id_by_uri.entry(uri).or_insert(id);
    }

    let mut participants = Map::new();
    for &prop in &attendees {
        let uri = util::normalized_uri(prop.value_as_string());
        let Some(id) = id_by_uri.get(&uri) else {
            continue;
        };
        let p = participant_from_ical(prop, &attendee_by_uri, &id_by_uri, organizer);
        participants.insert(id.clone(), p);
    }

    // Synthesize a participant for an organizer who is not an attendee.
    if let Some(organizer) = organizer {
        let uri = util::normalized_uri(organizer.value_as_string());
        if !attendee_by_uri.contains_key(&uri) {
            let id = organizer
                .get_param_value(xname::ID)
                .map_or_else(|| util::sha1_key(&uri), str::to_string);
            participants.insert(id, participant_from_organizer(organizer));
        }
    }

    if participants.is_empty() {
        Json::Null
    } else {
        Json::Object(participants)
    }
}

/// Structural participant equality for the organizer-collapse check.
///
/// `sendTo` is normalized (missing → synthesized from `email`) and
/// compared per method by URI equality; defaults and nulls are stripped
/// before comparing the rest. An `email` that merely restates the
/// `imip` address is derived data and ignored.
#[must_use]
pub fn participant_equals(a: &Json, b: &Json) -> bool {
    let (Some(a), Some(b)) = (a.as_object(), b.as_object()) else {
        return a == b;
    };

    let send_to_a = normalized_send_to(a);
    let send_to_b = normalized_send_to(b);
    match (&send_to_a, &send_to_b) {
        (Some(sa), Some(sb)) => {
            if sa.len() != sb.len() {
                return false;
            }
            for (method, uri_a) in sa {
                let matches = sb
                    .get(method)
                    .and_then(Json::as_str)
                    .zip(uri_a.as_str())
                    .is_some_and(|(ub, ua)| util::match_uri(ua, ub));
                if !matches {
                    return false;
                }
            }
        }
        (None, None) => {}
        _ => return false,
    }

    strip_defaults(a, send_to_a.as_ref()) == strip_defaults(b, send_to_b.as_ref())
}

fn normalized_send_to(p: &Map<String, Json>) -> Option<Map<String, Json>> {
    match p.get("sendTo") {
        Some(Json::Object(send_to)) => Some(send_to.clone()),
        _ => {
            let email = p.get("email").and_then(Json::as_str)?;
            let mut send_to = Map::new();
            send_to.insert("imip".to_string(), json!(util::mail_addr_to_uri(email)));
            Some(send_to)
        }
    }
}

fn strip_defaults(p: &Map<String, Json>, send_to: Option<&Map<String, Json>>) -> Map<String, Json> {
    let mut p = p.clone();
    p.remove("sendTo");

    if p.get("name").and_then(Json::as_str) == Some("") {
        p.remove("name");
    }
    if p.get("participationStatus").and_then(Json::as_str) == Some("needs-action") {
        p.remove("participationStatus");
    }
    if p.get("attendance").and_then(Json::as_str) == Some("required") {
        p.remove("attendance");
    }
    if p.get("expectReply") == Some(&Json::Bool(false)) {
        p.remove("expectReply");
    }
    if p.get("scheduleSequence").and_then(Json::as_i64) == Some(0) {
        p.remove("scheduleSequence");
    }

    // An email equal to the imip address carries no information.
    if let (Some(email), Some(send_to)) = (p.get("email").and_then(Json::as_str), send_to) {
        let imip_addr = send_to
            .get("imip")
            .and_then(Json::as_str)
            .and_then(util::mail_addr_from_uri);
        if imip_addr.as_deref() == Some(&util::canonical_mail_addr(email)) {
            p.remove("email");
        }
    }

    p.retain(|_, v| !v.is_null());
    p
}

/// Picks the iCalendar CAL-ADDRESS for a participant: `sendTo.imip`,
/// then `sendTo.other`, then the first `sendTo` entry, then the mailto
/// form of `email`.
fn caladdress_of(participant: &Json) -> Option<String> {
    let send_to = participant.get("sendTo").and_then(Json::as_object);
    if let Some(send_to) = send_to {
        for method in ["imip", "other"] {
            if let Some(uri) = send_to.get(method).and_then(Json::as_str) {
                return Some(uri.to_string());
            }
        }
        if let Some(uri) = send_to.values().find_map(Json::as_str) {
            return Some(uri.to_string());
        }
    }
    participant
        .get("email")
        .and_then(Json::as_str)
        .map(util::mail_addr_to_uri)
}

/// Writes `replyTo` + `participants` as ORGANIZER and ATTENDEE
/// properties.
pub fn participants_to_ical(ctx: &mut Context, comp: &mut Component, event: &Map<String, Json>) {
    comp.remove_properties("ATTENDEE");
    comp.remove_properties("ORGANIZER");

    let reply_to = event.get("replyTo").filter(|v| !v.is_null());
    let participants = event.get("participants").filter(|v| !v.is_null());

    if let Some(reply_to) = reply_to {
        if reply_to.as_object().map_or(true, Map::is_empty) {
            ctx.invalid_prop(Some("replyTo"));
        }
    }
    if let Some(participants) = participants {
        if participants.as_object().map_or(true, Map::is_empty) {
            ctx.invalid_prop(Some("participants"));
        }
    }
    if reply_to.is_some() != participants.is_some() {
        ctx.invalid_prop(Some("replyTo"));
        ctx.invalid_prop(Some("participants"));
        return;
    }
    let (Some(reply_to), Some(participants)) = (
        reply_to.and_then(Json::as_object),
        participants.and_then(Json::as_object),
    ) else {
        return;
    };

    // Validate replyTo entries.
    ctx.begin_prop("replyTo");
    for (method, uri) in reply_to {
        if !util::is_valid_rsvp_method(method) || !uri.is_string() {
            ctx.invalid_prop(Some(method));
        }
    }
    ctx.end_prop();

    // Pre-assign a CAL-ADDRESS to every participant id.
    let mut caladdress_by_id: HashMap<String, String> = HashMap::new();
    for (id, participant) in participants {
        if !util::is_valid_jmap_id(id) {
            continue;
        }
        if let Some(addr) = caladdress_of(participant) {
            caladdress_by_id.insert(id.clone(), addr);
        }
    }

    // Pick the ORGANIZER URI from replyTo.
    let organizer_method = ["imip", "other"]
        .into_iter()
        .find(|m| reply_to.contains_key(*m))
        .map(str::to_string)
        .or_else(|| reply_to.keys().next().cloned());
    let Some(organizer_method) = organizer_method else {
        return;
    };
    let Some(organizer_uri) = reply_to.get(&organizer_method).and_then(Json::as_str) else {
        return;
    };

    let mut organizer = Property::cal_address("ORGANIZER", organizer_uri);
    // Carry the full replyTo map unless it is the trivial single
    // imip/other entry recoverable from the value.
    if reply_to.len() > 1 || (organizer_method != "imip" && organizer_method != "other") {
        for (method, uri) in reply_to {
            if let Some(uri) = uri.as_str() {
                organizer.add_param(Parameter::new(xname::RSVP_URI, format!("{method}:{uri}")));
            }
        }
    }
    comp.add_property(organizer);

    let links = event.get("links").cloned().unwrap_or(Json::Null);
    let organizer_uri = organizer_uri.to_string();

    for (id, participant) in participants {
        ctx.begin_prop_key("participants", id);
        if !util::is_valid_jmap_id(id) {
            ctx.invalid_prop(None);
            ctx.end_prop();
            continue;
        }
        let Some(caladdress) = caladdress_by_id.get(id).cloned() else {
            ctx.invalid_prop(Some("sendTo"));
            ctx.invalid_prop(Some("email"));
            ctx.end_prop();
            continue;
        };
        participant_to_ical(
            ctx,
            comp,
            id,
            participant,
            participants,
            &links,
            &organizer_uri,
            &caladdress,
            &caladdress_by_id,
        );
        ctx.end_prop();
    }
}

#[expect(clippy::too_many_arguments, reason = "mirrors the attendee write context")]
fn participant_to_ical(
    ctx: &mut Context,
    comp: &mut Component,
    id: &str,
    participant: &Json,
    participants: &Map<String, Json>,
    links: &Json,
    organizer_uri: &str,
    caladdress: &str,
    caladdress_by_id: &HashMap<String, String>,
) {
    let mut prop = Property::cal_address("ATTENDEE", caladdress);
    prop.set_param(Parameter::new(xname::ID, id));

    let is_organizer = util::match_uri(caladdress, organizer_uri);
    if is_organizer {
        if let Some(organizer) = comp.get_property_mut("ORGANIZER") {
            organizer.set_param(Parameter::new(xname::ID, id));
        }
    }

    // name
    match participant.get("name") {
        None | Some(Json::Null) => {}
        Some(Json::String(name)) => {
            prop.add_param(Parameter::cn(name));
            if is_organizer {
                if let Some(organizer) = comp.get_property_mut("ORGANIZER") {
                    organizer.set_param(Parameter::cn(name));
                }
            }
        }
        Some(_) => ctx.invalid_prop(Some("name")),
    }

    // sendTo
    match participant.get("sendTo") {
        None | Some(Json::Null) => {}
        Some(Json::Object(send_to)) if !send_to.is_empty() => {
            ctx.begin_prop("sendTo");
            let trivial = send_to.len() == 1
                && send_to
                    .keys()
                    .all(|method| method == "imip" || method == "other");
            for (method, uri) in send_to {
                if !util::is_valid_rsvp_method(method) || !uri.is_string() {
                    ctx.invalid_prop(Some(method));
                    continue;
                }
                if !trivial {
                    if let Some(uri) = uri.as_str() {
                        prop.add_param(Parameter::new(
                            xname::RSVP_URI,
                            format!("{method}:{uri}"),
                        ));
                    }
                }
            }
            ctx.end_prop();
        }
        Some(_) => ctx.invalid_prop(Some("sendTo")),
    }

    // email
    match participant.get("email") {
        None | Some(Json::Null) => {}
        Some(Json::String(email)) => {
            if !util::match_uri(caladdress, email) {
                prop.add_param(Parameter::email(email));
                if is_organizer {
                    if let Some(organizer) = comp.get_property_mut("ORGANIZER") {
                        organizer.set_param(Parameter::email(email));
                    }
                }
            }
        }
        Some(_) => ctx.invalid_prop(Some("email")),
    }

    // kind
    match participant.get("kind") {
        None | Some(Json::Null) => {}
        Some(Json::String(kind)) => {
            let cutype = match kind.to_ascii_uppercase().as_str() {
                "LOCATION" => Some("ROOM"),
                "INDIVIDUAL" => Some("INDIVIDUAL"),
                "GROUP" => Some("GROUP"),
                "RESOURCE" => Some("RESOURCE"),
                _ => None,
            };
            if let Some(cutype) = cutype {
                prop.add_param(Parameter::cutype(cutype));
            }
        }
        Some(_) => ctx.invalid_prop(Some("kind")),
    }

    // attendance
    let mut required_role = true;
    match participant.get("attendance") {
        None | Some(Json::Null) => {}
        Some(Json::String(attendance)) => {
            let role = match attendance.to_ascii_lowercase().as_str() {
                "optional" => Some("OPT-PARTICIPANT"),
                "none" => Some("NON-PARTICIPANT"),
                _ => None,
            };
            if let Some(role) = role {
                required_role = false;
                prop.add_param(Parameter::role(role));
            }
        }
        Some(_) => ctx.invalid_prop(Some("attendance")),
    }

    // roles
    match participant.get("roles") {
        None | Some(Json::Null) => {}
        Some(Json::Object(roles)) if !roles.is_empty() => {
            write_roles(ctx, &mut prop, roles, required_role, is_organizer);
        }
        Some(_) => ctx.invalid_prop(Some("roles")),
    }

    // locationId
    match participant.get("locationId") {
        None | Some(Json::Null) => {}
        Some(Json::String(locid)) => prop.set_param(Parameter::new(xname::LOCATION_ID, locid)),
        Some(_) => ctx.invalid_prop(Some("locationId")),
    }

    // participationStatus
    let mut has_partstat = false;
    match participant.get("participationStatus") {
        None | Some(Json::Null) => {}
        Some(Json::String(status)) => {
            let partstat = match status.to_ascii_lowercase().as_str() {
                "needs-action" => Some("NEEDS-ACTION"),
                "accepted" => Some("ACCEPTED"),
                "declined" => Some("DECLINED"),
                "tentative" => Some("TENTATIVE"),
                _ => None,
            };
            match partstat {
                Some(partstat) => {
                    has_partstat = true;
                    prop.add_param(Parameter::partstat(partstat));
                }
                None => ctx.invalid_prop(Some("participationStatus")),
            }
        }
        Some(_) => ctx.invalid_prop(Some("participationStatus")),
    }

    // expectReply
    match participant.get("expectReply") {
        None | Some(Json::Null) => {}
        Some(Json::Bool(expect)) => {
            prop.add_param(Parameter::rsvp(*expect));
            if *expect && !has_partstat {
                prop.add_param(Parameter::partstat("NEEDS-ACTION"));
            }
        }
        Some(_) => ctx.invalid_prop(Some("expectReply")),
    }

    // delegatedTo / delegatedFrom / memberOf
    for (field, build) in [
        ("delegatedTo", Parameter::delegated_to as fn(String) -> Parameter),
        ("delegatedFrom", Parameter::delegated_from as fn(String) -> Parameter),
        ("memberOf", Parameter::member as fn(String) -> Parameter),
    ] {
        match participant.get(field) {
            None | Some(Json::Null) => {}
            Some(Json::Object(refs)) if !refs.is_empty() => {
                for (ref_id, val) in refs {
                    let resolvable = util::is_valid_jmap_id(ref_id)
                        && participants.contains_key(ref_id)
                        && val == &Json::Bool(true);
                    if resolvable {
                        if let Some(uri) = caladdress_by_id.get(ref_id) {
                            prop.add_param(build(uri.clone()));
                        }
                    } else {
                        ctx.begin_prop_key(field, ref_id);
                        ctx.invalid_prop(None);
                        ctx.end_prop();
                    }
                }
            }
            Some(_) => ctx.invalid_prop(Some(field)),
        }
    }

    // linkIds
    match participant.get("linkIds") {
        None | Some(Json::Null) => {}
        Some(Json::Object(link_ids)) if !link_ids.is_empty() => {
            for (link_id, val) in link_ids {
                let resolvable = util::is_valid_jmap_id(link_id)
                    && links.get(link_id).is_some()
                    && val == &Json::Bool(true);
                if resolvable {
                    prop.add_param(Parameter::new(xname::LINK_ID, link_id));
                } else {
                    ctx.begin_prop_key("linkIds", link_id);
                    ctx.invalid_prop(None);
                    ctx.end_prop();
                }
            }
        }
        Some(_) => ctx.invalid_prop(Some("linkIds")),
    }

    // scheduleSequence
    match participant.get("scheduleSequence") {
        None | Some(Json::Null) => {}
        Some(Json::Number(n)) if n.as_i64().is_some_and(|v| v >= 0) => {
            prop.add_param(Parameter::new(
                xname::SEQUENCE,
                n.as_i64().unwrap_or_default().to_string(),
            ));
        }
        Some(_) => ctx.invalid_prop(Some("scheduleSequence")),
    }

    // scheduleUpdated
    match participant.get("scheduleUpdated") {
        None | Some(Json::Null) => {}
        Some(Json::String(stamp)) => match localdate::utcdate_to_datetime(stamp) {
            Some(dt) => prop.add_param(Parameter::new(xname::DTSTAMP, dt.to_string())),
            None => ctx.invalid_prop(Some("scheduleUpdated")),
        },
        Some(_) => ctx.invalid_prop(Some("scheduleUpdated")),
    }

    if is_organizer {
        // The attendee record can be dropped entirely when the
        // ORGANIZER property alone reconstructs it.
        if let Some(organizer) = comp.get_property("ORGANIZER") {
            let from_organizer = participant_from_organizer(organizer);
            if participant_equals(&from_organizer, participant) {
                ctx.organizer_collapsed = true;
                return;
            }
        }
    }

    comp.add_property(prop);
}

/// Maps the JSCalendar roles set onto ROLE=CHAIR and X-JMAP-ROLE
/// parameters, leaving implied roles (owner on the organizer, plain
/// attendee, chair on a required participant) unwritten.
fn write_roles(
    ctx: &mut Context,
    prop: &mut Property,
    roles: &Map<String, Json>,
    required_role: bool,
    is_organizer: bool,
) {
    for (role, val) in roles {
        if val != &Json::Bool(true) {
            ctx.begin_prop_key("roles", role);
            ctx.invalid_prop(None);
            ctx.end_prop();
        }
    }

    let has_chair = roles.get("chair") == Some(&Json::Bool(true));
    let mut extra = roles.len();
    if has_chair && required_role {
        extra -= 1;
    }
    if is_organizer && roles.get("owner") == Some(&Json::Bool(true)) {
        extra -= 1;
    }
    if roles.get("attendee") == Some(&Json::Bool(true)) {
        extra -= 1;
    }

    if extra == 0 {
        if has_chair {
            prop.add_param(Parameter::role("CHAIR"));
        }
        return;
    }

    for role in roles.keys() {
        if role.eq_ignore_ascii_case("chair") && required_role {
            prop.add_param(Parameter::role("CHAIR"));
        } else {
            prop.add_param(Parameter::new(xname::ROLE, role));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attendee(uri: &str) -> Property {
        Property::cal_address("ATTENDEE", uri)
    }

    #[test]
    fn rsvpto_appends_caladdress() {
        let prop = attendee("mailto:alice@example.com");
        assert_eq!(
            rsvpto_from_property(&prop),
            json!({"imip": "mailto:alice@example.com"})
        );

        let prop = attendee("https://example.com/rsvp");
        assert_eq!(
            rsvpto_from_property(&prop),
            json!({"other": "https://example.com/rsvp"})
        );
    }

    #[test]
    fn rsvpto_parses_method_entries() {
        let mut prop = attendee("mailto:alice@example.com");
        prop.add_param(Parameter::new(
            xname::RSVP_URI,
            "web:https://example.com/rsvp",
        ));
        prop.add_param(Parameter::new(xname::RSVP_URI, "imip:mailto:alice@example.com"));
        assert_eq!(
            rsvpto_from_property(&prop),
            json!({
                "imip": "mailto:alice@example.com",
                "web": "https://example.com/rsvp",
            })
        );
    }

    #[test]
    fn delegation_chain_resolves_terminal_status() {
        let mut a = attendee("mailto:a@x.org");
        a.add_param(Parameter::partstat("DELEGATED"));
        a.add_param(Parameter::delegated_to("mailto:b@x.org"));
        let mut b = attendee("mailto:b@x.org");
        b.add_param(Parameter::partstat("ACCEPTED"));

        let mut index: HashMap<String, &Property> = HashMap::new();
        index.insert("mailto:a@x.org".to_string(), &a);
        index.insert("mailto:b@x.org".to_string(), &b);

        assert_eq!(
            participation_status(&a, &index).as_deref(),
            Some("accepted")
        );
    }

    #[test]
    fn delegation_cycle_resolves_to_none() {
        let mut a = attendee("mailto:a@x.org");
        a.add_param(Parameter::partstat("DELEGATED"));
        a.add_param(Parameter::delegated_to("mailto:b@x.org"));
        let mut b = attendee("mailto:b@x.org");
        b.add_param(Parameter::partstat("DELEGATED"));
        b.add_param(Parameter::delegated_to("mailto:a@x.org"));

        let mut index: HashMap<String, &Property> = HashMap::new();
        index.insert("mailto:a@x.org".to_string(), &a);
        index.insert("mailto:b@x.org".to_string(), &b);

        assert_eq!(participation_status(&a, &index), None);
    }

    #[test]
    fn organizer_equality_ignores_derived_email() {
        let organizer = {
            let mut p = Property::cal_address("ORGANIZER", "mailto:a@x.org");
            p.add_param(Parameter::cn("Alice"));
            p
        };
        let from_organizer = participant_from_organizer(&organizer);
        let participant = json!({
            "sendTo": {"imip": "mailto:a@x.org"},
            "name": "Alice",
            "roles": {"owner": true},
        });
        assert!(participant_equals(&from_organizer, &participant));
    }

    #[test]
    fn equality_detects_differences() {
        let a = json!({
            "sendTo": {"imip": "mailto:a@x.org"},
            "name": "Alice",
            "roles": {"owner": true},
        });
        let b = json!({
            "sendTo": {"imip": "mailto:a@x.org"},
            "name": "Alice",
            "roles": {"owner": true},
            "participationStatus": "accepted",
        });
        assert!(!participant_equals(&a, &b));
    }

    #[test]
    fn equality_normalizes_send_to_from_email() {
        let a = json!({"email": "a@x.org", "roles": {"attendee": true}});
        let b = json!({
            "sendTo": {"imip": "mailto:a@x.org"},
            "roles": {"attendee": true},
        });
        assert!(participant_equals(&a, &b));
    }

    #[test]
    fn caladdress_preference_order() {
        assert_eq!(
            caladdress_of(&json!({"sendTo": {"other": "xmpp:a", "imip": "mailto:a@x"}})),
            Some("mailto:a@x".to_string())
        );
        assert_eq!(
            caladdress_of(&json!({"sendTo": {"other": "xmpp:a"}})),
            Some("xmpp:a".to_string())
        );
        assert_eq!(
            caladdress_of(&json!({"email": "a@x.org"})),
            Some("mailto:a@x.org".to_string())
        );
        assert_eq!(caladdress_of(&json!({})), None);
    }
}
