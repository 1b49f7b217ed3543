//! Overrides translator: `RDATE`/`EXDATE`/exception VEVENTs ↔
//! `recurrenceOverrides`.
//!
//! Reading computes per-exception patches against a snapshot of the
//! master event; writing expands patches back into EXDATE, RDATE or
//! exception VEVENTs.

use jmapical_rfc::core::{Component, ComponentKind, DateTime, Duration, Period};
use jmapical_rfc::tz;
use serde_json::{json, Map, Value as Json};

use crate::context::Context;
use crate::error::ErrorKind;
use crate::event;
use crate::localdate;
use crate::patch;
use crate::time;

/// Patch keys that void an override entirely (JMAP: "a patch with such
/// a key MUST be ignored"). Matched against the first path segment.
const FORBIDDEN_PATCH_KEYS: [&str; 8] = [
    "uid",
    "relatedTo",
    "prodId",
    "isAllDay",
    "recurrenceRule",
    "recurrenceOverrides",
    "replyTo",
    "participantId",
];

/// Keys never diffed between a master and its exceptions: they are
/// suppressed from exception events, or volatile.
const UNDIFFED_MASTER_KEYS: [&str; 9] = [
    "uid",
    "relatedTo",
    "prodId",
    "isAllDay",
    "recurrenceRule",
    "recurrenceOverrides",
    "replyTo",
    "created",
    "updated",
];

fn patch_has_forbidden_key(override_patch: &Map<String, Json>) -> bool {
    override_patch.keys().any(|key| {
        let first = key.split('/').next().unwrap_or(key);
        FORBIDDEN_PATCH_KEYS.contains(&first)
    })
}

/// Collects `recurrenceOverrides` from RDATEs, EXDATEs and exception
/// VEVENTs in the parent calendar. `event` is the master event built so
/// far; it must not yet contain `recurrenceOverrides`.
#[must_use]
pub fn overrides_from_ical(
    ctx: &mut Context,
    parent: &Component,
    comp: &Component,
    event: &Map<String, Json>,
) -> Json {
    let mut overrides = Map::new();

    // RDATE
    for prop in comp.get_properties("RDATE") {
        for period in prop.value.periods() {
            let start = period.start().clone();
            let duration = match &period {
                Period::Explicit { start, end } => {
                    match (tz::utc_instant(start), tz::utc_instant(end)) {
                        (Some(t0), Some(t1)) => Duration::from_seconds((t1 - t0).num_seconds()),
                        _ => continue,
                    }
                }
                Period::Duration { duration, .. } => *duration,
            };
            overrides.insert(
                localdate::localdate_from_datetime(&start),
                json!({"duration": duration.to_string()}),
            );
        }
        for dt in prop.value.datetimes() {
            overrides.insert(localdate::localdate_from_datetime(&dt), json!({}));
        }
    }

    // EXDATE: rezoned into the start zone.
    for prop in comp.get_properties("EXDATE") {
        let prop_tzid = time::tzid_from_property(prop);
        for dt in prop.value.datetimes() {
            let rezoned = rezone_to_start(ctx, prop_tzid.as_deref(), &dt);
            overrides.insert(
                localdate::localdate_from_datetime(&rezoned),
                json!({"excluded": true}),
            );
        }
    }

    // Exception VEVENTs sharing the uid.
    let master_snapshot = diffable_master(event);
    for excomp in parent.children_of_kind(ComponentKind::Event) {
        if std::ptr::eq(excomp, comp) {
            continue;
        }
        if excomp.uid().is_none() || excomp.uid() != ctx.uid.as_deref() {
            continue;
        }
        let Some(recurid) = excomp
            .get_property("RECURRENCE-ID")
            .and_then(|p| p.as_datetime().cloned().or_else(|| p.as_date().map(|d| DateTime::from_date(*d))))
        else {
            continue;
        };

        let mut subctx = Context::read(None);
        subctx.master = Some(comp);
        subctx.is_exception = true;
        subctx.uid = ctx.uid.clone();
        let ex = event::event_from_ical(&mut subctx, parent, excomp);
        let Json::Object(mut ex) = ex else { continue };
        ex.remove("created");
        ex.remove("updated");

        let key = localdate::localdate_from_datetime(&recurid);
        if ex.get("start").and_then(Json::as_str) == Some(key.as_str()) {
            // The exception starts at its recurrence id; implicit.
            ex.remove("start");
        }

        let diff = patch::create(&Json::Object(master_snapshot.clone()), &Json::Object(ex));
        overrides.insert(key, diff);
    }

    if overrides.is_empty() {
        Json::Null
    } else {
        Json::Object(overrides)
    }
}

fn rezone_to_start(ctx: &Context, prop_tzid: Option<&str>, dt: &DateTime) -> DateTime {
    let (Some(start_tzid), Some(prop_tzid)) = (ctx.tzid_start.as_deref(), prop_tzid) else {
        return dt.clone();
    };
    if start_tzid == prop_tzid {
        return dt.clone();
    }
    let Some(start_zone) = tz::tz_from_tzid(start_tzid) else {
        return dt.clone();
    };
    tz::convert_to_zone(dt, start_zone).unwrap_or_else(|| dt.clone())
}

/// The master snapshot exceptions are diffed against: the event minus
/// recurrence bookkeeping and the keys exceptions never carry.
fn diffable_master(event: &Map<String, Json>) -> Map<String, Json> {
    let mut master = event.clone();
    for key in UNDIFFED_MASTER_KEYS {
        master.remove(key);
    }
    master
}

/// Writes `recurrenceOverrides` back: EXDATE for exclusions, RDATE for
/// extra occurrences, exception VEVENTs for patched instances.
pub fn overrides_to_ical(
    ctx: &mut Context,
    cal: &mut Component,
    comp: &mut Component,
    overrides: &Json,
    options: &crate::Options,
) {
    comp.remove_properties("RDATE");
    comp.remove_properties("EXDATE");

    // Move existing exception VEVENTs into a cache keyed by their
    // LocalDateTime recurrence id.
    let mut cache: Vec<(String, Component)> = Vec::new();
    let mut kept: Vec<Component> = Vec::new();
    for child in cal.children.drain(..) {
        if child.kind != Some(ComponentKind::Event) {
            kept.push(child);
            continue;
        }
        let recurid = child
            .get_property("RECURRENCE-ID")
            .and_then(|p| p.as_datetime().cloned());
        match recurid {
            Some(rid) => cache.push((localdate::localdate_from_datetime(&rid), child)),
            None => kept.push(child),
        }
    }
    cal.children = kept;

    let Json::Object(overrides) = overrides else {
        return;
    };

    // Snapshot the master before touching exceptions, so every patch
    // applies against the same baseline.
    let master = event::event_from_ical(&mut Context::read(None), cal, comp);
    let Json::Object(mut master) = master else {
        ctx.fatal = Some(ErrorKind::Unknown);
        return;
    };
    master.remove("recurrenceRule");
    master.remove("recurrenceOverrides");
    let master = Json::Object(master);

    for (id, override_patch) in overrides {
        ctx.begin_prop_key("recurrenceOverrides", id);

        let Some(start) = localdate::localdate_to_datetime(id, ctx.tz_start, ctx.is_all_day)
        else {
            ctx.invalid_prop(None);
            ctx.end_prop();
            continue;
        };
        let Json::Object(override_patch) = override_patch else {
            ctx.invalid_prop(None);
            ctx.end_prop();
            continue;
        };

        let is_date = ctx.is_all_day && ctx.tz_start.is_none();
        if let Some(excluded) = override_patch.get("excluded") {
            if override_patch.len() == 1 && excluded == &Json::Bool(true) {
                time::dtprop_to_ical(comp, "EXDATE", &start, ctx.tz_start, is_date, false);
            } else {
                ctx.invalid_prop(None);
            }
        } else if override_patch.is_empty() {
            time::dtprop_to_ical(comp, "RDATE", &start, ctx.tz_start, is_date, false);
        } else if patch_has_forbidden_key(override_patch) {
            // Ignored silently, per the JMAP patch contract.
        } else {
            let mut override_patch = override_patch.clone();
            if !override_patch.contains_key("start") {
                override_patch.insert("start".to_string(), json!(id));
            }

            let Some(ex) = patch::apply(&master, &Json::Object(override_patch)) else {
                ctx.invalid_prop(None);
                ctx.end_prop();
                continue;
            };

            let mut excomp = match cache.iter().position(|(key, _)| key == id) {
                Some(pos) => cache.swap_remove(pos).1,
                None => {
                    let mut cloned = comp.clone();
                    cloned.remove_properties("RRULE");
                    cloned.remove_properties("RDATE");
                    cloned.remove_properties("EXDATE");
                    cloned
                }
            };
            time::dtprop_to_ical(
                &mut excomp,
                "RECURRENCE-ID",
                &start,
                ctx.tz_start,
                is_date,
                true,
            );

            let mut exc_ctx = Context::write();
            exc_ctx.is_exception = true;
            exc_ctx.uid = ctx.uid.clone();
            event::event_to_ical(&mut exc_ctx, cal, &mut excomp, &ex, options);
            if exc_ctx.has_invalid() {
                ctx.invalid_prop_append(&exc_ctx.invalid_props());
            }
            if exc_ctx.fatal.is_some() {
                ctx.fatal = exc_ctx.fatal;
            }

            cal.add_child(excomp);
        }

        ctx.end_prop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn forbidden_keys_match_first_segment() {
        let patch = json!({"replyTo/imip": "mailto:x@x"});
        assert!(patch_has_forbidden_key(patch.as_object().unwrap()));
        let patch = json!({"title": "changed"});
        assert!(!patch_has_forbidden_key(patch.as_object().unwrap()));
    }

    #[test]
    fn diffable_master_drops_suppressed_keys() {
        let event = json!({
            "uid": "u",
            "title": "t",
            "recurrenceRule": {"frequency": "daily"},
            "created": "2022-01-01T00:00:00Z",
        });
        let master = diffable_master(event.as_object().unwrap());
        assert!(master.contains_key("title"));
        assert!(!master.contains_key("uid"));
        assert!(!master.contains_key("recurrenceRule"));
        assert!(!master.contains_key("created"));
    }
}
