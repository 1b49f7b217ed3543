//! Bidirectional translator between JSCalendar events (`@type:
//! "jsevent"`, JMAP Calendars data model) and iCalendar VEVENTs.
//!
//! The two entry points are [`to_jmap`] / [`to_jmap_all`] (iCalendar →
//! JSCalendar) and [`to_ical`] (JSCalendar → iCalendar). JSCalendar
//! events are plain `serde_json` values; iCalendar documents are
//! [`jmapical_rfc`] trees. Round-trip fidelity for JSCalendar-only
//! state rides on `X-JMAP-*` parameters.

pub use jmapical_rfc as rfc;

mod alerts;
mod context;
mod error;
mod event;
mod links;
mod localdate;
mod locations;
mod overrides;
mod participants;
mod patch;
mod recurrence;
mod time;
mod util;

use std::collections::HashSet;

use jmapical_rfc::core::{Component, ICalendar};
use jmapical_rfc::tz;
use serde_json::Value as Json;

use context::Context;

pub use error::{strerror, ConversionError, ErrorKind};

/// A JSCalendar event object.
pub type JsEvent = serde_json::Value;

/// Translation options.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Options {
    /// PRODID written when the event carries none.
    pub prod_id: String,
    /// Calendar user address for the ATTENDEE of email alerts, either
    /// a mail address or a full mailto: URI.
    pub calendar_user_address: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            prod_id: "-//jmapical//jmapical 0.1//EN".to_string(),
            calendar_user_address: None,
        }
    }
}

/// Converts the first main VEVENT of a calendar to a JSCalendar event.
///
/// Returns `Ok(None)` when the calendar has no main events.
///
/// ## Errors
/// Returns a [`ConversionError`] on fatal translation failure.
#[tracing::instrument(skip_all)]
pub fn to_jmap(
    ical: &ICalendar,
    wantprops: Option<&[&str]>,
) -> Result<Option<JsEvent>, ConversionError> {
    let mut events = to_jmap_all(ical, wantprops)?;
    if events.is_empty() {
        Ok(None)
    } else {
        Ok(Some(events.swap_remove(0)))
    }
}

/// Converts every main VEVENT of a calendar to a JSCalendar event.
///
/// A main event has a UID and no RECURRENCE-ID. A document whose single
/// VEVENT lacks a UID gets that event promoted anyway.
///
/// ## Errors
/// Returns a [`ConversionError`] on fatal translation failure.
#[tracing::instrument(skip_all)]
pub fn to_jmap_all(
    ical: &ICalendar,
    wantprops: Option<&[&str]>,
) -> Result<Vec<JsEvent>, ConversionError> {
    let all = ical.events();
    let mut todo: Vec<&Component> = all
        .iter()
        .copied()
        .filter(|c| c.uid().is_some() && c.get_property("RECURRENCE-ID").is_none())
        .collect();
    if todo.is_empty() && all.len() == 1 && all[0].uid().is_none() {
        todo.push(all[0]);
    }

    let wantprops: Option<HashSet<String>> =
        wantprops.map(|w| w.iter().map(|s| (*s).to_string()).collect());

    let mut events = Vec::with_capacity(todo.len());
    for comp in todo {
        let mut ctx = Context::read(wantprops.clone());
        let event = event::event_from_ical(&mut ctx, &ical.root, comp);
        if let Some(kind) = ctx.fatal {
            return Err(fatal_error(kind));
        }
        events.push(event);
    }

    tracing::debug!(count = events.len(), "converted events to JSCalendar");
    Ok(events)
}

/// Converts a JSCalendar event to a fresh iCalendar document with
/// default [`Options`].
///
/// ## Errors
/// Returns [`ConversionError::Uid`] when `uid` is missing or empty, and
/// [`ConversionError::Props`] with every offending JSON-Pointer path
/// when properties violate the event contract.
pub fn to_ical(event: &JsEvent) -> Result<ICalendar, ConversionError> {
    to_ical_with(event, &Options::default())
}

/// Converts a JSCalendar event to a fresh iCalendar document.
///
/// The document carries `VERSION:2.0` and `CALSCALE:GREGORIAN`, the
/// event a fresh DTSTAMP/CREATED and `SEQUENCE:0`; required VTIMEZONE
/// components are appended.
///
/// ## Errors
/// See [`to_ical`].
#[tracing::instrument(skip_all)]
pub fn to_ical_with(event: &JsEvent, options: &Options) -> Result<ICalendar, ConversionError> {
    let uid = event
        .get("uid")
        .and_then(Json::as_str)
        .filter(|uid| !uid.is_empty());
    let Some(uid) = uid else {
        return Err(ConversionError::Uid);
    };

    let mut ical = ICalendar::new(&options.prod_id);
    let mut comp = Component::event();

    let mut ctx = Context::write();
    ctx.uid = Some(uid.to_string());
    event::event_to_ical(&mut ctx, &mut ical.root, &mut comp, event, options);

    if ctx.has_invalid() {
        return Err(ConversionError::Props(ctx.invalid_props()));
    }
    if let Some(kind) = ctx.fatal {
        return Err(fatal_error(kind));
    }

    ical.add_event(comp);
    tz::add_required_timezones(&mut ical);

    tracing::debug!(uid, "converted JSCalendar event to iCalendar");
    Ok(ical)
}

fn fatal_error(kind: ErrorKind) -> ConversionError {
    match kind {
        ErrorKind::Ical => ConversionError::Ical,
        ErrorKind::Uid => ConversionError::Uid,
        ErrorKind::Props => ConversionError::Props(Vec::new()),
        _ => ConversionError::Unknown,
    }
}
