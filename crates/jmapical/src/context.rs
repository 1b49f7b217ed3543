//! Per-conversion context: JSON-Pointer breadcrumbs, the
//! invalid-property accumulator, and translation state.
//!
//! The context is passed by mutable reference through every aspect
//! translator; there are no hidden thread-locals.

use std::collections::{BTreeMap, HashSet};

use chrono_tz::Tz;
use jmapical_rfc::core::Component;

use crate::error::ErrorKind;

/// Direction of the running conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// iCalendar to JSCalendar.
    Read,
    /// JSCalendar to iCalendar.
    Write,
}

/// State threaded through one event translation.
pub struct Context<'a> {
    /// Conversion direction.
    pub mode: Mode,
    /// Whether the current component is a recurrence exception.
    pub is_exception: bool,
    /// Top-level property filter (read side).
    pub wantprops: Option<HashSet<String>>,
    /// Master VEVENT when reading an exception.
    pub master: Option<&'a Component>,
    /// Olson TZID of the event start, if zoned.
    pub tzid_start: Option<String>,
    /// Whether the event is an all-day event.
    pub is_all_day: bool,
    /// The event uid.
    pub uid: Option<String>,
    /// Start timezone resolved on the write side.
    pub tz_start: Option<Tz>,
    /// End timezone resolved on the write side.
    pub tz_end: Option<Tz>,
    /// Whether the organizer's attendee record was collapsed into the
    /// ORGANIZER property on the write side.
    pub organizer_collapsed: bool,
    /// Fatal error, if any.
    pub fatal: Option<ErrorKind>,

    path: Vec<String>,
    invalid: BTreeMap<String, ()>,
}

impl<'a> Context<'a> {
    /// Creates a read-side context.
    #[must_use]
    pub fn read(wantprops: Option<HashSet<String>>) -> Self {
        Self::new(Mode::Read, wantprops)
    }

    /// Creates a write-side context.
    #[must_use]
    pub fn write() -> Self {
        Self::new(Mode::Write, None)
    }

    fn new(mode: Mode, wantprops: Option<HashSet<String>>) -> Self {
        Self {
            mode,
            is_exception: false,
            wantprops,
            master: None,
            tzid_start: None,
            is_all_day: false,
            uid: None,
            tz_start: None,
            tz_end: None,
            organizer_collapsed: false,
            fatal: None,
            path: Vec::new(),
            invalid: BTreeMap::new(),
        }
    }

    /// Returns whether the caller asked for a top-level property.
    ///
    /// Without a filter every property is wanted.
    #[must_use]
    pub fn want(&self, name: &str) -> bool {
        self.wantprops.as_ref().map_or(true, |w| w.contains(name))
    }

    /// Pushes a path segment.
    pub fn begin_prop(&mut self, name: &str) {
        self.path.push(encode_pointer(name));
    }

    /// Pushes a `name/key` path segment.
    pub fn begin_prop_key(&mut self, name: &str, key: &str) {
        self.path
            .push(format!("{}/{}", encode_pointer(name), encode_pointer(key)));
    }

    /// Pushes a `name/index` path segment.
    pub fn begin_prop_idx(&mut self, name: &str, idx: usize) {
        self.path.push(format!("{}/{idx}", encode_pointer(name)));
    }

    /// Pops the innermost path segment.
    ///
    /// ## Panics
    /// Panics if the path stack is empty; begin/end calls must pair up.
    pub fn end_prop(&mut self) {
        assert!(self.path.pop().is_some(), "unbalanced end_prop");
    }

    /// Records the current path, joined with `name` if given, as an
    /// invalid property.
    pub fn invalid_prop(&mut self, name: Option<&str>) {
        let mut segments: Vec<String> = self.path.clone();
        if let Some(name) = name {
            segments.push(encode_pointer(name));
        }
        if !segments.is_empty() {
            self.invalid.insert(segments.join("/"), ());
        }
    }

    /// Records paths produced by a nested conversion, prefixed with the
    /// current path.
    pub fn invalid_prop_append(&mut self, paths: &[String]) {
        let prefix = self.path.join("/");
        for path in paths {
            let full = if prefix.is_empty() {
                path.clone()
            } else {
                format!("{prefix}/{path}")
            };
            self.invalid.insert(full, ());
        }
    }

    /// Returns whether any property error was recorded.
    #[must_use]
    pub fn has_invalid(&self) -> bool {
        !self.invalid.is_empty()
    }

    /// Returns the number of recorded property errors.
    #[must_use]
    pub fn invalid_count(&self) -> usize {
        self.invalid.len()
    }

    /// Returns the recorded property paths, sorted.
    #[must_use]
    pub fn invalid_props(&self) -> Vec<String> {
        self.invalid.keys().cloned().collect()
    }
}

/// Encodes a JSON-Pointer segment: `~` as `~0` and `/` as `~1`.
fn encode_pointer(segment: &str) -> String {
    if segment.contains(['~', '/']) {
        segment.replace('~', "~0").replace('/', "~1")
    } else {
        segment.to_string()
    }
}
