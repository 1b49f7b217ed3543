//! iCalendar properties and content lines (RFC 5545 §3.1, §3.8).

use super::{DateTime, Duration, Parameter, RRule, Trigger, Value};
use super::value::Date;

/// A raw content line, before value type resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    /// Property name, normalized to uppercase.
    pub name: String,
    /// Parameters in order of appearance.
    pub params: Vec<Parameter>,
    /// Raw value text (unfolded, not unescaped).
    pub raw_value: String,
}

impl ContentLine {
    /// Creates a content line.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            params: Vec::new(),
            raw_value: value.into(),
        }
    }

    /// Returns the first parameter with the given name.
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&Parameter> {
        let upper = name.to_ascii_uppercase();
        self.params.iter().find(|p| p.name == upper)
    }

    /// Returns the value of a parameter.
    #[must_use]
    pub fn get_param_value(&self, name: &str) -> Option<&str> {
        self.get_param(name)?.value()
    }

    /// Returns the VALUE parameter, if present.
    #[must_use]
    pub fn value_type(&self) -> Option<&str> {
        self.get_param_value("VALUE")
    }

    /// Returns the TZID parameter, if present.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        self.get_param_value("TZID")
    }
}

/// A fully parsed property: typed value plus the original raw text for
/// round-trip fidelity.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Property name, normalized to uppercase.
    pub name: String,
    /// Parameters in order of appearance.
    pub params: Vec<Parameter>,
    /// Parsed value.
    pub value: Value,
    /// Original raw value text.
    pub raw_value: String,
}

impl Property {
    /// Creates a property with a text value.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            name: name.into().to_ascii_uppercase(),
            params: Vec::new(),
            value: Value::Text(value.clone()),
            raw_value: value,
        }
    }

    /// Creates a property with an integer value.
    #[must_use]
    pub fn integer(name: impl Into<String>, value: i32) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            params: Vec::new(),
            value: Value::Integer(value),
            raw_value: value.to_string(),
        }
    }

    /// Creates a property with a URI value.
    #[must_use]
    pub fn uri(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            name: name.into().to_ascii_uppercase(),
            params: Vec::new(),
            value: Value::Uri(value.clone()),
            raw_value: value,
        }
    }

    /// Creates a property with a CAL-ADDRESS value (ORGANIZER, ATTENDEE).
    #[must_use]
    pub fn cal_address(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            name: name.into().to_ascii_uppercase(),
            params: Vec::new(),
            value: Value::CalAddress(value.clone()),
            raw_value: value,
        }
    }

    /// Creates a property with a date-time value. The TZID parameter, if
    /// any, is the caller's responsibility.
    #[must_use]
    pub fn datetime(name: impl Into<String>, dt: DateTime) -> Self {
        let raw = dt.to_string();
        Self {
            name: name.into().to_ascii_uppercase(),
            params: Vec::new(),
            value: Value::DateTime(dt),
            raw_value: raw,
        }
    }

    /// Creates a property with a date value, tagged `VALUE=DATE`.
    #[must_use]
    pub fn date(name: impl Into<String>, d: Date) -> Self {
        let raw = d.to_string();
        Self {
            name: name.into().to_ascii_uppercase(),
            params: vec![Parameter::value_type("DATE")],
            value: Value::Date(d),
            raw_value: raw,
        }
    }

    /// Creates a property with a duration value.
    #[must_use]
    pub fn duration(name: impl Into<String>, d: Duration) -> Self {
        let raw = d.to_string();
        Self {
            name: name.into().to_ascii_uppercase(),
            params: Vec::new(),
            value: Value::Duration(d),
            raw_value: raw,
        }
    }

    /// Creates a property with a recurrence-rule value.
    #[must_use]
    pub fn recur(name: impl Into<String>, rule: RRule) -> Self {
        let raw = rule.to_string();
        Self {
            name: name.into().to_ascii_uppercase(),
            params: Vec::new(),
            value: Value::Recur(Box::new(rule)),
            raw_value: raw,
        }
    }

    /// Creates a property with a trigger value.
    #[must_use]
    pub fn trigger(t: Trigger) -> Self {
        let raw = t.to_string();
        let mut params = Vec::new();
        if matches!(t, Trigger::DateTime(_)) {
            params.push(Parameter::value_type("DATE-TIME"));
        }
        Self {
            name: "TRIGGER".to_string(),
            params,
            value: Value::Trigger(t),
            raw_value: raw,
        }
    }

    /// Returns the first parameter with the given name.
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&Parameter> {
        let upper = name.to_ascii_uppercase();
        self.params.iter().find(|p| p.name == upper)
    }

    /// Returns the value of a parameter.
    #[must_use]
    pub fn get_param_value(&self, name: &str) -> Option<&str> {
        self.get_param(name)?.value()
    }

    /// Returns every parameter with the given name.
    pub fn params_named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Parameter> {
        let upper = name.to_ascii_uppercase();
        self.params.iter().filter(move |p| p.name == upper)
    }

    /// Returns every value of every parameter with the given name.
    ///
    /// Multi-valued parameters (DELEGATED-TO, MEMBER) and repeated
    /// X-parameters both flatten into one list.
    #[must_use]
    pub fn param_values(&self, name: &str) -> Vec<&str> {
        self.params_named(name)
            .flat_map(|p| p.values.iter().map(String::as_str))
            .collect()
    }

    /// Appends a parameter.
    pub fn add_param(&mut self, param: Parameter) {
        self.params.push(param);
    }

    /// Sets a parameter, replacing any parameter with the same name.
    pub fn set_param(&mut self, param: Parameter) {
        self.params.retain(|p| p.name != param.name);
        self.params.push(param);
    }

    /// Removes every parameter with the given name.
    pub fn remove_param(&mut self, name: &str) {
        let upper = name.to_ascii_uppercase();
        self.params.retain(|p| p.name != upper);
    }

    /// Returns the value as text if this is a text property.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        self.value.as_text()
    }

    /// Returns the value as an integer.
    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        self.value.as_integer()
    }

    /// Returns the value as a date-time.
    #[must_use]
    pub fn as_datetime(&self) -> Option<&DateTime> {
        self.value.as_datetime()
    }

    /// Returns the value as a date.
    #[must_use]
    pub fn as_date(&self) -> Option<&Date> {
        self.value.as_date()
    }

    /// Returns the value as a duration.
    #[must_use]
    pub fn as_duration(&self) -> Option<&Duration> {
        self.value.as_duration()
    }

    /// Returns the value as a trigger.
    #[must_use]
    pub fn as_trigger(&self) -> Option<&Trigger> {
        self.value.as_trigger()
    }

    /// Returns the value as a URI or CAL-ADDRESS string.
    #[must_use]
    pub fn as_uri(&self) -> Option<&str> {
        self.value.as_uri()
    }

    /// Returns the wire text of the value.
    #[must_use]
    pub fn value_as_string(&self) -> &str {
        &self.raw_value
    }
}

/// Property names used by the translator.
pub mod names {
    // Calendar properties
    pub const CALSCALE: &str = "CALSCALE";
    pub const METHOD: &str = "METHOD";
    pub const PRODID: &str = "PRODID";
    pub const VERSION: &str = "VERSION";

    // Descriptive properties
    pub const ATTACH: &str = "ATTACH";
    pub const CATEGORIES: &str = "CATEGORIES";
    pub const CLASS: &str = "CLASS";
    pub const COLOR: &str = "COLOR";
    pub const CONFERENCE: &str = "CONFERENCE";
    pub const DESCRIPTION: &str = "DESCRIPTION";
    pub const GEO: &str = "GEO";
    pub const LOCATION: &str = "LOCATION";
    pub const PRIORITY: &str = "PRIORITY";
    pub const STATUS: &str = "STATUS";
    pub const SUMMARY: &str = "SUMMARY";
    pub const TRANSP: &str = "TRANSP";

    // Date and time properties
    pub const DTEND: &str = "DTEND";
    pub const DTSTART: &str = "DTSTART";
    pub const DURATION: &str = "DURATION";

    // Relationship properties
    pub const ATTENDEE: &str = "ATTENDEE";
    pub const ORGANIZER: &str = "ORGANIZER";
    pub const RECURRENCE_ID: &str = "RECURRENCE-ID";
    pub const RELATED_TO: &str = "RELATED-TO";
    pub const UID: &str = "UID";
    pub const URL: &str = "URL";

    // Recurrence properties
    pub const EXDATE: &str = "EXDATE";
    pub const RDATE: &str = "RDATE";
    pub const RRULE: &str = "RRULE";

    // Alarm properties
    pub const ACKNOWLEDGED: &str = "ACKNOWLEDGED";
    pub const ACTION: &str = "ACTION";
    pub const TRIGGER: &str = "TRIGGER";

    // Change management properties
    pub const CREATED: &str = "CREATED";
    pub const DTSTAMP: &str = "DTSTAMP";
    pub const SEQUENCE: &str = "SEQUENCE";
}
