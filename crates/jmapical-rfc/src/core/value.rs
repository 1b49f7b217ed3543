//! iCalendar DATE, PERIOD, TRIGGER and the property value enum
//! (RFC 5545 §3.3).

use std::fmt;

use super::{DateTime, Duration, RRule, Time, UtcOffset};

/// DATE value (RFC 5545 §3.3.4): a calendar date without time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Date {
    /// Year.
    pub year: i32,
    /// Month (1-12).
    pub month: u8,
    /// Day of month (1-31).
    pub day: u8,
}

impl Date {
    /// Creates a new date.
    #[must_use]
    pub const fn new(year: i32, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.year, self.month, self.day)
    }
}

/// PERIOD value (RFC 5545 §3.3.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Period {
    /// Explicit start and end instants.
    Explicit {
        /// Start of the period.
        start: DateTime,
        /// End of the period.
        end: DateTime,
    },
    /// Start instant plus a duration.
    Duration {
        /// Start of the period.
        start: DateTime,
        /// Length of the period.
        duration: Duration,
    },
}

impl Period {
    /// Returns the start of the period.
    #[must_use]
    pub const fn start(&self) -> &DateTime {
        match self {
            Self::Explicit { start, .. } | Self::Duration { start, .. } => start,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit { start, end } => write!(f, "{start}/{end}"),
            Self::Duration { start, duration } => write!(f, "{start}/{duration}"),
        }
    }
}

/// TRIGGER value for VALARM (RFC 5545 §3.8.6.3).
///
/// Either a duration relative to an anchor, or an absolute date-time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Relative trigger.
    Duration(Duration),
    /// Absolute trigger (UTC per RFC 5545).
    DateTime(DateTime),
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duration(d) => write!(f, "{d}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
        }
    }
}

/// Typed property values (RFC 5545 §3.3).
///
/// The raw wire string is kept separately on the property for round-trip
/// fidelity; this enum is what the translator works with.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// BINARY value, kept as the raw base64 text.
    Binary(String),
    /// BOOLEAN value.
    Boolean(bool),
    /// CAL-ADDRESS value (typically a mailto: URI).
    CalAddress(String),
    /// DATE value.
    Date(Date),
    /// Multi-valued DATE (RDATE/EXDATE;VALUE=DATE).
    DateList(Vec<Date>),
    /// DATE-TIME value.
    DateTime(DateTime),
    /// Multi-valued DATE-TIME (RDATE/EXDATE).
    DateTimeList(Vec<DateTime>),
    /// DURATION value.
    Duration(Duration),
    /// FLOAT value.
    Float(f64),
    /// INTEGER value.
    Integer(i32),
    /// PERIOD value.
    Period(Period),
    /// Multi-valued PERIOD (RDATE;VALUE=PERIOD).
    PeriodList(Vec<Period>),
    /// RECUR value.
    Recur(Box<RRule>),
    /// TEXT value (unescaped).
    Text(String),
    /// Multi-valued TEXT.
    TextList(Vec<String>),
    /// TIME value.
    Time(Time),
    /// TRIGGER value.
    Trigger(Trigger),
    /// URI value.
    Uri(String),
    /// UTC-OFFSET value.
    UtcOffset(UtcOffset),
    /// Unknown or unparseable value, preserved verbatim.
    Unknown(String),
}

impl Value {
    /// Returns the value as text, if it is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an integer, if it is an integer value.
    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as a date-time, if it is a date-time value.
    #[must_use]
    pub fn as_datetime(&self) -> Option<&DateTime> {
        match self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Returns the value as a date, if it is a date value.
    #[must_use]
    pub fn as_date(&self) -> Option<&Date> {
        match self {
            Self::Date(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the value as a duration, if it is a duration value.
    #[must_use]
    pub fn as_duration(&self) -> Option<&Duration> {
        match self {
            Self::Duration(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the value as a recurrence rule, if it is a recur value.
    #[must_use]
    pub fn as_recur(&self) -> Option<&RRule> {
        match self {
            Self::Recur(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the value as a trigger, if it is a trigger value.
    #[must_use]
    pub fn as_trigger(&self) -> Option<&Trigger> {
        match self {
            Self::Trigger(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the value as a URI or CAL-ADDRESS string.
    #[must_use]
    pub fn as_uri(&self) -> Option<&str> {
        match self {
            Self::Uri(s) | Self::CalAddress(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the date-times of a single- or multi-valued date(-time)
    /// property. Plain DATE values surface as floating midnights.
    #[must_use]
    pub fn datetimes(&self) -> Vec<DateTime> {
        match self {
            Self::DateTime(dt) => vec![dt.clone()],
            Self::DateTimeList(list) => list.clone(),
            Self::Date(d) => vec![DateTime::from_date(*d)],
            Self::DateList(list) => list.iter().copied().map(DateTime::from_date).collect(),
            _ => Vec::new(),
        }
    }

    /// Returns the periods of a PERIOD-valued property.
    #[must_use]
    pub fn periods(&self) -> Vec<Period> {
        match self {
            Self::Period(p) => vec![p.clone()],
            Self::PeriodList(list) => list.clone(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_display() {
        assert_eq!(Date::new(2022, 3, 7).to_string(), "20220307");
    }

    #[test]
    fn period_display() {
        let start = DateTime::utc(2022, 1, 1, 9, 0, 0);
        let p = Period::Duration {
            start: start.clone(),
            duration: Duration::from_seconds(8 * 3600),
        };
        assert_eq!(p.to_string(), "20220101T090000Z/PT8H");

        let p = Period::Explicit {
            start,
            end: DateTime::utc(2022, 1, 1, 17, 0, 0),
        };
        assert_eq!(p.to_string(), "20220101T090000Z/20220101T170000Z");
    }

    #[test]
    fn datetimes_unifies_dates() {
        let v = Value::DateList(vec![Date::new(2022, 1, 1), Date::new(2022, 1, 2)]);
        let dts = v.datetimes();
        assert_eq!(dts.len(), 2);
        assert_eq!(dts[0].to_string(), "20220101T000000");
    }
}
