//! iCalendar core models (RFC 5545).
//!
//! These types are designed for:
//! - Round-trip fidelity: unknown properties and parameters survive intact
//! - Deterministic serialization: canonical ordering, so hashed property
//!   text is stable across round-trips
//! - Type safety: the translator never parses wire strings itself

mod component;
mod datetime;
mod duration;
mod parameter;
mod property;
mod rrule;
mod value;

pub use component::{Component, ComponentKind, ICalendar};
pub use datetime::{DateTime, DateTimeForm, Time, UtcOffset};
pub use duration::Duration;
pub use parameter::Parameter;
pub use property::{ContentLine, Property};
pub use rrule::{Frequency, MonthNum, RRule, RRuleUntil, Skip, Weekday, WeekdayNum};
pub use value::{Date, Period, Trigger, Value};
