//! iCalendar (RFC 5545) support for the jmapical translator.
//!
//! This crate owns the component/property/parameter tree, typed value
//! parsing (date-time, duration, period, recurrence, trigger) and
//! stringification. The semantic JSCalendar translator in the `jmapical`
//! crate never touches wire text; it only reads and builds these trees.

pub mod build;
pub mod core;
pub mod parse;
pub mod tz;
