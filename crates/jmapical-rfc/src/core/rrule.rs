//! iCalendar RECUR value type (RFC 5545 §3.3.10, RFC 7529).

use std::fmt;

use super::{Date, DateTime};

/// Recurrence frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Returns the wire string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Secondly => "SECONDLY",
            Self::Minutely => "MINUTELY",
            Self::Hourly => "HOURLY",
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }

    /// Parses a frequency (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "SECONDLY" => Self::Secondly,
            "MINUTELY" => Self::Minutely,
            "HOURLY" => Self::Hourly,
            "DAILY" => Self::Daily,
            "WEEKLY" => Self::Weekly,
            "MONTHLY" => Self::Monthly,
            "YEARLY" => Self::Yearly,
            _ => return None,
        })
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// Returns the two-letter abbreviation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sunday => "SU",
            Self::Monday => "MO",
            Self::Tuesday => "TU",
            Self::Wednesday => "WE",
            Self::Thursday => "TH",
            Self::Friday => "FR",
            Self::Saturday => "SA",
        }
    }

    /// Parses a two-letter weekday abbreviation (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "SU" => Self::Sunday,
            "MO" => Self::Monday,
            "TU" => Self::Tuesday,
            "WE" => Self::Wednesday,
            "TH" => Self::Thursday,
            "FR" => Self::Friday,
            "SA" => Self::Saturday,
            _ => return None,
        })
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// BYDAY entry: a weekday with an optional occurrence ordinal
/// (`MO`, `1MO`, `-1FR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayNum {
    /// Occurrence within the period (-53..=53, never 0).
    pub ordinal: Option<i8>,
    /// The day of the week.
    pub weekday: Weekday,
}

impl WeekdayNum {
    /// Creates an entry without an ordinal.
    #[must_use]
    pub const fn every(weekday: Weekday) -> Self {
        Self {
            ordinal: None,
            weekday,
        }
    }
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.ordinal {
            write!(f, "{n:+}")?;
        }
        write!(f, "{}", self.weekday)
    }
}

/// BYMONTH entry with the RFC 7529 leap-month flag (`3` or `3L`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthNum {
    /// Month number (1-based; calendar scales may exceed 12).
    pub month: u8,
    /// Whether this names a leap month.
    pub leap: bool,
}

impl MonthNum {
    /// Creates a non-leap month entry.
    #[must_use]
    pub const fn new(month: u8) -> Self {
        Self { month, leap: false }
    }

    /// Parses a BYMONTH entry (`"3"`, `"3L"`).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let (num, leap) = match s.strip_suffix(['L', 'l']) {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        let month = num.parse::<u8>().ok()?;
        if month == 0 {
            return None;
        }
        Some(Self { month, leap })
    }
}

impl fmt::Display for MonthNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.month)?;
        if self.leap {
            write!(f, "L")?;
        }
        Ok(())
    }
}

/// SKIP behavior for non-existent dates (RFC 7529).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    Omit,
    Backward,
    Forward,
}

impl Skip {
    /// Returns the wire string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Omit => "OMIT",
            Self::Backward => "BACKWARD",
            Self::Forward => "FORWARD",
        }
    }

    /// Parses a skip mode (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "OMIT" => Self::Omit,
            "BACKWARD" => Self::Backward,
            "FORWARD" => Self::Forward,
            _ => return None,
        })
    }
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// UNTIL boundary: DATE or DATE-TIME, inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RRuleUntil {
    /// Date-only boundary.
    Date(Date),
    /// Date-time boundary (UTC on the wire when the start is zoned).
    DateTime(DateTime),
}

impl fmt::Display for RRuleUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{d}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
        }
    }
}

/// Recurrence rule (RFC 5545 §3.3.10 with the RFC 7529 extensions).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RRule {
    /// Recurrence frequency (required for a valid rule).
    pub freq: Option<Frequency>,
    /// Interval between occurrences (default 1).
    pub interval: Option<u32>,
    /// Calendar scale (RFC 7529 RSCALE), uppercase.
    pub rscale: Option<String>,
    /// Skip behavior for non-existent dates (RFC 7529).
    pub skip: Option<Skip>,
    /// End of the recurrence (exclusive with `count`).
    pub until: Option<RRuleUntil>,
    /// Number of occurrences (exclusive with `until`).
    pub count: Option<u32>,
    /// Week start day (default Monday).
    pub wkst: Option<Weekday>,
    /// BYSECOND list (0-60).
    pub by_second: Vec<u8>,
    /// BYMINUTE list (0-59).
    pub by_minute: Vec<u8>,
    /// BYHOUR list (0-23).
    pub by_hour: Vec<u8>,
    /// BYDAY list.
    pub by_day: Vec<WeekdayNum>,
    /// BYMONTHDAY list (-31..=31, never 0).
    pub by_monthday: Vec<i8>,
    /// BYYEARDAY list (-366..=366, never 0).
    pub by_yearday: Vec<i16>,
    /// BYWEEKNO list (-53..=53, never 0).
    pub by_weekno: Vec<i8>,
    /// BYMONTH list.
    pub by_month: Vec<MonthNum>,
    /// BYSETPOS list (-366..=366, never 0).
    pub by_setpos: Vec<i16>,
}

impl RRule {
    /// Creates an empty rule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn push_list<T: ToString>(parts: &mut Vec<String>, tag: &str, list: &[T]) {
    if !list.is_empty() {
        let s: Vec<_> = list.iter().map(ToString::to_string).collect();
        parts.push(format!("{tag}={}", s.join(",")));
    }
}

impl fmt::Display for RRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if let Some(freq) = self.freq {
            parts.push(format!("FREQ={freq}"));
        }
        if let Some(ref rscale) = self.rscale {
            parts.push(format!("RSCALE={rscale}"));
        }
        if let Some(skip) = self.skip {
            if skip != Skip::Omit {
                parts.push(format!("SKIP={skip}"));
            }
        }
        if let Some(interval) = self.interval {
            if interval != 1 {
                parts.push(format!("INTERVAL={interval}"));
            }
        }
        if let Some(ref until) = self.until {
            parts.push(format!("UNTIL={until}"));
        }
        if let Some(count) = self.count {
            parts.push(format!("COUNT={count}"));
        }
        if let Some(wkst) = self.wkst {
            parts.push(format!("WKST={wkst}"));
        }

        push_list(&mut parts, "BYSECOND", &self.by_second);
        push_list(&mut parts, "BYMINUTE", &self.by_minute);
        push_list(&mut parts, "BYHOUR", &self.by_hour);
        push_list(&mut parts, "BYDAY", &self.by_day);
        push_list(&mut parts, "BYMONTHDAY", &self.by_monthday);
        push_list(&mut parts, "BYYEARDAY", &self.by_yearday);
        push_list(&mut parts, "BYWEEKNO", &self.by_weekno);
        push_list(&mut parts, "BYMONTH", &self.by_month);
        push_list(&mut parts, "BYSETPOS", &self.by_setpos);

        write!(f, "{}", parts.join(";"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_basic() {
        let rule = RRule {
            freq: Some(Frequency::Daily),
            count: Some(5),
            ..RRule::default()
        };
        assert_eq!(rule.to_string(), "FREQ=DAILY;COUNT=5");
    }

    #[test]
    fn display_byday_ordinal() {
        let rule = RRule {
            freq: Some(Frequency::Monthly),
            by_day: vec![WeekdayNum {
                ordinal: Some(-1),
                weekday: Weekday::Friday,
            }],
            ..RRule::default()
        };
        assert_eq!(rule.to_string(), "FREQ=MONTHLY;BYDAY=-1FR");
    }

    #[test]
    fn display_rscale_skip() {
        let rule = RRule {
            freq: Some(Frequency::Yearly),
            rscale: Some("CHINESE".to_string()),
            skip: Some(Skip::Forward),
            by_month: vec![MonthNum { month: 3, leap: true }],
            ..RRule::default()
        };
        assert_eq!(rule.to_string(), "FREQ=YEARLY;RSCALE=CHINESE;SKIP=FORWARD;BYMONTH=3L");
    }

    #[test]
    fn month_num_parse() {
        assert_eq!(MonthNum::parse("3"), Some(MonthNum::new(3)));
        assert_eq!(
            MonthNum::parse("3L"),
            Some(MonthNum { month: 3, leap: true })
        );
        assert_eq!(MonthNum::parse("0"), None);
        assert_eq!(MonthNum::parse("x"), None);
    }

    #[test]
    fn interval_of_one_is_omitted() {
        let rule = RRule {
            freq: Some(Frequency::Weekly),
            interval: Some(1),
            ..RRule::default()
        };
        assert_eq!(rule.to_string(), "FREQ=WEEKLY");
    }
}
