//! Typed value parsers for iCalendar (RFC 5545 §3.3).

use super::error::{ParseError, ParseErrorKind, ParseResult};
use crate::core::{
    Date, DateTime, DateTimeForm, Duration, Frequency, MonthNum, Period, RRule, RRuleUntil, Skip,
    Time, Trigger, UtcOffset, Weekday, WeekdayNum,
};

/// Parses a DATE value: `YYYYMMDD`.
///
/// ## Errors
/// Returns an error if the string is not a valid 8-digit date.
pub fn parse_date(s: &str, line: usize, col: usize) -> ParseResult<Date> {
    let err = || ParseError::new(ParseErrorKind::InvalidDate, line, col);
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }

    let year = s[0..4].parse::<i32>().map_err(|_| err())?;
    let month = s[4..6].parse::<u8>().map_err(|_| err())?;
    let day = s[6..8].parse::<u8>().map_err(|_| err())?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(err());
    }

    Ok(Date { year, month, day })
}

/// Parses a TIME value: `HHMMSS[Z]`.
///
/// ## Errors
/// Returns an error if the string is not a valid 6-digit time.
pub fn parse_time(s: &str, line: usize, col: usize) -> ParseResult<Time> {
    let err = || ParseError::new(ParseErrorKind::InvalidTime, line, col);
    let (time, is_utc) = match s.strip_suffix('Z') {
        Some(stripped) => (stripped, true),
        None => (s, false),
    };

    if time.len() != 6 || !time.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }

    let hour = time[0..2].parse::<u8>().map_err(|_| err())?;
    let minute = time[2..4].parse::<u8>().map_err(|_| err())?;
    let second = time[4..6].parse::<u8>().map_err(|_| err())?;

    // Allow 60 for leap seconds.
    if hour > 23 || minute > 59 || second > 60 {
        return Err(err());
    }

    Ok(Time {
        hour,
        minute,
        second,
        is_utc,
    })
}

/// Parses a DATE-TIME value: `YYYYMMDD"T"HHMMSS[Z]`.
///
/// The TZID comes from the property parameter, not the value text.
///
/// ## Errors
/// Returns an error if the string is not a valid date-time.
pub fn parse_datetime(
    s: &str,
    tzid: Option<&str>,
    line: usize,
    col: usize,
) -> ParseResult<DateTime> {
    let t_pos = s
        .find('T')
        .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidDateTime, line, col))?;

    let date = parse_date(&s[..t_pos], line, col)?;
    let time = parse_time(&s[t_pos + 1..], line, col + t_pos + 1)?;

    let form = if time.is_utc {
        DateTimeForm::Utc
    } else if let Some(tz) = tzid {
        DateTimeForm::Zoned {
            tzid: tz.to_string(),
        }
    } else {
        DateTimeForm::Floating
    };

    Ok(DateTime {
        year: date.year,
        month: date.month,
        day: date.day,
        hour: time.hour,
        minute: time.minute,
        second: time.second,
        form,
    })
}

/// Parses a DURATION value: `[+|-]P[nW]` or `[+|-]P[nD][T[nH][nM][nS]]`.
///
/// ## Errors
/// Returns an error if the string is not a valid duration.
pub fn parse_duration(s: &str, line: usize, col: usize) -> ParseResult<Duration> {
    let err = || ParseError::new(ParseErrorKind::InvalidDuration, line, col);

    let (rest, negative) = match s.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (s.strip_prefix('+').unwrap_or(s), false),
    };
    let rest = rest.strip_prefix('P').ok_or_else(err)?;
    if rest.is_empty() {
        return Err(err());
    }

    let mut dur = Duration {
        negative,
        ..Duration::zero()
    };

    let mut in_time = false;
    let mut num = String::new();
    let mut saw_component = false;
    for c in rest.chars() {
        match c {
            '0'..='9' => num.push(c),
            'T' | 't' if num.is_empty() => in_time = true,
            'W' | 'w' | 'D' | 'd' | 'H' | 'h' | 'M' | 'm' | 'S' | 's' => {
                let val: u32 = num.parse().map_err(|_| err())?;
                num.clear();
                saw_component = true;
                match c.to_ascii_uppercase() {
                    'W' if !in_time => dur.weeks = val,
                    'D' if !in_time => dur.days = val,
                    'H' if in_time => dur.hours = val,
                    'M' if in_time => dur.minutes = val,
                    'S' if in_time => dur.seconds = val,
                    _ => return Err(err()),
                }
            }
            _ => return Err(err()),
        }
    }
    if !num.is_empty() || !saw_component {
        return Err(err());
    }

    Ok(dur)
}

/// Parses a PERIOD value: `start "/" (end | duration)`.
///
/// ## Errors
/// Returns an error if the string is not a valid period.
pub fn parse_period(s: &str, tzid: Option<&str>, line: usize, col: usize) -> ParseResult<Period> {
    let slash = s
        .find('/')
        .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidPeriod, line, col))?;

    let start = parse_datetime(&s[..slash], tzid, line, col)?;
    let end_str = &s[slash + 1..];

    if end_str.starts_with(['P', '+', '-']) {
        let duration = parse_duration(end_str, line, col + slash + 1)?;
        Ok(Period::Duration { start, duration })
    } else {
        let end = parse_datetime(end_str, tzid, line, col + slash + 1)?;
        Ok(Period::Explicit { start, end })
    }
}

/// Parses a TRIGGER value: a duration, or an absolute date-time.
///
/// ## Errors
/// Returns an error if the string is neither.
pub fn parse_trigger(s: &str, line: usize, col: usize) -> ParseResult<Trigger> {
    if s.starts_with(['P', 'p', '+', '-']) {
        Ok(Trigger::Duration(parse_duration(s, line, col)?))
    } else {
        Ok(Trigger::DateTime(parse_datetime(s, None, line, col)?))
    }
}

/// Parses a RECUR value (RFC 5545 §3.3.10, RFC 7529).
///
/// Unknown rule parts are ignored.
///
/// ## Errors
/// Returns an error if a recognized rule part is malformed.
pub fn parse_rrule(s: &str, line: usize, col: usize) -> ParseResult<RRule> {
    let mut rule = RRule::new();

    for part in s.split(';') {
        if part.is_empty() {
            continue;
        }
        let eq = part
            .find('=')
            .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidRRule, line, col))?;
        parse_rrule_part(&mut rule, &part[..eq], &part[eq + 1..], line, col)?;
    }

    Ok(rule)
}

fn parse_rrule_part(
    rule: &mut RRule,
    key: &str,
    value: &str,
    line: usize,
    col: usize,
) -> ParseResult<()> {
    let err = |kind| ParseError::new(kind, line, col);
    match key.to_ascii_uppercase().as_str() {
        "FREQ" => {
            rule.freq =
                Some(Frequency::parse(value).ok_or_else(|| err(ParseErrorKind::InvalidFrequency))?);
        }
        "INTERVAL" => {
            rule.interval = Some(
                value
                    .parse()
                    .map_err(|_| err(ParseErrorKind::InvalidRRule))?,
            );
        }
        "RSCALE" => rule.rscale = Some(value.to_ascii_uppercase()),
        "SKIP" => {
            rule.skip = Some(Skip::parse(value).ok_or_else(|| err(ParseErrorKind::InvalidRRule))?);
        }
        "COUNT" => {
            if rule.until.is_some() {
                return Err(err(ParseErrorKind::UntilCountConflict));
            }
            rule.count = Some(
                value
                    .parse()
                    .map_err(|_| err(ParseErrorKind::InvalidRRule))?,
            );
        }
        "UNTIL" => {
            if rule.count.is_some() {
                return Err(err(ParseErrorKind::UntilCountConflict));
            }
            rule.until = Some(if value.contains('T') {
                RRuleUntil::DateTime(parse_datetime(value, None, line, col)?)
            } else {
                RRuleUntil::Date(parse_date(value, line, col)?)
            });
        }
        "WKST" => {
            rule.wkst =
                Some(Weekday::parse(value).ok_or_else(|| err(ParseErrorKind::InvalidWeekday))?);
        }
        "BYSECOND" => rule.by_second = parse_num_list(value, line, col)?,
        "BYMINUTE" => rule.by_minute = parse_num_list(value, line, col)?,
        "BYHOUR" => rule.by_hour = parse_num_list(value, line, col)?,
        "BYDAY" => {
            rule.by_day = value
                .split(',')
                .map(|v| parse_weekday_num(v.trim(), line, col))
                .collect::<ParseResult<_>>()?;
        }
        "BYMONTHDAY" => rule.by_monthday = parse_num_list(value, line, col)?,
        "BYYEARDAY" => rule.by_yearday = parse_num_list(value, line, col)?,
        "BYWEEKNO" => rule.by_weekno = parse_num_list(value, line, col)?,
        "BYMONTH" => {
            rule.by_month = value
                .split(',')
                .map(|v| {
                    MonthNum::parse(v.trim())
                        .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidRRule, line, col))
                })
                .collect::<ParseResult<_>>()?;
        }
        "BYSETPOS" => rule.by_setpos = parse_num_list(value, line, col)?,
        _ => {}
    }
    Ok(())
}

fn parse_num_list<T: std::str::FromStr>(s: &str, line: usize, col: usize) -> ParseResult<Vec<T>> {
    s.split(',')
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| ParseError::new(ParseErrorKind::InvalidRRule, line, col))
        })
        .collect()
}

/// Parses a BYDAY entry: `MO`, `1MO`, `-1FR`.
fn parse_weekday_num(s: &str, line: usize, col: usize) -> ParseResult<WeekdayNum> {
    if s.len() < 2 {
        return Err(ParseError::new(ParseErrorKind::InvalidWeekday, line, col));
    }

    let weekday = Weekday::parse(&s[s.len() - 2..])
        .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidWeekday, line, col))?;

    let ordinal_str = &s[..s.len() - 2];
    let ordinal = if ordinal_str.is_empty() {
        None
    } else {
        Some(
            ordinal_str
                .parse()
                .map_err(|_| ParseError::new(ParseErrorKind::InvalidRRule, line, col))?,
        )
    };

    Ok(WeekdayNum { ordinal, weekday })
}

/// Parses a UTC-OFFSET value: `(+|-)HHMM[SS]`.
///
/// ## Errors
/// Returns an error if the string is not a valid offset.
pub fn parse_utc_offset(s: &str, line: usize, col: usize) -> ParseResult<UtcOffset> {
    let err = || ParseError::new(ParseErrorKind::InvalidUtcOffset, line, col);
    if s.len() < 5 {
        return Err(err());
    }

    let sign = match s.as_bytes()[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return Err(err()),
    };

    let hours = s[1..3].parse::<i32>().map_err(|_| err())?;
    let minutes = s[3..5].parse::<i32>().map_err(|_| err())?;
    let seconds = if s.len() >= 7 {
        s[5..7].parse::<i32>().map_err(|_| err())?
    } else {
        0
    };

    Ok(UtcOffset::from_seconds(
        sign * (hours * 3600 + minutes * 60 + seconds),
    ))
}

/// Parses a BOOLEAN value.
///
/// ## Errors
/// Returns an error unless the string is TRUE or FALSE.
pub fn parse_boolean(s: &str, line: usize, col: usize) -> ParseResult<bool> {
    match s.to_ascii_uppercase().as_str() {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        _ => Err(ParseError::new(ParseErrorKind::InvalidBoolean, line, col)),
    }
}

/// Parses an INTEGER value.
///
/// ## Errors
/// Returns an error if the string is not an integer.
pub fn parse_integer(s: &str, line: usize, col: usize) -> ParseResult<i32> {
    s.parse()
        .map_err(|_| ParseError::new(ParseErrorKind::InvalidInteger, line, col))
}

/// Parses a FLOAT value.
///
/// ## Errors
/// Returns an error if the string is not a float.
pub fn parse_float(s: &str, line: usize, col: usize) -> ParseResult<f64> {
    s.parse()
        .map_err(|_| ParseError::new(ParseErrorKind::InvalidFloat, line, col))
}

/// Unescapes a TEXT value (RFC 5545 §3.3.11).
#[must_use]
pub fn unescape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n' | 'N') => result.push('\n'),
                Some(',') => result.push(','),
                Some(';') => result.push(';'),
                Some('\\') | None => result.push('\\'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Splits a multi-valued property value on unescaped commas.
#[must_use]
pub fn split_value_list(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let bytes = s.as_bytes();
    let mut start = 0;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == b',' {
            parts.push(&s[start..i]);
            start = i + 1;
        }
    }
    parts.push(&s[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_basic() {
        let d = parse_date("20220307", 1, 1).unwrap();
        assert_eq!((d.year, d.month, d.day), (2022, 3, 7));
        assert!(parse_date("2022037", 1, 1).is_err());
        assert!(parse_date("20221307", 1, 1).is_err());
    }

    #[test]
    fn datetime_forms() {
        assert!(parse_datetime("20220101T090000Z", None, 1, 1).unwrap().is_utc());
        assert!(parse_datetime("20220101T090000", None, 1, 1)
            .unwrap()
            .is_floating());
        let dt = parse_datetime("20220101T090000", Some("Europe/Berlin"), 1, 1).unwrap();
        assert_eq!(dt.tzid(), Some("Europe/Berlin"));
    }

    #[test]
    fn duration_forms() {
        assert_eq!(parse_duration("P2W", 1, 1).unwrap().weeks, 2);
        let d = parse_duration("P1DT2H30M", 1, 1).unwrap();
        assert_eq!((d.days, d.hours, d.minutes), (1, 2, 30));
        let d = parse_duration("-PT15M", 1, 1).unwrap();
        assert!(d.negative);
        assert_eq!(d.minutes, 15);
        assert!(parse_duration("P", 1, 1).is_err());
        assert!(parse_duration("PT", 1, 1).is_err());
        assert!(parse_duration("1D", 1, 1).is_err());
    }

    #[test]
    fn period_forms() {
        match parse_period("20220101T090000Z/PT8H", None, 1, 1).unwrap() {
            Period::Duration { duration, .. } => assert_eq!(duration.hours, 8),
            Period::Explicit { .. } => panic!("expected duration period"),
        }
        match parse_period("20220101T090000Z/20220101T170000Z", None, 1, 1).unwrap() {
            Period::Explicit { end, .. } => assert_eq!(end.hour, 17),
            Period::Duration { .. } => panic!("expected explicit period"),
        }
    }

    #[test]
    fn trigger_forms() {
        match parse_trigger("-PT15M", 1, 1).unwrap() {
            Trigger::Duration(d) => assert!(d.negative),
            Trigger::DateTime(_) => panic!("expected duration trigger"),
        }
        match parse_trigger("20220101T101500Z", 1, 1).unwrap() {
            Trigger::DateTime(dt) => assert!(dt.is_utc()),
            Trigger::Duration(_) => panic!("expected datetime trigger"),
        }
    }

    #[test]
    fn rrule_basic() {
        let r = parse_rrule("FREQ=DAILY;COUNT=5", 1, 1).unwrap();
        assert_eq!(r.freq, Some(Frequency::Daily));
        assert_eq!(r.count, Some(5));
    }

    #[test]
    fn rrule_rscale() {
        let r = parse_rrule("FREQ=YEARLY;RSCALE=CHINESE;SKIP=FORWARD;BYMONTH=3L", 1, 1).unwrap();
        assert_eq!(r.rscale.as_deref(), Some("CHINESE"));
        assert_eq!(r.skip, Some(Skip::Forward));
        assert!(r.by_month[0].leap);
    }

    #[test]
    fn rrule_until_count_conflict() {
        assert!(parse_rrule("FREQ=DAILY;COUNT=10;UNTIL=20220131", 1, 1).is_err());
    }

    #[test]
    fn rrule_byday_ordinals() {
        let r = parse_rrule("FREQ=MONTHLY;BYDAY=-1FR,2MO", 1, 1).unwrap();
        assert_eq!(r.by_day[0].ordinal, Some(-1));
        assert_eq!(r.by_day[1].ordinal, Some(2));
    }

    #[test]
    fn unescape() {
        assert_eq!(unescape_text("a\\, b\\nc\\\\d"), "a, b\nc\\d");
    }

    #[test]
    fn value_list_split() {
        assert_eq!(split_value_list("a,b"), vec!["a", "b"]);
        assert_eq!(split_value_list("a\\,b,c"), vec!["a\\,b", "c"]);
    }

    #[test]
    fn utc_offset() {
        assert_eq!(parse_utc_offset("+0530", 1, 1).unwrap().as_seconds(), 19800);
        assert_eq!(parse_utc_offset("-0800", 1, 1).unwrap().as_seconds(), -28800);
    }
}
