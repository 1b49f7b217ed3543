//! iCalendar document parser (RFC 5545).

use super::error::{ParseError, ParseErrorKind, ParseResult};
use super::lexer::{parse_content_line, split_lines};
use super::values::{
    parse_boolean, parse_date, parse_datetime, parse_duration, parse_float, parse_integer,
    parse_period, parse_rrule, parse_trigger, parse_utc_offset, split_value_list, unescape_text,
};
use crate::core::{Component, ComponentKind, ContentLine, ICalendar, Property, Value};

/// Parses an iCalendar document from a string.
///
/// Property values that cannot be parsed as their declared type are kept
/// as `Value::Unknown` rather than failing the whole document; the
/// structural grammar (content lines, BEGIN/END nesting) is strict.
///
/// ## Errors
/// Returns an error if the input is not structurally valid iCalendar.
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
pub fn parse(input: &str) -> ParseResult<ICalendar> {
    let lines = split_lines(input);
    if lines.is_empty() {
        return Err(ParseError::new(ParseErrorKind::MissingBegin, 1, 1));
    }

    tracing::trace!(count = lines.len(), "unfolded content lines");

    let content_lines: Vec<(usize, ContentLine)> = lines
        .into_iter()
        .map(|(line_num, line)| parse_content_line(&line, line_num).map(|cl| (line_num, cl)))
        .collect::<ParseResult<_>>()?;

    let mut iter = content_lines.into_iter().peekable();
    let root = parse_component(&mut iter)?;

    if root.kind != Some(ComponentKind::Calendar) {
        return Err(
            ParseError::new(ParseErrorKind::MissingBegin, 1, 1).with_context("expected VCALENDAR")
        );
    }

    tracing::debug!(events = root.events().len(), "parsed iCalendar document");

    Ok(ICalendar { root })
}

/// Parses one component, consuming from its BEGIN line to its END line.
fn parse_component(
    iter: &mut std::iter::Peekable<impl Iterator<Item = (usize, ContentLine)>>,
) -> ParseResult<Component> {
    let (line_num, begin) = iter
        .next()
        .ok_or_else(|| ParseError::new(ParseErrorKind::MissingBegin, 1, 1))?;
    if begin.name != "BEGIN" {
        return Err(ParseError::new(ParseErrorKind::MissingBegin, line_num, 1));
    }
    let name = begin.raw_value.to_ascii_uppercase();
    parse_component_body(iter, line_num, &name)
}

/// Parses a component body given that its BEGIN line was consumed.
fn parse_component_body(
    iter: &mut std::iter::Peekable<impl Iterator<Item = (usize, ContentLine)>>,
    begin_line: usize,
    name: &str,
) -> ParseResult<Component> {
    let mut component = Component::custom(name);
    let mut last_line = begin_line;

    loop {
        let Some((line_num, cl)) = iter.next() else {
            return Err(ParseError::new(ParseErrorKind::MissingEnd, last_line, 1)
                .with_context(format!("missing END:{name}")));
        };
        last_line = line_num;

        match cl.name.as_str() {
            "BEGIN" => {
                let nested = cl.raw_value.to_ascii_uppercase();
                component
                    .children
                    .push(parse_component_body(iter, line_num, &nested)?);
            }
            "END" => {
                let end_name = cl.raw_value.to_ascii_uppercase();
                if end_name != name {
                    return Err(
                        ParseError::new(ParseErrorKind::MismatchedComponent, line_num, 1)
                            .with_context(format!("expected END:{name}, got END:{end_name}")),
                    );
                }
                break;
            }
            _ => component.properties.push(resolve_property(cl, line_num)),
        }
    }

    Ok(component)
}

/// The declared or implied data type of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueType {
    Binary,
    Boolean,
    CalAddress,
    Date,
    DateTime,
    Duration,
    Float,
    Integer,
    Period,
    Recur,
    Text,
    TextList,
    Trigger,
    Uri,
    UtcOffset,
    Unknown,
}

/// Returns the value type for a content line, combining the VALUE
/// parameter with the per-property defaults of RFC 5545 §3.8.
fn value_type_of(cl: &ContentLine) -> ValueType {
    if let Some(explicit) = cl.value_type() {
        return match explicit.to_ascii_uppercase().as_str() {
            "BINARY" => ValueType::Binary,
            "BOOLEAN" => ValueType::Boolean,
            "CAL-ADDRESS" => ValueType::CalAddress,
            "DATE" => ValueType::Date,
            "DATE-TIME" => {
                if cl.name == "TRIGGER" {
                    ValueType::Trigger
                } else {
                    ValueType::DateTime
                }
            }
            "DURATION" => {
                if cl.name == "TRIGGER" {
                    ValueType::Trigger
                } else {
                    ValueType::Duration
                }
            }
            "FLOAT" => ValueType::Float,
            "INTEGER" => ValueType::Integer,
            "PERIOD" => ValueType::Period,
            "RECUR" => ValueType::Recur,
            "TEXT" => ValueType::Text,
            "URI" => ValueType::Uri,
            "UTC-OFFSET" => ValueType::UtcOffset,
            _ => ValueType::Unknown,
        };
    }

    match cl.name.as_str() {
        "DTSTART" | "DTEND" | "DUE" | "RECURRENCE-ID" | "EXDATE" | "RDATE" | "CREATED"
        | "DTSTAMP" | "LAST-MODIFIED" | "COMPLETED" | "ACKNOWLEDGED" => ValueType::DateTime,
        "DURATION" | "REFRESH-INTERVAL" => ValueType::Duration,
        "TRIGGER" => ValueType::Trigger,
        "RRULE" | "EXRULE" => ValueType::Recur,
        "FREEBUSY" => ValueType::Period,
        "ORGANIZER" | "ATTENDEE" => ValueType::CalAddress,
        "ATTACH" | "URL" | "CONFERENCE" | "TZURL" | "SOURCE" => ValueType::Uri,
        "SEQUENCE" | "PRIORITY" | "REPEAT" | "PERCENT-COMPLETE" => ValueType::Integer,
        "TZOFFSETFROM" | "TZOFFSETTO" => ValueType::UtcOffset,
        "GEO" => ValueType::Unknown,
        "CATEGORIES" | "RESOURCES" => ValueType::TextList,
        name if name.starts_with("X-") => ValueType::Text,
        _ => ValueType::Text,
    }
}

/// Resolves a content line into a typed property.
///
/// Falls back to `Value::Unknown` when the value text does not parse as
/// the resolved type, keeping the raw text for round-trip output.
fn resolve_property(cl: ContentLine, line: usize) -> Property {
    let vtype = value_type_of(&cl);
    let tzid = cl.tzid().map(str::to_string);
    let raw = cl.raw_value.clone();

    let value = parse_value(&raw, vtype, tzid.as_deref(), line)
        .unwrap_or_else(|_| Value::Unknown(raw.clone()));

    Property {
        name: cl.name,
        params: cl.params,
        value,
        raw_value: raw,
    }
}

fn parse_value(
    raw: &str,
    vtype: ValueType,
    tzid: Option<&str>,
    line: usize,
) -> ParseResult<Value> {
    Ok(match vtype {
        ValueType::Binary => Value::Binary(raw.to_string()),
        ValueType::Boolean => Value::Boolean(parse_boolean(raw, line, 1)?),
        ValueType::CalAddress => Value::CalAddress(raw.to_string()),
        ValueType::Date => {
            let dates = split_value_list(raw)
                .into_iter()
                .map(|v| parse_date(v, line, 1))
                .collect::<ParseResult<Vec<_>>>()?;
            match <[_; 1]>::try_from(dates) {
                Ok([d]) => Value::Date(d),
                Err(dates) => Value::DateList(dates),
            }
        }
        ValueType::DateTime => {
            let dts = split_value_list(raw)
                .into_iter()
                .map(|v| {
                    if v.contains('T') {
                        parse_datetime(v, tzid, line, 1)
                    } else {
                        parse_date(v, line, 1).map(crate::core::DateTime::from_date)
                    }
                })
                .collect::<ParseResult<Vec<_>>>()?;
            match <[_; 1]>::try_from(dts) {
                Ok([dt]) => Value::DateTime(dt),
                Err(dts) => Value::DateTimeList(dts),
            }
        }
        ValueType::Duration => Value::Duration(parse_duration(raw, line, 1)?),
        ValueType::Float => Value::Float(parse_float(raw, line, 1)?),
        ValueType::Integer => Value::Integer(parse_integer(raw, line, 1)?),
        ValueType::Period => {
            let periods = split_value_list(raw)
                .into_iter()
                .map(|v| parse_period(v, tzid, line, 1))
                .collect::<ParseResult<Vec<_>>>()?;
            match <[_; 1]>::try_from(periods) {
                Ok([p]) => Value::Period(p),
                Err(periods) => Value::PeriodList(periods),
            }
        }
        ValueType::Recur => Value::Recur(Box::new(parse_rrule(raw, line, 1)?)),
        ValueType::Text => Value::Text(unescape_text(raw)),
        ValueType::TextList => Value::TextList(
            split_value_list(raw)
                .into_iter()
                .map(unescape_text)
                .collect(),
        ),
        ValueType::Trigger => Value::Trigger(parse_trigger(raw, line, 1)?),
        ValueType::Uri => Value::Uri(raw.to_string()),
        ValueType::UtcOffset => Value::UtcOffset(parse_utc_offset(raw, line, 1)?),
        ValueType::Unknown => Value::Unknown(raw.to_string()),
    })
}
