//! Content line lexer for iCalendar (RFC 5545 §3.1).
//!
//! Handles line unfolding and content-line tokenization.

use super::error::{ParseError, ParseErrorKind, ParseResult};
use crate::core::{ContentLine, Parameter};

/// Splits input into unfolded content lines with their line numbers.
///
/// Lines starting with SP/HTAB are continuations of the previous line;
/// unfolding removes the line break and the single whitespace character.
/// Bare LF endings and empty lines are tolerated.
#[must_use]
pub fn split_lines(input: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();

    for (i, raw_line) in input.lines().enumerate() {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if line.is_empty() {
            continue;
        }

        if line.starts_with([' ', '\t']) {
            let continuation = &line[1..];
            if let Some((_, prev)) = lines.last_mut() {
                prev.push_str(continuation);
            } else {
                lines.push((i + 1, continuation.to_string()));
            }
        } else {
            lines.push((i + 1, line.to_string()));
        }
    }

    lines
}

/// Parses a single content line: `name *(";" param) ":" value`.
///
/// ## Errors
/// Returns an error if the line is malformed.
pub fn parse_content_line(line: &str, line_num: usize) -> ParseResult<ContentLine> {
    let bytes = line.as_bytes();
    let mut pos = 0;

    // Property name runs to the first ';' or ':'.
    while pos < bytes.len() {
        let c = bytes[pos] as char;
        if c == ';' || c == ':' {
            break;
        }
        if !c.is_ascii_alphanumeric() && c != '-' {
            return Err(ParseError::new(
                ParseErrorKind::InvalidPropertyName,
                line_num,
                pos + 1,
            ));
        }
        pos += 1;
    }

    if pos == 0 {
        return Err(ParseError::new(
            ParseErrorKind::MissingPropertyName,
            line_num,
            1,
        ));
    }
    if pos >= bytes.len() {
        return Err(ParseError::new(
            ParseErrorKind::MissingColon,
            line_num,
            line.len(),
        ));
    }

    let name = line[..pos].to_ascii_uppercase();
    let mut params = Vec::new();

    while bytes[pos] == b';' {
        pos += 1;
        let param = parse_parameter(line, &mut pos, line_num)?;
        params.push(param);
        if pos >= bytes.len() {
            return Err(ParseError::new(
                ParseErrorKind::MissingColon,
                line_num,
                line.len(),
            ));
        }
    }

    // Now at the ':'.
    if bytes[pos] != b':' {
        return Err(ParseError::new(
            ParseErrorKind::MissingColon,
            line_num,
            pos + 1,
        ));
    }

    Ok(ContentLine {
        name,
        params,
        raw_value: line[pos + 1..].to_string(),
    })
}

/// Parses one parameter starting at `pos` (just past a ';'). Leaves `pos`
/// on the following ';' or ':'.
fn parse_parameter(line: &str, pos: &mut usize, line_num: usize) -> ParseResult<Parameter> {
    let bytes = line.as_bytes();
    let start = *pos;

    // Parameter name runs to '='.
    while *pos < bytes.len() && bytes[*pos] != b'=' {
        let c = bytes[*pos] as char;
        if !c.is_ascii_alphanumeric() && c != '-' {
            return Err(ParseError::new(
                ParseErrorKind::InvalidParameter,
                line_num,
                *pos + 1,
            ));
        }
        *pos += 1;
    }
    if *pos == start || *pos >= bytes.len() {
        return Err(ParseError::new(
            ParseErrorKind::InvalidParameter,
            line_num,
            start + 1,
        ));
    }

    let name = line[start..*pos].to_ascii_uppercase();
    *pos += 1; // consume '='

    let mut values = Vec::new();
    loop {
        values.push(parse_param_value(line, pos, line_num)?);
        match bytes.get(*pos) {
            Some(b',') => {
                *pos += 1;
            }
            Some(b';' | b':') | None => break,
            Some(_) => {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidParameter,
                    line_num,
                    *pos + 1,
                ));
            }
        }
    }

    Ok(Parameter::with_values(name, values))
}

/// Parses one (possibly quoted) parameter value, decoding the RFC 6868
/// caret escapes inside quotes.
fn parse_param_value(line: &str, pos: &mut usize, line_num: usize) -> ParseResult<String> {
    let bytes = line.as_bytes();

    if bytes.get(*pos) == Some(&b'"') {
        let quote_col = *pos + 1;
        *pos += 1;
        let mut value = String::new();
        let mut chars = line[*pos..].char_indices();
        loop {
            let Some((i, c)) = chars.next() else {
                return Err(ParseError::new(
                    ParseErrorKind::UnclosedQuote,
                    line_num,
                    quote_col,
                ));
            };
            match c {
                '"' => {
                    *pos += i + 1;
                    return Ok(value);
                }
                '^' => match chars.clone().next() {
                    Some((_, '^')) => {
                        value.push('^');
                        chars.next();
                    }
                    Some((_, 'n')) => {
                        value.push('\n');
                        chars.next();
                    }
                    Some((_, '\'')) => {
                        value.push('"');
                        chars.next();
                    }
                    _ => value.push('^'),
                },
                other => value.push(other),
            }
        }
    } else {
        let start = *pos;
        while let Some(&b) = bytes.get(*pos) {
            if b == b',' || b == b';' || b == b':' {
                break;
            }
            *pos += 1;
        }
        Ok(line[start..*pos].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_unfolds_continuations() {
        let input = "DESCRIPTION:part one\r\n  and part two\r\nSUMMARY:next";
        let lines = split_lines(input);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].1, "DESCRIPTION:part one and part two");
        assert_eq!(lines[1].1, "SUMMARY:next");
    }

    #[test]
    fn parse_simple_line() {
        let cl = parse_content_line("SUMMARY:Team Meeting", 1).unwrap();
        assert_eq!(cl.name, "SUMMARY");
        assert!(cl.params.is_empty());
        assert_eq!(cl.raw_value, "Team Meeting");
    }

    #[test]
    fn parse_line_with_params() {
        let cl = parse_content_line("DTSTART;TZID=Europe/Berlin:20220101T090000", 1).unwrap();
        assert_eq!(cl.name, "DTSTART");
        assert_eq!(cl.tzid(), Some("Europe/Berlin"));
        assert_eq!(cl.raw_value, "20220101T090000");
    }

    #[test]
    fn parse_quoted_param() {
        let cl = parse_content_line("ATTENDEE;CN=\"Doe, Jane\":mailto:jane@example.com", 1).unwrap();
        assert_eq!(cl.get_param_value("CN"), Some("Doe, Jane"));
        assert_eq!(cl.raw_value, "mailto:jane@example.com");
    }

    #[test]
    fn parse_multi_valued_param() {
        let cl = parse_content_line(
            "ATTENDEE;DELEGATED-TO=\"mailto:a@x\",\"mailto:b@x\":mailto:c@x",
            1,
        )
        .unwrap();
        assert_eq!(cl.params[0].values, vec!["mailto:a@x", "mailto:b@x"]);
    }

    #[test]
    fn parse_caret_encoding() {
        let cl = parse_content_line("ATTENDEE;CN=\"A^nB\":mailto:x@x", 1).unwrap();
        assert_eq!(cl.get_param_value("CN"), Some("A\nB"));
    }

    #[test]
    fn parse_unclosed_quote() {
        let err = parse_content_line("ATTENDEE;CN=\"Unclosed:mailto:x@x", 1).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnclosedQuote);
    }

    #[test]
    fn parse_missing_colon() {
        assert!(parse_content_line("INVALID", 1).is_err());
    }
}
