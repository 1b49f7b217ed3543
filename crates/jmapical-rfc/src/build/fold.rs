//! Content line folding (RFC 5545 §3.1).

/// Maximum line length in octets, excluding CRLF.
const MAX_LINE_OCTETS: usize = 75;

/// Folds a content line to the 75-octet limit, appending CRLF.
///
/// Folds are inserted as CRLF plus a single space, never splitting a
/// UTF-8 sequence.
#[must_use]
pub fn fold_line(line: &str) -> String {
    let bytes = line.as_bytes();
    if bytes.len() <= MAX_LINE_OCTETS {
        return format!("{line}\r\n");
    }

    let mut result = String::with_capacity(bytes.len() + (bytes.len() / MAX_LINE_OCTETS) * 3);
    let mut pos = 0;
    let mut first = true;

    while pos < bytes.len() {
        // Continuation lines lose one octet to the leading space.
        let max_len = if first {
            MAX_LINE_OCTETS
        } else {
            MAX_LINE_OCTETS - 1
        };

        if !first {
            result.push(' ');
        }

        let remaining = bytes.len() - pos;
        if remaining <= max_len {
            result.push_str(&line[pos..]);
            result.push_str("\r\n");
            break;
        }

        let mut end = pos + max_len;
        while end > pos && !line.is_char_boundary(end) {
            end -= 1;
        }
        if end == pos {
            end = pos + 1;
            while end < bytes.len() && !line.is_char_boundary(end) {
                end += 1;
            }
        }

        result.push_str(&line[pos..end]);
        result.push_str("\r\n");
        pos = end;
        first = false;
    }

    result
}
