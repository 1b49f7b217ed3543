//! Identity, URI and validation helpers shared across the translators.

use sha1::{Digest, Sha1};

/// The `X-` parameter and property names used as round-trip
/// side-channels for JSCalendar-only state.
pub mod xname {
    /// Stable JSCalendar id on any property.
    pub const ID: &str = "X-JMAP-ID";
    /// Additional participant role.
    pub const ROLE: &str = "X-JMAP-ROLE";
    /// `method:uri` entry for `sendTo`/`replyTo`.
    pub const RSVP_URI: &str = "X-JMAP-RSVP-URI";
    /// Participant-to-location back-reference.
    pub const LOCATION_ID: &str = "X-JMAP-LOCATIONID";
    /// Participant/location-to-link back-reference.
    pub const LINK_ID: &str = "X-JMAP-LINKID";
    /// Participant schedule sequence.
    pub const SEQUENCE: &str = "X-JMAP-SEQUENCE";
    /// Participant schedule-updated timestamp.
    pub const DTSTAMP: &str = "X-JMAP-DTSTAMP";
    /// Link/location title.
    pub const TITLE: &str = "X-JMAP-TITLE";
    /// Link/location relation.
    pub const REL: &str = "X-JMAP-REL";
    /// Location description.
    pub const DESCRIPTION: &str = "X-JMAP-DESCRIPTION";
    /// Location timezone.
    pub const TZID: &str = "X-JMAP-TZID";
    /// Location coordinates.
    pub const GEO: &str = "X-JMAP-GEO";
    /// Link content id.
    pub const CID: &str = "X-JMAP-CID";
    /// Link display hint.
    pub const DISPLAY: &str = "X-JMAP-DISPLAY";
    /// Secondary location property (a property, not a parameter).
    pub const LOCATION: &str = "X-JMAP-LOCATION";
    /// Event-level default-alerts flag (a property, not a parameter).
    pub const USE_DEFAULT_ALERTS: &str = "X-JMAP-USEDEFAULTALERTS";
    /// Apple structured location property.
    pub const APPLE_STRUCTURED_LOCATION: &str = "X-APPLE-STRUCTURED-LOCATION";
    /// Title parameter used by Apple structured locations.
    pub const APPLE_TITLE: &str = "X-TITLE";
}

/// Returns the lower-hex SHA-1 of a string.
///
/// This is the synthetic-id fallback: hashing the canonical iCalendar
/// text of a property yields the same id on every round-trip.
#[must_use]
pub fn sha1_key(val: &str) -> String {
    use std::fmt::Write;

    let mut hasher = Sha1::new();
    hasher.update(val.as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Returns whether a string is a valid JSCalendar id:
/// `[A-Za-z0-9_-]{1,255}`.
#[must_use]
pub fn is_valid_jmap_id(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 255
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Returns whether a string is a valid RSVP method: one or more ASCII
/// letters.
#[must_use]
pub fn is_valid_rsvp_method(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphabetic())
}

/// Returns whether a string is an RFC 8288 `reg-rel-type`: lowercase
/// letters and digits, with `.` and `-` allowed after the first
/// character.
#[must_use]
pub fn is_valid_reg_rel(rel: &str) -> bool {
    !rel.is_empty()
        && rel.bytes().enumerate().all(|(i, b)| {
            b.is_ascii_lowercase() || b.is_ascii_digit() || (i > 0 && (b == b'.' || b == b'-'))
        })
}

/// Normalizes a URI by lowercasing its scheme. Everything after the
/// first colon is left untouched.
#[must_use]
pub fn normalized_uri(uri: &str) -> String {
    match uri.find(':') {
        Some(colon) => {
            let mut out = uri[..colon].to_ascii_lowercase();
            out.push_str(&uri[colon..]);
            out
        }
        None => uri.to_string(),
    }
}

/// Compares two URIs: scheme case-insensitive, remainder case-sensitive.
/// Strings without schemes compare as plain equality.
#[must_use]
pub fn match_uri(uri1: &str, uri2: &str) -> bool {
    match (uri1.find(':'), uri2.find(':')) {
        (None, None) => uri1 == uri2,
        (Some(c1), Some(c2)) if c1 == c2 => {
            uri1[..c1].eq_ignore_ascii_case(&uri2[..c2]) && uri1[c1..] == uri2[c2..]
        }
        _ => false,
    }
}

/// Extracts the canonical mail address from a `mailto:` URI.
///
/// Query parts are stripped and the domain is lowercased. Returns `None`
/// for non-mailto URIs.
#[must_use]
pub fn mail_addr_from_uri(uri: &str) -> Option<String> {
    let rest = skip_prefix_ignore_case(uri, "mailto:")?;
    let addr = rest.split('?').next().unwrap_or(rest);
    Some(canonical_mail_addr(addr))
}

/// Builds a `mailto:` URI from a mail address.
#[must_use]
pub fn mail_addr_to_uri(addr: &str) -> String {
    format!("mailto:{addr}")
}

/// Canonicalizes a mail address: the domain part is lowercased, the
/// local part preserved.
#[must_use]
pub fn canonical_mail_addr(addr: &str) -> String {
    match addr.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_ascii_lowercase()),
        None => addr.to_string(),
    }
}

fn skip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}
