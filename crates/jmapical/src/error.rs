//! Conversion error types.

use thiserror::Error;

/// The kinds of conversion error the translator reports.
///
/// `Callback` and `Memory` exist for parity with the error contract of
/// the wire API; the Rust core itself only produces `Ical`, `Props`,
/// `Uid` and `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A caller-supplied callback failed.
    Callback,
    /// Out of memory.
    Memory,
    /// The iCalendar library reported an error.
    Ical,
    /// One or more event properties are invalid.
    Props,
    /// The event has no usable uid.
    Uid,
    /// Any other error.
    Unknown,
}

impl ErrorKind {
    /// Returns the diagnostic string for this error kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Callback => "jmapical: callback error",
            Self::Memory => "jmapical: no memory",
            Self::Ical => "jmapical: iCalendar error",
            Self::Props => "jmapical: property error",
            Self::Uid => "jmapical: iCalendar uid error",
            Self::Unknown => "jmapical: unknown error",
        }
    }
}

/// Returns the diagnostic string for an error kind.
#[must_use]
pub const fn strerror(kind: ErrorKind) -> &'static str {
    kind.as_str()
}

/// Error returned by the translation entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The iCalendar data could not be processed.
    #[error("jmapical: iCalendar error")]
    Ical,

    /// One or more properties violate the event contract. Carries the
    /// JSON-Pointer paths of every offending property.
    #[error("jmapical: property error: {0:?}")]
    Props(Vec<String>),

    /// `uid` is missing or empty.
    #[error("jmapical: iCalendar uid error")]
    Uid,

    /// Any other failure.
    #[error("jmapical: unknown error")]
    Unknown,
}

impl ConversionError {
    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Ical => ErrorKind::Ical,
            Self::Props(_) => ErrorKind::Props,
            Self::Uid => ErrorKind::Uid,
            Self::Unknown => ErrorKind::Unknown,
        }
    }

    /// Returns the invalid property paths for a `Props` error.
    #[must_use]
    pub fn props(&self) -> &[String] {
        match self {
            Self::Props(paths) => paths,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strerror_strings() {
        assert_eq!(strerror(ErrorKind::Props), "jmapical: property error");
        assert_eq!(strerror(ErrorKind::Uid), "jmapical: iCalendar uid error");
    }

    #[test]
    fn error_kind_mapping() {
        assert_eq!(ConversionError::Uid.kind(), ErrorKind::Uid);
        let err = ConversionError::Props(vec!["title".to_string()]);
        assert_eq!(err.kind(), ErrorKind::Props);
        assert_eq!(err.props(), ["title"]);
    }
}
