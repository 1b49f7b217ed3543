//! iCalendar property parameters (RFC 5545 §3.2).

use std::fmt;

/// A property parameter, e.g. the `TZID` in
/// `DTSTART;TZID=Europe/Berlin:20220101T090000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name, normalized to uppercase.
    pub name: String,
    /// Parameter values. Most parameters carry one value; DELEGATED-TO,
    /// DELEGATED-FROM and MEMBER may carry several.
    pub values: Vec<String>,
}

impl Parameter {
    /// Creates a parameter with a single value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            values: vec![value.into()],
        }
    }

    /// Creates a parameter with multiple values.
    #[must_use]
    pub fn with_values(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            values,
        }
    }

    /// Returns the first (usually only) value.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Creates a TZID parameter.
    #[must_use]
    pub fn tzid(tzid: impl Into<String>) -> Self {
        Self::new(names::TZID, tzid)
    }

    /// Creates a VALUE (data type) parameter.
    #[must_use]
    pub fn value_type(value_type: impl Into<String>) -> Self {
        Self::new(names::VALUE, value_type)
    }

    /// Creates a CN (common name) parameter.
    #[must_use]
    pub fn cn(name: impl Into<String>) -> Self {
        Self::new(names::CN, name)
    }

    /// Creates a CUTYPE parameter.
    #[must_use]
    pub fn cutype(cutype: impl Into<String>) -> Self {
        Self::new(names::CUTYPE, cutype)
    }

    /// Creates a ROLE parameter.
    #[must_use]
    pub fn role(role: impl Into<String>) -> Self {
        Self::new(names::ROLE, role)
    }

    /// Creates a PARTSTAT parameter.
    #[must_use]
    pub fn partstat(status: impl Into<String>) -> Self {
        Self::new(names::PARTSTAT, status)
    }

    /// Creates an RSVP parameter.
    #[must_use]
    pub fn rsvp(rsvp: bool) -> Self {
        Self::new(names::RSVP, if rsvp { "TRUE" } else { "FALSE" })
    }

    /// Creates an EMAIL parameter (RFC 7986 §6.2).
    #[must_use]
    pub fn email(addr: impl Into<String>) -> Self {
        Self::new(names::EMAIL, addr)
    }

    /// Creates a DELEGATED-TO parameter.
    #[must_use]
    pub fn delegated_to(uri: impl Into<String>) -> Self {
        Self::new(names::DELEGATED_TO, uri)
    }

    /// Creates a DELEGATED-FROM parameter.
    #[must_use]
    pub fn delegated_from(uri: impl Into<String>) -> Self {
        Self::new(names::DELEGATED_FROM, uri)
    }

    /// Creates a MEMBER parameter.
    #[must_use]
    pub fn member(uri: impl Into<String>) -> Self {
        Self::new(names::MEMBER, uri)
    }

    /// Creates a RELATED parameter for alarm triggers.
    #[must_use]
    pub fn related(end: bool) -> Self {
        Self::new(names::RELATED, if end { "END" } else { "START" })
    }

    /// Creates a RELTYPE parameter.
    #[must_use]
    pub fn reltype(reltype: impl Into<String>) -> Self {
        Self::new(names::RELTYPE, reltype)
    }

    /// Creates a LANGUAGE parameter.
    #[must_use]
    pub fn language(lang: impl Into<String>) -> Self {
        Self::new(names::LANGUAGE, lang)
    }

    /// Creates a FMTTYPE parameter.
    #[must_use]
    pub fn fmttype(mime: impl Into<String>) -> Self {
        Self::new(names::FMTTYPE, mime)
    }

    /// Creates a LABEL parameter (RFC 7986 §6.1).
    #[must_use]
    pub fn label(label: impl Into<String>) -> Self {
        Self::new(names::LABEL, label)
    }

    /// Creates a SIZE parameter (RFC 8607 §4.1).
    #[must_use]
    pub fn size(size: u64) -> Self {
        Self::new(names::SIZE, size.to_string())
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.values.is_empty() {
            write!(f, "=")?;
            for (i, value) in self.values.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                if value.contains([':', ';', ',', '"']) {
                    write!(f, "\"{value}\"")?;
                } else {
                    write!(f, "{value}")?;
                }
            }
        }
        Ok(())
    }
}

/// Parameter names used by the translator.
pub mod names {
    pub const ALTREP: &str = "ALTREP";
    pub const CN: &str = "CN";
    pub const CUTYPE: &str = "CUTYPE";
    pub const DELEGATED_FROM: &str = "DELEGATED-FROM";
    pub const DELEGATED_TO: &str = "DELEGATED-TO";
    pub const EMAIL: &str = "EMAIL";
    pub const FMTTYPE: &str = "FMTTYPE";
    pub const LABEL: &str = "LABEL";
    pub const LANGUAGE: &str = "LANGUAGE";
    pub const MEMBER: &str = "MEMBER";
    pub const PARTSTAT: &str = "PARTSTAT";
    pub const RELATED: &str = "RELATED";
    pub const RELTYPE: &str = "RELTYPE";
    pub const ROLE: &str = "ROLE";
    pub const RSVP: &str = "RSVP";
    pub const SIZE: &str = "SIZE";
    pub const TZID: &str = "TZID";
    pub const VALUE: &str = "VALUE";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_simple() {
        let param = Parameter::tzid("Europe/Berlin");
        assert_eq!(param.to_string(), "TZID=Europe/Berlin");
    }

    #[test]
    fn display_quoted() {
        let param = Parameter::cn("Doe; Jane");
        assert_eq!(param.to_string(), "CN=\"Doe; Jane\"");
    }

    #[test]
    fn display_multi_valued() {
        let param = Parameter::with_values(
            "MEMBER",
            vec![
                "mailto:a@example.com".to_string(),
                "mailto:b@example.com".to_string(),
            ],
        );
        assert_eq!(
            param.to_string(),
            "MEMBER=mailto:a@example.com,mailto:b@example.com"
        );
    }

    #[test]
    fn name_is_normalized() {
        assert_eq!(Parameter::new("tzid", "UTC").name, "TZID");
    }
}
