//! iCalendar DATE-TIME and TIME value types (RFC 5545 §3.3.5, §3.3.12).

use std::fmt;

use super::value::Date;

/// UTC offset (RFC 5545 §3.3.14), e.g. `+0530` or `-0800`.
///
/// Stored as total seconds east of UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtcOffset {
    seconds: i32,
}

impl UtcOffset {
    /// The UTC offset (zero).
    pub const UTC: Self = Self { seconds: 0 };

    /// Creates a UTC offset from total seconds east of UTC.
    #[must_use]
    pub const fn from_seconds(seconds: i32) -> Self {
        Self { seconds }
    }

    /// Returns the offset as total seconds east of UTC.
    #[must_use]
    pub const fn as_seconds(self) -> i32 {
        self.seconds
    }
}

impl fmt::Display for UtcOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.seconds >= 0 { '+' } else { '-' };
        let hours = self.seconds.abs() / 3600;
        let minutes = (self.seconds.abs() % 3600) / 60;
        let seconds = self.seconds.abs() % 60;
        write!(f, "{sign}{hours:02}{minutes:02}")?;
        if seconds != 0 {
            write!(f, "{seconds:02}")?;
        }
        Ok(())
    }
}

/// Time of day (RFC 5545 §3.3.12).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    /// Hour (0-23).
    pub hour: u8,
    /// Minute (0-59).
    pub minute: u8,
    /// Second (0-60, allowing leap seconds).
    pub second: u8,
    /// Whether the time carries the 'Z' UTC designator.
    pub is_utc: bool,
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}{:02}", self.hour, self.minute, self.second)?;
        if self.is_utc {
            write!(f, "Z")?;
        }
        Ok(())
    }
}

/// Form of a DATE-TIME value (RFC 5545 §3.3.5).
///
/// The three forms are mutually exclusive: floating (no zone), UTC
/// ('Z' suffix), or zoned (TZID parameter reference).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateTimeForm {
    /// Same wall-clock time in any timezone; not an absolute instant.
    Floating,
    /// Absolute instant, rendered with a 'Z' suffix.
    Utc,
    /// Local time in the referenced timezone.
    Zoned {
        /// Timezone identifier from the TZID parameter.
        tzid: String,
    },
}

/// A DATE-TIME value (RFC 5545 §3.3.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTime {
    /// Year.
    pub year: i32,
    /// Month (1-12).
    pub month: u8,
    /// Day of month (1-31).
    pub day: u8,
    /// Hour (0-23).
    pub hour: u8,
    /// Minute (0-59).
    pub minute: u8,
    /// Second (0-60).
    pub second: u8,
    /// Floating, UTC, or zoned.
    pub form: DateTimeForm,
}

impl DateTime {
    /// Creates a floating DATE-TIME.
    #[must_use]
    pub const fn floating(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            form: DateTimeForm::Floating,
        }
    }

    /// Creates a UTC DATE-TIME.
    #[must_use]
    pub const fn utc(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            form: DateTimeForm::Utc,
        }
    }

    /// Creates a zoned DATE-TIME.
    #[must_use]
    pub fn zoned(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        tzid: impl Into<String>,
    ) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            form: DateTimeForm::Zoned { tzid: tzid.into() },
        }
    }

    /// Creates a floating DATE-TIME at midnight of the given date.
    #[must_use]
    pub const fn from_date(date: Date) -> Self {
        Self::floating(date.year, date.month, date.day, 0, 0, 0)
    }

    /// Returns the date portion of this DATE-TIME.
    #[must_use]
    pub const fn date(&self) -> Date {
        Date {
            year: self.year,
            month: self.month,
            day: self.day,
        }
    }

    /// Returns whether this is a UTC time.
    #[must_use]
    pub fn is_utc(&self) -> bool {
        matches!(self.form, DateTimeForm::Utc)
    }

    /// Returns whether this is a floating time.
    #[must_use]
    pub fn is_floating(&self) -> bool {
        matches!(self.form, DateTimeForm::Floating)
    }

    /// Returns the timezone id if this is a zoned time.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        match &self.form {
            DateTimeForm::Zoned { tzid } => Some(tzid),
            _ => None,
        }
    }

    /// Replaces the form, keeping the wall-clock fields.
    #[must_use]
    pub fn with_form(mut self, form: DateTimeForm) -> Self {
        self.form = form;
        self
    }

    /// Returns the wall-clock fields as a chrono `NaiveDateTime`.
    ///
    /// `None` if the fields do not name a real calendar time.
    #[must_use]
    pub fn naive(&self) -> Option<chrono::NaiveDateTime> {
        chrono::NaiveDate::from_ymd_opt(self.year, u32::from(self.month), u32::from(self.day))?
            .and_hms_opt(
                u32::from(self.hour),
                u32::from(self.minute),
                u32::from(self.second),
            )
    }

    /// Builds a DATE-TIME from chrono wall-clock fields and a form.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "chrono month/day/time components are within u8 range"
    )]
    pub fn from_naive(naive: chrono::NaiveDateTime, form: DateTimeForm) -> Self {
        use chrono::{Datelike, Timelike};
        Self {
            year: naive.year(),
            month: naive.month() as u8,
            day: naive.day() as u8,
            hour: naive.hour() as u8,
            minute: naive.minute() as u8,
            second: naive.second() as u8,
            form,
        }
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}{:02}{:02}T{:02}{:02}{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        if self.is_utc() {
            write!(f, "Z")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_offset_display() {
        assert_eq!(UtcOffset::from_seconds(5 * 3600 + 30 * 60).to_string(), "+0530");
        assert_eq!(UtcOffset::from_seconds(-8 * 3600).to_string(), "-0800");
        assert_eq!(UtcOffset::UTC.to_string(), "+0000");
    }

    #[test]
    fn datetime_display() {
        assert_eq!(
            DateTime::utc(2022, 1, 1, 10, 15, 0).to_string(),
            "20220101T101500Z"
        );
        assert_eq!(
            DateTime::zoned(2022, 1, 1, 9, 0, 0, "Europe/Berlin").to_string(),
            "20220101T090000"
        );
    }

    #[test]
    fn datetime_from_date() {
        let dt = DateTime::from_date(Date::new(2022, 3, 7));
        assert_eq!(dt.to_string(), "20220307T000000");
        assert!(dt.is_floating());
    }

    #[test]
    fn datetime_naive_round_trip() {
        let dt = DateTime::zoned(2022, 6, 30, 23, 59, 59, "Europe/Berlin");
        let naive = dt.naive().unwrap();
        let back = DateTime::from_naive(naive, dt.form.clone());
        assert_eq!(back, dt);
    }
}
