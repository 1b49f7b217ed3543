//! iCalendar DURATION value type (RFC 5545 §3.3.6).

use std::fmt;

/// A duration of time (RFC 5545 §3.3.6).
///
/// Either week-based (`P2W`) or day/time-based (`P1DT2H30M`). iCalendar
/// durations have no year or month designators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Duration {
    /// Whether this duration is negative.
    pub negative: bool,
    /// Number of weeks (exclusive with the other components).
    pub weeks: u32,
    /// Number of days.
    pub days: u32,
    /// Number of hours.
    pub hours: u32,
    /// Number of minutes.
    pub minutes: u32,
    /// Number of seconds.
    pub seconds: u32,
}

impl Duration {
    /// The zero duration.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            negative: false,
            weeks: 0,
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }

    /// Creates a duration of whole days.
    #[must_use]
    pub const fn days(days: u32) -> Self {
        Self {
            negative: false,
            weeks: 0,
            days,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }

    /// Creates a duration of whole minutes.
    #[must_use]
    pub const fn minutes(minutes: u32) -> Self {
        Self {
            negative: false,
            weeks: 0,
            days: 0,
            hours: 0,
            minutes,
            seconds: 0,
        }
    }

    /// Normalizes a signed second count into a duration.
    ///
    /// A count that is a whole number of weeks becomes week-based,
    /// everything else day/time-based.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "components are bounded by the absolute second count"
    )]
    pub fn from_seconds(total: i64) -> Self {
        const WEEK: i64 = 7 * 24 * 3600;
        let negative = total < 0;
        let t = total.abs();

        if t != 0 && t % WEEK == 0 {
            Self {
                negative,
                weeks: (t / WEEK) as u32,
                days: 0,
                hours: 0,
                minutes: 0,
                seconds: 0,
            }
        } else {
            Self {
                negative,
                weeks: 0,
                days: (t / 86400) as u32,
                hours: ((t % 86400) / 3600) as u32,
                minutes: ((t % 3600) / 60) as u32,
                seconds: (t % 60) as u32,
            }
        }
    }

    /// Returns the total length in seconds (negative if the duration is).
    #[must_use]
    pub const fn as_seconds(&self) -> i64 {
        let total = (self.weeks as i64 * 7 * 24 * 3600)
            + (self.days as i64 * 24 * 3600)
            + (self.hours as i64 * 3600)
            + (self.minutes as i64 * 60)
            + (self.seconds as i64);
        if self.negative { -total } else { total }
    }

    /// Returns whether every component is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.weeks == 0 && self.days == 0 && self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }

    /// Returns whether the duration has sub-day components.
    #[must_use]
    pub const fn has_time(&self) -> bool {
        self.hours != 0 || self.minutes != 0 || self.seconds != 0
    }

    /// Returns the unsigned counterpart of this duration.
    #[must_use]
    pub const fn abs(mut self) -> Self {
        self.negative = false;
        self
    }

    /// Returns this duration with the sign flipped.
    #[must_use]
    pub const fn negate(mut self) -> Self {
        self.negative = !self.negative;
        self
    }

    /// Returns this duration with the given sign.
    #[must_use]
    pub const fn with_sign(mut self, negative: bool) -> Self {
        self.negative = negative;
        self
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative && !self.is_zero() {
            write!(f, "-")?;
        }
        write!(f, "P")?;

        if self.is_zero() {
            // The zero duration renders as PT0S, matching the string the
            // JSCalendar `duration` field contract expects.
            return write!(f, "T0S");
        }

        if self.weeks > 0 {
            return write!(f, "{}W", self.weeks);
        }

        if self.days > 0 {
            write!(f, "{}D", self.days)?;
        }
        if self.has_time() {
            write!(f, "T")?;
            if self.hours > 0 {
                write!(f, "{}H", self.hours)?;
            }
            if self.minutes > 0 {
                write!(f, "{}M", self.minutes)?;
            }
            if self.seconds > 0 {
                write!(f, "{}S", self.seconds)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_zero() {
        assert_eq!(Duration::zero().to_string(), "PT0S");
    }

    #[test]
    fn display_components() {
        let d = Duration {
            days: 1,
            hours: 2,
            minutes: 30,
            ..Duration::zero()
        };
        assert_eq!(d.to_string(), "P1DT2H30M");
        assert_eq!(Duration::minutes(15).negate().to_string(), "-PT15M");
    }

    #[test]
    fn from_seconds_normalizes() {
        assert_eq!(Duration::from_seconds(0).to_string(), "PT0S");
        assert_eq!(Duration::from_seconds(3 * 3600).to_string(), "PT3H");
        assert_eq!(Duration::from_seconds(86400).to_string(), "P1D");
        assert_eq!(Duration::from_seconds(14 * 86400).to_string(), "P2W");
        assert_eq!(Duration::from_seconds(-900).to_string(), "-PT15M");
    }

    #[test]
    fn seconds_round_trip() {
        let d = Duration::from_seconds(90061);
        assert_eq!(d.as_seconds(), 90061);
        assert_eq!(Duration::from_seconds(-90061).as_seconds(), -90061);
    }
}
