//! Microsecond time handling.
//!
//! All durations and timestamps crossing component boundaries are microseconds.
//! Millisecond values are accepted at construction time only and converted here.

use crate::rational::Rational;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Sentinel for an unset/unknown time value, distinct from zero.
pub const TIME_UNSET: i64 = i64::MIN;

/// A time base for converting between timestamp units.
///
/// Common time bases:
/// - 1/1000 for milliseconds
/// - 1/1000000 for microseconds
/// - 1/\<timescale\> for MP4 track time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeBase(pub Rational);

impl TimeBase {
    /// Create a new time base from numerator and denominator.
    pub fn new(num: i64, den: i64) -> Self {
        Self(Rational::new(num, den))
    }

    /// Millisecond time base (1/1000).
    pub const MILLISECONDS: Self = Self(Rational { num: 1, den: 1000 });

    /// Microsecond time base (1/1000000).
    pub const MICROSECONDS: Self = Self(Rational { num: 1, den: 1_000_000 });

    /// Convert a timestamp from this time base to another.
    pub fn convert(&self, value: i64, target: TimeBase) -> i64 {
        self.0.rescale(value, target.0)
    }

    /// Convert a value in this time base to microseconds.
    pub fn to_micros(&self, value: i64) -> i64 {
        self.convert(value, TimeBase::MICROSECONDS)
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::MICROSECONDS
    }
}

impl From<Rational> for TimeBase {
    fn from(r: Rational) -> Self {
        Self(r)
    }
}

/// A microsecond duration that may be unset.
///
/// The unset state is the [`TIME_UNSET`] sentinel, distinct from a zero
/// duration. Arithmetic on unset values yields unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DurationUs {
    /// The raw microsecond value, or [`TIME_UNSET`].
    pub value: i64,
}

impl DurationUs {
    /// Create a duration from microseconds.
    pub fn from_micros(us: i64) -> Self {
        Self { value: us }
    }

    /// Create a duration from milliseconds.
    pub fn from_millis(ms: i64) -> Self {
        Self {
            value: ms.saturating_mul(1000),
        }
    }

    /// Create an unset duration.
    pub fn unset() -> Self {
        Self { value: TIME_UNSET }
    }

    /// Create a zero duration.
    pub fn zero() -> Self {
        Self { value: 0 }
    }

    /// Check if this duration is set.
    pub fn is_set(&self) -> bool {
        self.value != TIME_UNSET
    }

    /// Get the microsecond value, or `None` when unset.
    pub fn micros(&self) -> Option<i64> {
        if self.is_set() {
            Some(self.value)
        } else {
            None
        }
    }

    /// Convert to seconds, or `None` when unset.
    pub fn to_seconds(&self) -> Option<f64> {
        self.micros().map(|us| us as f64 / 1_000_000.0)
    }
}

impl Default for DurationUs {
    fn default() -> Self {
        Self::unset()
    }
}

impl Add for DurationUs {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        if !self.is_set() || !rhs.is_set() {
            return Self::unset();
        }
        Self {
            value: self.value.saturating_add(rhs.value),
        }
    }
}

impl Sub for DurationUs {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        if !self.is_set() || !rhs.is_set() {
            return Self::unset();
        }
        Self {
            value: self.value.saturating_sub(rhs.value),
        }
    }
}

impl fmt::Display for DurationUs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_seconds() {
            Some(secs) => {
                let hours = (secs / 3600.0) as u32;
                let mins = ((secs % 3600.0) / 60.0) as u32;
                let secs = secs % 60.0;
                write!(f, "{:02}:{:02}:{:06.3}", hours, mins, secs)
            }
            None => write!(f, "UNSET"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_base_convert() {
        let ms = TimeBase::MILLISECONDS;
        assert_eq!(ms.convert(300, TimeBase::MICROSECONDS), 300_000);

        let track = TimeBase::new(1, 30_000);
        assert_eq!(track.to_micros(30_000), 1_000_000);
    }

    #[test]
    fn test_unset_distinct_from_zero() {
        assert!(DurationUs::zero().is_set());
        assert!(!DurationUs::unset().is_set());
        assert_ne!(DurationUs::zero(), DurationUs::unset());
    }

    #[test]
    fn test_millis_conversion() {
        assert_eq!(DurationUs::from_millis(300).value, 300_000);
    }

    #[test]
    fn test_arithmetic_propagates_unset() {
        let d = DurationUs::from_micros(1_000_000);
        assert!(!(d + DurationUs::unset()).is_set());
        assert!(!(DurationUs::unset() - d).is_set());
        assert_eq!((d - DurationUs::from_micros(400_000)).value, 600_000);
    }

    #[test]
    fn test_display() {
        let d = DurationUs::from_millis(3_723_500);
        assert_eq!(format!("{}", d), "01:02:03.500");
        assert_eq!(format!("{}", DurationUs::unset()), "UNSET");
    }
}
