//! Exact rational values and edit-unit conversions
//!
//! Edit rates, curve times and curve levels are stored as fractions and only
//! turned into floating point when a consumer asks for it.

use crate::{Error, Position, Result};
use std::cmp::Ordering;
use std::fmt;

/// A fraction with 32-bit signed numerator and denominator, as stored in AAF
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rational {
    /// Numerator
    pub numerator: i32,
    /// Denominator
    pub denominator: i32,
}

impl Rational {
    /// Creates a new rational without normalizing or validating it
    pub const fn new(numerator: i32, denominator: i32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Creates a rational from an integer
    pub const fn from_int(value: i32) -> Self {
        Self::new(value, 1)
    }

    /// Zero
    pub const fn zero() -> Self {
        Self::new(0, 1)
    }

    /// One
    pub const fn one() -> Self {
        Self::new(1, 1)
    }

    /// Fails with [`Error::ZeroDenominator`] when the denominator is zero
    pub fn check(&self) -> Result<Self> {
        if self.denominator == 0 {
            return Err(Error::ZeroDenominator(*self));
        }
        Ok(*self)
    }

    /// Converts to f64, failing on a zero denominator
    pub fn to_f64(&self) -> Result<f64> {
        let r = self.check()?;
        Ok(r.numerator as f64 / r.denominator as f64)
    }

    /// Converts to f32, failing on a zero denominator
    pub fn to_f32(&self) -> Result<f32> {
        let r = self.check()?;
        Ok(r.numerator as f32 / r.denominator as f32)
    }

    /// Compares two rationals by value, without going through floating point
    ///
    /// Returns `None` if either denominator is zero.
    pub fn cmp_value(&self, other: &Self) -> Option<Ordering> {
        if self.denominator == 0 || other.denominator == 0 {
            return None;
        }
        let lhs = self.numerator as i64 * other.denominator as i64;
        let rhs = other.numerator as i64 * self.denominator as i64;
        // Flip when exactly one denominator is negative
        if (self.denominator < 0) != (other.denominator < 0) {
            Some(rhs.cmp(&lhs))
        } else {
            Some(lhs.cmp(&rhs))
        }
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rational({}/{})", self.numerator, self.denominator)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// A position split into hours, minutes, seconds and frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hmsf {
    pub hours: u16,
    pub minutes: u16,
    pub seconds: u16,
    pub frames: u16,
}

impl fmt::Display for Hmsf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds, self.frames
        )
    }
}

/// Converts a value in edit units to a sample count at `sample_rate`
///
/// `value * sample_rate / edit_rate`, computed in integers and truncated
/// toward zero. Fails when the result does not fit an `i64`.
pub fn eu_to_samples(value: Position, edit_rate: Rational, sample_rate: u32) -> Result<i64> {
    let rate = edit_rate.check()?;
    if rate.numerator == 0 {
        return Err(Error::ZeroDenominator(Rational::new(
            rate.denominator,
            rate.numerator,
        )));
    }
    let num = value as i128 * sample_rate as i128 * rate.denominator as i128;
    let samples = num / rate.numerator as i128;
    i64::try_from(samples).map_err(|_| Error::OutOfRange(format!("{} samples", samples)))
}

/// Splits a value in edit units into hours, minutes, seconds and frames
///
/// Frames are counted at `fps` frames per second inside the last second.
/// Negative times and more than `u16::MAX` hours are out of range.
pub fn eu_to_hmsf(value: Position, edit_rate: Rational, fps: u16) -> Result<Hmsf> {
    let rate = edit_rate.check()?;
    if rate.numerator == 0 {
        return Err(Error::ZeroDenominator(Rational::new(
            rate.denominator,
            rate.numerator,
        )));
    }

    // Position as a fraction of seconds: value * den / num
    let mut num = value as i128 * rate.denominator as i128;
    let mut den = rate.numerator as i128;
    if den < 0 {
        num = -num;
        den = -den;
    }
    if num < 0 {
        return Err(Error::OutOfRange(format!("negative time {}", value)));
    }

    let total_secs = num / den;
    // Below `fps`, so it fits
    let frames = ((num % den) * fps as i128 / den) as u16;
    let hours = u16::try_from(total_secs / 3600)
        .map_err(|_| Error::OutOfRange(format!("{} hours", total_secs / 3600)))?;

    Ok(Hmsf {
        hours,
        minutes: (total_secs % 3600 / 60) as u16,
        seconds: (total_secs % 60) as u16,
        frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_f64() {
        assert_eq!(Rational::new(1, 4).to_f64().unwrap(), 0.25);
        assert!(matches!(
            Rational::new(1, 0).to_f64(),
            Err(Error::ZeroDenominator(_))
        ));
    }

    #[test]
    fn test_cmp_value() {
        let half = Rational::new(1, 2);
        let third = Rational::new(1, 3);
        assert_eq!(half.cmp_value(&third), Some(Ordering::Greater));
        assert_eq!(half.cmp_value(&Rational::new(2, 4)), Some(Ordering::Equal));
        assert_eq!(Rational::new(-1, -2).cmp_value(&half), Some(Ordering::Equal));
        assert_eq!(half.cmp_value(&Rational::new(1, 0)), None);
    }

    #[test]
    fn test_eu_to_samples() {
        // One second at 25 fps edit rate, 48 kHz essence
        assert_eq!(eu_to_samples(25, Rational::new(25, 1), 48000).unwrap(), 48000);
        // Audio edit rate equal to the sample rate
        assert_eq!(eu_to_samples(1234, Rational::new(48000, 1), 48000).unwrap(), 1234);
        // NTSC rate
        assert_eq!(
            eu_to_samples(30000, Rational::new(30000, 1001), 48000).unwrap(),
            48048000
        );
    }

    #[test]
    fn test_eu_to_samples_zero_rate() {
        assert!(eu_to_samples(10, Rational::new(25, 0), 48000).is_err());
        assert!(eu_to_samples(10, Rational::new(0, 1), 48000).is_err());
    }

    #[test]
    fn test_eu_to_hmsf() {
        // 1h 2m 3s and 12 frames at 25 fps
        let value = (3600 + 120 + 3) * 25 + 12;
        let tc = eu_to_hmsf(value, Rational::new(25, 1), 25).unwrap();
        assert_eq!(
            tc,
            Hmsf {
                hours: 1,
                minutes: 2,
                seconds: 3,
                frames: 12
            }
        );
        assert_eq!(tc.to_string(), "01:02:03:12");
    }

    #[test]
    fn test_conversions_out_of_range() {
        assert!(matches!(
            eu_to_samples(i64::MAX, Rational::new(1, 1), 48000),
            Err(Error::OutOfRange(_))
        ));
        assert!(matches!(
            eu_to_hmsf(-25, Rational::new(25, 1), 25),
            Err(Error::OutOfRange(_))
        ));
        // Both signs negative is a positive time
        assert_eq!(eu_to_hmsf(-50, Rational::new(-25, 1), 25).unwrap().seconds, 2);
        // 65536 hours at one edit unit per second
        assert!(matches!(
            eu_to_hmsf(65536 * 3600, Rational::new(1, 1), 25),
            Err(Error::OutOfRange(_))
        ));
    }

    #[test]
    fn test_eu_to_hmsf_audio_rate() {
        // Half a second at 48 kHz is 12 frames at 25 fps
        let tc = eu_to_hmsf(48000 * 61 + 24000, Rational::new(48000, 1), 25).unwrap();
        assert_eq!(tc.minutes, 1);
        assert_eq!(tc.seconds, 1);
        assert_eq!(tc.frames, 12);
    }
}
