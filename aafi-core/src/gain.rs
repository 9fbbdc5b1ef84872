//! Gain automation curves
//!
//! A gain is either a single multiplier applied to a whole clip or track, or
//! an ordered list of control points forming an automation curve. Values
//! between points are left to the consumer to interpolate.

use crate::{Error, Rational, Result};
use std::cmp::Ordering;

pub const INTERPOL_NONE: u32 = 0x0400;
pub const INTERPOL_LINEAR: u32 = 0x0800;
pub const INTERPOL_LOG: u32 = 0x1000;
pub const INTERPOL_CONSTANT: u32 = 0x2000;
pub const INTERPOL_POWER: u32 = 0x4000;
pub const INTERPOL_BSPLINE: u32 = 0x8000;

const INTERPOL_MASK: u32 = INTERPOL_NONE
    | INTERPOL_LINEAR
    | INTERPOL_LOG
    | INTERPOL_CONSTANT
    | INTERPOL_POWER
    | INTERPOL_BSPLINE;

pub const GAIN_CONSTANT: u32 = 0x0001;
pub const GAIN_VARIABLE: u32 = 0x0002;

/// How values between two control points are meant to be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Interpolation {
    /// Hold the previous value
    None,
    #[default]
    Linear,
    Log,
    /// Step to the next value
    Constant,
    Power,
    /// Cubic spline through the points
    BSpline,
}

impl Interpolation {
    /// Returns the flag bit for this interpolation
    pub fn flag(self) -> u32 {
        match self {
            Interpolation::None => INTERPOL_NONE,
            Interpolation::Linear => INTERPOL_LINEAR,
            Interpolation::Log => INTERPOL_LOG,
            Interpolation::Constant => INTERPOL_CONSTANT,
            Interpolation::Power => INTERPOL_POWER,
            Interpolation::BSpline => INTERPOL_BSPLINE,
        }
    }

    /// Extracts the interpolation from a flag set
    ///
    /// Returns `Ok(None)` when no interpolation bit is set and an error when
    /// more than one is.
    pub fn from_flags(flags: u32) -> Result<Option<Self>> {
        let bits = flags & INTERPOL_MASK;
        let interpolation = match bits {
            0 => return Ok(None),
            INTERPOL_NONE => Interpolation::None,
            INTERPOL_LINEAR => Interpolation::Linear,
            INTERPOL_LOG => Interpolation::Log,
            INTERPOL_CONSTANT => Interpolation::Constant,
            INTERPOL_POWER => Interpolation::Power,
            INTERPOL_BSPLINE => Interpolation::BSpline,
            _ => return Err(Error::InvalidFlags(flags)),
        };
        Ok(Some(interpolation))
    }
}

/// A single (time, value) pair on a curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlPoint {
    /// Time of the point
    pub time: Rational,
    /// Multiplier level at that time
    pub value: Rational,
}

impl ControlPoint {
    pub fn new(time: Rational, value: Rational) -> Self {
        Self { time, value }
    }
}

/// Whether a gain is a single multiplier or an automation curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GainKind {
    Constant,
    Variable,
}

/// Gain applied to a clip or to a whole track
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioGain {
    kind: GainKind,
    interpolation: Interpolation,
    points: Vec<ControlPoint>,
}

impl AudioGain {
    /// Creates a constant gain holding a single multiplier
    pub fn constant(value: Rational) -> Self {
        Self {
            kind: GainKind::Constant,
            interpolation: Interpolation::None,
            points: vec![ControlPoint::new(Rational::zero(), value)],
        }
    }

    /// Creates an automation curve
    ///
    /// Points must be non-empty and strictly increasing in time.
    pub fn variable(interpolation: Interpolation, points: Vec<ControlPoint>) -> Result<Self> {
        check_points(&points)?;
        Ok(Self {
            kind: GainKind::Variable,
            interpolation,
            points,
        })
    }

    /// Rebuilds a gain from flag bits and parallel time/value arrays
    pub fn from_parts(flags: u32, times: &[Rational], values: &[Rational]) -> Result<Self> {
        if times.len() != values.len() {
            return Err(Error::InvalidCurve(format!(
                "{} times for {} values",
                times.len(),
                values.len()
            )));
        }

        let points: Vec<ControlPoint> = times
            .iter()
            .zip(values)
            .map(|(t, v)| ControlPoint::new(*t, *v))
            .collect();

        let interpolation = Interpolation::from_flags(flags)?.unwrap_or_default();

        match (flags & GAIN_CONSTANT != 0, flags & GAIN_VARIABLE != 0) {
            (true, false) => {
                if points.len() != 1 {
                    return Err(Error::InvalidCurve(format!(
                        "constant gain with {} points",
                        points.len()
                    )));
                }
                Ok(Self {
                    kind: GainKind::Constant,
                    interpolation: Interpolation::None,
                    points,
                })
            }
            (false, true) => Self::variable(interpolation, points),
            _ => Err(Error::InvalidFlags(flags)),
        }
    }

    /// Returns the gain kind
    pub fn kind(&self) -> GainKind {
        self.kind
    }

    /// Returns the interpolation between points
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Returns the control points in time order
    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    /// Number of control points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a well-formed gain
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the kind and interpolation as flag bits
    pub fn flags(&self) -> u32 {
        match self.kind {
            GainKind::Constant => GAIN_CONSTANT,
            GainKind::Variable => GAIN_VARIABLE | self.interpolation.flag(),
        }
    }

    /// Returns the multiplier of a constant gain
    pub fn constant_value(&self) -> Option<Rational> {
        match self.kind {
            GainKind::Constant => self.points.first().map(|p| p.value),
            GainKind::Variable => None,
        }
    }

    /// Returns the multiplier in effect at `time`
    ///
    /// Only a constant gain answers this; curves are evaluated by the caller.
    pub fn value_at(&self, _time: Rational) -> Option<Rational> {
        self.constant_value()
    }

    /// Returns the time values as a separate array
    pub fn times(&self) -> Vec<Rational> {
        self.points.iter().map(|p| p.time).collect()
    }

    /// Returns the level values as a separate array
    pub fn values(&self) -> Vec<Rational> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Validates that a curve is non-empty and strictly increasing in time
pub(crate) fn check_points(points: &[ControlPoint]) -> Result<()> {
    if points.is_empty() {
        return Err(Error::InvalidCurve("curve has no points".to_string()));
    }

    for pair in points.windows(2) {
        match pair[0].time.cmp_value(&pair[1].time) {
            Some(Ordering::Less) => {}
            Some(_) => {
                return Err(Error::InvalidCurve(format!(
                    "time {} does not follow {}",
                    pair[1].time, pair[0].time
                )))
            }
            None => {
                return Err(Error::InvalidCurve(format!(
                    "invalid time {} or {}",
                    pair[0].time, pair[1].time
                )))
            }
        }
    }

    for point in points {
        point.time.check()?;
        point.value.check()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(t: (i32, i32), v: (i32, i32)) -> ControlPoint {
        ControlPoint::new(Rational::new(t.0, t.1), Rational::new(v.0, v.1))
    }

    #[test]
    fn test_constant_gain() {
        let gain = AudioGain::constant(Rational::new(1, 2));
        assert_eq!(gain.kind(), GainKind::Constant);
        assert_eq!(gain.len(), 1);
        assert_eq!(gain.flags(), GAIN_CONSTANT);
        assert_eq!(gain.value_at(Rational::zero()), Some(Rational::new(1, 2)));
        assert_eq!(gain.value_at(Rational::new(90, 1)), Some(Rational::new(1, 2)));
    }

    #[test]
    fn test_variable_gain() {
        let gain = AudioGain::variable(
            Interpolation::Log,
            vec![pt((0, 1), (0, 1)), pt((10, 1), (1, 1)), pt((20, 1), (1, 2))],
        )
        .unwrap();

        assert_eq!(gain.flags(), GAIN_VARIABLE | INTERPOL_LOG);
        assert_eq!(gain.times().len(), gain.values().len());
        assert_eq!(gain.constant_value(), None);
        assert_eq!(gain.value_at(Rational::new(10, 1)), None);
    }

    #[test]
    fn test_variable_gain_rejects_unordered() {
        let err = AudioGain::variable(
            Interpolation::Linear,
            vec![pt((5, 1), (0, 1)), pt((5, 1), (1, 1))],
        );
        assert!(matches!(err, Err(Error::InvalidCurve(_))));

        assert!(AudioGain::variable(Interpolation::Linear, Vec::new()).is_err());
    }

    #[test]
    fn test_from_parts() {
        let times = [Rational::zero()];
        let values = [Rational::new(3, 4)];
        let gain = AudioGain::from_parts(GAIN_CONSTANT, &times, &values).unwrap();
        assert_eq!(gain.constant_value(), Some(Rational::new(3, 4)));

        // Both kinds at once
        assert!(matches!(
            AudioGain::from_parts(GAIN_CONSTANT | GAIN_VARIABLE, &times, &values),
            Err(Error::InvalidFlags(_))
        ));

        // Constant with two points
        let times = [Rational::zero(), Rational::one()];
        let values = [Rational::one(), Rational::one()];
        assert!(AudioGain::from_parts(GAIN_CONSTANT, &times, &values).is_err());

        let gain =
            AudioGain::from_parts(GAIN_VARIABLE | INTERPOL_BSPLINE, &times, &values).unwrap();
        assert_eq!(gain.interpolation(), Interpolation::BSpline);
    }

    #[test]
    fn test_interpolation_flags() {
        assert_eq!(
            Interpolation::from_flags(INTERPOL_POWER | GAIN_VARIABLE).unwrap(),
            Some(Interpolation::Power)
        );
        assert_eq!(Interpolation::from_flags(GAIN_CONSTANT).unwrap(), None);
        assert!(Interpolation::from_flags(INTERPOL_LOG | INTERPOL_LINEAR).is_err());
    }
}
