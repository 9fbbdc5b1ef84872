//! Fades and crossfades
//!
//! A transition spans `len` edit units and carries one curve, mirrored for
//! both halves of a crossfade, or two independent curves.

use crate::gain::{check_points, ControlPoint, Interpolation};
use crate::{Error, Position, Rational, Result};

pub const TRANS_SINGLE_CURVE: u32 = 0x0010;
pub const TRANS_TWO_CURVE: u32 = 0x0020;
pub const TRANS_FADE_IN: u32 = 0x0040;
pub const TRANS_FADE_OUT: u32 = 0x0080;
pub const TRANS_XFADE: u32 = 0x0100;

/// Direction of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransitionKind {
    FadeIn,
    FadeOut,
    CrossFade,
}

impl TransitionKind {
    /// Returns the flag bit for this kind
    pub fn flag(self) -> u32 {
        match self {
            TransitionKind::FadeIn => TRANS_FADE_IN,
            TransitionKind::FadeOut => TRANS_FADE_OUT,
            TransitionKind::CrossFade => TRANS_XFADE,
        }
    }

    /// Extracts exactly one direction from a flag set
    pub fn from_flags(flags: u32) -> Result<Self> {
        match flags & (TRANS_FADE_IN | TRANS_FADE_OUT | TRANS_XFADE) {
            TRANS_FADE_IN => Ok(TransitionKind::FadeIn),
            TRANS_FADE_OUT => Ok(TransitionKind::FadeOut),
            TRANS_XFADE => Ok(TransitionKind::CrossFade),
            _ => Err(Error::InvalidFlags(flags)),
        }
    }

    /// Linear curve used when the source does not describe one
    pub fn default_curve(self) -> Vec<ControlPoint> {
        let (start, end) = match self {
            TransitionKind::FadeOut => (Rational::one(), Rational::zero()),
            TransitionKind::FadeIn | TransitionKind::CrossFade => {
                (Rational::zero(), Rational::one())
            }
        };
        vec![
            ControlPoint::new(Rational::zero(), start),
            ControlPoint::new(Rational::one(), end),
        ]
    }
}

/// Curve points of a transition
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransitionCurves {
    /// No points, after the curves have been released
    Released,
    /// One curve, mirrored for the second half of a crossfade
    Single(Vec<ControlPoint>),
    /// One curve per half
    Two {
        a: Vec<ControlPoint>,
        b: Vec<ControlPoint>,
    },
}

/// A fade in, fade out or crossfade
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transition {
    /// Direction
    pub kind: TransitionKind,
    /// Interpolation between curve points
    pub interpolation: Interpolation,
    /// Length of the transition, in edit units
    pub len: Position,
    /// Where the preceding segment should end and the following one begin
    /// if the transition is dropped
    pub cut_pt: Position,
    curves: TransitionCurves,
}

impl Transition {
    /// Creates a single-curve transition
    pub fn single(
        kind: TransitionKind,
        interpolation: Interpolation,
        len: Position,
        cut_pt: Position,
        curve: Vec<ControlPoint>,
    ) -> Result<Self> {
        check_points(&curve)?;
        Ok(Self {
            kind,
            interpolation,
            len,
            cut_pt,
            curves: TransitionCurves::Single(curve),
        })
    }

    /// Creates a two-curve transition
    pub fn two_curve(
        kind: TransitionKind,
        interpolation: Interpolation,
        len: Position,
        cut_pt: Position,
        a: Vec<ControlPoint>,
        b: Vec<ControlPoint>,
    ) -> Result<Self> {
        check_points(&a)?;
        check_points(&b)?;
        Ok(Self {
            kind,
            interpolation,
            len,
            cut_pt,
            curves: TransitionCurves::Two { a, b },
        })
    }

    /// Creates a single-curve transition with the kind's linear default curve
    pub fn with_default_curve(
        kind: TransitionKind,
        interpolation: Interpolation,
        len: Position,
        cut_pt: Position,
    ) -> Self {
        Self {
            kind,
            interpolation,
            len,
            cut_pt,
            curves: TransitionCurves::Single(kind.default_curve()),
        }
    }

    /// Returns arity, direction and interpolation as flag bits
    pub fn flags(&self) -> u32 {
        let arity = match self.curves {
            TransitionCurves::Two { .. } => TRANS_TWO_CURVE,
            TransitionCurves::Single(_) | TransitionCurves::Released => TRANS_SINGLE_CURVE,
        };
        arity | self.kind.flag() | self.interpolation.flag()
    }

    /// True if this is a fade in
    pub fn is_fade_in(&self) -> bool {
        self.kind == TransitionKind::FadeIn
    }

    /// True if this is a fade out
    pub fn is_fade_out(&self) -> bool {
        self.kind == TransitionKind::FadeOut
    }

    /// True if this is a crossfade
    pub fn is_xfade(&self) -> bool {
        self.kind == TransitionKind::CrossFade
    }

    /// Returns the curves
    pub fn curves(&self) -> &TransitionCurves {
        &self.curves
    }

    /// Returns the single curve, or the first of two
    pub fn curve_a(&self) -> Option<&[ControlPoint]> {
        match &self.curves {
            TransitionCurves::Single(a) | TransitionCurves::Two { a, .. } => Some(a),
            TransitionCurves::Released => None,
        }
    }

    /// Returns the second curve of a two-curve transition
    pub fn curve_b(&self) -> Option<&[ControlPoint]> {
        match &self.curves {
            TransitionCurves::Two { b, .. } => Some(b),
            _ => None,
        }
    }

    /// Releases the curve points, keeping the transition itself
    ///
    /// Returns the number of curves released.
    pub fn clear_curves(&mut self) -> usize {
        match std::mem::replace(&mut self.curves, TransitionCurves::Released) {
            TransitionCurves::Released => 0,
            TransitionCurves::Single(_) => 1,
            TransitionCurves::Two { .. } => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gain::INTERPOL_LINEAR;

    #[test]
    fn test_single_curve() {
        let trans = Transition::with_default_curve(
            TransitionKind::FadeIn,
            Interpolation::Linear,
            48,
            24,
        );
        assert_eq!(
            trans.flags(),
            TRANS_SINGLE_CURVE | TRANS_FADE_IN | INTERPOL_LINEAR
        );
        assert_eq!(trans.curve_a().map(<[_]>::len), Some(2));
        assert!(trans.curve_b().is_none());
    }

    #[test]
    fn test_two_curve() {
        let a = TransitionKind::FadeOut.default_curve();
        let mut b = TransitionKind::FadeIn.default_curve();
        b.insert(
            1,
            ControlPoint::new(Rational::new(1, 2), Rational::new(1, 4)),
        );

        let trans = Transition::two_curve(
            TransitionKind::CrossFade,
            Interpolation::Linear,
            100,
            50,
            a,
            b,
        )
        .unwrap();

        assert_ne!(trans.flags() & TRANS_TWO_CURVE, 0);
        assert_eq!(trans.curve_a().unwrap().len(), 2);
        assert_eq!(trans.curve_b().unwrap().len(), 3);
        assert!(trans.is_xfade());
    }

    #[test]
    fn test_fade_out_default_curve() {
        let curve = TransitionKind::FadeOut.default_curve();
        assert_eq!(curve[0].value, Rational::one());
        assert_eq!(curve[1].value, Rational::zero());
    }

    #[test]
    fn test_kind_from_flags() {
        assert_eq!(
            TransitionKind::from_flags(TRANS_FADE_OUT | TRANS_SINGLE_CURVE).unwrap(),
            TransitionKind::FadeOut
        );
        assert!(TransitionKind::from_flags(TRANS_FADE_IN | TRANS_FADE_OUT).is_err());
        assert!(TransitionKind::from_flags(TRANS_TWO_CURVE).is_err());
    }

    #[test]
    fn test_clear_curves() {
        let mut trans = Transition::with_default_curve(
            TransitionKind::FadeOut,
            Interpolation::Linear,
            10,
            0,
        );
        assert_eq!(trans.clear_curves(), 1);
        assert!(trans.curve_a().is_none());
        assert_eq!(trans.clear_curves(), 0);
        assert!(trans.is_fade_out());
    }
}
