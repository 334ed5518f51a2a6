use num_traits::{One, Zero};
use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::math::Interval;

/// Tolerance used for every "is this zero" decision in the crate
pub const ZERO_TOLERANCE: f64 = 1e-12;

/// A numeric domain that expressions can be evaluated in.
///
/// Implemented for `f64` (point values) and [`Interval`] (sound enclosures).
/// Every primitive needed by the node kinds lives here, so evaluation code is
/// written once and instantiated for both domains.
pub trait Scalar:
    Copy
    + Debug
    + PartialEq
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Send
    + Sync
    + 'static
{
    /// Lift a constant node's component into this domain
    fn from_constant(value: f64, bounds: Interval) -> Self;

    fn from_f64(value: f64) -> Self;

    /// `self * self`, tighter than a general product for intervals
    fn squared(self) -> Self;
    fn sqrt(self) -> Self;
    fn sin(self) -> Self;
    fn cos(self) -> Self;
    fn tan(self) -> Self;
    fn asin(self) -> Self;
    fn acos(self) -> Self;
    fn exp(self) -> Self;
    fn ln(self) -> Self;
    fn powi(self, exponent: i32) -> Self;
    fn powf(self, exponent: f64) -> Self;
    fn pow(self, exponent: Self) -> Self;
}

impl Scalar for f64 {
    #[inline]
    fn from_constant(value: f64, _bounds: Interval) -> Self {
        value
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn squared(self) -> Self {
        self * self
    }

    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    #[inline]
    fn sin(self) -> Self {
        f64::sin(self)
    }

    #[inline]
    fn cos(self) -> Self {
        f64::cos(self)
    }

    #[inline]
    fn tan(self) -> Self {
        f64::tan(self)
    }

    // Arguments a hair outside [-1, 1] are rounding noise
    fn asin(self) -> Self {
        clamp_unit(self).map_or(f64::NAN, f64::asin)
    }

    fn acos(self) -> Self {
        clamp_unit(self).map_or(f64::NAN, f64::acos)
    }

    #[inline]
    fn exp(self) -> Self {
        f64::exp(self)
    }

    #[inline]
    fn ln(self) -> Self {
        f64::ln(self)
    }

    #[inline]
    fn powi(self, exponent: i32) -> Self {
        f64::powi(self, exponent)
    }

    #[inline]
    fn powf(self, exponent: f64) -> Self {
        f64::powf(self, exponent)
    }

    #[inline]
    fn pow(self, exponent: Self) -> Self {
        f64::powf(self, exponent)
    }
}

/// Clamp `value` into `[-1, 1]` if it is within tolerance of that range
pub(crate) fn clamp_unit(value: f64) -> Option<f64> {
    if value.abs() <= 1.0 + ZERO_TOLERANCE {
        Some(value.clamp(-1.0, 1.0))
    } else {
        None
    }
}

// ===== Float tolerance helpers =====

/// Check if a float is approximately zero (within tolerance)
#[inline]
pub(crate) fn is_zero(n: f64) -> bool {
    n.abs() <= ZERO_TOLERANCE
}

/// Check if a float is approximately one (within tolerance)
#[inline]
pub(crate) fn is_one(n: f64) -> bool {
    (n - 1.0).abs() <= ZERO_TOLERANCE
}

/// Check if a float is approximately negative one (within tolerance)
#[inline]
pub(crate) fn is_neg_one(n: f64) -> bool {
    (n + 1.0).abs() <= ZERO_TOLERANCE
}

/// Tolerance comparison of two floats
#[inline]
pub(crate) fn approx_eq(a: f64, b: f64) -> bool {
    is_zero(a - b)
}

/// Returns the exponent as an `i32` if it is an exact small integer
#[inline]
pub(crate) fn as_integer(n: f64) -> Option<i32> {
    if n.fract() == 0.0 && n.abs() <= f64::from(i32::MAX) {
        Some(n as i32)
    } else {
        None
    }
}
