//! Interval arithmetic with outward rounding
//!
//! Every operation returns an enclosure of all values the exact operation can
//! take over its operands: if `x` lies in `a` then `f(x)` lies in `f(a)`.
//! Rounding is handled by stepping each computed bound one ulp outward
//! (two ulps for library transcendentals, which are not correctly rounded).

use num_traits::{One, Zero};
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::traits::{Scalar, ZERO_TOLERANCE, as_integer};

/// A closed interval `[lower, upper]`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interval {
    lower: f64,
    upper: f64,
}

#[inline]
fn down(x: f64) -> f64 {
    if x.is_finite() { x.next_down() } else { x }
}

#[inline]
fn up(x: f64) -> f64 {
    if x.is_finite() { x.next_up() } else { x }
}

#[inline]
fn down2(x: f64) -> f64 {
    down(down(x))
}

#[inline]
fn up2(x: f64) -> f64 {
    up(up(x))
}

/// Product of two bounds where `0 * inf` is taken as zero
#[inline]
fn bound_product(a: f64, b: f64) -> f64 {
    if a == 0.0 || b == 0.0 { 0.0 } else { a * b }
}

impl Interval {
    /// Create the interval spanning `a` and `b` (in either order)
    #[inline]
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Interval { lower: a, upper: b }
        } else {
            Interval { lower: b, upper: a }
        }
    }

    /// Degenerate interval containing only `value`
    #[inline]
    pub fn singleton(value: f64) -> Self {
        Interval {
            lower: value,
            upper: value,
        }
    }

    /// The entire real line
    pub fn whole() -> Self {
        Interval {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }

    /// The empty interval, produced when a function is applied wholly
    /// outside its domain
    pub fn empty() -> Self {
        Interval {
            lower: f64::NAN,
            upper: f64::NAN,
        }
    }

    #[inline]
    pub fn lower(&self) -> f64 {
        self.lower
    }

    #[inline]
    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_nan() || self.upper.is_nan()
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn midpoint(&self) -> f64 {
        self.lower + 0.5 * (self.upper - self.lower)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    pub fn contains_interval(&self, other: &Interval) -> bool {
        self.lower <= other.lower && other.upper <= self.upper
    }

    /// Smallest interval containing both operands
    pub fn hull(&self, other: &Interval) -> Interval {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Interval {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    /// Tolerance comparison of both bounds
    pub fn approx_eq(&self, other: &Interval, tolerance: f64) -> bool {
        (self.lower - other.lower).abs() <= tolerance
            && (self.upper - other.upper).abs() <= tolerance
    }

    pub fn abs(self) -> Interval {
        if self.is_empty() || self.lower >= 0.0 {
            self
        } else if self.upper <= 0.0 {
            -self
        } else {
            Interval {
                lower: 0.0,
                upper: (-self.lower).max(self.upper),
            }
        }
    }

    pub fn squared(self) -> Interval {
        if self.is_empty() {
            return self;
        }
        let a = self.abs();
        Interval {
            lower: down(a.lower * a.lower).max(0.0),
            upper: up(a.upper * a.upper),
        }
    }

    pub fn sqrt(self) -> Interval {
        if self.is_empty() || self.upper < 0.0 {
            return Interval::empty();
        }
        let lower = if self.lower <= 0.0 {
            0.0
        } else {
            down(self.lower.sqrt()).max(0.0)
        };
        Interval {
            lower,
            upper: up(self.upper.sqrt()),
        }
    }

    pub fn exp(self) -> Interval {
        if self.is_empty() {
            return self;
        }
        Interval {
            lower: down2(self.lower.exp()).max(0.0),
            upper: up2(self.upper.exp()),
        }
    }

    pub fn ln(self) -> Interval {
        if self.is_empty() || self.upper < 0.0 {
            return Interval::empty();
        }
        let lower = if self.lower <= 0.0 {
            f64::NEG_INFINITY
        } else {
            down2(self.lower.ln())
        };
        Interval {
            lower,
            upper: up2(self.upper.ln()),
        }
    }

    pub fn cos(self) -> Interval {
        if self.is_empty() {
            return self;
        }
        let (a, b) = (self.lower, self.upper);
        if !(a.is_finite() && b.is_finite()) || b - a >= TAU {
            return Interval::new(-1.0, 1.0);
        }
        let (ca, cb) = (a.cos(), b.cos());
        let mut lower = ca.min(cb);
        let mut upper = ca.max(cb);
        // maxima at 2kπ, minima at (2k + 1)π
        if (a / TAU).ceil() * TAU <= b {
            upper = 1.0;
        }
        if ((a - PI) / TAU).ceil() * TAU + PI <= b {
            lower = -1.0;
        }
        Interval {
            lower: down2(lower).max(-1.0),
            upper: up2(upper).min(1.0),
        }
    }

    pub fn sin(self) -> Interval {
        if self.is_empty() {
            return self;
        }
        let (a, b) = (self.lower, self.upper);
        if !(a.is_finite() && b.is_finite()) || b - a >= TAU {
            return Interval::new(-1.0, 1.0);
        }
        let (sa, sb) = (a.sin(), b.sin());
        let mut lower = sa.min(sb);
        let mut upper = sa.max(sb);
        // maxima at π/2 + 2kπ, minima at -π/2 + 2kπ
        if ((a - FRAC_PI_2) / TAU).ceil() * TAU + FRAC_PI_2 <= b {
            upper = 1.0;
        }
        if ((a + FRAC_PI_2) / TAU).ceil() * TAU - FRAC_PI_2 <= b {
            lower = -1.0;
        }
        Interval {
            lower: down2(lower).max(-1.0),
            upper: up2(upper).min(1.0),
        }
    }

    pub fn tan(self) -> Interval {
        if self.is_empty() {
            return self;
        }
        let (a, b) = (self.lower, self.upper);
        if !(a.is_finite() && b.is_finite()) || b - a >= PI {
            return Interval::whole();
        }
        // poles at π/2 + kπ
        if ((a - FRAC_PI_2) / PI).ceil() * PI + FRAC_PI_2 <= b {
            return Interval::whole();
        }
        Interval {
            lower: down2(a.tan()),
            upper: up2(b.tan()),
        }
    }

    /// Clamp both bounds into `[-1, 1]`, or `None` if the interval misses
    /// that range by more than the tolerance
    fn clamped_to_unit(self) -> Option<(f64, f64)> {
        if self.is_empty()
            || self.lower > 1.0 + ZERO_TOLERANCE
            || self.upper < -1.0 - ZERO_TOLERANCE
        {
            return None;
        }
        Some((self.lower.clamp(-1.0, 1.0), self.upper.clamp(-1.0, 1.0)))
    }

    pub fn asin(self) -> Interval {
        match self.clamped_to_unit() {
            Some((a, b)) => Interval {
                lower: down2(a.asin()).max(down(-FRAC_PI_2)),
                upper: up2(b.asin()).min(up(FRAC_PI_2)),
            },
            None => Interval::empty(),
        }
    }

    pub fn acos(self) -> Interval {
        match self.clamped_to_unit() {
            Some((a, b)) => Interval {
                lower: down2(b.acos()).max(0.0),
                upper: up2(a.acos()).min(up(PI)),
            },
            None => Interval::empty(),
        }
    }

    pub fn powi(self, exponent: i32) -> Interval {
        if self.is_empty() {
            return self;
        }
        if exponent == 0 {
            return Interval::one();
        }
        if exponent < 0 {
            return match exponent.checked_neg() {
                Some(positive) => Interval::one() / self.powi(positive),
                None => Interval::whole(),
            };
        }
        if exponent % 2 == 0 {
            let a = self.abs();
            Interval {
                lower: down2(a.lower.powi(exponent)).max(0.0),
                upper: up2(a.upper.powi(exponent)),
            }
        } else {
            Interval {
                lower: down2(self.lower.powi(exponent)),
                upper: up2(self.upper.powi(exponent)),
            }
        }
    }

    /// Real power; non-integer exponents restrict the base to `[0, inf)`
    pub fn powf(self, exponent: f64) -> Interval {
        if let Some(n) = as_integer(exponent) {
            return self.powi(n);
        }
        if self.is_empty() || self.upper < 0.0 {
            return Interval::empty();
        }
        let a = self.lower.max(0.0);
        let b = self.upper;
        let (low, high) = if exponent > 0.0 {
            (a.powf(exponent), b.powf(exponent))
        } else {
            (b.powf(exponent), a.powf(exponent))
        };
        Interval {
            lower: down2(low).max(0.0),
            upper: up2(high),
        }
    }

    /// Power with an interval exponent.
    ///
    /// A base that reaches below zero is only defined at integer exponents,
    /// where the sign alternates, so the enclosure is the whole line.
    pub fn pow(self, exponent: Interval) -> Interval {
        if self.is_empty() || exponent.is_empty() {
            return Interval::empty();
        }
        if exponent.lower == exponent.upper {
            return self.powf(exponent.lower);
        }
        if self.lower < 0.0 {
            return Interval::whole();
        }
        (exponent * self.ln()).exp()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

impl From<f64> for Interval {
    fn from(value: f64) -> Self {
        Interval::singleton(value)
    }
}

impl Add for Interval {
    type Output = Interval;

    fn add(self, rhs: Interval) -> Interval {
        Interval {
            lower: down(self.lower + rhs.lower),
            upper: up(self.upper + rhs.upper),
        }
    }
}

impl Sub for Interval {
    type Output = Interval;

    fn sub(self, rhs: Interval) -> Interval {
        Interval {
            lower: down(self.lower - rhs.upper),
            upper: up(self.upper - rhs.lower),
        }
    }
}

impl Mul for Interval {
    type Output = Interval;

    fn mul(self, rhs: Interval) -> Interval {
        if self.is_empty() || rhs.is_empty() {
            return Interval::empty();
        }
        let products = [
            bound_product(self.lower, rhs.lower),
            bound_product(self.lower, rhs.upper),
            bound_product(self.upper, rhs.lower),
            bound_product(self.upper, rhs.upper),
        ];
        let lower = products.iter().copied().fold(f64::INFINITY, f64::min);
        let upper = products.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Interval {
            lower: down(lower),
            upper: up(upper),
        }
    }
}

impl Div for Interval {
    type Output = Interval;

    fn div(self, rhs: Interval) -> Interval {
        if self.is_empty() || rhs.is_empty() {
            return Interval::empty();
        }
        if rhs.contains(0.0) {
            return Interval::whole();
        }
        let quotients = [
            self.lower / rhs.lower,
            self.lower / rhs.upper,
            self.upper / rhs.lower,
            self.upper / rhs.upper,
        ];
        let lower = quotients.iter().copied().fold(f64::INFINITY, f64::min);
        let upper = quotients.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Interval {
            lower: down(lower),
            upper: up(upper),
        }
    }
}

impl Neg for Interval {
    type Output = Interval;

    #[inline]
    fn neg(self) -> Interval {
        Interval {
            lower: -self.upper,
            upper: -self.lower,
        }
    }
}

impl Zero for Interval {
    fn zero() -> Self {
        Interval::singleton(0.0)
    }

    fn is_zero(&self) -> bool {
        self.lower == 0.0 && self.upper == 0.0
    }
}

impl One for Interval {
    fn one() -> Self {
        Interval::singleton(1.0)
    }
}

impl Scalar for Interval {
    #[inline]
    fn from_constant(_value: f64, bounds: Interval) -> Self {
        bounds
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        Interval::singleton(value)
    }

    fn squared(self) -> Self {
        Interval::squared(self)
    }

    fn sqrt(self) -> Self {
        Interval::sqrt(self)
    }

    fn sin(self) -> Self {
        Interval::sin(self)
    }

    fn cos(self) -> Self {
        Interval::cos(self)
    }

    fn tan(self) -> Self {
        Interval::tan(self)
    }

    fn asin(self) -> Self {
        Interval::asin(self)
    }

    fn acos(self) -> Self {
        Interval::acos(self)
    }

    fn exp(self) -> Self {
        Interval::exp(self)
    }

    fn ln(self) -> Self {
        Interval::ln(self)
    }

    fn powi(self, exponent: i32) -> Self {
        Interval::powi(self, exponent)
    }

    fn powf(self, exponent: f64) -> Self {
        Interval::powf(self, exponent)
    }

    fn pow(self, exponent: Self) -> Self {
        Interval::pow(self, exponent)
    }
}
