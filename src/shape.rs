//! Semantic value shapes for the typed expression façade.
//!
//! A [`Shape`] tells [`ParametricExpression`](crate::ParametricExpression)
//! how many components a value has and how to move it in and out of a raw
//! column of numbers. Scalars are `f64`, fixed-size vectors and points are
//! [`Vector<N>`] and [`Point<N>`], and `Vec<f64>` covers sizes only known at
//! run time.

use std::fmt;
use std::ops::{Add, Index, Mul, Neg, Sub};

use crate::math::Interval;

/// A value type expressions can produce or consume
pub trait Shape: Clone + fmt::Debug + 'static {
    /// Number of components, `None` when only known at run time
    const NUM_DIMENSIONS: Option<usize>;

    /// Enclosure of a value of this shape
    type Bounds: Clone + fmt::Debug;

    /// Shape of a derivative with respect to a scalar
    type Differential: Shape;

    fn to_components(&self) -> Vec<f64>;
    fn from_components(components: &[f64]) -> Self;
    fn bounds_to_components(bounds: &Self::Bounds) -> Vec<Interval>;
    fn bounds_from_components(components: &[Interval]) -> Self::Bounds;
}

/// A shape whose component count is known at compile time
pub trait FixedShape: Shape {
    const DIMENSIONS: usize;
}

impl Shape for f64 {
    const NUM_DIMENSIONS: Option<usize> = Some(1);
    type Bounds = Interval;
    type Differential = f64;

    fn to_components(&self) -> Vec<f64> {
        vec![*self]
    }

    fn from_components(components: &[f64]) -> Self {
        components[0]
    }

    fn bounds_to_components(bounds: &Interval) -> Vec<Interval> {
        vec![*bounds]
    }

    fn bounds_from_components(components: &[Interval]) -> Interval {
        components[0]
    }
}

impl FixedShape for f64 {
    const DIMENSIONS: usize = 1;
}

impl Shape for Vec<f64> {
    const NUM_DIMENSIONS: Option<usize> = None;
    type Bounds = Vec<Interval>;
    type Differential = Vec<f64>;

    fn to_components(&self) -> Vec<f64> {
        self.clone()
    }

    fn from_components(components: &[f64]) -> Self {
        components.to_vec()
    }

    fn bounds_to_components(bounds: &Vec<Interval>) -> Vec<Interval> {
        bounds.clone()
    }

    fn bounds_from_components(components: &[Interval]) -> Vec<Interval> {
        components.to_vec()
    }
}

// ===== Vector =====

/// A displacement in N-dimensional space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vector<const N: usize> {
    pub components: [f64; N],
}

pub type Vector2 = Vector<2>;
pub type Vector3 = Vector<3>;

impl<const N: usize> Vector<N> {
    pub const fn new(components: [f64; N]) -> Self {
        Vector { components }
    }

    pub fn zero() -> Self {
        Vector::new([0.0; N])
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.components
            .iter()
            .zip(&other.components)
            .map(|(a, b)| a * b)
            .sum()
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }
}

impl Vector<2> {
    pub const fn xy(x: f64, y: f64) -> Self {
        Vector::new([x, y])
    }
}

impl Vector<3> {
    pub const fn xyz(x: f64, y: f64, z: f64) -> Self {
        Vector::new([x, y, z])
    }

    pub fn cross(&self, other: &Self) -> Self {
        let [a0, a1, a2] = self.components;
        let [b0, b1, b2] = other.components;
        Vector::new([a1 * b2 - a2 * b1, a2 * b0 - a0 * b2, a0 * b1 - a1 * b0])
    }
}

impl<const N: usize> Index<usize> for Vector<N> {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.components[index]
    }
}

impl<const N: usize> Add for Vector<N> {
    type Output = Vector<N>;

    fn add(self, rhs: Self) -> Self {
        Vector::new(std::array::from_fn(|i| self.components[i] + rhs.components[i]))
    }
}

impl<const N: usize> Sub for Vector<N> {
    type Output = Vector<N>;

    fn sub(self, rhs: Self) -> Self {
        Vector::new(std::array::from_fn(|i| self.components[i] - rhs.components[i]))
    }
}

impl<const N: usize> Mul<f64> for Vector<N> {
    type Output = Vector<N>;

    fn mul(self, rhs: f64) -> Self {
        Vector::new(self.components.map(|c| c * rhs))
    }
}

impl<const N: usize> Neg for Vector<N> {
    type Output = Vector<N>;

    fn neg(self) -> Self {
        Vector::new(self.components.map(|c| -c))
    }
}

impl<const N: usize> Shape for Vector<N> {
    const NUM_DIMENSIONS: Option<usize> = Some(N);
    type Bounds = [Interval; N];
    type Differential = Vector<N>;

    fn to_components(&self) -> Vec<f64> {
        self.components.to_vec()
    }

    fn from_components(components: &[f64]) -> Self {
        Vector::new(std::array::from_fn(|i| components[i]))
    }

    fn bounds_to_components(bounds: &[Interval; N]) -> Vec<Interval> {
        bounds.to_vec()
    }

    fn bounds_from_components(components: &[Interval]) -> [Interval; N] {
        std::array::from_fn(|i| components[i])
    }
}

impl<const N: usize> FixedShape for Vector<N> {
    const DIMENSIONS: usize = N;
}

// ===== Point =====

/// A position in N-dimensional space; differences of points are vectors
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point<const N: usize> {
    pub coordinates: [f64; N],
}

pub type Point2 = Point<2>;
pub type Point3 = Point<3>;

impl<const N: usize> Point<N> {
    pub const fn new(coordinates: [f64; N]) -> Self {
        Point { coordinates }
    }

    pub fn origin() -> Self {
        Point::new([0.0; N])
    }
}

impl Point<2> {
    pub const fn xy(x: f64, y: f64) -> Self {
        Point::new([x, y])
    }
}

impl Point<3> {
    pub const fn xyz(x: f64, y: f64, z: f64) -> Self {
        Point::new([x, y, z])
    }
}

impl<const N: usize> Index<usize> for Point<N> {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.coordinates[index]
    }
}

impl<const N: usize> Sub for Point<N> {
    type Output = Vector<N>;

    fn sub(self, rhs: Self) -> Vector<N> {
        Vector::new(std::array::from_fn(|i| self.coordinates[i] - rhs.coordinates[i]))
    }
}

impl<const N: usize> Add<Vector<N>> for Point<N> {
    type Output = Point<N>;

    fn add(self, rhs: Vector<N>) -> Point<N> {
        Point::new(std::array::from_fn(|i| self.coordinates[i] + rhs.components[i]))
    }
}

impl<const N: usize> Shape for Point<N> {
    const NUM_DIMENSIONS: Option<usize> = Some(N);
    type Bounds = [Interval; N];
    type Differential = Vector<N>;

    fn to_components(&self) -> Vec<f64> {
        self.coordinates.to_vec()
    }

    fn from_components(components: &[f64]) -> Self {
        Point::new(std::array::from_fn(|i| components[i]))
    }

    fn bounds_to_components(bounds: &[Interval; N]) -> Vec<Interval> {
        bounds.to_vec()
    }

    fn bounds_from_components(components: &[Interval]) -> [Interval; N] {
        std::array::from_fn(|i| components[i])
    }
}

impl<const N: usize> FixedShape for Point<N> {
    const DIMENSIONS: usize = N;
}

impl<const N: usize> fmt::Display for Vector<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<")?;
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, ">")
    }
}

impl<const N: usize> fmt::Display for Point<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.coordinates.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_vector_arithmetic() {
        let a = Point3::xyz(1.0, 2.0, 3.0);
        let b = Point3::xyz(0.0, 2.0, 5.0);
        let d = a - b;
        assert_eq!(d, Vector3::xyz(1.0, 0.0, -2.0));
        assert_eq!(b + d, a);
        assert_eq!((d * 2.0)[2], -4.0);
        assert_eq!(Vector3::xyz(1.0, 0.0, 0.0).cross(&Vector3::xyz(0.0, 1.0, 0.0)), Vector3::xyz(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_component_round_trip_and_dimensions() {
        assert_eq!(<Point2 as Shape>::NUM_DIMENSIONS, Some(2));
        assert_eq!(<Vec<f64> as Shape>::NUM_DIMENSIONS, None);
        assert_eq!(<Vector3 as FixedShape>::DIMENSIONS, 3);
        let p = Point2::from_components(&[4.0, 5.0]);
        assert_eq!(p.to_components(), vec![4.0, 5.0]);
        assert_eq!(format!("{p}"), "(4, 5)");
        assert_eq!(format!("{}", Vector2::xy(1.0, -1.5)), "<1, -1.5>");
    }
}
