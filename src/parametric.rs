//! Typed façade over expression nodes
//!
//! [`ParametricExpression<V, P>`] is a function from a parameter of shape `P`
//! to a value of shape `V`, for example `ParametricExpression<Point3, f64>`
//! for a space curve or `ParametricExpression<f64, Vector2>` for a scalar
//! field over the plane. Every combinator validates shapes before building
//! anything and runs the construction-time simplifier. Fallible combinators
//! then pass the result through a fresh [`DeduplicationCache`]. The
//! infallible ones (`scaled`, `norm`, negation and multiplication by an
//! `f64`) only put a single new root over their operand, so a deduplicated
//! operand gives a deduplicated result.
//!
//! ```
//! use parametric_expr::{ParametricExpression, Vector3};
//!
//! let t = ParametricExpression::<f64>::parameter(0).expect("Valid parameter index");
//! let direction = ParametricExpression::<Vector3>::constant(&Vector3::xyz(1.0, 1.0, 1.0));
//! let line = (&direction * &t)
//!     .expect("Should build")
//!     .translated(&Vector3::xyz(1.0, 1.0, 1.0))
//!     .expect("Should build");
//! let height = line.dot_vector(&Vector3::xyz(0.0, 1.0, 0.0)).expect("Should build");
//! assert_eq!(height.evaluate(&1.0).expect("Should evaluate"), 2.0);
//! ```

use ::log::debug;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::Arc;

use crate::constructors;
use crate::dedup::DeduplicationCache;
use crate::differentiation;
use crate::error::{ExprError, Result};
use crate::evaluator::{CompiledExpression, EvaluationDomain, Evaluator};
use crate::functions::ElementaryFunction;
use crate::math::{Interval, Matrix};
use crate::node::{NodeKind, NodeRef};
use crate::shape::{FixedShape, Shape};

/// A function from parameters of shape `P` to values of shape `V`
pub struct ParametricExpression<V: Shape, P: Shape = f64> {
    node: NodeRef,
    _shape: PhantomData<fn() -> (V, P)>,
}

impl<V: Shape, P: Shape> Clone for ParametricExpression<V, P> {
    fn clone(&self) -> Self {
        ParametricExpression {
            node: self.node.clone(),
            _shape: PhantomData,
        }
    }
}

impl<V: Shape, P: Shape> fmt::Debug for ParametricExpression<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParametricExpression")
            .field("num_parameters", &self.node.num_parameters())
            .field("num_dimensions", &self.node.num_dimensions())
            .field("kind", &self.node.kind_name())
            .finish()
    }
}

impl<V: Shape, P: Shape> fmt::Display for ParametricExpression<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.node, f)
    }
}

fn check_shape<S: Shape>(operation: &'static str, found: usize, parameters: bool) -> Result<()> {
    match S::NUM_DIMENSIONS {
        Some(expected) if expected != found => Err(if parameters {
            ExprError::parameters(operation, expected, found)
        } else {
            ExprError::dimensions(operation, expected, found)
        }),
        _ => Ok(()),
    }
}

/// Canonicalize a freshly built node and wrap it with the requested shapes
fn wrap<W: Shape, Q: Shape>(node: NodeRef) -> Result<ParametricExpression<W, Q>> {
    let node = DeduplicationCache::new().deduplicated(&node)?;
    ParametricExpression::from_node(node)
}

// ===== Construction =====

impl<V: Shape, P: Shape> ParametricExpression<V, P> {
    /// Wrap an existing node, checking it against the static shapes
    pub fn from_node(node: NodeRef) -> Result<Self> {
        check_shape::<V>("from_node", node.num_dimensions(), false)?;
        check_shape::<P>("from_node", node.num_parameters(), true)?;
        Ok(ParametricExpression {
            node,
            _shape: PhantomData,
        })
    }

    /// Constant `value` over `num_parameters` parameters
    pub fn constant_in(value: &V, num_parameters: usize) -> Result<Self> {
        Self::from_node(constructors::constant(value.to_components(), num_parameters))
    }

    /// Stack scalar expressions into one value
    pub fn from_components(parts: &[ParametricExpression<f64, P>]) -> Result<Self> {
        let (first, rest) = parts.split_first().ok_or_else(|| {
            ExprError::shape("from_components", "needs at least one component")
        })?;
        let node = rest.iter().try_fold(first.node.clone(), |acc, part| {
            constructors::concatenated(&acc, &part.node)
        })?;
        wrap(node)
    }
}

impl<V: Shape, P: FixedShape> ParametricExpression<V, P> {
    pub fn constant(value: &V) -> Self {
        ParametricExpression {
            node: constructors::constant(value.to_components(), P::DIMENSIONS),
            _shape: PhantomData,
        }
    }
}

impl<P: Shape> ParametricExpression<f64, P> {
    /// Component `index` of a parameter vector of size `num_parameters`
    pub fn parameter_in(num_parameters: usize, index: usize) -> Result<Self> {
        Self::from_node(constructors::parameter(num_parameters, index)?)
    }
}

impl<P: FixedShape> ParametricExpression<f64, P> {
    pub fn parameter(index: usize) -> Result<Self> {
        Self::parameter_in(P::DIMENSIONS, index)
    }
}

impl<P: FixedShape> ParametricExpression<P, P> {
    /// The parameter itself
    pub fn identity() -> Self {
        ParametricExpression {
            node: constructors::identity(P::DIMENSIONS),
            _shape: PhantomData,
        }
    }
}

// ===== Queries =====

impl<V: Shape, P: Shape> ParametricExpression<V, P> {
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn num_parameters(&self) -> usize {
        self.node.num_parameters()
    }

    pub fn num_dimensions(&self) -> usize {
        self.node.num_dimensions()
    }

    pub fn is_constant(&self) -> bool {
        self.node.is_constant()
    }

    pub fn compile(&self) -> CompiledExpression {
        CompiledExpression::compile(&self.node)
    }
}

// ===== Evaluation =====

impl<V: Shape, P: Shape> ParametricExpression<V, P> {
    pub fn evaluate(&self, parameter: &P) -> Result<V> {
        let input = Arc::new(Matrix::from_column(&parameter.to_components()));
        let output = Evaluator::new().evaluate(&self.node, &input)?;
        Ok(V::from_components(output.column(0)))
    }

    /// Evaluate many samples in one pass over the graph
    pub fn evaluate_batch(&self, parameters: &[P]) -> Result<Vec<V>> {
        let columns: Vec<Vec<f64>> = parameters.iter().map(Shape::to_components).collect();
        let input = self.batch_input("evaluate_batch", &columns)?;
        let output = Evaluator::new().evaluate(&self.node, &Arc::new(input))?;
        Ok(output.columns().map(V::from_components).collect())
    }

    /// Enclosure of every value taken over the parameter `bounds`
    pub fn evaluate_bounds(&self, bounds: &P::Bounds) -> Result<V::Bounds> {
        let input = Arc::new(Matrix::from_column(&P::bounds_to_components(bounds)));
        let output = Evaluator::new().evaluate(&self.node, &input)?;
        Ok(V::bounds_from_components(output.column(0)))
    }

    pub fn evaluate_bounds_batch(&self, bounds: &[P::Bounds]) -> Result<Vec<V::Bounds>> {
        let columns: Vec<Vec<Interval>> = bounds.iter().map(P::bounds_to_components).collect();
        let input = self.batch_input("evaluate_bounds_batch", &columns)?;
        let output = Evaluator::new().evaluate(&self.node, &Arc::new(input))?;
        Ok(output.columns().map(V::bounds_from_components).collect())
    }

    /// Evaluate raw buffers in a caller-owned session, sharing its memo table
    pub fn evaluate_with<T: EvaluationDomain>(
        &self,
        evaluator: &mut Evaluator,
        input: &Arc<Matrix<T>>,
    ) -> Result<Arc<Matrix<T>>> {
        evaluator.evaluate(&self.node, input)
    }

    /// `num_dimensions x num_parameters` matrix of partial derivatives
    pub fn jacobian(&self, parameter: &P) -> Result<Matrix<f64>> {
        self.jacobian_in(Matrix::from_column(&parameter.to_components()))
    }

    /// Enclosure of the Jacobian over the parameter `bounds`
    pub fn jacobian_bounds(&self, bounds: &P::Bounds) -> Result<Matrix<Interval>> {
        self.jacobian_in(Matrix::from_column(&P::bounds_to_components(bounds)))
    }

    fn jacobian_in<T: EvaluationDomain>(&self, input: Matrix<T>) -> Result<Matrix<T>> {
        let input = Arc::new(input);
        let mut evaluator = Evaluator::new();
        let mut columns = Vec::with_capacity(self.num_parameters());
        for index in 0..self.num_parameters() {
            let partial = DeduplicationCache::new()
                .deduplicated(&differentiation::derivative(&self.node, index)?)?;
            columns.push(evaluator.evaluate(&partial, &input)?.column(0).to_vec());
        }
        Ok(Matrix::from_fn(self.num_dimensions(), columns.len(), |row, col| {
            columns[col][row]
        }))
    }

    fn batch_input<T: Copy>(&self, operation: &'static str, columns: &[Vec<T>]) -> Result<Matrix<T>> {
        Matrix::from_columns(self.num_parameters(), columns).ok_or_else(|| {
            ExprError::shape(
                operation,
                format!(
                    "every sample needs {} parameters",
                    self.num_parameters()
                ),
            )
        })
    }
}

// ===== Differentiation and composition =====

impl<V: Shape, P: Shape> ParametricExpression<V, P> {
    /// Partial derivative with respect to parameter `index`
    pub fn derivative_at(&self, index: usize) -> Result<ParametricExpression<V::Differential, P>> {
        wrap(differentiation::derivative(&self.node, index)?)
    }

    /// Partial derivative with respect to the parameter `parameter` selects
    pub fn derivative_by(
        &self,
        parameter: &ParametricExpression<f64, P>,
    ) -> Result<ParametricExpression<V::Differential, P>> {
        match parameter.node.kind() {
            NodeKind::Parameter { index } => self.derivative_at(*index),
            NodeKind::Identity => self.derivative_at(0),
            _ => Err(ExprError::shape(
                "derivative_by",
                format!(
                    "expects a parameter expression, found {}",
                    parameter.node.kind_name()
                ),
            )),
        }
    }

    /// `self(inner(q))`
    pub fn composed<Q: Shape>(
        &self,
        inner: &ParametricExpression<P, Q>,
    ) -> Result<ParametricExpression<V, Q>> {
        let node = constructors::composed(&self.node, &inner.node)?;
        debug!(
            "composed {} nodes with {} nodes -> {} nodes",
            self.node.node_count(),
            inner.node.node_count(),
            node.node_count()
        );
        wrap(node)
    }

    /// Unit tangent of a curve
    pub fn tangent_vector(&self) -> Result<ParametricExpression<V::Differential, P>> {
        wrap(differentiation::tangent_vector(&self.node)?)
    }

    pub fn curvature(&self) -> Result<ParametricExpression<f64, P>> {
        wrap(differentiation::curvature(&self.node)?)
    }

    /// Principal normal of a curve, or unit normal of a surface in 3D
    pub fn normal_vector(&self) -> Result<ParametricExpression<V::Differential, P>> {
        wrap(differentiation::normal_vector(&self.node)?)
    }

    pub fn binormal_vector(&self) -> Result<ParametricExpression<V::Differential, P>> {
        wrap(differentiation::binormal_vector(&self.node)?)
    }
}

impl<V: Shape> ParametricExpression<V, f64> {
    /// Derivative of a one-parameter expression
    pub fn derivative(&self) -> Result<ParametricExpression<V::Differential, f64>> {
        self.derivative_at(0)
    }
}

// ===== Geometric and structural combinators =====

impl<V: Shape, P: Shape> ParametricExpression<V, P> {
    pub fn translated(&self, offset: &V::Differential) -> Result<Self> {
        wrap(constructors::translated(&self.node, &offset.to_components())?)
    }

    /// Offset by a displacement expression, e.g. a point plus a vector
    pub fn displaced(&self, offset: &ParametricExpression<V::Differential, P>) -> Result<Self> {
        wrap(constructors::sum(&self.node, &offset.node)?)
    }

    pub fn scaled(&self, scale: f64) -> Self {
        ParametricExpression {
            node: constructors::scaled(scale, &self.node),
            _shape: PhantomData,
        }
    }

    /// Apply a linear map with one column per dimension of `self`
    pub fn transformed<W: Shape>(&self, matrix: &Matrix<f64>) -> Result<ParametricExpression<W, P>> {
        wrap(constructors::transformed(matrix, &self.node)?)
    }

    pub fn dot<W: Shape>(&self, other: &ParametricExpression<W, P>) -> Result<ParametricExpression<f64, P>> {
        wrap(constructors::dot(&self.node, &other.node)?)
    }

    pub fn dot_vector(&self, vector: &V::Differential) -> Result<ParametricExpression<f64, P>> {
        let other = constructors::constant(vector.to_components(), self.num_parameters());
        wrap(constructors::dot(&self.node, &other)?)
    }

    pub fn cross<W: Shape>(&self, other: &ParametricExpression<W, P>) -> Result<ParametricExpression<V::Differential, P>> {
        wrap(constructors::cross(&self.node, &other.node)?)
    }

    pub fn cross_vector(&self, vector: &V::Differential) -> Result<ParametricExpression<V::Differential, P>> {
        let other = constructors::constant(vector.to_components(), self.num_parameters());
        wrap(constructors::cross(&self.node, &other)?)
    }

    pub fn norm(&self) -> ParametricExpression<f64, P> {
        ParametricExpression {
            node: constructors::norm(&self.node),
            _shape: PhantomData,
        }
    }

    pub fn normalized(&self) -> Result<ParametricExpression<V::Differential, P>> {
        wrap(constructors::normalized(&self.node)?)
    }

    pub fn squared_norm(&self) -> Result<ParametricExpression<f64, P>> {
        wrap(constructors::squared_norm(&self.node)?)
    }

    pub fn component(&self, index: usize) -> Result<ParametricExpression<f64, P>> {
        wrap(constructors::component(&self.node, index)?)
    }

    pub fn x(&self) -> Result<ParametricExpression<f64, P>> {
        self.component(0)
    }

    pub fn y(&self) -> Result<ParametricExpression<f64, P>> {
        self.component(1)
    }

    pub fn z(&self) -> Result<ParametricExpression<f64, P>> {
        self.component(2)
    }

    /// Components `start..start + count`, viewed as shape `W`
    pub fn components<W: Shape>(&self, start: usize, count: usize) -> Result<ParametricExpression<W, P>> {
        wrap(constructors::components(&self.node, start, count)?)
    }

    /// Components of `self` followed by those of `other`, viewed as shape `X`
    pub fn concatenated<W: Shape, X: Shape>(
        &self,
        other: &ParametricExpression<W, P>,
    ) -> Result<ParametricExpression<X, P>> {
        wrap(constructors::concatenated(&self.node, &other.node)?)
    }
}

impl<P: Shape> ParametricExpression<f64, P> {
    pub fn squared(&self) -> Result<Self> {
        self.powf(2.0)
    }

    pub fn powf(&self, exponent: f64) -> Result<Self> {
        wrap(constructors::powf(&self.node, exponent)?)
    }
}

// ===== Operators =====

impl<V: Shape, P: Shape> Add for &ParametricExpression<V, P> {
    type Output = Result<ParametricExpression<V, P>>;

    fn add(self, rhs: Self) -> Self::Output {
        wrap(constructors::sum(&self.node, &rhs.node)?)
    }
}

impl<V: Shape, P: Shape> Sub for &ParametricExpression<V, P> {
    type Output = Result<ParametricExpression<V, P>>;

    fn sub(self, rhs: Self) -> Self::Output {
        wrap(constructors::difference(&self.node, &rhs.node)?)
    }
}

impl<V: Shape, P: Shape> Neg for &ParametricExpression<V, P> {
    type Output = ParametricExpression<V, P>;

    fn neg(self) -> Self::Output {
        ParametricExpression {
            node: constructors::negated(&self.node),
            _shape: PhantomData,
        }
    }
}

impl<V: Shape, P: Shape> Neg for ParametricExpression<V, P> {
    type Output = ParametricExpression<V, P>;

    fn neg(self) -> Self::Output {
        -&self
    }
}

/// Scale by a scalar expression
impl<V: Shape, P: Shape> Mul<&ParametricExpression<f64, P>> for &ParametricExpression<V, P> {
    type Output = Result<ParametricExpression<V, P>>;

    fn mul(self, rhs: &ParametricExpression<f64, P>) -> Self::Output {
        wrap(constructors::product(&rhs.node, &self.node)?)
    }
}

impl<V: Shape, P: Shape> Div<&ParametricExpression<f64, P>> for &ParametricExpression<V, P> {
    type Output = Result<ParametricExpression<V, P>>;

    fn div(self, rhs: &ParametricExpression<f64, P>) -> Self::Output {
        wrap(constructors::quotient(&self.node, &rhs.node)?)
    }
}

impl<V: Shape, P: Shape> Mul<f64> for &ParametricExpression<V, P> {
    type Output = ParametricExpression<V, P>;

    fn mul(self, rhs: f64) -> Self::Output {
        self.scaled(rhs)
    }
}

impl<V: Shape, P: Shape> Mul<&ParametricExpression<V, P>> for f64 {
    type Output = ParametricExpression<V, P>;

    fn mul(self, rhs: &ParametricExpression<V, P>) -> Self::Output {
        rhs.scaled(self)
    }
}

/// Fails with `DivisionByZero` for a tolerance-zero divisor
impl<V: Shape, P: Shape> Div<f64> for &ParametricExpression<V, P> {
    type Output = Result<ParametricExpression<V, P>>;

    fn div(self, rhs: f64) -> Self::Output {
        let divisor = constructors::constant(vec![rhs], self.num_parameters());
        wrap(constructors::quotient(&self.node, &divisor)?)
    }
}

// ===== Elementary functions =====

macro_rules! elementary_functions {
    ($($name:ident => $function:ident),* $(,)?) => {
        $(
            pub fn $name<P: Shape>(x: &ParametricExpression<f64, P>) -> Result<ParametricExpression<f64, P>> {
                wrap(constructors::function(ElementaryFunction::$function, &x.node)?)
            }
        )*
    };
}

elementary_functions!(
    sin => Sin, cos => Cos, tan => Tan,
    asin => Asin, acos => Acos,
    exp => Exp, log => Log, sqrt => Sqrt,
);

/// `base ^ exponent`
pub fn pow<P: Shape>(
    base: &ParametricExpression<f64, P>,
    exponent: &ParametricExpression<f64, P>,
) -> Result<ParametricExpression<f64, P>> {
    wrap(constructors::power(&base.node, &exponent.node)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Point3, Vector2, Vector3};

    #[test]
    fn test_static_shapes_are_checked() {
        let node = constructors::identity(3);
        assert!(ParametricExpression::<Point3, Vector3>::from_node(node.clone()).is_ok());
        let err = ParametricExpression::<Vector2, Vector3>::from_node(node.clone()).unwrap_err();
        assert!(matches!(err, ExprError::DimensionMismatch { what: "dimensions", .. }));
        let err = ParametricExpression::<Vector3, f64>::from_node(node).unwrap_err();
        assert!(matches!(err, ExprError::DimensionMismatch { what: "parameters", .. }));
    }

    #[test]
    fn test_dynamic_shapes() {
        let u = ParametricExpression::<f64, Vec<f64>>::parameter_in(4, 3).expect("Valid parameter index");
        assert_eq!(u.evaluate(&vec![1.0, 2.0, 3.0, 4.0]).expect("Should evaluate"), 4.0);
        assert!(u.evaluate(&vec![1.0]).is_err());

        let v = ParametricExpression::<Vec<f64>, Vec<f64>>::constant_in(&vec![1.0, 2.0], 4).expect("Should build");
        assert!(v.is_constant());
        assert_eq!(v.evaluate(&vec![0.0; 4]).expect("Should evaluate"), vec![1.0, 2.0]);
    }

    #[test]
    fn test_derivative_by_parameter_handle() {
        let u = ParametricExpression::<f64, Vector2>::parameter(0).expect("Valid parameter index");
        let v = ParametricExpression::<f64, Vector2>::parameter(1).expect("Valid parameter index");
        let e = (&u.squared().expect("Should build") * &v).expect("Should build");
        let de_du = e.derivative_by(&u).expect("Should differentiate");
        assert_eq!(de_du.evaluate(&Vector2::xy(3.0, 2.0)).expect("Should evaluate"), 12.0);
        let de_dv = e.derivative_by(&v).expect("Should differentiate");
        assert_eq!(de_dv.evaluate(&Vector2::xy(3.0, 2.0)).expect("Should evaluate"), 9.0);
        assert!(e.derivative_by(&e).is_err());
        assert!(matches!(
            e.derivative_at(2),
            Err(ExprError::IndexOutOfRange { index: 2, bound: 2, .. })
        ));
    }

    #[test]
    fn test_division_by_zero_fails_at_construction() {
        let t = ParametricExpression::<f64>::parameter(0).expect("Valid parameter index");
        assert!(matches!(&t / 0.0, Err(ExprError::DivisionByZero { .. })));
        let zero = ParametricExpression::<f64>::constant(&0.0);
        assert!(matches!(&t / &zero, Err(ExprError::DivisionByZero { .. })));
        assert_eq!((&t / 4.0).expect("Should build").evaluate(&2.0).expect("Should evaluate"), 0.5);
    }

    #[test]
    fn test_from_components_and_accessors() {
        let t = ParametricExpression::<f64>::parameter(0).expect("Valid parameter index");
        let curve = ParametricExpression::<Point3>::from_components(&[
            t.clone(),
            t.squared().expect("Should build"),
            cos(&t).expect("Should build"),
        ])
        .expect("Should build");
        assert_eq!(curve.y().expect("Should build").evaluate(&3.0).expect("Should evaluate"), 9.0);
        let tail: ParametricExpression<Vector2> = curve.components(1, 2).expect("Should build");
        assert_eq!(tail.evaluate(&0.0).expect("Should evaluate"), Vector2::xy(0.0, 1.0));
        assert!(ParametricExpression::<Point3>::from_components(&[]).is_err());
        assert!(curve.component(3).is_err());
    }

    #[test]
    fn test_infallible_combinators_keep_graphs_deduplicated() {
        let u = ParametricExpression::<f64, Vector2>::parameter(0).expect("Valid parameter index");
        let v = ParametricExpression::<f64, Vector2>::parameter(1).expect("Valid parameter index");
        let wave = (&sin(&u).expect("Should build") * &sin(&u).expect("Should build")).expect("Should build");
        let field = (&(&wave + &v.squared().expect("Should build")).expect("Should build") + &sin(&u).expect("Should build")).expect("Should build");
        let canonical = DeduplicationCache::new().deduplicated(field.node()).expect("Should deduplicate");
        assert!(Arc::ptr_eq(&canonical, field.node()));

        let built = [
            field.scaled(3.0).node().clone(),
            (-&field).node().clone(),
            (&field * 2.0).node().clone(),
            (0.5 * &field).node().clone(),
            field.norm().node().clone(),
            field.scaled(-2.0).norm().node().clone(),
        ];
        for node in built {
            let again = DeduplicationCache::new().deduplicated(&node).expect("Should deduplicate");
            assert!(Arc::ptr_eq(&again, &node), "{node}");
        }
    }
}
