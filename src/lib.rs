//! Parametric Expression Engine
//!
//! Represents functions of a bounded parameter vector (curves, surfaces,
//! transformations) as a shared, immutable DAG of typed nodes.
//!
//! # Features
//! - Exact symbolic differentiation, plus forward-mode Jacobian evaluation
//! - Point evaluation and sound interval enclosures from the same graph
//! - Construction-time simplification and structural deduplication
//! - Session-scoped memoized evaluation and compiled register programs
//! - **Type-safe façade** with operator overloading over scalars, vectors
//!   and points
//!
//! # Usage Examples
//!
//! ## Typed API
//! ```
//! use parametric_expr::{ParametricExpression, sin};
//! use std::f64::consts::FRAC_PI_2;
//!
//! let t = ParametricExpression::<f64>::parameter(0).expect("Valid parameter index");
//! let e = sin(&t).expect("Should build");
//! assert!((e.evaluate(&FRAC_PI_2).expect("Should evaluate") - 1.0).abs() < 1e-12);
//! let slope = e.derivative().expect("Should differentiate");
//! assert_eq!(slope.evaluate(&0.0).expect("Should evaluate"), 1.0);
//! ```
//!
//! ## Node API
//! ```
//! use parametric_expr::constructors::{parameter, squared_norm, sum};
//! use parametric_expr::{Evaluator, Matrix, derivative};
//! use std::sync::Arc;
//!
//! let u = parameter(2, 0).expect("Valid parameter index");
//! let v = parameter(2, 1).expect("Valid parameter index");
//! let uu = squared_norm(&u).expect("Should build");
//! let vv = squared_norm(&v).expect("Should build");
//! let e = sum(&uu, &vv).expect("Should build");
//! let de_du = derivative(&e, 0).expect("Should differentiate");
//!
//! let input = Arc::new(Matrix::from_column(&[3.0, 4.0]));
//! let mut evaluator = Evaluator::new();
//! assert_eq!(evaluator.evaluate(&e, &input).expect("Should evaluate").get(0, 0), 25.0);
//! assert_eq!(evaluator.evaluate(&de_du, &input).expect("Should evaluate").get(0, 0), 6.0);
//! ```

pub mod constructors;
mod dedup;
mod differentiation;
mod display;
mod error;
mod evaluator;
mod functions;
mod math;
mod node;
mod parametric;
mod shape;
mod traits;

#[cfg(test)]
mod tests;

pub use dedup::DeduplicationCache;
pub use differentiation::{binormal_vector, curvature, derivative, normal_vector, tangent_vector};
pub use display::dump;
pub use error::{ExprError, Result};
pub use evaluator::{CompiledExpression, DomainTables, EvaluationDomain, Evaluator};
pub use functions::ElementaryFunction;
pub use math::{Interval, Matrix};
pub use node::{Node, NodeKind, NodeRef};
pub use parametric::{
    ParametricExpression, acos, asin, cos, exp, log, pow, sin, sqrt, tan,
};
pub use shape::{FixedShape, Point, Point2, Point3, Shape, Vector, Vector2, Vector3};
pub use traits::{Scalar, ZERO_TOLERANCE};
