//! Evaluation of expression graphs over point values and interval bounds.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────────┐     ┌──────────────────────┐
//! │   NodeRef   │ ──> │      Evaluator      │ ──> │  Arc<Matrix<T>>      │
//! │    (DAG)    │     │ (memo per session)  │     │  rows = dimensions   │
//! └─────────────┘     └─────────────────────┘     │  cols = samples      │
//!        │                      │                 └──────────────────────┘
//!        │         ┌────────────┼────────────┐
//!        │         ▼            ▼            ▼
//!        │   ┌──────────┐ ┌──────────┐ ┌──────────┐
//!        │   │  values  │ │  bounds  │ │ jacobian │
//!        │   │  (f64)   │ │(Interval)│ │ (fwd AD) │
//!        │   └──────────┘ └──────────┘ └──────────┘
//!        ▼
//! ┌─────────────────────┐
//! │ CompiledExpression  │  flat register program, no memo table
//! └─────────────────────┘
//! ```
//!
//! An [`Evaluator`] memoizes every intermediate result keyed by
//! (node identity, input identity). A node shared by several parents is
//! therefore computed once per input, and asking for the same node on the
//! same input again returns the very same `Arc`. Each memo entry keeps the
//! node and the input alive, so a key can never be recycled by another
//! buffer while the session lasts.
//!
//! # Example
//!
//! ```
//! use parametric_expr::constructors::{function, parameter};
//! use parametric_expr::{ElementaryFunction, Evaluator, Matrix};
//! use std::sync::Arc;
//!
//! let t = parameter(1, 0).expect("Valid parameter index");
//! let sine = function(ElementaryFunction::Sin, &t).expect("Should build");
//! let input = Arc::new(Matrix::from_column(&[0.5]));
//!
//! let mut evaluator = Evaluator::new();
//! let first = evaluator.evaluate(&sine, &input).expect("Should evaluate");
//! let second = evaluator.evaluate(&sine, &input).expect("Should evaluate");
//! assert!(Arc::ptr_eq(&first, &second));
//! ```

mod compiler;
mod execution;
mod jacobian;


pub use compiler::CompiledExpression;

use log::trace;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::error::{ExprError, Result};
use crate::math::{Interval, Matrix};
use crate::node::{NodeKind, NodeRef};
use crate::traits::{Scalar, as_integer};

type MemoKey = (usize, usize);

/// A cached result together with the handles that keep its key valid
struct MemoEntry<T> {
    _node: NodeRef,
    _input: Arc<Matrix<T>>,
    result: Arc<Matrix<T>>,
}

type MemoTable<T> = FxHashMap<MemoKey, MemoEntry<T>>;

/// Value and Jacobian memo tables for one numeric domain
pub struct DomainTables<T> {
    values: MemoTable<T>,
    jacobians: MemoTable<T>,
}

impl<T> DomainTables<T> {
    fn with_capacity(capacity: usize) -> Self {
        DomainTables {
            values: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            jacobians: FxHashMap::default(),
        }
    }

    fn len(&self) -> usize {
        self.values.len() + self.jacobians.len()
    }

    fn clear(&mut self) {
        self.values.clear();
        self.jacobians.clear();
    }
}

/// A numeric domain the evaluator keeps a memo sub-table for
pub trait EvaluationDomain: Scalar {
    #[doc(hidden)]
    fn tables(evaluator: &mut Evaluator) -> &mut DomainTables<Self>;
}

impl EvaluationDomain for f64 {
    fn tables(evaluator: &mut Evaluator) -> &mut DomainTables<Self> {
        &mut evaluator.values
    }
}

impl EvaluationDomain for Interval {
    fn tables(evaluator: &mut Evaluator) -> &mut DomainTables<Self> {
        &mut evaluator.bounds
    }
}

/// Session-scoped evaluation context with memoization
pub struct Evaluator {
    values: DomainTables<f64>,
    bounds: DomainTables<Interval>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Pre-size the point-value memo table for about `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        Evaluator {
            values: DomainTables::with_capacity(capacity),
            bounds: DomainTables::with_capacity(0),
        }
    }

    /// Number of memoized results across all domains
    pub fn len(&self) -> usize {
        self.values.len() + self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every memoized result
    pub fn clear(&mut self) {
        self.values.clear();
        self.bounds.clear();
    }

    /// Evaluate `node` on every column of `input`.
    ///
    /// `input` must have one row per parameter of `node`; the result has one
    /// row per dimension and the same number of columns.
    pub fn evaluate<T: EvaluationDomain>(
        &mut self,
        node: &NodeRef,
        input: &Arc<Matrix<T>>,
    ) -> Result<Arc<Matrix<T>>> {
        if input.rows() != node.num_parameters() {
            return Err(ExprError::parameters(
                "evaluate",
                node.num_parameters(),
                input.rows(),
            ));
        }
        Ok(self.evaluated(node, input))
    }

    /// Memoized evaluation; `input` is known to have the right shape
    pub(crate) fn evaluated<T: EvaluationDomain>(
        &mut self,
        node: &NodeRef,
        input: &Arc<Matrix<T>>,
    ) -> Arc<Matrix<T>> {
        match node.kind() {
            NodeKind::Identity => return input.clone(),
            NodeKind::Parameter { .. } if node.num_parameters() == 1 => return input.clone(),
            _ => {}
        }

        let key = (node.address(), Arc::as_ptr(input) as usize);
        if let Some(entry) = T::tables(self).values.get(&key) {
            return entry.result.clone();
        }

        trace!(
            "evaluating {} R{} -> R{} over {} samples",
            node.kind_name(),
            node.num_parameters(),
            node.num_dimensions(),
            input.cols()
        );
        let result = self.compute(node, input);
        T::tables(self).values.insert(
            key,
            MemoEntry {
                _node: node.clone(),
                _input: input.clone(),
                result: result.clone(),
            },
        );
        result
    }

    fn compute<T: EvaluationDomain>(
        &mut self,
        node: &NodeRef,
        input: &Arc<Matrix<T>>,
    ) -> Arc<Matrix<T>> {
        let cols = input.cols();
        let dims = node.num_dimensions();
        let matrix = match node.kind() {
            NodeKind::Constant { values, bounds } => Matrix::from_fn(dims, cols, |row, _| {
                T::from_constant(values[row], bounds[row])
            }),

            NodeKind::Identity => return input.clone(),

            NodeKind::Parameter { index } => Matrix::from_fn(1, cols, |_, col| input.get(*index, col)),

            NodeKind::Sum(a, b) => {
                let (a, b) = (self.evaluated(a, input), self.evaluated(b, input));
                a.zip_with(&b, |x, y| x + y)
            }

            NodeKind::Difference(a, b) => {
                let (a, b) = (self.evaluated(a, input), self.evaluated(b, input));
                a.zip_with(&b, |x, y| x - y)
            }

            NodeKind::Product {
                multiplier,
                multiplicand,
            } => {
                let m = self.evaluated(multiplier, input);
                let x = self.evaluated(multiplicand, input);
                Matrix::from_fn(dims, cols, |row, col| m.get(0, col) * x.get(row, col))
            }

            NodeKind::Quotient { dividend, divisor } => {
                let a = self.evaluated(dividend, input);
                let b = self.evaluated(divisor, input);
                Matrix::from_fn(dims, cols, |row, col| a.get(row, col) / b.get(0, col))
            }

            NodeKind::Negated(x) => self.evaluated(x, input).map(|v| -v),

            NodeKind::Scaling { scale, operand } => {
                let scale = T::from_f64(*scale);
                self.evaluated(operand, input).map(|v| v * scale)
            }

            NodeKind::Translation { operand, offset } => {
                let x = self.evaluated(operand, input);
                Matrix::from_fn(dims, cols, |row, col| {
                    x.get(row, col) + T::from_f64(offset[row])
                })
            }

            NodeKind::Transformation { matrix, operand } => {
                let x = self.evaluated(operand, input);
                matrix.map(T::from_f64).matmul(&x)
            }

            NodeKind::Power { base, exponent } => {
                let b = self.evaluated(base, input);
                match exponent.scalar_value() {
                    Some(e) => match as_integer(e) {
                        Some(n) => b.map(|v| v.powi(n)),
                        None => b.map(|v| v.powf(e)),
                    },
                    None => {
                        let e = self.evaluated(exponent, input);
                        b.zip_with(&e, |x, y| x.pow(y))
                    }
                }
            }

            NodeKind::Composition { outer, inner } => {
                let intermediate = self.evaluated(inner, input);
                return self.evaluated(outer, &intermediate);
            }

            NodeKind::Concatenation(a, b) => {
                let (a, b) = (self.evaluated(a, input), self.evaluated(b, input));
                a.stacked(&b)
            }

            NodeKind::Components {
                operand,
                start,
                count,
            } => self.evaluated(operand, input).row_block(*start, *count),

            NodeKind::DotProduct(a, b) => {
                let (a, b) = (self.evaluated(a, input), self.evaluated(b, input));
                Matrix::from_fn(1, cols, |_, col| dot(a.column(col), b.column(col)))
            }

            NodeKind::CrossProduct(a, b) => {
                let (a, b) = (self.evaluated(a, input), self.evaluated(b, input));
                let mut result = Matrix::zeros(3, cols);
                for col in 0..cols {
                    result
                        .column_mut(col)
                        .copy_from_slice(&cross(a.column(col), b.column(col)));
                }
                result
            }

            NodeKind::Norm(x) => {
                let x = self.evaluated(x, input);
                Matrix::from_fn(1, cols, |_, col| squared_norm(x.column(col)).sqrt())
            }

            NodeKind::SquaredNorm(x) => {
                let x = self.evaluated(x, input);
                Matrix::from_fn(1, cols, |_, col| squared_norm(x.column(col)))
            }

            NodeKind::Normalized(x) => {
                let x = self.evaluated(x, input);
                let mut result = (*x).clone();
                for col in 0..cols {
                    let length = squared_norm(x.column(col)).sqrt();
                    for value in result.column_mut(col) {
                        *value = *value / length;
                    }
                }
                result
            }

            NodeKind::Function { function, operand } => {
                let function = *function;
                self.evaluated(operand, input).map(|v| function.apply(v))
            }
        };
        Arc::new(matrix)
    }
}

pub(crate) fn dot<T: Scalar>(a: &[T], b: &[T]) -> T {
    a.iter()
        .zip(b)
        .fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}

/// Sum of squares; uses `squared` so interval enclosures stay non-negative
pub(crate) fn squared_norm<T: Scalar>(a: &[T]) -> T {
    a.iter().fold(T::zero(), |acc, &x| acc + x.squared())
}

pub(crate) fn cross<T: Scalar>(a: &[T], b: &[T]) -> [T; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}
