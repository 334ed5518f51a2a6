//! Forward-mode Jacobian evaluation
//!
//! Computes `d(node)/d(parameters)` numerically at a single parameter sample
//! without building derivative graphs. Each node combines its children's
//! values and Jacobians by the usual product/chain rules; results are
//! memoized in the evaluator's Jacobian sub-tables.

use log::trace;
use std::sync::Arc;

use super::{EvaluationDomain, Evaluator, MemoEntry, cross, dot, squared_norm};
use crate::error::{ExprError, Result};
use crate::math::Matrix;
use crate::node::{NodeKind, NodeRef};
use crate::traits::as_integer;

impl Evaluator {
    /// Jacobian of `node` at the single parameter sample in `input`.
    ///
    /// `input` must be one column with one row per parameter; the result is
    /// `num_dimensions x num_parameters`.
    pub fn evaluate_jacobian<T: EvaluationDomain>(
        &mut self,
        node: &NodeRef,
        input: &Arc<Matrix<T>>,
    ) -> Result<Arc<Matrix<T>>> {
        if input.rows() != node.num_parameters() {
            return Err(ExprError::parameters(
                "jacobian",
                node.num_parameters(),
                input.rows(),
            ));
        }
        if input.cols() != 1 {
            return Err(ExprError::shape(
                "jacobian",
                format!("expects a single parameter sample, found {}", input.cols()),
            ));
        }
        Ok(self.jacobian(node, input))
    }

    pub(crate) fn jacobian<T: EvaluationDomain>(
        &mut self,
        node: &NodeRef,
        input: &Arc<Matrix<T>>,
    ) -> Arc<Matrix<T>> {
        let key = (node.address(), Arc::as_ptr(input) as usize);
        if let Some(entry) = T::tables(self).jacobians.get(&key) {
            return entry.result.clone();
        }
        trace!(
            "jacobian of {} R{} -> R{}",
            node.kind_name(),
            node.num_parameters(),
            node.num_dimensions()
        );
        let result = Arc::new(self.compute_jacobian(node, input));
        T::tables(self).jacobians.insert(
            key,
            MemoEntry {
                _node: node.clone(),
                _input: input.clone(),
                result: result.clone(),
            },
        );
        result
    }

    fn compute_jacobian<T: EvaluationDomain>(
        &mut self,
        node: &NodeRef,
        input: &Arc<Matrix<T>>,
    ) -> Matrix<T> {
        let n = node.num_parameters();
        let dims = node.num_dimensions();
        match node.kind() {
            NodeKind::Constant { .. } => Matrix::zeros(dims, n),

            NodeKind::Identity => Matrix::identity(n),

            NodeKind::Parameter { index } => Matrix::from_fn(1, n, |_, col| {
                if col == *index { T::one() } else { T::zero() }
            }),

            NodeKind::Sum(a, b) => {
                let (ja, jb) = (self.jacobian(a, input), self.jacobian(b, input));
                ja.zip_with(&jb, |x, y| x + y)
            }

            NodeKind::Difference(a, b) => {
                let (ja, jb) = (self.jacobian(a, input), self.jacobian(b, input));
                ja.zip_with(&jb, |x, y| x - y)
            }

            // J(m x) = m Jx + x Jm
            NodeKind::Product {
                multiplier,
                multiplicand,
            } => {
                let m = self.evaluated(multiplier, input).get(0, 0);
                let x = self.evaluated(multiplicand, input);
                let jm = self.jacobian(multiplier, input);
                let jx = self.jacobian(multiplicand, input);
                Matrix::from_fn(dims, n, |row, col| {
                    m * jx.get(row, col) + x.get(row, 0) * jm.get(0, col)
                })
            }

            // J(a / b) = (Ja b - a Jb) / b^2
            NodeKind::Quotient { dividend, divisor } => {
                let a = self.evaluated(dividend, input);
                let b = self.evaluated(divisor, input).get(0, 0);
                let ja = self.jacobian(dividend, input);
                let jb = self.jacobian(divisor, input);
                let b_squared = b.squared();
                Matrix::from_fn(dims, n, |row, col| {
                    (ja.get(row, col) * b - a.get(row, 0) * jb.get(0, col)) / b_squared
                })
            }

            NodeKind::Negated(x) => self.jacobian(x, input).map(|v| -v),

            NodeKind::Scaling { scale, operand } => {
                let scale = T::from_f64(*scale);
                self.jacobian(operand, input).map(|v| v * scale)
            }

            NodeKind::Translation { operand, .. } => (*self.jacobian(operand, input)).clone(),

            NodeKind::Transformation { matrix, operand } => {
                let jx = self.jacobian(operand, input);
                matrix.map(T::from_f64).matmul(&jx)
            }

            NodeKind::Power { base, exponent } => {
                let b = self.evaluated(base, input).get(0, 0);
                let jb = self.jacobian(base, input);
                match exponent.scalar_value() {
                    // c b^(c-1) Jb
                    Some(c) => {
                        let reduced = match as_integer(c - 1.0) {
                            Some(k) => b.powi(k),
                            None => b.powf(c - 1.0),
                        };
                        let slope = T::from_f64(c) * reduced;
                        jb.map(|v| slope * v)
                    }
                    // b^e (ln(b) Je + e Jb / b)
                    None => {
                        let e = self.evaluated(exponent, input).get(0, 0);
                        let je = self.jacobian(exponent, input);
                        let value = b.pow(e);
                        let log_base = b.ln();
                        Matrix::from_fn(1, n, |_, col| {
                            value * (log_base * je.get(0, col) + e * jb.get(0, col) / b)
                        })
                    }
                }
            }

            // J(f(g)) = Jf(g) Jg
            NodeKind::Composition { outer, inner } => {
                let intermediate = self.evaluated(inner, input);
                let outer_jacobian = self.jacobian(outer, &intermediate);
                let inner_jacobian = self.jacobian(inner, input);
                outer_jacobian.matmul(&inner_jacobian)
            }

            NodeKind::Concatenation(a, b) => {
                let (ja, jb) = (self.jacobian(a, input), self.jacobian(b, input));
                ja.stacked(&jb)
            }

            NodeKind::Components {
                operand,
                start,
                count,
            } => self.jacobian(operand, input).row_block(*start, *count),

            // J(a . b) = a^T Jb + b^T Ja
            NodeKind::DotProduct(a, b) => {
                let (va, vb) = (self.evaluated(a, input), self.evaluated(b, input));
                let (ja, jb) = (self.jacobian(a, input), self.jacobian(b, input));
                Matrix::from_fn(1, n, |_, col| {
                    dot(va.column(0), jb.column(col)) + dot(vb.column(0), ja.column(col))
                })
            }

            // column-wise: Ja x b + a x Jb
            NodeKind::CrossProduct(a, b) => {
                let (va, vb) = (self.evaluated(a, input), self.evaluated(b, input));
                let (ja, jb) = (self.jacobian(a, input), self.jacobian(b, input));
                let mut result = Matrix::zeros(3, n);
                for col in 0..n {
                    let first = cross(ja.column(col), vb.column(0));
                    let second = cross(va.column(0), jb.column(col));
                    for row in 0..3 {
                        result.set(row, col, first[row] + second[row]);
                    }
                }
                result
            }

            // J|x| = x^T Jx / |x|
            NodeKind::Norm(x) => {
                let vx = self.evaluated(x, input);
                let jx = self.jacobian(x, input);
                let length = squared_norm(vx.column(0)).sqrt();
                Matrix::from_fn(1, n, |_, col| dot(vx.column(0), jx.column(col)) / length)
            }

            // J(x . x) = 2 x^T Jx
            NodeKind::SquaredNorm(x) => {
                let vx = self.evaluated(x, input);
                let jx = self.jacobian(x, input);
                let two = T::from_f64(2.0);
                Matrix::from_fn(1, n, |_, col| two * dot(vx.column(0), jx.column(col)))
            }

            // J(x / |x|) = (Jx - u u^T Jx) / |x|
            NodeKind::Normalized(x) => {
                let vx = self.evaluated(x, input);
                let jx = self.jacobian(x, input);
                let length = squared_norm(vx.column(0)).sqrt();
                let unit: Vec<T> = vx.column(0).iter().map(|&v| v / length).collect();
                let mut result = Matrix::zeros(dims, n);
                for col in 0..n {
                    let along = dot(&unit, jx.column(col));
                    for row in 0..dims {
                        result.set(row, col, (jx.get(row, col) - unit[row] * along) / length);
                    }
                }
                result
            }

            NodeKind::Function { function, operand } => {
                let x = self.evaluated(operand, input).get(0, 0);
                let slope = function.slope(x);
                self.jacobian(operand, input).map(|v| slope * v)
            }
        }
    }
}
