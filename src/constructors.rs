//! Node combinators with construction-time simplification
//!
//! Every function here validates its operands before building anything and
//! applies local algebraic short-circuits on the way:
//! - constant folding whenever all operands are constants
//! - zero/one absorption (`x + 0 = x`, `1 * x = x`, `-1 * x = -x`, `0 * x = 0`)
//! - scalar products put a constant operand in the multiplier slot so they
//!   become scalings, which deduplicate against other scalings
//! - nested scalings, translations and transformations merge
//! - dot/cross against a zero constant collapse to a zero constant

use std::f64::consts::PI;
use std::sync::Arc;

use crate::error::{ExprError, Result};
use crate::evaluator::Evaluator;
use crate::functions::{ElementaryFunction, Registry};
use crate::math::Matrix;
use crate::node::{Node, NodeKind, NodeRef};
use crate::traits::{as_integer, is_neg_one, is_one, is_zero};

fn check_parameters(operation: &'static str, a: &Node, b: &Node) -> Result<()> {
    if a.num_parameters() != b.num_parameters() {
        return Err(ExprError::parameters(
            operation,
            a.num_parameters(),
            b.num_parameters(),
        ));
    }
    Ok(())
}

fn check_dimensions(operation: &'static str, a: &Node, b: &Node) -> Result<()> {
    if a.num_dimensions() != b.num_dimensions() {
        return Err(ExprError::dimensions(
            operation,
            a.num_dimensions(),
            b.num_dimensions(),
        ));
    }
    Ok(())
}

fn check_scalar(operation: &'static str, x: &Node) -> Result<()> {
    if x.num_dimensions() != 1 {
        return Err(ExprError::shape(
            operation,
            format!(
                "requires a scalar operand, found {} dimensions",
                x.num_dimensions()
            ),
        ));
    }
    Ok(())
}

// ===== Leaves =====

/// Constant vector as a function of `num_parameters` parameters
pub fn constant(values: Vec<f64>, num_parameters: usize) -> NodeRef {
    Node::constant(values, num_parameters)
}

pub fn zero(num_dimensions: usize, num_parameters: usize) -> NodeRef {
    Node::constant(vec![0.0; num_dimensions], num_parameters)
}

/// The identity function on `R^num_parameters`
pub fn identity(num_parameters: usize) -> NodeRef {
    Node::new(num_parameters, num_parameters, NodeKind::Identity)
}

/// Parameter `index` of a `num_parameters`-dimensional parameter vector
pub fn parameter(num_parameters: usize, index: usize) -> Result<NodeRef> {
    if index >= num_parameters {
        return Err(ExprError::IndexOutOfRange {
            operation: "parameter",
            index,
            bound: num_parameters,
        });
    }
    Ok(Node::new(num_parameters, 1, NodeKind::Parameter { index }))
}

// ===== Unary arithmetic =====

pub fn negated(x: &NodeRef) -> NodeRef {
    match x.kind() {
        NodeKind::Constant { values, .. } => {
            constant(values.iter().map(|v| -v).collect(), x.num_parameters())
        }
        NodeKind::Negated(inner) => inner.clone(),
        NodeKind::Scaling { scale, operand } => scaled(-scale, operand),
        NodeKind::Difference(a, b) => Node::new(
            x.num_parameters(),
            x.num_dimensions(),
            NodeKind::Difference(b.clone(), a.clone()),
        ),
        _ => Node::new(
            x.num_parameters(),
            x.num_dimensions(),
            NodeKind::Negated(x.clone()),
        ),
    }
}

pub fn scaled(scale: f64, x: &NodeRef) -> NodeRef {
    if is_zero(scale) {
        return zero(x.num_dimensions(), x.num_parameters());
    }
    if is_one(scale) {
        return x.clone();
    }
    if is_neg_one(scale) {
        return negated(x);
    }
    match x.kind() {
        NodeKind::Constant { values, .. } => {
            constant(values.iter().map(|v| v * scale).collect(), x.num_parameters())
        }
        NodeKind::Scaling {
            scale: inner_scale,
            operand,
        } => scaled(scale * inner_scale, operand),
        NodeKind::Negated(operand) => scaled(-scale, operand),
        _ => Node::new(
            x.num_parameters(),
            x.num_dimensions(),
            NodeKind::Scaling {
                scale,
                operand: x.clone(),
            },
        ),
    }
}

pub fn translated(x: &NodeRef, offset: &[f64]) -> Result<NodeRef> {
    if offset.len() != x.num_dimensions() {
        return Err(ExprError::dimensions(
            "translate",
            x.num_dimensions(),
            offset.len(),
        ));
    }
    if offset.iter().all(|&v| is_zero(v)) {
        return Ok(x.clone());
    }
    Ok(match x.kind() {
        NodeKind::Constant { values, .. } => constant(
            values.iter().zip(offset).map(|(a, b)| a + b).collect(),
            x.num_parameters(),
        ),
        NodeKind::Translation {
            operand,
            offset: inner_offset,
        } => {
            let merged: Vec<f64> = inner_offset.iter().zip(offset).map(|(a, b)| a + b).collect();
            translated(operand, &merged)?
        }
        _ => Node::new(
            x.num_parameters(),
            x.num_dimensions(),
            NodeKind::Translation {
                operand: x.clone(),
                offset: offset.to_vec(),
            },
        ),
    })
}

/// `matrix * x`; the matrix must have one column per dimension of `x`
pub fn transformed(matrix: &Matrix<f64>, x: &NodeRef) -> Result<NodeRef> {
    if matrix.cols() != x.num_dimensions() {
        return Err(ExprError::dimensions(
            "transform",
            x.num_dimensions(),
            matrix.cols(),
        ));
    }
    if matrix.rows() == 0 {
        return Err(ExprError::shape(
            "transform",
            "transformation matrix has no rows",
        ));
    }
    if matrix.is_zero() {
        return Ok(zero(matrix.rows(), x.num_parameters()));
    }
    if matrix.rows() == 1 && matrix.cols() == 1 {
        return Ok(scaled(matrix.get(0, 0), x));
    }
    if matrix.is_identity() {
        return Ok(x.clone());
    }
    Ok(match x.kind() {
        NodeKind::Constant { values, .. } => {
            let product = matrix.matmul(&Matrix::from_column(values));
            constant(product.column(0).to_vec(), x.num_parameters())
        }
        NodeKind::Transformation {
            matrix: inner,
            operand,
        } => transformed(&matrix.matmul(inner), operand)?,
        NodeKind::Scaling { scale, operand } => transformed(&matrix.scaled(*scale), operand)?,
        NodeKind::Negated(operand) => transformed(&matrix.scaled(-1.0), operand)?,
        _ => Node::new(
            x.num_parameters(),
            matrix.rows(),
            NodeKind::Transformation {
                matrix: matrix.clone(),
                operand: x.clone(),
            },
        ),
    })
}

// ===== Binary arithmetic =====

pub fn sum(a: &NodeRef, b: &NodeRef) -> Result<NodeRef> {
    check_parameters("sum", a, b)?;
    check_dimensions("sum", a, b)?;
    if let Some(values) = b.constant_values() {
        return translated(a, values);
    }
    if let Some(values) = a.constant_values() {
        return translated(b, values);
    }
    if let NodeKind::Negated(operand) = b.kind() {
        return difference(a, operand);
    }
    Ok(Node::new(
        a.num_parameters(),
        a.num_dimensions(),
        NodeKind::Sum(a.clone(), b.clone()),
    ))
}

pub fn difference(a: &NodeRef, b: &NodeRef) -> Result<NodeRef> {
    check_parameters("difference", a, b)?;
    check_dimensions("difference", a, b)?;
    if let Some(values) = b.constant_values() {
        let offset: Vec<f64> = values.iter().map(|v| -v).collect();
        return translated(a, &offset);
    }
    if let Some(values) = a.constant_values() {
        return translated(&negated(b), values);
    }
    if let NodeKind::Negated(operand) = b.kind() {
        return sum(a, operand);
    }
    Ok(Node::new(
        a.num_parameters(),
        a.num_dimensions(),
        NodeKind::Difference(a.clone(), b.clone()),
    ))
}

/// Product of a scalar with an operand of any dimension (in either order)
pub fn product(a: &NodeRef, b: &NodeRef) -> Result<NodeRef> {
    check_parameters("product", a, b)?;
    let (multiplier, multiplicand) = match (a.num_dimensions(), b.num_dimensions()) {
        (1, 1) if b.is_constant() && !a.is_constant() => (b, a),
        (1, _) => (a, b),
        (_, 1) => (b, a),
        (u, v) => {
            return Err(ExprError::shape(
                "product",
                format!("one operand must be a scalar, found {u} and {v} dimensions"),
            ));
        }
    };
    if let Some(value) = multiplier.scalar_value() {
        return Ok(scaled(value, multiplicand));
    }
    if multiplicand.is_zero_constant() {
        return Ok(zero(multiplicand.num_dimensions(), multiplicand.num_parameters()));
    }
    Ok(Node::new(
        a.num_parameters(),
        multiplicand.num_dimensions(),
        NodeKind::Product {
            multiplier: multiplier.clone(),
            multiplicand: multiplicand.clone(),
        },
    ))
}

/// `a / b` for a scalar divisor `b`
pub fn quotient(a: &NodeRef, b: &NodeRef) -> Result<NodeRef> {
    check_parameters("quotient", a, b)?;
    check_scalar("quotient", b)?;
    if let Some(divisor) = b.scalar_value() {
        if is_zero(divisor) {
            return Err(ExprError::DivisionByZero {
                operation: "quotient",
            });
        }
        return Ok(scaled(1.0 / divisor, a));
    }
    if a.is_zero_constant() {
        return Ok(a.clone());
    }
    Ok(Node::new(
        a.num_parameters(),
        a.num_dimensions(),
        NodeKind::Quotient {
            dividend: a.clone(),
            divisor: b.clone(),
        },
    ))
}

pub fn power(base: &NodeRef, exponent: &NodeRef) -> Result<NodeRef> {
    check_parameters("power", base, exponent)?;
    check_scalar("power", base)?;
    check_scalar("power", exponent)?;
    match (base.scalar_value(), exponent.scalar_value()) {
        (Some(b), Some(e)) => {
            if is_zero(b) && e < 0.0 {
                return Err(ExprError::DivisionByZero { operation: "power" });
            }
            if b < 0.0 && as_integer(e).is_none() {
                return Err(ExprError::Domain {
                    function: "pow",
                    value: b,
                });
            }
            Ok(constant(vec![b.powf(e)], base.num_parameters()))
        }
        // b^g = exp(g ln b) needs b > 0 once the exponent varies
        (Some(b), None) if b <= 0.0 || is_zero(b) => Err(ExprError::Domain {
            function: "pow",
            value: b,
        }),
        (_, Some(e)) if is_zero(e) => Ok(constant(vec![1.0], base.num_parameters())),
        (_, Some(e)) if is_one(e) => Ok(base.clone()),
        _ => Ok(Node::new(
            base.num_parameters(),
            1,
            NodeKind::Power {
                base: base.clone(),
                exponent: exponent.clone(),
            },
        )),
    }
}

/// `base ^ exponent` for a constant exponent
pub fn powf(base: &NodeRef, exponent: f64) -> Result<NodeRef> {
    power(base, &constant(vec![exponent], base.num_parameters()))
}

// ===== Structure =====

/// `outer(inner(p))`
pub fn composed(outer: &NodeRef, inner: &NodeRef) -> Result<NodeRef> {
    if inner.num_dimensions() != outer.num_parameters() {
        return Err(ExprError::dimensions(
            "compose",
            outer.num_parameters(),
            inner.num_dimensions(),
        ));
    }
    if let Some(values) = inner.constant_values() {
        let input = Arc::new(Matrix::from_column(values));
        let value = Evaluator::new().evaluate(outer, &input)?;
        return Ok(constant(value.column(0).to_vec(), inner.num_parameters()));
    }
    if matches!(inner.kind(), NodeKind::Identity) {
        return Ok(outer.clone());
    }
    match outer.kind() {
        NodeKind::Constant { values, .. } => Ok(constant(values.clone(), inner.num_parameters())),
        NodeKind::Identity => Ok(inner.clone()),
        NodeKind::Parameter { index } => component(inner, *index),
        NodeKind::Composition {
            outer: outermost,
            inner: middle,
        } => composed(outermost, &composed(middle, inner)?),
        _ => Ok(Node::new(
            inner.num_parameters(),
            outer.num_dimensions(),
            NodeKind::Composition {
                outer: outer.clone(),
                inner: inner.clone(),
            },
        )),
    }
}

/// Stack the components of `a` on top of those of `b`
pub fn concatenated(a: &NodeRef, b: &NodeRef) -> Result<NodeRef> {
    check_parameters("concatenate", a, b)?;
    if let (Some(first), Some(second)) = (a.constant_values(), b.constant_values()) {
        let values = first.iter().chain(second).copied().collect();
        return Ok(constant(values, a.num_parameters()));
    }
    Ok(Node::new(
        a.num_parameters(),
        a.num_dimensions() + b.num_dimensions(),
        NodeKind::Concatenation(a.clone(), b.clone()),
    ))
}

/// Components `start..start + count` of `x`
pub fn components(x: &NodeRef, start: usize, count: usize) -> Result<NodeRef> {
    let end = match start.checked_add(count) {
        Some(end) if count > 0 && end <= x.num_dimensions() => end,
        _ => {
            return Err(ExprError::IndexOutOfRange {
                operation: "components",
                index: start.saturating_add(count.max(1) - 1),
                bound: x.num_dimensions(),
            });
        }
    };
    if start == 0 && count == x.num_dimensions() {
        return Ok(x.clone());
    }
    Ok(match x.kind() {
        NodeKind::Constant { values, .. } => {
            constant(values[start..end].to_vec(), x.num_parameters())
        }
        NodeKind::Components {
            operand,
            start: inner_start,
            ..
        } => components(operand, inner_start + start, count)?,
        NodeKind::Concatenation(first, second) => {
            let split = first.num_dimensions();
            if end <= split {
                components(first, start, count)?
            } else if start >= split {
                components(second, start - split, count)?
            } else {
                slice_node(x, start, count)
            }
        }
        NodeKind::Negated(operand) => negated(&components(operand, start, count)?),
        NodeKind::Scaling { scale, operand } => scaled(*scale, &components(operand, start, count)?),
        _ => slice_node(x, start, count),
    })
}

fn slice_node(x: &NodeRef, start: usize, count: usize) -> NodeRef {
    Node::new(
        x.num_parameters(),
        count,
        NodeKind::Components {
            operand: x.clone(),
            start,
            count,
        },
    )
}

pub fn component(x: &NodeRef, index: usize) -> Result<NodeRef> {
    if index >= x.num_dimensions() {
        return Err(ExprError::IndexOutOfRange {
            operation: "component",
            index,
            bound: x.num_dimensions(),
        });
    }
    components(x, index, 1)
}

// ===== Vector operations =====

pub fn dot(a: &NodeRef, b: &NodeRef) -> Result<NodeRef> {
    check_dimensions("dot", a, b)?;
    check_parameters("dot", a, b)?;
    if let (Some(u), Some(v)) = (a.constant_values(), b.constant_values()) {
        let value = u.iter().zip(v).map(|(x, y)| x * y).sum();
        return Ok(constant(vec![value], a.num_parameters()));
    }
    if a.num_dimensions() == 1 {
        return product(a, b);
    }
    if a.is_zero_constant() || b.is_zero_constant() {
        return Ok(zero(1, a.num_parameters()));
    }
    Ok(Node::new(
        a.num_parameters(),
        1,
        NodeKind::DotProduct(a.clone(), b.clone()),
    ))
}

pub fn cross(a: &NodeRef, b: &NodeRef) -> Result<NodeRef> {
    if a.num_dimensions() != 3 || b.num_dimensions() != 3 {
        return Err(ExprError::shape(
            "cross",
            format!(
                "requires 3-dimensional operands, found {} and {}",
                a.num_dimensions(),
                b.num_dimensions()
            ),
        ));
    }
    check_parameters("cross", a, b)?;
    if let (Some(u), Some(v)) = (a.constant_values(), b.constant_values()) {
        let values = vec![
            u[1] * v[2] - u[2] * v[1],
            u[2] * v[0] - u[0] * v[2],
            u[0] * v[1] - u[1] * v[0],
        ];
        return Ok(constant(values, a.num_parameters()));
    }
    if a.is_zero_constant() || b.is_zero_constant() {
        return Ok(zero(3, a.num_parameters()));
    }
    Ok(Node::new(
        a.num_parameters(),
        3,
        NodeKind::CrossProduct(a.clone(), b.clone()),
    ))
}

fn euclidean_norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}

pub fn norm(x: &NodeRef) -> NodeRef {
    match x.kind() {
        NodeKind::Constant { values, .. } => {
            constant(vec![euclidean_norm(values)], x.num_parameters())
        }
        // already non-negative scalars
        NodeKind::Norm(_) | NodeKind::SquaredNorm(_) => x.clone(),
        NodeKind::Normalized(_) => constant(vec![1.0], x.num_parameters()),
        NodeKind::Negated(operand) => norm(operand),
        _ => Node::new(x.num_parameters(), 1, NodeKind::Norm(x.clone())),
    }
}

pub fn normalized(x: &NodeRef) -> Result<NodeRef> {
    Ok(match x.kind() {
        NodeKind::Constant { values, .. } => {
            let length = euclidean_norm(values);
            if is_zero(length) {
                return Err(ExprError::DivisionByZero {
                    operation: "normalized",
                });
            }
            constant(values.iter().map(|v| v / length).collect(), x.num_parameters())
        }
        NodeKind::Normalized(_) => x.clone(),
        NodeKind::Negated(operand) => negated(&normalized(operand)?),
        _ => Node::new(
            x.num_parameters(),
            x.num_dimensions(),
            NodeKind::Normalized(x.clone()),
        ),
    })
}

pub fn squared_norm(x: &NodeRef) -> Result<NodeRef> {
    Ok(match x.kind() {
        NodeKind::Constant { values, .. } => {
            constant(vec![values.iter().map(|v| v * v).sum()], x.num_parameters())
        }
        NodeKind::Negated(operand) => squared_norm(operand)?,
        NodeKind::Normalized(_) => constant(vec![1.0], x.num_parameters()),
        NodeKind::Function {
            function: ElementaryFunction::Sqrt,
            operand,
        } => operand.clone(),
        _ => Node::new(x.num_parameters(), 1, NodeKind::SquaredNorm(x.clone())),
    })
}

// ===== Elementary functions =====

pub fn function(function: ElementaryFunction, x: &NodeRef) -> Result<NodeRef> {
    let definition = Registry::get(function);
    check_scalar(definition.name, x)?;
    if let Some(value) = x.scalar_value() {
        if !(definition.domain)(value) {
            return Err(ExprError::Domain {
                function: definition.name,
                value,
            });
        }
        return Ok(constant(vec![function.apply(value)], x.num_parameters()));
    }
    if let NodeKind::Negated(operand) = x.kind() {
        match function {
            ElementaryFunction::Sin | ElementaryFunction::Tan | ElementaryFunction::Asin => {
                return Ok(negated(&self::function(function, operand)?));
            }
            ElementaryFunction::Cos => return self::function(function, operand),
            ElementaryFunction::Acos => {
                let pi = constant(vec![PI], x.num_parameters());
                return difference(&pi, &self::function(function, operand)?);
            }
            _ => {}
        }
    }
    Ok(Node::new(
        x.num_parameters(),
        1,
        NodeKind::Function {
            function,
            operand: x.clone(),
        },
    ))
}

/// Rebuild `node` around new children (in [`Node::children`] order),
/// re-running simplification. Returns `node` itself if no child changed.
pub fn with_children(node: &NodeRef, children: &[NodeRef]) -> Result<NodeRef> {
    let unchanged = node
        .children()
        .into_iter()
        .zip(children)
        .all(|(old, new)| Arc::ptr_eq(old, new));
    if unchanged {
        return Ok(node.clone());
    }
    match (node.kind(), children) {
        (NodeKind::Sum(..), [a, b]) => sum(a, b),
        (NodeKind::Difference(..), [a, b]) => difference(a, b),
        (NodeKind::Product { .. }, [a, b]) => product(a, b),
        (NodeKind::Quotient { .. }, [a, b]) => quotient(a, b),
        (NodeKind::Power { .. }, [a, b]) => power(a, b),
        (NodeKind::Composition { .. }, [a, b]) => composed(a, b),
        (NodeKind::Concatenation(..), [a, b]) => concatenated(a, b),
        (NodeKind::DotProduct(..), [a, b]) => dot(a, b),
        (NodeKind::CrossProduct(..), [a, b]) => cross(a, b),
        (NodeKind::Negated(_), [x]) => Ok(negated(x)),
        (NodeKind::Norm(_), [x]) => Ok(norm(x)),
        (NodeKind::SquaredNorm(_), [x]) => squared_norm(x),
        (NodeKind::Normalized(_), [x]) => normalized(x),
        (NodeKind::Scaling { scale, .. }, [x]) => Ok(scaled(*scale, x)),
        (NodeKind::Translation { offset, .. }, [x]) => translated(x, offset),
        (NodeKind::Transformation { matrix, .. }, [x]) => transformed(matrix, x),
        (NodeKind::Components { start, count, .. }, [x]) => components(x, *start, *count),
        (NodeKind::Function { function: f, .. }, [x]) => function(*f, x),
        _ => Err(ExprError::shape(
            "rebuild",
            format!(
                "{} node cannot take {} children",
                node.kind_name(),
                children.len()
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t() -> NodeRef {
        parameter(1, 0).expect("Valid parameter index")
    }

    #[test]
    fn test_scaling_identities() {
        let x = t();
        assert!(Arc::ptr_eq(&scaled(1.0, &x), &x));
        assert!(scaled(0.0, &x).is_zero_constant());
        assert!(matches!(scaled(-1.0, &x).kind(), NodeKind::Negated(_)));
        let nested = scaled(3.0, &scaled(2.0, &x));
        assert!(matches!(nested.kind(), NodeKind::Scaling { scale, .. } if *scale == 6.0));
        assert!(Arc::ptr_eq(&negated(&negated(&x)), &x));
    }

    #[test]
    fn test_constant_multiplier_becomes_scaling() {
        let x = t();
        let two = constant(vec![2.0], 1);
        let p = product(&x, &two).expect("Should build");
        let q = product(&two, &x).expect("Should build");
        assert!(matches!(p.kind(), NodeKind::Scaling { .. }));
        assert!(p.is_duplicate_of(&q));
    }

    #[test]
    fn test_sum_with_constant_translates() {
        let x = t();
        let s = sum(&x, &constant(vec![0.0], 1)).expect("Should build");
        assert!(Arc::ptr_eq(&s, &x));
        let s = sum(&constant(vec![2.0], 1), &x).expect("Should build");
        assert!(matches!(s.kind(), NodeKind::Translation { .. }));
    }

    #[test]
    fn test_dimension_checks() {
        let x = t();
        let v = constant(vec![1.0, 2.0], 1);
        let w = concatenated(&x, &x).expect("Should build");
        assert!(matches!(
            dot(&w, &concatenated(&w, &x).expect("Should build")),
            Err(ExprError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            cross(&w, &v),
            Err(ExprError::InvalidOperandShape { .. })
        ));
        assert!(matches!(
            product(&w, &w),
            Err(ExprError::InvalidOperandShape { .. })
        ));
        assert!(matches!(
            component(&w, 2),
            Err(ExprError::IndexOutOfRange { index: 2, bound: 2, .. })
        ));
        assert!(matches!(
            parameter(2, 2),
            Err(ExprError::IndexOutOfRange { .. })
        ));
        let u = parameter(2, 0).expect("Valid parameter index");
        assert!(matches!(
            sum(&x, &u),
            Err(ExprError::DimensionMismatch { what: "parameters", .. })
        ));
    }

    #[test]
    fn test_division_by_constant_zero() {
        let x = t();
        assert_eq!(
            quotient(&x, &constant(vec![0.0], 1)).unwrap_err(),
            ExprError::DivisionByZero {
                operation: "quotient"
            }
        );
        let halved = quotient(&x, &constant(vec![2.0], 1)).expect("Should build");
        assert!(matches!(halved.kind(), NodeKind::Scaling { scale, .. } if *scale == 0.5));
    }

    #[test]
    fn test_zero_constant_short_circuits() {
        let v = concatenated(&t(), &concatenated(&t(), &t()).expect("Should build")).expect("Should build");
        let zero3 = zero(3, 1);
        assert!(dot(&v, &zero3).expect("Should build").is_zero_constant());
        assert!(cross(&zero3, &v).expect("Should build").is_zero_constant());
    }

    #[test]
    fn test_components_route_through_concatenation() {
        let x = t();
        let y = function(ElementaryFunction::Sin, &x).expect("Should build");
        let pair = concatenated(&x, &y).expect("Should build");
        assert!(Arc::ptr_eq(&component(&pair, 0).expect("Should build"), &x));
        assert!(Arc::ptr_eq(&component(&pair, 1).expect("Should build"), &y));
        assert!(Arc::ptr_eq(&components(&pair, 0, 2).expect("Should build"), &pair));
    }

    #[test]
    fn test_composition_simplifications() {
        let x = t();
        let f = function(ElementaryFunction::Exp, &x).expect("Should build");
        // composing with a constant folds
        let c = composed(&f, &constant(vec![0.0], 3)).expect("Should compose");
        assert_eq!(c.constant_values(), Some(&[1.0][..]));
        assert_eq!(c.num_parameters(), 3);
        // identity on either side is a no-op
        assert!(Arc::ptr_eq(&composed(&f, &identity(1)).expect("Should compose"), &f));
        assert!(Arc::ptr_eq(&composed(&identity(1), &f).expect("Should compose"), &f));
        // mismatched dimensions
        let pair = concatenated(&x, &x).expect("Should build");
        assert!(composed(&f, &pair).is_err());
        // parameter selects a component of the inner expression
        let v = parameter(2, 1).expect("Valid parameter index");
        let picked = composed(&v, &concatenated(&x, &f).expect("Should build")).expect("Should compose");
        assert!(Arc::ptr_eq(&picked, &f));
    }

    #[test]
    fn test_function_folding_and_domains() {
        let c = function(ElementaryFunction::Sqrt, &constant(vec![4.0], 1)).expect("Should build");
        assert_eq!(c.scalar_value(), Some(2.0));
        assert!(matches!(
            function(ElementaryFunction::Log, &constant(vec![0.0], 1)),
            Err(ExprError::Domain { function: "log", .. })
        ));
        let clamped = function(ElementaryFunction::Acos, &constant(vec![1.0 + 1e-14], 1)).expect("Should build");
        assert_eq!(clamped.scalar_value(), Some(0.0));
        let pair = concatenated(&t(), &t()).expect("Should build");
        assert!(matches!(
            function(ElementaryFunction::Sin, &pair),
            Err(ExprError::InvalidOperandShape { .. })
        ));
    }

    #[test]
    fn test_negation_through_functions() {
        let x = t();
        let minus = negated(&x);
        let s = function(ElementaryFunction::Sin, &minus).expect("Should build");
        assert!(matches!(s.kind(), NodeKind::Negated(_)));
        let c = function(ElementaryFunction::Cos, &minus).expect("Should build");
        assert!(c.is_duplicate_of(&function(ElementaryFunction::Cos, &x).expect("Should build")));
    }

    #[test]
    fn test_power_rules() {
        let x = t();
        assert!(Arc::ptr_eq(&powf(&x, 1.0).expect("Should build"), &x));
        assert_eq!(powf(&x, 0.0).expect("Should build").scalar_value(), Some(1.0));
        assert!(matches!(
            power(&constant(vec![0.0], 1), &constant(vec![-1.0], 1)),
            Err(ExprError::DivisionByZero { .. })
        ));
        let eight = power(&constant(vec![2.0], 1), &constant(vec![3.0], 1)).expect("Should build");
        assert_eq!(eight.scalar_value(), Some(8.0));
    }

    #[test]
    fn test_variable_exponent_needs_positive_constant_base() {
        let x = t();
        for base in [-2.0, 0.0] {
            assert_eq!(
                power(&constant(vec![base], 1), &x).unwrap_err(),
                ExprError::Domain {
                    function: "pow",
                    value: base
                }
            );
        }
        // a positive base builds and differentiates
        let two_to_x = power(&constant(vec![2.0], 1), &x).expect("Should build");
        assert!(crate::differentiation::derivative(&two_to_x, 0).is_ok());
        // a constant base with a constant exponent still folds
        let folded = power(&constant(vec![-2.0], 1), &constant(vec![2.0], 1)).expect("Should build");
        assert_eq!(folded.scalar_value(), Some(4.0));
    }

    #[test]
    fn test_component_ranges_never_overflow() {
        let pair = concatenated(&t(), &t()).expect("Should build");
        for (start, count) in [(usize::MAX, 2), (1, usize::MAX), (usize::MAX, usize::MAX), (2, 1), (0, 0)] {
            assert!(matches!(
                components(&pair, start, count),
                Err(ExprError::IndexOutOfRange { bound: 2, .. })
            ));
        }
        assert!(components(&pair, 1, 1).is_ok());
    }

    #[test]
    fn test_transformation_merging() {
        let v = concatenated(&t(), &t()).expect("Should build");
        let m = Matrix::from_fn(2, 2, |r, c| (r + 2 * c + 1) as f64);
        let once = transformed(&m, &v).expect("Should build");
        let twice = transformed(&m, &once).expect("Should build");
        match twice.kind() {
            NodeKind::Transformation { matrix, operand } => {
                assert!(Arc::ptr_eq(operand, &v));
                assert!(matrix.approx_eq(&m.matmul(&m)));
            }
            other => panic!("expected transformation, got {other:?}"),
        }
        assert!(Arc::ptr_eq(&transformed(&Matrix::identity(2), &v).expect("Should build"), &v));
    }
}
