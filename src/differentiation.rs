// Differentiation engine - applies calculus rules structurally
//
// Derivatives are assembled through the combinators in `constructors`, so the
// same zero/one absorption that applies to user-built expressions keeps
// derivative graphs small. Within one call every node is differentiated at
// most once; shared subgraphs yield shared derivative subgraphs.

use log::debug;
use rustc_hash::FxHashMap;

use crate::constructors::{
    component, components, composed, concatenated, constant, cross, difference, dot, negated,
    norm, normalized, powf, product, quotient, scaled, sum, transformed, zero,
};
use crate::error::{ExprError, Result};
use crate::functions::{ElementaryFunction, Registry};
use crate::node::{NodeKind, NodeRef};

/// Partial derivative of `node` with respect to parameter `index`
pub fn derivative(node: &NodeRef, index: usize) -> Result<NodeRef> {
    if index >= node.num_parameters() {
        return Err(ExprError::IndexOutOfRange {
            operation: "derivative",
            index,
            bound: node.num_parameters(),
        });
    }
    let mut differentiator = Differentiator {
        index,
        memo: FxHashMap::default(),
    };
    let result = differentiator.derive(node)?;
    debug!(
        "derivative w.r.t. parameter {index}: {} nodes -> {} nodes",
        node.node_count(),
        result.node_count()
    );
    Ok(result)
}

struct Differentiator {
    index: usize,
    /// Keyed by node address; the root keeps every visited node alive
    memo: FxHashMap<usize, NodeRef>,
}

impl Differentiator {
    fn derive(&mut self, node: &NodeRef) -> Result<NodeRef> {
        if let Some(cached) = self.memo.get(&node.address()) {
            return Ok(cached.clone());
        }
        let result = self.derive_uncached(node)?;
        self.memo.insert(node.address(), result.clone());
        Ok(result)
    }

    fn derive_uncached(&mut self, node: &NodeRef) -> Result<NodeRef> {
        let n = node.num_parameters();
        match node.kind() {
            NodeKind::Constant { .. } => Ok(zero(node.num_dimensions(), n)),

            NodeKind::Identity => {
                let mut unit = vec![0.0; n];
                unit[self.index] = 1.0;
                Ok(constant(unit, n))
            }

            NodeKind::Parameter { index } => {
                let value = if *index == self.index { 1.0 } else { 0.0 };
                Ok(constant(vec![value], n))
            }

            NodeKind::Sum(a, b) => sum(&self.derive(a)?, &self.derive(b)?),
            NodeKind::Difference(a, b) => difference(&self.derive(a)?, &self.derive(b)?),

            // d(f*g) = df*g + f*dg
            NodeKind::Product {
                multiplier,
                multiplicand,
            } => {
                let first = product(&self.derive(multiplier)?, multiplicand)?;
                let second = product(multiplier, &self.derive(multiplicand)?)?;
                sum(&first, &second)
            }

            // d(f/g) = (df*g - f*dg) / g^2
            NodeKind::Quotient { dividend, divisor } => {
                let numerator = difference(
                    &product(divisor, &self.derive(dividend)?)?,
                    &product(&self.derive(divisor)?, dividend)?,
                )?;
                quotient(&numerator, &crate::constructors::squared_norm(divisor)?)
            }

            NodeKind::Negated(x) => Ok(negated(&self.derive(x)?)),
            NodeKind::Scaling { scale, operand } => Ok(scaled(*scale, &self.derive(operand)?)),
            NodeKind::Translation { operand, .. } => self.derive(operand),
            NodeKind::Transformation { matrix, operand } => {
                transformed(matrix, &self.derive(operand)?)
            }

            NodeKind::Power { base, exponent } => match exponent.scalar_value() {
                // d(f^c) = c * f^(c-1) * df
                Some(c) => {
                    let reduced = powf(base, c - 1.0)?;
                    Ok(scaled(c, &product(&reduced, &self.derive(base)?)?))
                }
                // d(f^g) = f^g * (dg * ln(f) + g * df / f)
                None => {
                    let log_base =
                        crate::constructors::function(ElementaryFunction::Log, base)?;
                    let first = product(&self.derive(exponent)?, &log_base)?;
                    let second = product(exponent, &quotient(&self.derive(base)?, base)?)?;
                    product(node, &sum(&first, &second)?)
                }
            },

            // d(f(g)) = sum_i (d_i f)(g) * d(g_i)
            NodeKind::Composition { outer, inner } => {
                let inner_derivative = self.derive(inner)?;
                let mut result = zero(node.num_dimensions(), n);
                for i in 0..outer.num_parameters() {
                    let partial = composed(&derivative(outer, i)?, inner)?;
                    let term = product(&component(&inner_derivative, i)?, &partial)?;
                    result = sum(&result, &term)?;
                }
                Ok(result)
            }

            NodeKind::Concatenation(a, b) => concatenated(&self.derive(a)?, &self.derive(b)?),
            NodeKind::Components {
                operand,
                start,
                count,
            } => components(&self.derive(operand)?, *start, *count),

            NodeKind::DotProduct(a, b) => sum(
                &dot(&self.derive(a)?, b)?,
                &dot(a, &self.derive(b)?)?,
            ),
            NodeKind::CrossProduct(a, b) => sum(
                &cross(&self.derive(a)?, b)?,
                &cross(a, &self.derive(b)?)?,
            ),

            // d|f| = df . f/|f|
            NodeKind::Norm(x) => dot(&self.derive(x)?, &normalized(x)?),

            // d(f.f) = 2 f . df
            NodeKind::SquaredNorm(x) => Ok(scaled(2.0, &dot(x, &self.derive(x)?)?)),

            // d(f/|f|) = (df - (df . n) n) / |f|
            NodeKind::Normalized(x) => {
                let dx = self.derive(x)?;
                let along = product(&dot(&dx, node)?, node)?;
                quotient(&difference(&dx, &along)?, &norm(x))
            }

            NodeKind::Function { function, operand } => {
                let slope = (Registry::get(*function).derivative)(operand, node)?;
                product(&slope, &self.derive(operand)?)
            }
        }
    }
}

fn require_curve(operation: &'static str, node: &NodeRef) -> Result<()> {
    if node.num_parameters() != 1 {
        return Err(ExprError::shape(
            operation,
            format!(
                "only defined for curves, found {} parameters",
                node.num_parameters()
            ),
        ));
    }
    Ok(())
}

/// Unit tangent of a curve
pub fn tangent_vector(node: &NodeRef) -> Result<NodeRef> {
    require_curve("tangent_vector", node)?;
    normalized(&derivative(node, 0)?)
}

/// Curvature of a curve: `|dT/dt| / |dr/dt|`
pub fn curvature(node: &NodeRef) -> Result<NodeRef> {
    require_curve("curvature", node)?;
    let tangent = tangent_vector(node)?;
    quotient(&norm(&derivative(&tangent, 0)?), &norm(&derivative(node, 0)?))
}

/// Principal normal of a curve, or the unit normal of a surface in 3D
pub fn normal_vector(node: &NodeRef) -> Result<NodeRef> {
    match (node.num_parameters(), node.num_dimensions()) {
        (1, _) => normalized(&derivative(&tangent_vector(node)?, 0)?),
        (2, 3) => normalized(&cross(&derivative(node, 0)?, &derivative(node, 1)?)?),
        (n, u) => Err(ExprError::shape(
            "normal_vector",
            format!("needs a curve or a surface in 3D, found R{n} -> R{u}"),
        )),
    }
}

/// Binormal of a 3D curve: tangent cross normal
pub fn binormal_vector(node: &NodeRef) -> Result<NodeRef> {
    require_curve("binormal_vector", node)?;
    if node.num_dimensions() != 3 {
        return Err(ExprError::shape(
            "binormal_vector",
            format!(
                "only defined for 3D curves, found {} dimensions",
                node.num_dimensions()
            ),
        ));
    }
    cross(&tangent_vector(node)?, &normal_vector(node)?)
}
