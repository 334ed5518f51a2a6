//! Definitions of the elementary functions
//!
//! Derivatives are with respect to the function's own argument; the chain
//! rule factor is applied by the caller.

use super::ElementaryFunction;
use super::registry::FunctionDefinition;
use crate::constructors::{constant, difference, function, negated, quotient, squared_norm};
use crate::error::Result;
use crate::node::NodeRef;
use crate::traits::clamp_unit;

fn one(x: &NodeRef) -> NodeRef {
    constant(vec![1.0], x.num_parameters())
}

/// `1 / sqrt(1 - x^2)`, shared by asin and acos
fn inverse_sine_slope(x: &NodeRef) -> Result<NodeRef> {
    let radicand = difference(&one(x), &squared_norm(x)?)?;
    quotient(&one(x), &function(ElementaryFunction::Sqrt, &radicand)?)
}

/// Return all function definitions for populating the registry
pub(crate) fn all_definitions() -> Vec<FunctionDefinition> {
    vec![
        FunctionDefinition {
            function: ElementaryFunction::Sin,
            name: "sin",
            domain: f64::is_finite,
            // d/dx sin(x) = cos(x)
            derivative: |x, _| function(ElementaryFunction::Cos, x),
        },
        FunctionDefinition {
            function: ElementaryFunction::Cos,
            name: "cos",
            domain: f64::is_finite,
            // d/dx cos(x) = -sin(x)
            derivative: |x, _| Ok(negated(&function(ElementaryFunction::Sin, x)?)),
        },
        FunctionDefinition {
            function: ElementaryFunction::Tan,
            name: "tan",
            domain: |x| x.is_finite() && !crate::traits::is_zero(x.cos()),
            // d/dx tan(x) = 1 / cos(x)^2
            derivative: |x, _| {
                let cosine = function(ElementaryFunction::Cos, x)?;
                quotient(&one(x), &squared_norm(&cosine)?)
            },
        },
        FunctionDefinition {
            function: ElementaryFunction::Asin,
            name: "asin",
            domain: |x| clamp_unit(x).is_some(),
            // d/dx asin(x) = 1 / sqrt(1 - x^2)
            derivative: |x, _| inverse_sine_slope(x),
        },
        FunctionDefinition {
            function: ElementaryFunction::Acos,
            name: "acos",
            domain: |x| clamp_unit(x).is_some(),
            // d/dx acos(x) = -1 / sqrt(1 - x^2)
            derivative: |x, _| Ok(negated(&inverse_sine_slope(x)?)),
        },
        FunctionDefinition {
            function: ElementaryFunction::Exp,
            name: "exp",
            domain: |x| !x.is_nan(),
            // d/dx exp(x) = exp(x)
            derivative: |_, node| Ok(node.clone()),
        },
        FunctionDefinition {
            function: ElementaryFunction::Log,
            name: "log",
            domain: |x| x > 0.0,
            // d/dx log(x) = 1 / x
            derivative: |x, _| quotient(&one(x), x),
        },
        FunctionDefinition {
            function: ElementaryFunction::Sqrt,
            name: "sqrt",
            domain: |x| x >= 0.0,
            // d/dx sqrt(x) = 1 / (2 sqrt(x))
            derivative: |x, node| quotient(&constant(vec![0.5], x.num_parameters()), node),
        },
    ]
}
