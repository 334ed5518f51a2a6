//! Expression nodes: the immutable DAG behind every parametric expression
//!
//! A node represents a pure function `R^n -> R^u` where `n` is its number of
//! parameters and `u` its number of dimensions. Nodes are shared through
//! [`NodeRef`] and never mutated, so the graph is acyclic by construction.

use rustc_hash::FxHashSet;
use std::ops::Deref;
use std::sync::Arc;

use crate::functions::ElementaryFunction;
use crate::math::{Interval, Matrix};
use crate::traits::approx_eq;

/// Shared handle to an expression node
pub type NodeRef = Arc<Node>;

#[derive(Debug)]
pub struct Node {
    num_parameters: usize,
    num_dimensions: usize,
    kind: NodeKind,
}

impl Deref for Node {
    type Target = NodeKind;

    fn deref(&self) -> &Self::Target {
        &self.kind
    }
}

#[derive(Debug)]
pub enum NodeKind {
    /// Constant vector, with its point bounds precomputed for interval evaluation
    Constant {
        values: Vec<f64>,
        bounds: Vec<Interval>,
    },

    /// The parameter vector itself (`n == u`)
    Identity,

    /// A single component of the parameter vector
    Parameter { index: usize },

    Sum(NodeRef, NodeRef),
    Difference(NodeRef, NodeRef),

    /// Scalar `multiplier` times a `multiplicand` of any dimension
    Product {
        multiplier: NodeRef,
        multiplicand: NodeRef,
    },

    /// Any `dividend` divided by a scalar `divisor`
    Quotient { dividend: NodeRef, divisor: NodeRef },

    Negated(NodeRef),

    Scaling { scale: f64, operand: NodeRef },

    Translation { operand: NodeRef, offset: Vec<f64> },

    /// Linear map: `matrix * operand`
    Transformation { matrix: Matrix<f64>, operand: NodeRef },

    Power { base: NodeRef, exponent: NodeRef },

    /// `outer(inner(p))`
    Composition { outer: NodeRef, inner: NodeRef },

    Concatenation(NodeRef, NodeRef),

    Components {
        operand: NodeRef,
        start: usize,
        count: usize,
    },

    DotProduct(NodeRef, NodeRef),
    CrossProduct(NodeRef, NodeRef),
    Norm(NodeRef),
    SquaredNorm(NodeRef),
    Normalized(NodeRef),

    Function {
        function: ElementaryFunction,
        operand: NodeRef,
    },
}

impl Node {
    pub(crate) fn new(num_parameters: usize, num_dimensions: usize, kind: NodeKind) -> NodeRef {
        Arc::new(Node {
            num_parameters,
            num_dimensions,
            kind,
        })
    }

    /// Constant node; its interval bounds are the degenerate point intervals
    pub(crate) fn constant(values: Vec<f64>, num_parameters: usize) -> NodeRef {
        let bounds = values.iter().copied().map(Interval::singleton).collect();
        Node::new(
            num_parameters,
            values.len(),
            NodeKind::Constant { values, bounds },
        )
    }

    #[inline]
    pub fn num_parameters(&self) -> usize {
        self.num_parameters
    }

    #[inline]
    pub fn num_dimensions(&self) -> usize {
        self.num_dimensions
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, NodeKind::Constant { .. })
    }

    pub fn constant_values(&self) -> Option<&[f64]> {
        match &self.kind {
            NodeKind::Constant { values, .. } => Some(values.as_slice()),
            _ => None,
        }
    }

    /// Value of a one-dimensional constant node
    pub fn scalar_value(&self) -> Option<f64> {
        match self.constant_values() {
            Some([value]) => Some(*value),
            _ => None,
        }
    }

    /// Constant whose components are all zero within tolerance
    pub fn is_zero_constant(&self) -> bool {
        self.constant_values()
            .is_some_and(|values| values.iter().all(|&v| crate::traits::is_zero(v)))
    }

    /// Address used as this node's identity in memo tables
    #[inline]
    pub fn address(&self) -> usize {
        self as *const Node as usize
    }

    /// Direct children in a fixed order
    pub fn children(&self) -> Vec<&NodeRef> {
        use NodeKind::*;
        match &self.kind {
            Constant { .. } | Identity | Parameter { .. } => Vec::new(),
            Sum(a, b)
            | Difference(a, b)
            | Concatenation(a, b)
            | DotProduct(a, b)
            | CrossProduct(a, b) => vec![a, b],
            Product {
                multiplier,
                multiplicand,
            } => vec![multiplier, multiplicand],
            Quotient { dividend, divisor } => vec![dividend, divisor],
            Power { base, exponent } => vec![base, exponent],
            Composition { outer, inner } => vec![outer, inner],
            Negated(x) | Norm(x) | SquaredNorm(x) | Normalized(x) => vec![x],
            Scaling { operand, .. }
            | Translation { operand, .. }
            | Transformation { operand, .. }
            | Components { operand, .. }
            | Function { operand, .. } => vec![operand],
        }
    }

    /// Short name of the node kind, used by the debug dump
    pub fn kind_name(&self) -> &'static str {
        use NodeKind::*;
        match &self.kind {
            Constant { .. } => "Constant",
            Identity => "Identity",
            Parameter { .. } => "Parameter",
            Sum(..) => "Sum",
            Difference(..) => "Difference",
            Product { .. } => "Product",
            Quotient { .. } => "Quotient",
            Negated(_) => "Negated",
            Scaling { .. } => "Scaling",
            Translation { .. } => "Translation",
            Transformation { .. } => "Transformation",
            Power { .. } => "Power",
            Composition { .. } => "Composition",
            Concatenation(..) => "Concatenation",
            Components { .. } => "Components",
            DotProduct(..) => "DotProduct",
            CrossProduct(..) => "CrossProduct",
            Norm(_) => "Norm",
            SquaredNorm(_) => "SquaredNorm",
            Normalized(_) => "Normalized",
            Function { function, .. } => function.name(),
        }
    }

    /// Structural equality up to tolerance on constant payloads.
    ///
    /// Two nodes are duplicates if they have the same kind, the same numbers
    /// of parameters and dimensions, matching payloads and pairwise duplicate
    /// children. Sums, products and dot products also match with their
    /// operands swapped.
    pub fn is_duplicate_of(&self, other: &Node) -> bool {
        use NodeKind::*;

        if std::ptr::eq(self, other) {
            return true;
        }
        if self.num_parameters != other.num_parameters
            || self.num_dimensions != other.num_dimensions
        {
            return false;
        }
        match (&self.kind, &other.kind) {
            (Constant { values: a, .. }, Constant { values: b, .. }) => {
                a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| approx_eq(x, y))
            }
            (Identity, Identity) => true,
            (Parameter { index: a }, Parameter { index: b }) => a == b,
            (Sum(a1, a2), Sum(b1, b2)) | (DotProduct(a1, a2), DotProduct(b1, b2)) => {
                commutative_duplicates(a1, a2, b1, b2)
            }
            (
                Product {
                    multiplier: a1,
                    multiplicand: a2,
                },
                Product {
                    multiplier: b1,
                    multiplicand: b2,
                },
            ) => commutative_duplicates(a1, a2, b1, b2),
            (Difference(a1, a2), Difference(b1, b2))
            | (Concatenation(a1, a2), Concatenation(b1, b2))
            | (CrossProduct(a1, a2), CrossProduct(b1, b2)) => {
                a1.is_duplicate_of(b1) && a2.is_duplicate_of(b2)
            }
            (
                Quotient {
                    dividend: a1,
                    divisor: a2,
                },
                Quotient {
                    dividend: b1,
                    divisor: b2,
                },
            )
            | (
                Power {
                    base: a1,
                    exponent: a2,
                },
                Power {
                    base: b1,
                    exponent: b2,
                },
            )
            | (
                Composition {
                    outer: a1,
                    inner: a2,
                },
                Composition {
                    outer: b1,
                    inner: b2,
                },
            ) => a1.is_duplicate_of(b1) && a2.is_duplicate_of(b2),
            (Negated(a), Negated(b))
            | (Norm(a), Norm(b))
            | (SquaredNorm(a), SquaredNorm(b))
            | (Normalized(a), Normalized(b)) => a.is_duplicate_of(b),
            (
                Scaling {
                    scale: s,
                    operand: a,
                },
                Scaling {
                    scale: t,
                    operand: b,
                },
            ) => approx_eq(*s, *t) && a.is_duplicate_of(b),
            (
                Translation {
                    operand: a,
                    offset: s,
                },
                Translation {
                    operand: b,
                    offset: t,
                },
            ) => s.iter().zip(t).all(|(&x, &y)| approx_eq(x, y)) && a.is_duplicate_of(b),
            (
                Transformation {
                    matrix: m,
                    operand: a,
                },
                Transformation {
                    matrix: n,
                    operand: b,
                },
            ) => m.approx_eq(n) && a.is_duplicate_of(b),
            (
                Components {
                    operand: a,
                    start: s,
                    ..
                },
                Components {
                    operand: b,
                    start: t,
                    ..
                },
            ) => s == t && a.is_duplicate_of(b),
            (
                Function {
                    function: f,
                    operand: a,
                },
                Function {
                    function: g,
                    operand: b,
                },
            ) => f == g && a.is_duplicate_of(b),
            _ => false,
        }
    }

    /// Number of distinct nodes reachable from this one
    pub fn node_count(&self) -> usize {
        let mut seen = FxHashSet::default();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if seen.insert(node.address()) {
                stack.extend(node.children().into_iter().map(|child| &**child));
            }
        }
        seen.len()
    }

    /// Length of the longest path to a leaf
    pub fn max_depth(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(|child| child.max_depth())
            .max()
            .unwrap_or(0)
    }
}

fn commutative_duplicates(a1: &Node, a2: &Node, b1: &Node, b2: &Node) -> bool {
    (a1.is_duplicate_of(b1) && a2.is_duplicate_of(b2))
        || (a1.is_duplicate_of(b2) && a2.is_duplicate_of(b1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parameter(n: usize, index: usize) -> NodeRef {
        Node::new(n, 1, NodeKind::Parameter { index })
    }

    #[test]
    fn test_constant_accessors() {
        let c = Node::constant(vec![0.0, 1e-13], 2);
        assert!(c.is_constant());
        assert!(c.is_zero_constant());
        assert_eq!(c.num_dimensions(), 2);
        assert_eq!(c.scalar_value(), None);
        assert_eq!(Node::constant(vec![3.0], 1).scalar_value(), Some(3.0));
    }

    #[test]
    fn test_duplicate_detection() {
        let u = parameter(2, 0);
        let v = parameter(2, 1);
        let a = Node::new(2, 1, NodeKind::Sum(u.clone(), v.clone()));
        let b = Node::new(2, 1, NodeKind::Sum(v.clone(), u.clone()));
        let c = Node::new(2, 1, NodeKind::Difference(u.clone(), v.clone()));
        let d = Node::new(2, 1, NodeKind::Difference(v.clone(), u.clone()));

        assert!(a.is_duplicate_of(&b));
        assert!(!c.is_duplicate_of(&d));
        assert!(!u.is_duplicate_of(&v));
        assert!(!a.is_duplicate_of(&c));
    }

    #[test]
    fn test_constants_compare_within_tolerance() {
        let a = Node::constant(vec![1.0, 2.0], 1);
        let b = Node::constant(vec![1.0 + 1e-14, 2.0], 1);
        let c = Node::constant(vec![1.0, 2.1], 1);
        assert!(a.is_duplicate_of(&b));
        assert!(!a.is_duplicate_of(&c));
        // same values, different parameter count
        assert!(!a.is_duplicate_of(&Node::constant(vec![1.0, 2.0], 2)));
    }

    #[test]
    fn test_node_count_shares_subgraphs() {
        let t = parameter(1, 0);
        let square = Node::new(1, 1, NodeKind::SquaredNorm(t.clone()));
        let sum = Node::new(1, 1, NodeKind::Sum(square.clone(), square.clone()));
        assert_eq!(sum.node_count(), 3);
        assert_eq!(sum.max_depth(), 3);
        assert_eq!(sum.children().len(), 2);
    }
}
