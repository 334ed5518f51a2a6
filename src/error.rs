use thiserror::Error;

/// Errors raised while constructing or evaluating parametric expressions
///
/// Every structural problem is detected when a combinator is called, so an
/// invalid expression graph can never be built. Evaluation of a valid graph
/// only fails when the caller hands in a buffer of the wrong shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// Operands disagree on their number of dimensions or parameters
    #[error("{operation}: expected {expected} {what}, found {found}")]
    DimensionMismatch {
        operation: &'static str,
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// A component, axis or parameter index is outside `0..bound`
    #[error("{operation}: index {index} out of range (valid range 0..{bound})")]
    IndexOutOfRange {
        operation: &'static str,
        index: usize,
        bound: usize,
    },

    /// The operation is only defined for operands of another shape
    #[error("{operation}: {reason}")]
    InvalidOperandShape {
        operation: &'static str,
        reason: String,
    },

    /// Division by a constant that is zero within tolerance
    #[error("{operation}: division by zero")]
    DivisionByZero { operation: &'static str },

    /// A function was applied to a constant outside its domain
    #[error("{function} is undefined at {value}")]
    Domain { function: &'static str, value: f64 },
}

impl ExprError {
    pub(crate) fn dimensions(operation: &'static str, expected: usize, found: usize) -> Self {
        ExprError::DimensionMismatch {
            operation,
            what: "dimensions",
            expected,
            found,
        }
    }

    pub(crate) fn parameters(operation: &'static str, expected: usize, found: usize) -> Self {
        ExprError::DimensionMismatch {
            operation,
            what: "parameters",
            expected,
            found,
        }
    }

    pub(crate) fn shape(operation: &'static str, reason: impl Into<String>) -> Self {
        ExprError::InvalidOperandShape {
            operation,
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T, E = ExprError> = std::result::Result<T, E>;
