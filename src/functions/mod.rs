//! Elementary functions of one scalar argument
//!
//! Each function carries a definition (see [`definitions`]) holding its name,
//! the domain it accepts at constant arguments and its symbolic derivative.
//! Numeric evaluation is generic over the [`Scalar`] domain so the same code
//! serves point values and interval bounds.

use std::fmt;

use crate::traits::Scalar;

pub(crate) mod definitions;
pub(crate) mod registry;

pub(crate) use registry::Registry;

/// The transcendental functions an expression can apply
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementaryFunction {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Exp,
    Log,
    Sqrt,
}

impl ElementaryFunction {
    pub const ALL: [ElementaryFunction; 8] = [
        ElementaryFunction::Sin,
        ElementaryFunction::Cos,
        ElementaryFunction::Tan,
        ElementaryFunction::Asin,
        ElementaryFunction::Acos,
        ElementaryFunction::Exp,
        ElementaryFunction::Log,
        ElementaryFunction::Sqrt,
    ];

    pub fn name(self) -> &'static str {
        Registry::get(self).name
    }

    /// Evaluate the function in any numeric domain
    #[inline]
    pub fn apply<T: Scalar>(self, x: T) -> T {
        match self {
            ElementaryFunction::Sin => x.sin(),
            ElementaryFunction::Cos => x.cos(),
            ElementaryFunction::Tan => x.tan(),
            ElementaryFunction::Asin => x.asin(),
            ElementaryFunction::Acos => x.acos(),
            ElementaryFunction::Exp => x.exp(),
            ElementaryFunction::Log => x.ln(),
            ElementaryFunction::Sqrt => x.sqrt(),
        }
    }

    /// Value of the first derivative `f'(x)`, used by forward-mode Jacobians
    pub fn slope<T: Scalar>(self, x: T) -> T {
        let one = T::one();
        match self {
            ElementaryFunction::Sin => x.cos(),
            ElementaryFunction::Cos => -x.sin(),
            ElementaryFunction::Tan => one / x.cos().squared(),
            ElementaryFunction::Asin => one / (one - x.squared()).sqrt(),
            ElementaryFunction::Acos => -(one / (one - x.squared()).sqrt()),
            ElementaryFunction::Exp => x.exp(),
            ElementaryFunction::Log => one / x,
            ElementaryFunction::Sqrt => T::from_f64(0.5) / x.sqrt(),
        }
    }
}

impl fmt::Display for ElementaryFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
