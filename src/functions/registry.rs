use std::sync::OnceLock;

use super::ElementaryFunction;
use crate::error::Result;
use crate::node::NodeRef;

/// Definition of an elementary function: naming, constant-argument domain
/// and symbolic differentiation
pub(crate) struct FunctionDefinition {
    pub function: ElementaryFunction,

    /// Name used in the debug dump and in error messages
    pub name: &'static str,

    /// Whether a constant argument may be folded
    pub domain: fn(f64) -> bool,

    /// Symbolic derivative of `f(x)` with respect to `x`.
    /// Arguments: (the operand `x`, the node `f(x)` itself)
    pub derivative: fn(&NodeRef, &NodeRef) -> Result<NodeRef>,
}

/// Definitions indexed by the enum discriminant
static REGISTRY: OnceLock<Vec<FunctionDefinition>> = OnceLock::new();

fn init_registry() -> Vec<FunctionDefinition> {
    let mut definitions = super::definitions::all_definitions();
    definitions.sort_by_key(|definition| definition.function as usize);
    definitions
}

pub(crate) struct Registry;

impl Registry {
    /// Get the definition of `function` - O(1) index lookup
    pub(crate) fn get(function: ElementaryFunction) -> &'static FunctionDefinition {
        &REGISTRY.get_or_init(init_registry)[function as usize]
    }
}
