//! Deduplication of structurally identical subexpressions
//!
//! Repeated differentiation and composition tend to rebuild the same
//! subexpressions over and over. Passing a freshly built graph through a
//! [`DeduplicationCache`] collapses every structurally identical subgraph to
//! a single shared node, which keeps graphs small and lets the evaluator
//! memoize shared work.
//!
//! A cache is meant to live for one top-level construction call and then be
//! dropped; it is not a process-wide intern table.

use log::trace;

use crate::constructors::with_children;
use crate::error::Result;
use crate::node::NodeRef;

/// Ordered list of canonical nodes, none a duplicate of another
#[derive(Debug, Default)]
pub struct DeduplicationCache {
    entries: Vec<NodeRef>,
}

impl DeduplicationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First cached node that `node` duplicates, if any
    pub fn find(&self, node: &NodeRef) -> Option<&NodeRef> {
        self.entries.iter().find(|entry| node.is_duplicate_of(entry))
    }

    /// Return the canonical node for `node`: an existing duplicate if one is
    /// cached, otherwise `node` itself (after recursively canonicalizing its
    /// children), which is then added to the cache.
    pub fn deduplicated(&mut self, node: &NodeRef) -> Result<NodeRef> {
        if let Some(existing) = self.find(node) {
            trace!(
                "dedup hit: {} R{} -> R{}",
                node.kind_name(),
                node.num_parameters(),
                node.num_dimensions()
            );
            return Ok(existing.clone());
        }

        let children = node
            .children()
            .into_iter()
            .map(|child| self.deduplicated(child))
            .collect::<Result<Vec<_>>>()?;
        let rebuilt = with_children(node, &children)?;

        // rebuilding may simplify into something already cached
        if let Some(existing) = self.find(&rebuilt) {
            return Ok(existing.clone());
        }
        self.entries.push(rebuilt.clone());
        Ok(rebuilt)
    }
}
