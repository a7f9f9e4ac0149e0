//! Seed-set and inactive-seed bookkeeping.
//!
//! - **SeedSet**: the ordered, append-only set of chosen seeds.
//! - **InactiveSeeds**: per node, the prior seeds whose influence path to
//!   that node has been superseded by a later seed. Strictly append-only;
//!   a seed marked inactive for a node never becomes active again.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::engine::arborescence::Arborescence;
use crate::engine::errors::SelectError;
use crate::engine::graph::NodeId;

/// The ordered seed set S.
///
/// Append-only across a run and capped at the configured seed count by the
/// selector. Appending a duplicate is an internal error: the greedy loop
/// removes a node from the candidate pool before appending it.
#[derive(Debug, Clone, Default)]
pub struct SeedSet {
    ordered: Vec<NodeId>,
    members: FxHashSet<NodeId>,
}

impl SeedSet {
    /// Creates an empty seed set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of seeds chosen so far.
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Whether no seed has been chosen yet.
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Whether the node has been chosen as a seed.
    pub fn contains(&self, node: NodeId) -> bool {
        self.members.contains(&node)
    }

    /// Chosen seeds in selection order.
    pub fn as_slice(&self) -> &[NodeId] {
        &self.ordered
    }

    /// Appends a newly selected seed.
    pub fn push(&mut self, node: NodeId) -> Result<(), SelectError> {
        if !self.members.insert(node) {
            return Err(SelectError::Internal(format!(
                "seed {:?} appended twice",
                node
            )));
        }
        self.ordered.push(node);
        Ok(())
    }

    /// Consumes the set, yielding the selection-ordered seed list.
    pub fn into_vec(self) -> Vec<NodeId> {
        self.ordered
    }
}

/// Per-node record of dominated ("inactive") prior seeds.
///
/// A prior seed s becomes inactive for a node v when a newly chosen seed
/// lies on s's maximum-influence path to v: the new seed is then the more
/// efficient activator on that path, and s must be excluded from v's
/// in-arborescence on the next rebuild.
#[derive(Debug, Clone, Default)]
pub struct InactiveSeeds {
    blocked: FxHashMap<NodeId, Vec<NodeId>>,
}

impl InactiveSeeds {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// The seeds currently inactive for a node, in the order they were
    /// dominated.
    pub fn blocked_for(&self, node: NodeId) -> &[NodeId] {
        self.blocked.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether a seed is already inactive for a node.
    pub fn is_blocked(&self, node: NodeId, seed: NodeId) -> bool {
        self.blocked_for(node).contains(&seed)
    }

    /// Records the seeds dominated by `new_seed`.
    ///
    /// For every node v reachable in `new_seed`'s out-arborescence and every
    /// prior seed s present in v's in-arborescence: if s's recorded MIP
    /// within that tree passes through `new_seed`, s is marked inactive for
    /// v. Must run BEFORE `new_seed` is appended to `seeds`.
    pub fn update(
        &mut self,
        seeds: &SeedSet,
        new_seed: NodeId,
        out_tree: &Arborescence,
        in_trees: &FxHashMap<NodeId, Arborescence>,
    ) -> Result<(), SelectError> {
        for &v in out_tree.nodes() {
            let v_tree = in_trees.get(&v).ok_or_else(|| {
                SelectError::Internal(format!("missing in-arborescence for node {:?}", v))
            })?;
            for &s in seeds.as_slice() {
                if let Some(mip) = v_tree.mip(s) {
                    if !self.is_blocked(v, s) && mip.contains(&new_seed) {
                        self.blocked.entry(v).or_default().push(s);
                    }
                }
            }
        }
        Ok(())
    }
}
