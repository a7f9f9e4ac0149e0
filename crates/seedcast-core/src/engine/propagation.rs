//! Tree-scoped activation and marginal-gain propagation.
//!
//! Two ordered passes over an in-arborescence:
//!
//! - **Activation** (bottom-up, leaves before root): the probability that
//!   each node becomes active given the current seed set, combining in-tree
//!   predecessors as independent sources.
//! - **Alpha** (top-down, root before leaves): the sensitivity of the root's
//!   activation probability to each node's own activation — the probability
//!   that an activation at the node propagates all the way to the root.
//!
//! Both tables are scoped per tree and keyed by `(tree root, node)` — a
//! stable structural key rather than object identity — and a tree's slice is
//! cleared and recomputed whenever the tree is rebuilt.

use rustc_hash::FxHashMap;

use crate::engine::arborescence::{Arborescence, TreeKind};
use crate::engine::errors::SelectError;
use crate::engine::graph::{DiffusionGraph, NodeId};
use crate::engine::seeds::SeedSet;

/// Activation probabilities, per tree: `(tree root, node) -> p ∈ [0, 1]`.
#[derive(Debug, Clone, Default)]
pub struct ActivationTable {
    trees: FxHashMap<NodeId, FxHashMap<NodeId, f64>>,
}

impl ActivationTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Activation probability of `node` within the tree rooted at
    /// `tree_root`, if computed.
    pub fn get(&self, node: NodeId, tree_root: NodeId) -> Option<f64> {
        self.trees.get(&tree_root)?.get(&node).copied()
    }

    fn set(&mut self, tree_root: NodeId, node: NodeId, value: f64) {
        self.trees.entry(tree_root).or_default().insert(node, value);
    }

    fn reset_tree(&mut self, tree_root: NodeId) {
        self.trees.remove(&tree_root);
    }
}

/// Marginal-gain sensitivities, per tree: `(tree root, node) -> α ∈ [0, 1]`.
#[derive(Debug, Clone, Default)]
pub struct AlphaTable {
    trees: FxHashMap<NodeId, FxHashMap<NodeId, f64>>,
}

impl AlphaTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Alpha of `node` within the tree rooted at `tree_root`, if computed.
    pub fn get(&self, tree_root: NodeId, node: NodeId) -> Option<f64> {
        self.trees.get(&tree_root)?.get(&node).copied()
    }

    fn set(&mut self, tree_root: NodeId, node: NodeId, value: f64) {
        self.trees.entry(tree_root).or_default().insert(node, value);
    }

    fn reset_tree(&mut self, tree_root: NodeId) {
        self.trees.remove(&tree_root);
    }
}

/// Recomputes activation probabilities for every node of an in-arborescence.
///
/// Nodes are processed in decreasing MIP length (leaves before root) so each
/// in-tree predecessor's activation is known before its successor's:
///
/// - a seed is active with probability 1;
/// - a node with no in-tree predecessors (and not a seed) has probability 0;
/// - otherwise `1 − Π (1 − ap(c) · proba(c → node))` over in-tree
///   predecessors c, the independent-source OR-combination.
pub fn update_activation(
    ap: &mut ActivationTable,
    graph: &DiffusionGraph,
    seeds: &SeedSet,
    tree: &Arborescence,
) -> Result<(), SelectError> {
    if tree.kind() != TreeKind::In {
        return Err(SelectError::Internal(
            "activation update requires an in-arborescence".into(),
        ));
    }
    let root = tree.root();
    ap.reset_tree(root);

    for u in tree.nodes_leaves_first() {
        let value = if seeds.contains(u) {
            1.0
        } else if tree.children(u).is_empty() {
            0.0
        } else {
            let mut prod = 1.0;
            for &c in tree.children(u) {
                let p = tree_edge_proba(graph, c, u)?;
                let ap_c = ap.get(c, root).ok_or_else(|| {
                    SelectError::Internal(format!(
                        "activation of predecessor {:?} missing in tree {:?}",
                        c, root
                    ))
                })?;
                prod *= 1.0 - ap_c * p;
            }
            1.0 - prod
        };
        if !value.is_finite() {
            return Err(SelectError::Numerical(format!(
                "activation of {:?} in tree {:?} is not finite",
                u, root
            )));
        }
        ap.set(root, u, value);
    }
    Ok(())
}

/// Recomputes alpha for every node of an in-arborescence.
///
/// Nodes are processed in increasing MIP length (root before leaves). The
/// root's alpha is 1. For any other node u with unique tree successor w:
/// a seeded w shields u entirely (alpha 0); otherwise
/// `alpha(w) · proba(u → w) · Π (1 − ap(s) · proba(s → w))` over w's other
/// in-tree predecessors s.
///
/// A non-root node without exactly one successor violates the arborescence
/// invariant; that is a fatal internal error, never silently repaired.
pub fn update_alpha(
    alpha: &mut AlphaTable,
    graph: &DiffusionGraph,
    seeds: &SeedSet,
    tree: &Arborescence,
    ap: &ActivationTable,
) -> Result<(), SelectError> {
    if tree.kind() != TreeKind::In {
        return Err(SelectError::Internal(
            "alpha update requires an in-arborescence".into(),
        ));
    }
    let root = tree.root();
    alpha.reset_tree(root);

    for u in tree.nodes_root_first() {
        let value = if u == root {
            1.0
        } else {
            let w = tree.parent(u).ok_or_else(|| {
                SelectError::Internal(format!(
                    "node {:?} must have exactly one outgoing edge in the in-arborescence rooted at {:?}",
                    u, root
                ))
            })?;
            if seeds.contains(w) {
                0.0
            } else {
                let alpha_w = alpha.get(root, w).ok_or_else(|| {
                    SelectError::Internal(format!(
                        "alpha of successor {:?} missing in tree {:?}",
                        w, root
                    ))
                })?;
                let mut prod = 1.0;
                for &s in tree.children(w) {
                    if s == u {
                        continue;
                    }
                    let p = tree_edge_proba(graph, s, w)?;
                    let ap_s = ap.get(s, root).ok_or_else(|| {
                        SelectError::Internal(format!(
                            "activation of sibling {:?} missing in tree {:?}",
                            s, root
                        ))
                    })?;
                    prod *= 1.0 - ap_s * p;
                }
                alpha_w * tree_edge_proba(graph, u, w)? * prod
            }
        };
        if !value.is_finite() {
            return Err(SelectError::Numerical(format!(
                "alpha of {:?} in tree {:?} is not finite",
                u, root
            )));
        }
        alpha.set(root, u, value);
    }
    Ok(())
}

/// Transition probability of a tree edge, looked up on the underlying graph.
/// Tree edges are graph edges, so absence is an internal inconsistency.
fn tree_edge_proba(graph: &DiffusionGraph, src: NodeId, dst: NodeId) -> Result<f64, SelectError> {
    graph.proba(src, dst).ok_or_else(|| {
        SelectError::Internal(format!(
            "tree edge {:?} -> {:?} has no underlying graph edge",
            src, dst
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::arborescence::{build_in_arborescence, build_out_arborescence};

    fn chain_graph() -> DiffusionGraph {
        let mut graph = DiffusionGraph::new();
        graph.add_edge(NodeId(0), NodeId(1), 0.5).expect("edge");
        graph.add_edge(NodeId(1), NodeId(2), 0.5).expect("edge");
        graph
    }

    #[test]
    fn activation_without_seeds_is_zero_everywhere() {
        let graph = chain_graph();
        let seeds = SeedSet::new();
        let tree = build_in_arborescence(&graph, NodeId(2), 0.01, &seeds, &[]);

        let mut ap = ActivationTable::new();
        update_activation(&mut ap, &graph, &seeds, &tree).expect("activation");
        for &u in tree.nodes() {
            assert_eq!(ap.get(u, NodeId(2)), Some(0.0));
        }
    }

    #[test]
    fn seeds_have_activation_one_and_propagate_downstream() {
        let graph = chain_graph();
        let mut seeds = SeedSet::new();
        seeds.push(NodeId(0)).expect("seed");
        let tree = build_in_arborescence(&graph, NodeId(2), 0.01, &seeds, &[]);

        let mut ap = ActivationTable::new();
        update_activation(&mut ap, &graph, &seeds, &tree).expect("activation");
        assert_eq!(ap.get(NodeId(0), NodeId(2)), Some(1.0));
        assert_eq!(ap.get(NodeId(1), NodeId(2)), Some(0.5));
        assert_eq!(ap.get(NodeId(2), NodeId(2)), Some(0.25));
    }

    #[test]
    fn activation_combines_independent_predecessors() {
        // 0 -> 2 and 1 -> 2, both seeded: 1 - (1 - 0.5)(1 - 0.25).
        let mut graph = DiffusionGraph::new();
        graph.add_edge(NodeId(0), NodeId(2), 0.5).expect("edge");
        graph.add_edge(NodeId(1), NodeId(2), 0.25).expect("edge");
        let mut seeds = SeedSet::new();
        seeds.push(NodeId(0)).expect("seed");
        seeds.push(NodeId(1)).expect("seed");

        let tree = build_in_arborescence(&graph, NodeId(2), 0.01, &seeds, &[]);
        let mut ap = ActivationTable::new();
        update_activation(&mut ap, &graph, &seeds, &tree).expect("activation");

        let expected = 1.0 - (1.0 - 0.5) * (1.0 - 0.25);
        let got = ap.get(NodeId(2), NodeId(2)).expect("root entry");
        assert!((got - expected).abs() < 1e-12);
    }

    #[test]
    fn activation_rejects_out_arborescence() {
        let graph = chain_graph();
        let seeds = SeedSet::new();
        let tree = build_out_arborescence(&graph, NodeId(0), 0.01, &seeds);
        let mut ap = ActivationTable::new();
        assert!(matches!(
            update_activation(&mut ap, &graph, &seeds, &tree),
            Err(SelectError::Internal(_))
        ));
    }

    #[test]
    fn alpha_of_root_is_one_and_decays_along_the_path() {
        let graph = chain_graph();
        let seeds = SeedSet::new();
        let tree = build_in_arborescence(&graph, NodeId(2), 0.01, &seeds, &[]);

        let mut ap = ActivationTable::new();
        update_activation(&mut ap, &graph, &seeds, &tree).expect("activation");
        let mut alpha = AlphaTable::new();
        update_alpha(&mut alpha, &graph, &seeds, &tree, &ap).expect("alpha");

        assert_eq!(alpha.get(NodeId(2), NodeId(2)), Some(1.0));
        assert_eq!(alpha.get(NodeId(2), NodeId(1)), Some(0.5));
        assert_eq!(alpha.get(NodeId(2), NodeId(0)), Some(0.25));
    }

    #[test]
    fn seeded_successor_shields_alpha() {
        let graph = chain_graph();
        let mut seeds = SeedSet::new();
        seeds.push(NodeId(1)).expect("seed");
        let tree = build_in_arborescence(&graph, NodeId(2), 0.01, &seeds, &[]);

        let mut ap = ActivationTable::new();
        update_activation(&mut ap, &graph, &seeds, &tree).expect("activation");
        let mut alpha = AlphaTable::new();
        update_alpha(&mut alpha, &graph, &seeds, &tree, &ap).expect("alpha");

        // 0 is not in the tree (the frontier stops at the seed); 1's alpha
        // is unaffected by being a seed itself.
        assert_eq!(alpha.get(NodeId(2), NodeId(1)), Some(0.5));
        assert_eq!(alpha.get(NodeId(2), NodeId(0)), None);
    }

    #[test]
    fn alpha_discounts_activated_siblings() {
        // 0 -> 2 (0.5), 1 -> 2 (0.25), 1 seeded. Alpha of 0 within the tree
        // rooted at 2 is p(0->2) * (1 - ap(1) * p(1->2)).
        let mut graph = DiffusionGraph::new();
        graph.add_edge(NodeId(0), NodeId(2), 0.5).expect("edge");
        graph.add_edge(NodeId(1), NodeId(2), 0.25).expect("edge");
        let mut seeds = SeedSet::new();
        seeds.push(NodeId(1)).expect("seed");

        let tree = build_in_arborescence(&graph, NodeId(2), 0.01, &seeds, &[]);
        let mut ap = ActivationTable::new();
        update_activation(&mut ap, &graph, &seeds, &tree).expect("activation");
        let mut alpha = AlphaTable::new();
        update_alpha(&mut alpha, &graph, &seeds, &tree, &ap).expect("alpha");

        let expected = 0.5 * (1.0 - 1.0 * 0.25);
        let got = alpha.get(NodeId(2), NodeId(0)).expect("alpha entry");
        assert!((got - expected).abs() < 1e-12);
    }

    #[test]
    fn alpha_rejects_out_arborescence() {
        let graph = chain_graph();
        let seeds = SeedSet::new();
        let tree = build_out_arborescence(&graph, NodeId(0), 0.01, &seeds);
        let ap = ActivationTable::new();
        let mut alpha = AlphaTable::new();
        assert!(matches!(
            update_alpha(&mut alpha, &graph, &seeds, &tree, &ap),
            Err(SelectError::Internal(_))
        ));
    }

    #[test]
    fn rebuilding_a_tree_clears_its_stale_entries() {
        let graph = chain_graph();
        let mut seeds = SeedSet::new();
        seeds.push(NodeId(1)).expect("seed");

        let mut ap = ActivationTable::new();
        let full = build_in_arborescence(&graph, NodeId(2), 0.01, &SeedSet::new(), &[]);
        update_activation(&mut ap, &graph, &SeedSet::new(), &full).expect("activation");
        assert!(ap.get(NodeId(0), NodeId(2)).is_some());

        // Rebuild against the seed set: node 0 leaves the tree, and its
        // entry must not linger.
        let pruned = build_in_arborescence(&graph, NodeId(2), 0.01, &seeds, &[]);
        update_activation(&mut ap, &graph, &seeds, &pruned).expect("activation");
        assert_eq!(ap.get(NodeId(0), NodeId(2)), None);
        assert_eq!(ap.get(NodeId(1), NodeId(2)), Some(1.0));
    }
}
