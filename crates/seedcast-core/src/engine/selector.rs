//! The greedy PMIA seed-selection loop.
//!
//! Each round picks the node with the highest incremental-influence
//! estimate, builds its out-arborescence, retires the contributions its
//! reach makes redundant, updates the inactive-seed bookkeeping, and
//! rebuilds the in-arborescence of every node it reaches. The per-node
//! estimates are maintained incrementally across rounds; the full-graph
//! recomputation of the naive greedy algorithm never happens.

use rustc_hash::FxHashMap;

use crate::engine::arborescence::{build_in_arborescence, build_out_arborescence, Arborescence};
use crate::engine::errors::SelectError;
use crate::engine::graph::{DiffusionGraph, NodeId};
use crate::engine::propagation::{
    update_activation, update_alpha, ActivationTable, AlphaTable,
};
use crate::engine::seeds::{InactiveSeeds, SeedSet};

/// Configuration for a selection run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionConfig {
    /// Desired seed-set size k.
    pub seed_count: usize,
    /// Pruning threshold θ in (0, 1]. Paths whose combined transition
    /// probability falls below θ are excluded from every arborescence;
    /// smaller values grow larger trees (higher fidelity, higher cost).
    pub theta: f64,
}

impl SelectionConfig {
    /// Creates a configuration with the given seed count and threshold.
    pub fn new(seed_count: usize, theta: f64) -> Self {
        Self { seed_count, theta }
    }

    fn validate(self) -> Result<Self, SelectError> {
        if !self.theta.is_finite() || !(self.theta > 0.0 && self.theta <= 1.0) {
            return Err(SelectError::ValidationError(format!(
                "pruning threshold theta must be in (0, 1], got {}",
                self.theta
            )));
        }
        Ok(self)
    }
}

/// Runtime diagnostics for a selection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionDiagnostics {
    /// Greedy rounds completed.
    pub rounds_run: usize,
    /// In-arborescences built, counting initialization and rebuilds.
    pub trees_built: usize,
    /// Candidate nodes at initialization.
    pub candidate_count: usize,
    /// Whether the incremental-influence map drained before `seed_count`
    /// rounds completed.
    pub influence_drained: bool,
}

/// Observer hooks at the two natural progress checkpoints.
///
/// Both hooks default to no-ops; observing must not affect results. The
/// selector calls `tree_built` once per in-arborescence construction
/// (initialization and rebuilds) and `round_complete` at each round
/// boundary.
pub trait SelectionObserver {
    /// A node's in-arborescence was (re)built.
    fn tree_built(&mut self, root: NodeId) {
        let _ = root;
    }

    /// A greedy round finished by appending `seed` to the seed set.
    fn round_complete(&mut self, round: usize, seed: NodeId) {
        let _ = (round, seed);
    }
}

struct NoopObserver;

impl SelectionObserver for NoopObserver {}

/// Selects up to `config.seed_count` seeds maximizing expected diffusion
/// reach under the Independent Cascade model.
///
/// Returns the chosen nodes in selection order: the first entry has the
/// largest independent marginal contribution.
pub fn select_seeds(
    graph: &DiffusionGraph,
    config: SelectionConfig,
) -> Result<Vec<NodeId>, SelectError> {
    run_selection(graph, config, &mut NoopObserver).map(|(seeds, _)| seeds)
}

/// Like [`select_seeds`], additionally returning run diagnostics.
pub fn select_seeds_with_diagnostics(
    graph: &DiffusionGraph,
    config: SelectionConfig,
) -> Result<(Vec<NodeId>, SelectionDiagnostics), SelectError> {
    run_selection(graph, config, &mut NoopObserver)
}

/// Like [`select_seeds_with_diagnostics`], reporting progress to `observer`.
pub fn select_seeds_with_observer(
    graph: &DiffusionGraph,
    config: SelectionConfig,
    observer: &mut dyn SelectionObserver,
) -> Result<(Vec<NodeId>, SelectionDiagnostics), SelectError> {
    run_selection(graph, config, observer)
}

fn run_selection(
    graph: &DiffusionGraph,
    config: SelectionConfig,
    observer: &mut dyn SelectionObserver,
) -> Result<(Vec<NodeId>, SelectionDiagnostics), SelectError> {
    let config = config.validate()?;
    graph.validate()?;
    if config.seed_count > graph.node_count() {
        return Err(SelectError::ValidationError(format!(
            "seed count {} exceeds the {} reachable nodes of the graph",
            config.seed_count,
            graph.node_count()
        )));
    }

    let mut diagnostics = SelectionDiagnostics {
        rounds_run: 0,
        trees_built: 0,
        candidate_count: graph.node_count(),
        influence_drained: false,
    };
    if config.seed_count == 0 {
        return Ok((Vec::new(), diagnostics));
    }

    let theta = config.theta;
    let mut seeds = SeedSet::new();
    let mut inactive = InactiveSeeds::new();
    let mut in_trees: FxHashMap<NodeId, Arborescence> = FxHashMap::default();
    let mut ap = ActivationTable::new();
    let mut alpha = AlphaTable::new();
    let mut inc_inf: FxHashMap<NodeId, f64> =
        graph.nodes().iter().map(|&node| (node, 0.0)).collect();

    // Initialization: every node's in-arborescence against the empty seed
    // set, seeding the incremental-influence estimates.
    for &node in graph.nodes() {
        let tree = build_in_arborescence(graph, node, theta, &seeds, inactive.blocked_for(node));
        update_activation(&mut ap, graph, &seeds, &tree)?;
        update_alpha(&mut alpha, graph, &seeds, &tree, &ap)?;
        for &u in tree.nodes() {
            let gain = contribution(&alpha, &ap, node, u)?;
            add_influence(&mut inc_inf, u, gain)?;
        }
        in_trees.insert(node, tree);
        diagnostics.trees_built += 1;
        observer.tree_built(node);
    }

    for round in 0..config.seed_count {
        let Some(node) = argmax_influence(&inc_inf) else {
            diagnostics.influence_drained = true;
            break;
        };
        inc_inf.remove(&node);

        let out_tree = build_out_arborescence(graph, node, theta, &seeds);

        // The new seed's reach makes part of every overlapping node's prior
        // contribution redundant; retire it before rebuilding.
        for &v in out_tree.nodes() {
            let v_tree = in_trees.get(&v).ok_or_else(|| {
                SelectError::Internal(format!("missing in-arborescence for node {:?}", v))
            })?;
            for &w in v_tree.nodes() {
                if w == node || seeds.contains(w) {
                    continue;
                }
                let stale = contribution(&alpha, &ap, v, w)?;
                add_influence(&mut inc_inf, w, -stale)?;
            }
        }

        inactive.update(&seeds, node, &out_tree, &in_trees)?;
        seeds.push(node)?;

        // Rebuild the in-arborescence of every node the new seed reaches
        // and restore the fresh contributions.
        for &v in out_tree.nodes() {
            if v == node {
                continue;
            }
            let tree =
                build_in_arborescence(graph, v, theta, &seeds, inactive.blocked_for(v));
            update_activation(&mut ap, graph, &seeds, &tree)?;
            update_alpha(&mut alpha, graph, &seeds, &tree, &ap)?;
            for &w in tree.nodes() {
                if seeds.contains(w) {
                    continue;
                }
                let gain = contribution(&alpha, &ap, v, w)?;
                add_influence(&mut inc_inf, w, gain)?;
            }
            in_trees.insert(v, tree);
            diagnostics.trees_built += 1;
            observer.tree_built(v);
        }

        diagnostics.rounds_run += 1;
        observer.round_complete(round, node);
    }

    Ok((seeds.into_vec(), diagnostics))
}

/// A node's current contribution within one tree:
/// `alpha(tree, node) · (1 − ap(node, tree))`.
fn contribution(
    alpha: &AlphaTable,
    ap: &ActivationTable,
    tree_root: NodeId,
    node: NodeId,
) -> Result<f64, SelectError> {
    let a = alpha.get(tree_root, node).ok_or_else(|| {
        SelectError::Internal(format!(
            "alpha of {:?} missing in tree {:?}",
            node, tree_root
        ))
    })?;
    let p = ap.get(node, tree_root).ok_or_else(|| {
        SelectError::Internal(format!(
            "activation of {:?} missing in tree {:?}",
            node, tree_root
        ))
    })?;
    Ok(a * (1.0 - p))
}

fn add_influence(
    inc_inf: &mut FxHashMap<NodeId, f64>,
    node: NodeId,
    delta: f64,
) -> Result<(), SelectError> {
    let entry = inc_inf.get_mut(&node).ok_or_else(|| {
        SelectError::Internal(format!(
            "node {:?} missing from the incremental-influence map",
            node
        ))
    })?;
    *entry += delta;
    Ok(())
}

/// The candidate with the highest estimate; ties break toward the lowest
/// node id so selection is reproducible.
fn argmax_influence(inc_inf: &FxHashMap<NodeId, f64>) -> Option<NodeId> {
    let mut best: Option<(NodeId, f64)> = None;
    for (&node, &value) in inc_inf {
        let better = match best {
            None => true,
            Some((best_node, best_value)) => {
                value > best_value || (value == best_value && node < best_node)
            }
        };
        if better {
            best = Some((node, value));
        }
    }
    best.map(|(node, _)| node)
}
