//! # Diffusion Graph
//!
//! This module implements the directed, edge-weighted graph that seed
//! selection runs over.
//!
//! ## Key Components
//!
//! - **DiffusionEdge**: A directed edge carrying a transition probability
//!   `proba ∈ (0, 1]` and its negative log `log_proba = −ln(proba)`
//! - **DiffusionGraph**: Contiguous node/edge storage with O(1) id lookups
//!   and per-node in/out adjacency kept in a fixed, deterministic order
//!
//! ## Design
//!
//! The graph is read-only for the duration of a selection run; all selection
//! state lives outside it. Adjacency lists are kept sorted by neighbor id so
//! that the total order over edges is `(src, dst)` lexicographic, which the
//! arborescence builder relies on for reproducible tie-breaking.
//!
//! ## Example
//!
//! ```rust,ignore
//! use seedcast_core::engine::graph::*;
//!
//! let mut graph = DiffusionGraph::default();
//! graph.add_edge(NodeId(0), NodeId(1), 0.5)?;
//! graph.add_edge(NodeId(1), NodeId(2), 0.25)?;
//! ```

use rustc_hash::FxHashMap;

use crate::engine::errors::SelectError;

/// Maximum allowed drift between a supplied `log_proba` and `−ln(proba)`.
const WEIGHT_CONSISTENCY_TOLERANCE: f64 = 1e-9;

/// A unique identifier for a node in the diffusion graph.
///
/// NodeId implements Ord/PartialOrd for stable, deterministic iteration.
/// Uses u32 internally for efficient storage and indexing.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

/// A unique identifier for an edge in the diffusion graph.
///
/// Assigned sequentially in insertion order.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeId(pub u32);

/// A directed edge with its Independent Cascade transition weights.
///
/// Invariant: `log_proba == −ln(proba)` within [`WEIGHT_CONSISTENCY_TOLERANCE`]
/// and `proba ∈ (0, 1]`. Enforced on insertion and re-checked by
/// [`DiffusionGraph::validate`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiffusionEdge {
    /// The unique edge identifier
    pub id: EdgeId,
    /// The source node
    pub src: NodeId,
    /// The destination node
    pub dst: NodeId,
    /// Transition probability in (0, 1]
    pub proba: f64,
    /// Negative log of the transition probability
    pub log_proba: f64,
}

/// A directed diffusion graph with per-edge transition probabilities.
///
/// Storage layout:
/// - Contiguous `Vec` node/edge storage for cache efficiency
/// - `FxHashMap` id indexes for O(1) lookups
/// - Per-node adjacency lists of edge positions, sorted by neighbor id so
///   iteration order is deterministic across runs
///
/// Nodes referenced by an edge are registered automatically. A second edge
/// between the same ordered pair of nodes is rejected: lookups and
/// tie-breaking are keyed by `(src, dst)`.
#[derive(Debug, Clone, Default)]
pub struct DiffusionGraph {
    /// All nodes, in registration order
    nodes: Vec<NodeId>,
    /// Index mapping NodeId to position in `nodes`
    node_index: FxHashMap<NodeId, usize>,
    /// All edges, in insertion order
    edges: Vec<DiffusionEdge>,
    /// Index mapping (src, dst) to position in `edges`
    edge_lookup: FxHashMap<(NodeId, NodeId), usize>,
    /// Outgoing edge positions per node, sorted by destination id
    out_adj: FxHashMap<NodeId, Vec<usize>>,
    /// Incoming edge positions per node, sorted by source id
    in_adj: FxHashMap<NodeId, Vec<usize>>,
}

impl DiffusionGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node. Registering an already-known node is a no-op.
    pub fn add_node(&mut self, node: NodeId) {
        if let std::collections::hash_map::Entry::Vacant(entry) = self.node_index.entry(node) {
            entry.insert(self.nodes.len());
            self.nodes.push(node);
        }
    }

    /// Adds a directed edge, deriving `log_proba` as `−ln(proba)`.
    ///
    /// Endpoint nodes are registered automatically.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId, proba: f64) -> Result<EdgeId, SelectError> {
        self.insert_edge(src, dst, proba, -proba.ln())
    }

    /// Adds a directed edge with an externally supplied negative-log weight.
    ///
    /// The two weights must be consistent: `log_proba == −ln(proba)` within
    /// a small tolerance. Inconsistent weights are rejected.
    pub fn add_edge_with_log(
        &mut self,
        src: NodeId,
        dst: NodeId,
        proba: f64,
        log_proba: f64,
    ) -> Result<EdgeId, SelectError> {
        if (log_proba + proba.ln()).abs() > WEIGHT_CONSISTENCY_TOLERANCE {
            return Err(SelectError::ValidationError(format!(
                "edge {:?} -> {:?}: log_proba {} is inconsistent with proba {}",
                src, dst, log_proba, proba
            )));
        }
        self.insert_edge(src, dst, proba, log_proba)
    }

    fn insert_edge(
        &mut self,
        src: NodeId,
        dst: NodeId,
        proba: f64,
        log_proba: f64,
    ) -> Result<EdgeId, SelectError> {
        check_edge_weights(src, dst, proba, log_proba)?;
        if self.edge_lookup.contains_key(&(src, dst)) {
            return Err(SelectError::ValidationError(format!(
                "duplicate edge {:?} -> {:?}",
                src, dst
            )));
        }

        self.add_node(src);
        self.add_node(dst);

        let position = self.edges.len();
        let id = EdgeId(position as u32);
        self.edges.push(DiffusionEdge {
            id,
            src,
            dst,
            proba,
            log_proba,
        });
        self.edge_lookup.insert((src, dst), position);

        // Keep adjacency sorted by neighbor id: the fixed total edge order.
        let out = self.out_adj.entry(src).or_default();
        let at = out.partition_point(|&p| self.edges[p].dst < dst);
        out.insert(at, position);

        let inc = self.in_adj.entry(dst).or_default();
        let at = inc.partition_point(|&p| self.edges[p].src < src);
        inc.insert(at, position);

        Ok(id)
    }

    /// All nodes in registration order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether the node is registered.
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.node_index.contains_key(&node)
    }

    /// Outgoing edges of a node, ordered by destination id.
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = &DiffusionEdge> + '_ {
        self.out_adj
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(move |&position| &self.edges[position])
    }

    /// Incoming edges of a node, ordered by source id.
    pub fn in_edges(&self, node: NodeId) -> impl Iterator<Item = &DiffusionEdge> + '_ {
        self.in_adj
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(move |&position| &self.edges[position])
    }

    /// Looks up the edge between an ordered pair of nodes.
    pub fn edge_between(&self, src: NodeId, dst: NodeId) -> Option<&DiffusionEdge> {
        self.edge_lookup
            .get(&(src, dst))
            .map(|&position| &self.edges[position])
    }

    /// Transition probability of the edge `src -> dst`, if present.
    pub fn proba(&self, src: NodeId, dst: NodeId) -> Option<f64> {
        self.edge_between(src, dst).map(|edge| edge.proba)
    }

    /// Re-checks every edge weight invariant.
    ///
    /// Insertion already enforces these, but a graph obtained through
    /// deserialization or future construction paths must be rejected before
    /// any tree construction begins.
    pub fn validate(&self) -> Result<(), SelectError> {
        for edge in &self.edges {
            check_edge_weights(edge.src, edge.dst, edge.proba, edge.log_proba)?;
            if (edge.log_proba + edge.proba.ln()).abs() > WEIGHT_CONSISTENCY_TOLERANCE {
                return Err(SelectError::ValidationError(format!(
                    "edge {:?} -> {:?}: log_proba {} is inconsistent with proba {}",
                    edge.src, edge.dst, edge.log_proba, edge.proba
                )));
            }
        }
        Ok(())
    }
}

fn check_edge_weights(
    src: NodeId,
    dst: NodeId,
    proba: f64,
    log_proba: f64,
) -> Result<(), SelectError> {
    if !proba.is_finite() || !(proba > 0.0 && proba <= 1.0) {
        return Err(SelectError::ValidationError(format!(
            "edge {:?} -> {:?}: transition probability {} outside (0, 1]",
            src, dst, proba
        )));
    }
    if !log_proba.is_finite() || log_proba < 0.0 {
        return Err(SelectError::ValidationError(format!(
            "edge {:?} -> {:?}: negative-log weight {} must be finite and >= 0",
            src, dst, log_proba
        )));
    }
    Ok(())
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::{DiffusionEdge, DiffusionGraph, NodeId};
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Stable wire form: node and edge lists only. Indexes and adjacency are
    /// rebuilt through the validating insertion path on deserialization.
    #[derive(Serialize, Deserialize)]
    struct GraphParts {
        nodes: Vec<NodeId>,
        edges: Vec<DiffusionEdge>,
    }

    impl Serialize for DiffusionGraph {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            GraphParts {
                nodes: self.nodes.clone(),
                edges: self.edges.clone(),
            }
            .serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for DiffusionGraph {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let parts = GraphParts::deserialize(deserializer)?;
            let mut graph = DiffusionGraph::new();
            for node in parts.nodes {
                graph.add_node(node);
            }
            for edge in parts.edges {
                graph
                    .add_edge_with_log(edge.src, edge.dst, edge.proba, edge.log_proba)
                    .map_err(D::Error::custom)?;
            }
            Ok(graph)
        }
    }
}
