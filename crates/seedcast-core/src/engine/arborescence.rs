//! # Maximum-Influence Arborescences
//!
//! Bounded local influence trees grown around a root node:
//!
//! - the **in-arborescence** (MIIA) collects the maximum-influence paths
//!   converging into the root — who activates the root;
//! - the **out-arborescence** (MIOA) collects the maximum-influence paths
//!   diverging out of the root — whom the root activates.
//!
//! Both variants grow by Dijkstra-style relaxation over accumulated
//! negative-log edge weight and stop once the smallest accumulated distance
//! reaches `−ln(θ)`, so every admitted node is reachable with path
//! probability above the pruning threshold θ.
//!
//! ## Determinism
//!
//! The frontier of crossing edges is scanned in `(src, dst)` order with a
//! strict `<` comparison, so among equally-distant candidates the first edge
//! in the fixed total order wins. Rebuilding the same tree from the same
//! inputs always yields the same node admission order.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::engine::graph::{DiffusionGraph, NodeId};
use crate::engine::seeds::SeedSet;

/// Orientation of an arborescence relative to its root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeKind {
    /// Edges point toward the root (MIIA).
    In,
    /// Edges point away from the root (MIOA).
    Out,
}

/// A bounded directed tree of maximum-influence paths, plus its MIP table.
///
/// Every non-root node has exactly one `parent` — the neighbor one hop
/// closer to the root along its maximum-influence path. For the in-variant
/// the tree edge runs `node -> parent`; for the out-variant `parent -> node`.
/// The MIP table stores, per node, the full path: node-to-root for the
/// in-variant, root-to-node for the out-variant.
///
/// Construction cannot fail: an empty frontier simply yields a single-node
/// tree. Tree-ness (one parent per non-root node) holds by construction.
#[derive(Debug, Clone)]
pub struct Arborescence {
    kind: TreeKind,
    root: NodeId,
    /// Admitted nodes in admission order, root first
    nodes: Vec<NodeId>,
    /// Non-root node -> its unique MIP neighbor one hop closer to the root
    parent: FxHashMap<NodeId, NodeId>,
    /// Node -> nodes one hop further from the root
    children: FxHashMap<NodeId, SmallVec<[NodeId; 4]>>,
    /// Node -> maximum-influence path (see type docs for orientation)
    mip: FxHashMap<NodeId, Vec<NodeId>>,
}

impl Arborescence {
    fn single(kind: TreeKind, root: NodeId) -> Self {
        let mut mip = FxHashMap::default();
        mip.insert(root, vec![root]);
        Self {
            kind,
            root,
            nodes: vec![root],
            parent: FxHashMap::default(),
            children: FxHashMap::default(),
            mip,
        }
    }

    fn admit(&mut self, node: NodeId, parent: NodeId) {
        let mut path = self.mip.get(&parent).cloned().unwrap_or_default();
        match self.kind {
            TreeKind::In => path.insert(0, node),
            TreeKind::Out => path.push(node),
        }
        self.mip.insert(node, path);
        self.parent.insert(node, parent);
        self.children.entry(parent).or_default().push(node);
        self.nodes.push(node);
    }

    /// Orientation of this tree.
    pub fn kind(&self) -> TreeKind {
        self.kind
    }

    /// The distinguished root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is a degenerate single-node tree.
    pub fn is_single(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Admitted nodes in admission order, root first.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Whether the node was admitted into this tree.
    pub fn contains(&self, node: NodeId) -> bool {
        self.mip.contains_key(&node)
    }

    /// The unique MIP neighbor one hop closer to the root; None for the root
    /// or for nodes outside the tree.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parent.get(&node).copied()
    }

    /// Nodes one hop further from the root, in admission order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.children
            .get(&node)
            .map(SmallVec::as_slice)
            .unwrap_or(&[])
    }

    /// The maximum-influence path recorded for a node.
    pub fn mip(&self, node: NodeId) -> Option<&[NodeId]> {
        self.mip.get(&node).map(Vec::as_slice)
    }

    /// Hop count from the root (0 for the root itself).
    pub fn depth(&self, node: NodeId) -> Option<usize> {
        self.mip.get(&node).map(|path| path.len() - 1)
    }

    fn path_len(&self, node: NodeId) -> usize {
        self.mip.get(&node).map_or(0, Vec::len)
    }

    /// Nodes ordered deepest-first (decreasing MIP length, ties by id).
    ///
    /// Processing in this order guarantees every in-tree predecessor is
    /// visited before its successor.
    pub fn nodes_leaves_first(&self) -> Vec<NodeId> {
        let mut order = self.nodes.clone();
        order.sort_by(|a, b| self.path_len(*b).cmp(&self.path_len(*a)).then(a.cmp(b)));
        order
    }

    /// Nodes ordered root-first (increasing MIP length, ties by id).
    pub fn nodes_root_first(&self) -> Vec<NodeId> {
        let mut order = self.nodes.clone();
        order.sort_by(|a, b| self.path_len(*a).cmp(&self.path_len(*b)).then(a.cmp(b)));
        order
    }
}

/// Builds the bounded in-arborescence (MIIA) of `root`.
///
/// The initial frontier takes the root's in-edges, excluding sources in
/// `blocked` (seeds whose influence on `root` is dominated, see
/// [`crate::engine::seeds::InactiveSeeds`]) and the root itself. Current
/// seeds ARE admitted — their activation probability is 1 and the blocking
/// rule needs them present — but the frontier is never extended through an
/// admitted seed.
pub fn build_in_arborescence(
    graph: &DiffusionGraph,
    root: NodeId,
    theta: f64,
    seeds: &SeedSet,
    blocked: &[NodeId],
) -> Arborescence {
    let mut tree = Arborescence::single(TreeKind::In, root);
    let max_dist = -theta.ln();

    // Crossing edges -> accumulated distance through their in-tree endpoint.
    // BTreeMap keeps the fixed (src, dst) scan order.
    let mut frontier: BTreeMap<(NodeId, NodeId), f64> = BTreeMap::new();
    for edge in graph.in_edges(root) {
        if edge.src != root && !blocked.contains(&edge.src) {
            frontier.insert((edge.src, edge.dst), edge.log_proba);
        }
    }

    while let Some(((node, via), dist)) = pop_frontier_min(&mut frontier, max_dist) {
        tree.admit(node, via);
        // Edges out of the admitted node are now interior, not crossing.
        frontier.retain(|&(src, _), _| src != node);
        if !seeds.contains(node) {
            for edge in graph.in_edges(node) {
                if !tree.contains(edge.src) && !blocked.contains(&edge.src) {
                    frontier.insert((edge.src, edge.dst), dist + edge.log_proba);
                }
            }
        }
    }
    tree
}

/// Builds the bounded out-arborescence (MIOA) of `root`.
///
/// Seeds are excluded outright: a seed is already active, so the root's
/// forward influence never needs to pass through or reach one.
pub fn build_out_arborescence(
    graph: &DiffusionGraph,
    root: NodeId,
    theta: f64,
    seeds: &SeedSet,
) -> Arborescence {
    let mut tree = Arborescence::single(TreeKind::Out, root);
    let max_dist = -theta.ln();

    let mut frontier: BTreeMap<(NodeId, NodeId), f64> = BTreeMap::new();
    for edge in graph.out_edges(root) {
        if edge.dst != root && !seeds.contains(edge.dst) {
            frontier.insert((edge.src, edge.dst), edge.log_proba);
        }
    }

    while let Some(((via, node), dist)) = pop_frontier_min(&mut frontier, max_dist) {
        tree.admit(node, via);
        frontier.retain(|&(_, dst), _| dst != node);
        for edge in graph.out_edges(node) {
            if !tree.contains(edge.dst) && !seeds.contains(edge.dst) {
                frontier.insert((edge.src, edge.dst), dist + edge.log_proba);
            }
        }
    }
    tree
}

/// Dijkstra's greedy criterion: the crossing edge whose outer endpoint
/// reaches the smallest accumulated distance. Strict `<` with the (src, dst)
/// scan order breaks ties consistently. Returns None once the minimum
/// reaches the pruning bound.
fn pop_frontier_min(
    frontier: &mut BTreeMap<(NodeId, NodeId), f64>,
    max_dist: f64,
) -> Option<((NodeId, NodeId), f64)> {
    let mut best: Option<((NodeId, NodeId), f64)> = None;
    for (&key, &dist) in frontier.iter() {
        if best.map_or(true, |(_, min)| dist < min) {
            best = Some((key, dist));
        }
    }
    let (key, dist) = best?;
    if dist >= max_dist {
        return None;
    }
    frontier.remove(&key);
    Some((key, dist))
}
