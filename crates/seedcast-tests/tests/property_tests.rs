//! Property tests for selection determinism and propagation invariants.

use proptest::prelude::*;
use seedcast_core::engine::arborescence::build_in_arborescence;
use seedcast_core::engine::graph::{DiffusionGraph, NodeId};
use seedcast_core::engine::propagation::{
    update_activation, update_alpha, ActivationTable, AlphaTable,
};
use seedcast_core::engine::seeds::SeedSet;
use seedcast_core::engine::selector::{select_seeds, SelectionConfig};

const NODE_SPACE: u32 = 12;

fn edge_list() -> impl Strategy<Value = Vec<(u32, u32, f64)>> {
    prop::collection::vec(
        (0..NODE_SPACE, 0..NODE_SPACE, 0.05f64..0.95),
        1..40,
    )
}

/// Builds a graph from a raw edge list, dropping duplicate (src, dst) pairs.
fn build_graph(edges: &[(u32, u32, f64)]) -> DiffusionGraph {
    let mut graph = DiffusionGraph::new();
    for &(src, dst, proba) in edges {
        let _ = graph.add_edge(NodeId(src), NodeId(dst), proba);
    }
    graph
}

fn seeds_from_mask(graph: &DiffusionGraph, mask: u16) -> SeedSet {
    let mut seeds = SeedSet::new();
    for (i, &node) in graph.nodes().iter().enumerate() {
        if i < 16 && mask & (1 << i) != 0 {
            seeds.push(node).expect("distinct nodes");
        }
    }
    seeds
}

proptest! {
    #[test]
    fn selection_is_deterministic(edges in edge_list()) {
        let graph = build_graph(&edges);
        let config = SelectionConfig::new(graph.node_count().min(3), 0.01);
        let first = select_seeds(&graph, config).expect("first run");
        let second = select_seeds(&graph, config).expect("second run");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn seed_list_is_well_formed(edges in edge_list()) {
        let graph = build_graph(&edges);
        let k = graph.node_count().min(4);
        let seeds = select_seeds(&graph, SelectionConfig::new(k, 0.01)).expect("selection");

        prop_assert_eq!(seeds.len(), k);
        for &seed in &seeds {
            prop_assert!(graph.contains_node(seed));
        }
        let mut unique = seeds.clone();
        unique.sort_unstable();
        unique.dedup();
        prop_assert_eq!(unique.len(), seeds.len());
    }

    #[test]
    fn activation_and_alpha_stay_within_unit_interval(
        edges in edge_list(),
        mask in any::<u16>(),
        theta in 0.001f64..1.0,
    ) {
        let graph = build_graph(&edges);
        let seeds = seeds_from_mask(&graph, mask);
        let mut ap = ActivationTable::new();
        let mut alpha = AlphaTable::new();

        for &root in graph.nodes() {
            let tree = build_in_arborescence(&graph, root, theta, &seeds, &[]);
            update_activation(&mut ap, &graph, &seeds, &tree).expect("activation");
            update_alpha(&mut alpha, &graph, &seeds, &tree, &ap).expect("alpha");

            prop_assert_eq!(alpha.get(root, root), Some(1.0));
            for &u in tree.nodes() {
                let p = ap.get(u, root).expect("activation entry");
                prop_assert!((0.0..=1.0).contains(&p));
                if seeds.contains(u) {
                    prop_assert_eq!(p, 1.0);
                }
                let a = alpha.get(root, u).expect("alpha entry");
                prop_assert!((0.0..=1.0).contains(&a));
            }
        }
    }

    #[test]
    fn mip_lengths_grow_one_hop_at_a_time(edges in edge_list()) {
        let graph = build_graph(&edges);
        for &root in graph.nodes() {
            let tree = build_in_arborescence(&graph, root, 0.01, &SeedSet::new(), &[]);
            for &u in tree.nodes() {
                let depth = tree.depth(u).expect("admitted node");
                match tree.parent(u) {
                    None => prop_assert_eq!(u, root),
                    Some(parent) => {
                        let parent_depth = tree.depth(parent).expect("parent admitted");
                        prop_assert_eq!(depth, parent_depth + 1);
                    }
                }
            }
        }
    }
}
