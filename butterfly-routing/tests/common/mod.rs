#![allow(dead_code)]

use butterfly_routing::graph::InputEdge;
use butterfly_routing::{
    ChConfig, ContractionGraph, ContractionStats, Direction, EdgeList, Hierarchy, HierarchyBuilder,
    RestrictionProvider,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn edge_list(n: u32, edges: &[(u32, u32, f32, Direction)]) -> EdgeList {
    EdgeList::from_edges(
        n,
        edges.iter().map(|&(from, to, weight, direction)| InputEdge {
            from,
            to,
            weight,
            direction,
        }),
    )
    .unwrap()
}

/// Connected random graph: a two-way ring plus random chords with integer
/// weights, so path sums are exact in `f32`.
pub fn random_graph(n: u32, extra: usize, seed: u64) -> EdgeList {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut g = EdgeList::new(n);
    for v in 0..n {
        let w = rng.random_range(1..10) as f32;
        g.push(v, (v + 1) % n, w, Direction::Both).unwrap();
    }
    for _ in 0..extra {
        let a = rng.random_range(0..n);
        let b = rng.random_range(0..n);
        if a == b {
            continue;
        }
        let w = rng.random_range(1..20) as f32;
        let direction = match rng.random_range(0..3) {
            0 => Direction::Forward,
            1 => Direction::Backward,
            _ => Direction::Both,
        };
        g.push(a, b, w, direction).unwrap();
    }
    g
}

pub fn contraction_graph(base: &EdgeList, edge_based: bool) -> ContractionGraph {
    ContractionGraph::from_provider(base, edge_based, |e: &InputEdge| {
        Some((e.weight, e.direction))
    })
    .unwrap()
}

pub fn build_vertex_based(base: &EdgeList, config: ChConfig) -> (Hierarchy, ContractionStats) {
    let mut graph = contraction_graph(base, false);
    let stats = HierarchyBuilder::vertex_based(config).run(&mut graph).unwrap();
    (graph.into_hierarchy().unwrap(), stats)
}

pub fn build_edge_based(
    base: &EdgeList,
    restrictions: &dyn RestrictionProvider,
) -> (Hierarchy, ContractionStats) {
    let mut graph = contraction_graph(base, true);
    let stats = HierarchyBuilder::edge_based(ChConfig::default(), restrictions)
        .run(&mut graph)
        .unwrap();
    (graph.into_hierarchy().unwrap(), stats)
}
