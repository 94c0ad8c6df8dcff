mod common;

use butterfly_routing::formats::HierarchyFile;
use butterfly_routing::matrix::distance_matrix;
use butterfly_routing::query::unpack_edge;
use butterfly_routing::validate::{dijkstra, validate_hierarchy, verify_shortcuts};
use butterfly_routing::{
    BidirectionalQuery, ChConfig, ContractionGraph, ContractionState, Direction,
    HierarchyBuilder, Outcome, Seed, VertexId,
};

use common::{build_vertex_based, contraction_graph, edge_list, random_graph};

fn query_weight(h: &butterfly_routing::Hierarchy, s: u32, t: u32) -> Option<f32> {
    let mut q = BidirectionalQuery::between(h, s, t);
    q.run().unwrap();
    q.weight()
}

/// Distances from `source` over the uncontracted part of `graph`
fn remaining_distances(graph: &ContractionGraph, source: VertexId) -> Vec<Option<f32>> {
    let n = graph.vertex_count() as usize;
    let mut dist = vec![f32::INFINITY; n];
    let mut settled = vec![false; n];
    dist[source as usize] = 0.0;
    loop {
        let next = (0..n)
            .filter(|&v| !settled[v] && dist[v].is_finite())
            .min_by(|&a, &b| dist[a].total_cmp(&dist[b]));
        let Some(u) = next else { break };
        settled[u] = true;
        for e in graph.edges(u as VertexId) {
            if !e.data.direction.forward() || graph.is_contracted(e.neighbor) {
                continue;
            }
            let v = e.neighbor as usize;
            dist[v] = dist[v].min(dist[u] + e.data.weight);
        }
    }
    dist.into_iter()
        .map(|d| d.is_finite().then_some(d))
        .collect()
}

#[test]
fn test_pentagon_opposite_vertices() {
    let weights = [1.0, 2.0, 1.0, 3.0, 1.0];
    let edges: Vec<_> = (0..5u32)
        .map(|v| (v, (v + 1) % 5, weights[v as usize], Direction::Both))
        .collect();
    let base = edge_list(5, &edges);
    let config = ChConfig {
        depth_factor: 0.0,
        contracted_factor: 0.0,
        ..ChConfig::default()
    };
    let (h, stats) = build_vertex_based(&base, config);
    assert_eq!(stats.contracted, 5);

    let total: f32 = weights.iter().sum();
    for s in 0..5u32 {
        for t in 0..5u32 {
            // Arc s -> s+1 -> ... -> t
            let mut clockwise = 0.0;
            let mut v = s;
            while v != t {
                clockwise += weights[v as usize];
                v = (v + 1) % 5;
            }
            let shorter = f32::min(clockwise, total - clockwise);
            assert_eq!(query_weight(&h, s, t), Some(shorter), "{s} -> {t}");
        }
    }
}

#[test]
fn test_random_graphs_match_dijkstra() {
    for seed in 0..5 {
        let base = random_graph(60, 120, seed);
        let (h, _) = build_vertex_based(&base, ChConfig::default());

        let result = validate_hierarchy(&base, &h, None, 200, seed + 100).unwrap();
        assert!(result.is_ok(), "seed {seed}: {:?}", result.errors);
        assert_eq!(result.correct, 200);
    }
}

#[test]
fn test_each_contraction_preserves_remaining_distances() {
    for seed in 0..3 {
        let base = random_graph(24, 40, seed);
        let mut graph = contraction_graph(&base, false);
        let config = ChConfig::default();
        let builder = HierarchyBuilder::vertex_based(config.clone());
        let mut state = ContractionState::new(24, config.miss_window);

        let expected: Vec<Vec<Option<f32>>> = (0..24)
            .map(|s| (0..24).map(|t| dijkstra(&base, s, t).unwrap()).collect())
            .collect();

        // Interleaved order so contracted vertices are often adjacent
        let order: Vec<VertexId> = (0..24).map(|i| (i * 7) % 24).collect();
        let mut witnessed = 0;
        for (step, &v) in order.iter().enumerate() {
            let done = builder.contract(&mut graph, &mut state, v).unwrap();
            witnessed += done.plan.witnessed;

            for &s in &order[step + 1..] {
                let found = remaining_distances(&graph, s);
                for &t in &order[step + 1..] {
                    assert_eq!(
                        found[t as usize], expected[s as usize][t as usize],
                        "seed {seed}: {s} -> {t} after contracting {v}"
                    );
                }
            }
        }
        assert!(witnessed > 0, "seed {seed}: no shortcut was witnessed");
    }
}

#[test]
fn test_every_pair_on_small_graph() {
    let base = random_graph(25, 40, 7);
    let (h, _) = build_vertex_based(&base, ChConfig::default());
    for s in 0..25 {
        for t in 0..25 {
            assert_eq!(query_weight(&h, s, t), dijkstra(&base, s, t).unwrap(), "{s} -> {t}");
        }
    }
}

#[test]
fn test_route_unpacks_to_original_edges() {
    let base = random_graph(40, 60, 11);
    let (h, stats) = build_vertex_based(&base, ChConfig::default());
    assert!(stats.shortcuts_added > 0);

    let mut q = BidirectionalQuery::between(&h, 0, 20);
    let route = q.run().unwrap().route().cloned().unwrap();

    assert_eq!(route.vertices.first(), Some(&0));
    assert_eq!(route.vertices.last(), Some(&20));
    assert_eq!(route.edges.len() + 1, route.vertices.len());

    let mut total = 0.0;
    for (i, id) in route.edges.iter().enumerate() {
        let view = h.edge(id.edge()).unwrap();
        assert!(!view.is_shortcut());
        let (tail, head) = butterfly_routing::query::endpoints(&h, *id);
        assert_eq!((tail, head), (route.vertices[i], route.vertices[i + 1]));
        total += view.weight;
    }
    assert_eq!(total, route.weight);
    assert!(route.vertices.contains(&route.best_vertex));
}

#[test]
fn test_shortcuts_expand_to_their_weight() {
    let base = random_graph(50, 100, 3);
    let (h, _) = build_vertex_based(&base, ChConfig::default());

    let check = verify_shortcuts(&h).unwrap();
    assert!(check.checked > 0);
    assert!(check.mismatches.is_empty(), "{:?}", check.mismatches);

    // Spot-check one expansion directly
    let shortcut = (0..h.edge_count())
        .find(|&e| h.edge(e).unwrap().is_shortcut())
        .unwrap();
    let view = h.edge(shortcut).unwrap();
    let id = butterfly_routing::DirectedEdgeId::new(shortcut, !view.direction.forward());
    let (vertices, edges) = unpack_edge(&h, id).unwrap();
    assert!(vertices.len() >= 3);
    assert_eq!(edges.len() + 1, vertices.len());
}

#[test]
fn test_run_twice_changes_nothing() {
    let base = random_graph(30, 50, 5);
    let mut graph = contraction_graph(&base, false);
    let builder = HierarchyBuilder::vertex_based(ChConfig::default());
    builder.run(&mut graph).unwrap();
    let first = graph.clone().into_hierarchy().unwrap();

    let again = builder.run(&mut graph).unwrap();
    assert_eq!(again.contracted, 0);
    assert_eq!(graph.into_hierarchy().unwrap(), first);
}

#[test]
fn test_unreachable_target() {
    let base = edge_list(
        3,
        &[
            (0, 1, 1.0, Direction::Forward),
            (2, 1, 1.0, Direction::Forward),
        ],
    );
    let (h, _) = build_vertex_based(&base, ChConfig::default());

    let mut q = BidirectionalQuery::between(&h, 0, 2);
    assert!(matches!(q.run().unwrap(), Outcome::NoRoute { .. }));
    assert_eq!(q.weight(), None);
    assert_eq!(q.path(), None);

    assert_eq!(query_weight(&h, 2, 1), Some(1.0));
}

#[test]
fn test_seed_offsets_pick_cheapest_combination() {
    let base = edge_list(
        4,
        &[
            (0, 2, 5.0, Direction::Both),
            (1, 2, 1.0, Direction::Both),
            (2, 3, 1.0, Direction::Both),
        ],
    );
    let (h, _) = build_vertex_based(&base, ChConfig::default());

    let mut q = BidirectionalQuery::new(
        &h,
        vec![Seed::with_offset(0, 0.0), Seed::with_offset(1, 2.0)],
        vec![Seed::at(3)],
    );
    q.run().unwrap();
    assert_eq!(q.weight(), Some(4.0));
    assert_eq!(q.path(), Some(&[1, 2, 3][..]));
}

#[test]
fn test_out_of_range_seed_is_an_error() {
    let base = random_graph(5, 0, 1);
    let (h, _) = build_vertex_based(&base, ChConfig::default());
    let mut q = BidirectionalQuery::between(&h, 0, 99);
    assert!(q.run().is_err());
}

#[test]
fn test_matrix_matches_dijkstra() {
    let base = random_graph(40, 80, 21);
    let (h, _) = build_vertex_based(&base, ChConfig::default());
    let sources = [0, 5, 17, 33];
    let targets = [1, 9, 17, 39];

    let m = distance_matrix(&h, None, &sources, &targets).unwrap();
    for (i, &s) in sources.iter().enumerate() {
        for (j, &t) in targets.iter().enumerate() {
            assert_eq!(m[i][j], dijkstra(&base, s, t).unwrap(), "{s} -> {t}");
        }
    }
}

#[test]
fn test_saved_hierarchy_answers_the_same() {
    let base = random_graph(30, 60, 9);
    let (h, _) = build_vertex_based(&base, ChConfig::default());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("random.ch");
    HierarchyFile::write(&path, &h).unwrap();
    let loaded = HierarchyFile::read(&path).unwrap();
    assert_eq!(loaded, h);

    for (s, t) in [(0, 29), (4, 15), (22, 3)] {
        assert_eq!(query_weight(&loaded, s, t), dijkstra(&base, s, t).unwrap());
    }
}

#[test]
fn test_epsilon_merge_keeps_distances_close() {
    let base = random_graph(30, 60, 13);
    let config = ChConfig {
        merge_epsilon: 0.5,
        ..ChConfig::default()
    };
    let (h, _) = build_vertex_based(&base, config);
    for (s, t) in [(0, 10), (5, 25), (12, 2)] {
        let expected = dijkstra(&base, s, t).unwrap().unwrap();
        let actual = query_weight(&h, s, t).unwrap();
        assert!(actual >= expected && actual <= expected + 0.5 * 30.0);
    }
}
