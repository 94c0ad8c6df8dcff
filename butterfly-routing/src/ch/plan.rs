//! Shortcut planning for a single vertex
//!
//! Both the priority calculator and the builder need to know which
//! shortcuts contracting a vertex would create. Planning is read-only; the
//! builder applies the plan, the priority calculator only counts it.

use rustc_hash::FxHashMap;

use crate::ch::{WitnessCalculator, WitnessQuery, WitnessTarget};
use crate::graph::{merge_edges, ContractionGraph, Direction, EdgeData, VertexId};
use crate::turns::TurnModel;

/// Shortcut the contraction of a vertex would insert
#[derive(Debug, Clone, PartialEq)]
pub struct ShortcutCandidate {
    pub from: VertexId,
    pub to: VertexId,
    pub data: EdgeData,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractionPlan {
    /// Edges stored at the vertex, all of which disappear from the
    /// remaining graph
    pub removed: usize,
    pub shortcuts: Vec<ShortcutCandidate>,
    /// Candidate directions dropped because a witness exists
    pub witnessed: usize,
    /// Pairs of edges leading to the same neighbour
    pub skipped_self_loops: usize,
    /// Pairs whose maneuver at the vertex is forbidden
    pub skipped_restricted: usize,
}

/// Work out the shortcuts needed to contract `vertex`.
///
/// For every pair of edges `(e_i, e_j)` at `vertex` the path
/// `n_i -> vertex -> n_j` (and its reverse) becomes a candidate when both
/// edges allow it and the maneuver at `vertex` is permitted. Candidates
/// with a witness are dropped.
pub fn plan_contraction(
    graph: &ContractionGraph,
    witness: &dyn WitnessCalculator,
    turns: TurnModel<'_>,
    vertex: VertexId,
) -> ContractionPlan {
    let edges = graph.edges(vertex);
    let edge_based = turns.is_edge_based();
    let mut plan = ContractionPlan {
        removed: edges.len(),
        ..ContractionPlan::default()
    };

    let mut targets = Vec::new();
    let mut partners = Vec::new();

    for (i, ei) in edges.iter().enumerate() {
        targets.clear();
        partners.clear();
        let near_i = ei.data.near_owner(ei.neighbor);

        for ej in &edges[..i] {
            if ei.neighbor == ej.neighbor {
                plan.skipped_self_loops += 1;
                continue;
            }
            let near_j = ej.data.near_owner(ej.neighbor);

            // n_i -> vertex -> n_j and n_j -> vertex -> n_i
            let fwd_possible = ei.data.direction.backward() && ej.data.direction.forward();
            let bwd_possible = ej.data.direction.backward() && ei.data.direction.forward();
            let fwd = fwd_possible && turns.allows(near_i, vertex, near_j);
            let bwd = bwd_possible && turns.allows(near_j, vertex, near_i);
            plan.skipped_restricted +=
                usize::from(fwd_possible && !fwd) + usize::from(bwd_possible && !bwd);
            if !fwd && !bwd {
                continue;
            }

            let weight = ei.data.weight + ej.data.weight;
            targets.push(WitnessTarget {
                vertex: ej.neighbor,
                step: edge_based.then(|| ej.data.near_neighbor(vertex)),
                forward_weight: if fwd { weight } else { f32::INFINITY },
                backward_weight: if bwd { weight } else { f32::INFINITY },
            });
            partners.push(ej);
        }

        if targets.is_empty() {
            continue;
        }

        let query = WitnessQuery {
            pivot: vertex,
            origin: ei.neighbor,
            origin_step: edge_based.then(|| ei.data.near_neighbor(vertex)),
            targets: &targets,
        };
        let witnessed = witness.calculate(graph, turns, &query);

        for ((target, ej), found) in targets.iter().zip(&partners).zip(witnessed) {
            let need_fwd = target.forward_weight.is_finite() && !found.forward;
            let need_bwd = target.backward_weight.is_finite() && !found.backward;
            plan.witnessed += usize::from(target.forward_weight.is_finite() && found.forward)
                + usize::from(target.backward_weight.is_finite() && found.backward);

            let Some(direction) = Direction::from_flags(need_fwd, need_bwd) else {
                continue;
            };
            let (seq1, seq2) = if edge_based {
                (
                    vec![ei.data.near_neighbor(vertex)],
                    vec![ej.data.near_neighbor(vertex)],
                )
            } else {
                (Vec::new(), Vec::new())
            };
            let weight = ei.data.weight + ej.data.weight;
            plan.shortcuts.push(ShortcutCandidate {
                from: ei.neighbor,
                to: ej.neighbor,
                data: EdgeData::shortcut(weight, direction, vertex, seq1, seq2),
            });
        }
    }
    plan
}

type PairKey = (VertexId, VertexId, Vec<VertexId>, Vec<VertexId>);

/// Net change in stored edges if `shortcuts` were merged into `graph`
pub fn simulate_insertions(graph: &ContractionGraph, shortcuts: &[ShortcutCandidate]) -> isize {
    let epsilon = graph.merge_epsilon();
    let mut overlay: FxHashMap<PairKey, Vec<EdgeData>> = FxHashMap::default();
    let mut delta = 0isize;

    for sc in shortcuts {
        // One canonical orientation per pair
        let (from, to, data) = if sc.from <= sc.to {
            (sc.from, sc.to, sc.data.clone())
        } else {
            (sc.to, sc.from, sc.data.reversed())
        };
        let key = (from, to, data.via_seq1.clone(), data.via_seq2.clone());
        let current = overlay
            .entry(key)
            .or_insert_with(|| graph.edges_between(from, to, &data.via_seq1, &data.via_seq2));

        if let Some(merged) = merge_edges(current, data, epsilon) {
            delta += merged.len() as isize - current.len() as isize;
            *current = merged;
        }
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ch::DijkstraWitnessCalculator;

    fn calc() -> DijkstraWitnessCalculator {
        DijkstraWitnessCalculator::new(100, None)
    }

    #[test]
    fn test_path_needs_shortcut() {
        // 0 -> 1 -> 2, one-way
        let mut g = ContractionGraph::new(3, false);
        g.add_edge(0, 1, EdgeData::original(1.0, Direction::Forward)).unwrap();
        g.add_edge(1, 2, EdgeData::original(2.0, Direction::Forward)).unwrap();

        let plan = plan_contraction(&g, &calc(), TurnModel::VertexBased, 1);
        assert_eq!(plan.removed, 2);
        assert_eq!(plan.shortcuts.len(), 1);

        let sc = &plan.shortcuts[0];
        let (from, to, dir) = if sc.from == 0 {
            (sc.from, sc.to, sc.data.direction)
        } else {
            (sc.to, sc.from, sc.data.direction.reversed())
        };
        assert_eq!((from, to, dir), (0, 2, Direction::Forward));
        assert_eq!(sc.data.weight, 3.0);
        assert_eq!(sc.data.contracted_via, Some(1));
    }

    #[test]
    fn test_two_way_path_needs_both_shortcut() {
        let mut g = ContractionGraph::new(3, false);
        g.add_edge(0, 1, EdgeData::original(1.0, Direction::Both)).unwrap();
        g.add_edge(1, 2, EdgeData::original(1.0, Direction::Both)).unwrap();

        let plan = plan_contraction(&g, &calc(), TurnModel::VertexBased, 1);
        assert_eq!(plan.shortcuts.len(), 1);
        assert_eq!(plan.shortcuts[0].data.direction, Direction::Both);
        assert_eq!(simulate_insertions(&g, &plan.shortcuts), 1);
    }

    #[test]
    fn test_parallel_edges_to_same_neighbor_are_skipped() {
        let mut g = ContractionGraph::new(2, false);
        g.add_edge(0, 1, EdgeData::original(1.0, Direction::Forward)).unwrap();
        g.add_edge(1, 0, EdgeData::original(2.0, Direction::Forward)).unwrap();

        let plan = plan_contraction(&g, &calc(), TurnModel::VertexBased, 1);
        assert!(plan.shortcuts.is_empty());
        assert_eq!(plan.skipped_self_loops, 1);
    }

    #[test]
    fn test_existing_shorter_edge_makes_insert_noop() {
        let mut g = ContractionGraph::new(3, false);
        g.add_edge(0, 1, EdgeData::original(1.0, Direction::Both)).unwrap();
        g.add_edge(1, 2, EdgeData::original(1.0, Direction::Both)).unwrap();
        let candidate = ShortcutCandidate {
            from: 2,
            to: 0,
            data: EdgeData::shortcut(2.0, Direction::Both, 1, vec![], vec![]),
        };
        g.add_edge(0, 2, EdgeData::original(1.0, Direction::Both)).unwrap();
        assert_eq!(simulate_insertions(&g, &[candidate]), 0);
    }
}
