//! Turn-aware witness search
//!
//! Search states are `(vertex, adjacent)` where `adjacent` is the original
//! vertex the path touched right before `vertex` (forward search) or right
//! after it (backward search). A witness only replaces a shortcut when it
//! leaves the origin and reaches the target through the same adjacent
//! vertices, so every maneuver the shortcut allowed at either end stays
//! allowed for the witness.

use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use crate::ch::{WitnessCalculator, WitnessLimits, WitnessQuery, WitnessTarget, Witnessed};
use crate::graph::{ContractionGraph, VertexId, NO_VERTEX};
use crate::heap::HeapEntry;
use crate::turns::TurnModel;

type State = (VertexId, VertexId);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeBasedWitnessCalculator {
    limits: WitnessLimits,
}

impl EdgeBasedWitnessCalculator {
    pub fn new(max_settled: usize, max_weight: Option<f32>) -> Self {
        Self {
            limits: WitnessLimits {
                max_settled,
                max_weight,
            },
        }
    }

    fn search(
        &self,
        graph: &ContractionGraph,
        turns: TurnModel<'_>,
        query: &WitnessQuery<'_>,
        targets: &[(usize, f32)],
        forward: bool,
    ) -> Vec<bool> {
        let mut witnessed = vec![false; targets.len()];
        let Some(longest) = targets.iter().map(|t| t.1).reduce(f32::max) else {
            return witnessed;
        };
        let ceiling = self.limits.ceiling(longest);
        let matches = |t: &WitnessTarget, state: State| {
            t.vertex == state.0 && t.step.map_or(true, |s| s == state.1)
        };

        let start: State = (query.origin, NO_VERTEX);
        let mut dist: FxHashMap<State, f32> = FxHashMap::default();
        let mut heap = BinaryHeap::new();
        let mut settled = 0usize;
        let mut open = targets.len();

        dist.insert(start, 0.0);
        heap.push(HeapEntry::new(0.0, start));

        while let Some(HeapEntry { weight, item: state }) = heap.pop() {
            if dist.get(&state).is_some_and(|&d| weight > d) {
                continue;
            }
            if weight > ceiling {
                break;
            }

            for (slot, &(i, limit)) in targets.iter().enumerate() {
                if !witnessed[slot] && matches(&query.targets[i], state) && weight <= limit {
                    witnessed[slot] = true;
                    open -= 1;
                }
            }
            settled += 1;
            if open == 0 || settled >= self.limits.max_settled {
                break;
            }

            let (x, adjacent) = state;
            for edge in graph.edges(x) {
                let y = edge.neighbor;
                if y == query.pivot || graph.is_contracted(y) {
                    continue;
                }
                let data = &edge.data;
                let usable = if forward {
                    data.direction.forward()
                } else {
                    data.direction.backward()
                };
                if !usable {
                    continue;
                }

                let near = data.near_owner(y);
                let allowed = if state == start {
                    query.origin_step.map_or(true, |s| s == near)
                } else if forward {
                    turns.allows(adjacent, x, near)
                } else {
                    turns.allows(near, x, adjacent)
                };
                if !allowed {
                    continue;
                }

                let next_weight = weight + data.weight;
                if next_weight > ceiling {
                    continue;
                }
                let next: State = (y, data.near_neighbor(x));
                if dist.get(&next).map_or(true, |&d| next_weight < d) {
                    dist.insert(next, next_weight);
                    heap.push(HeapEntry::new(next_weight, next));
                }
            }
        }
        witnessed
    }
}

impl WitnessCalculator for EdgeBasedWitnessCalculator {
    fn calculate(
        &self,
        graph: &ContractionGraph,
        turns: TurnModel<'_>,
        query: &WitnessQuery<'_>,
    ) -> Vec<Witnessed> {
        let mut result = vec![Witnessed::default(); query.targets.len()];

        for forward in [true, false] {
            let wanted: Vec<(usize, f32)> = query
                .targets
                .iter()
                .enumerate()
                .filter_map(|(i, t)| {
                    let w = if forward { t.forward_weight } else { t.backward_weight };
                    w.is_finite().then_some((i, w))
                })
                .collect();
            if wanted.is_empty() {
                continue;
            }

            let found = self.search(graph, turns, query, &wanted, forward);
            for (&(i, _), hit) in wanted.iter().zip(found) {
                if hit {
                    if forward {
                        result[i].forward = true;
                    } else {
                        result[i].backward = true;
                    }
                }
            }
        }
        result
    }
}
