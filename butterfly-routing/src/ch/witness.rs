//! Witness search
//!
//! Before a shortcut `u -> w` through `v` is inserted, a local Dijkstra from
//! `u` that never enters `v` looks for a path no longer than the shortcut.
//! Such a witness makes the shortcut unnecessary. Searches are bounded by a
//! settled-vertex budget, so a missed witness only costs an extra shortcut.

use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use crate::graph::{ContractionGraph, VertexId};
use crate::heap::HeapEntry;
use crate::turns::TurnModel;

/// One candidate endpoint of the shortcuts leaving an origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WitnessTarget {
    pub vertex: VertexId,
    /// Edge-based only: the original vertex the shortcut passes right next
    /// to `vertex`. A witness must reach `vertex` from the same side.
    pub step: Option<VertexId>,
    /// Weight of the `origin -> vertex` shortcut, `INFINITY` if none
    pub forward_weight: f32,
    /// Weight of the `vertex -> origin` shortcut, `INFINITY` if none
    pub backward_weight: f32,
}

/// Which directions of a target already have a witness
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Witnessed {
    pub forward: bool,
    pub backward: bool,
}

/// All candidate shortcuts leaving one origin neighbour of the vertex being
/// contracted
#[derive(Debug, Clone, Copy)]
pub struct WitnessQuery<'q> {
    /// Vertex being contracted; searches never enter it
    pub pivot: VertexId,
    pub origin: VertexId,
    /// Edge-based only: a witness must leave `origin` through this original
    /// vertex, like the shortcut does.
    pub origin_step: Option<VertexId>,
    pub targets: &'q [WitnessTarget],
}

/// Decides which candidate shortcuts are witnessed.
///
/// Implementations must be conservative: reporting "no witness" is always
/// safe, reporting a witness that is longer than the shortcut is not.
pub trait WitnessCalculator: Send + Sync {
    fn calculate(
        &self,
        graph: &ContractionGraph,
        turns: TurnModel<'_>,
        query: &WitnessQuery<'_>,
    ) -> Vec<Witnessed>;
}

/// Settled-count and weight limits shared by witness searches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WitnessLimits {
    pub max_settled: usize,
    pub max_weight: Option<f32>,
}

impl WitnessLimits {
    /// Weight ceiling for a search whose longest candidate is `longest`
    pub(crate) fn ceiling(&self, longest: f32) -> f32 {
        match self.max_weight {
            Some(w) => longest.min(w),
            None => longest,
        }
    }
}

/// Plain Dijkstra witness search for vertex-based graphs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DijkstraWitnessCalculator {
    limits: WitnessLimits,
}

impl DijkstraWitnessCalculator {
    pub fn new(max_settled: usize, max_weight: Option<f32>) -> Self {
        Self {
            limits: WitnessLimits {
                max_settled,
                max_weight,
            },
        }
    }

    /// Shortest distances from `origin` to as many `targets` as the budget
    /// allows, walking edges forward (`forward == true`) or backward.
    fn search(
        &self,
        graph: &ContractionGraph,
        pivot: VertexId,
        origin: VertexId,
        targets: &[(VertexId, f32)],
        forward: bool,
    ) -> Vec<f32> {
        let mut found = vec![f32::INFINITY; targets.len()];
        let Some(longest) = targets.iter().map(|t| t.1).reduce(f32::max) else {
            return found;
        };
        let ceiling = self.limits.ceiling(longest);

        let mut dist: FxHashMap<VertexId, f32> = FxHashMap::default();
        let mut heap = BinaryHeap::new();
        let mut settled = 0usize;
        let mut open = targets.len();

        dist.insert(origin, 0.0);
        heap.push(HeapEntry::new(0.0, origin));

        while let Some(HeapEntry { weight, item: v }) = heap.pop() {
            if dist.get(&v).is_some_and(|&d| weight > d) {
                continue;
            }
            if weight > ceiling {
                break;
            }

            for (i, t) in targets.iter().enumerate() {
                if t.0 == v && found[i].is_infinite() {
                    found[i] = weight;
                    open -= 1;
                }
            }
            settled += 1;
            if open == 0 || settled >= self.limits.max_settled {
                break;
            }

            for edge in graph.edges(v) {
                let w = edge.neighbor;
                if w == pivot || graph.is_contracted(w) {
                    continue;
                }
                let usable = if forward {
                    edge.data.direction.forward()
                } else {
                    edge.data.direction.backward()
                };
                if !usable {
                    continue;
                }
                let next = weight + edge.data.weight;
                if next > ceiling {
                    continue;
                }
                if dist.get(&w).map_or(true, |&d| next < d) {
                    dist.insert(w, next);
                    heap.push(HeapEntry::new(next, w));
                }
            }
        }
        found
    }
}

impl WitnessCalculator for DijkstraWitnessCalculator {
    fn calculate(
        &self,
        graph: &ContractionGraph,
        _turns: TurnModel<'_>,
        query: &WitnessQuery<'_>,
    ) -> Vec<Witnessed> {
        let mut result = vec![Witnessed::default(); query.targets.len()];

        for forward in [true, false] {
            let (index, wanted): (Vec<usize>, Vec<(VertexId, f32)>) = query
                .targets
                .iter()
                .enumerate()
                .filter_map(|(i, t)| {
                    let w = if forward { t.forward_weight } else { t.backward_weight };
                    w.is_finite().then_some((i, (t.vertex, w)))
                })
                .unzip();
            if wanted.is_empty() {
                continue;
            }

            let found = self.search(graph, query.pivot, query.origin, &wanted, forward);
            for ((i, (_, limit)), d) in index.into_iter().zip(wanted).zip(found) {
                if d <= limit {
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
