//! Bucket-based many-to-many distances
//!
//! 1. Backward upward search from every target; each settled state drops a
//!    bucket entry `(target, weight)` at its vertex.
//! 2. Forward upward search from every source; each settled state scans the
//!    buckets at its vertex and keeps the lightest combination per target.
//!
//! Both phases run their searches on the rayon pool. Only distances are
//! produced; use [`BidirectionalQuery`](crate::BidirectionalQuery) when the
//! path itself is needed.

use std::collections::BinaryHeap;

use butterfly_common::Result;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::graph::{Hierarchy, VertexId};
use crate::heap::HeapEntry;
use crate::turns::{RestrictionProvider, TurnModel, NO_RESTRICTIONS};

/// State settled by an upward search
#[derive(Debug, Clone, Copy, PartialEq)]
struct Settled {
    vertex: VertexId,
    adjacent: Option<VertexId>,
    weight: f32,
}

#[derive(Debug, Clone, Copy)]
struct BucketEntry {
    target: u32,
    adjacent: Option<VertexId>,
    weight: f32,
}

/// Complete upward search space of `seed`
fn upward_search(
    hierarchy: &Hierarchy,
    turns: TurnModel<'_>,
    seed: VertexId,
    forward: bool,
) -> Result<Vec<Settled>> {
    type Key = (VertexId, Option<VertexId>);
    let edge_based = hierarchy.is_edge_based();

    let mut dist: FxHashMap<Key, f32> = FxHashMap::default();
    let mut done: FxHashSet<Key> = FxHashSet::default();
    let mut heap = BinaryHeap::new();
    let mut out = Vec::new();

    dist.insert((seed, None), 0.0);
    heap.push(HeapEntry::new(0.0, (seed, None::<VertexId>)));

    while let Some(HeapEntry { weight, item: key }) = heap.pop() {
        if !done.insert(key) {
            continue;
        }
        let (x, adjacent) = key;
        out.push(Settled {
            vertex: x,
            adjacent,
            weight,
        });

        for e in hierarchy.edge_range(x) {
            let view = hierarchy.edge(e)?;
            let usable = if forward {
                view.direction.forward()
            } else {
                view.direction.backward()
            };
            if !usable {
                continue;
            }
            let y = hierarchy.neighbor(e);
            let next_adjacent = if edge_based {
                let near = view.near_owner(y);
                if let Some(a) = adjacent {
                    let allowed = if forward {
                        turns.allows(a, x, near)
                    } else {
                        turns.allows(near, x, a)
                    };
                    if !allowed {
                        continue;
                    }
                }
                Some(view.near_neighbor(x))
            } else {
                None
            };

            let next = (y, next_adjacent);
            let w = weight + view.weight;
            if !done.contains(&next) && dist.get(&next).map_or(true, |&d| w < d) {
                dist.insert(next, w);
                heap.push(HeapEntry::new(w, next));
            }
        }
    }
    Ok(out)
}

/// Row-major `sources x targets` distances, `None` where unreachable
pub fn distance_matrix(
    hierarchy: &Hierarchy,
    restrictions: Option<&dyn RestrictionProvider>,
    sources: &[VertexId],
    targets: &[VertexId],
) -> Result<Vec<Vec<Option<f32>>>> {
    for &v in sources.iter().chain(targets) {
        hierarchy.check_vertex(v)?;
    }
    let turns = if hierarchy.is_edge_based() {
        TurnModel::edge_based(restrictions.unwrap_or(&NO_RESTRICTIONS))
    } else {
        TurnModel::VertexBased
    };

    let spaces: Vec<Vec<Settled>> = targets
        .par_iter()
        .map(|&t| upward_search(hierarchy, turns, t, false))
        .collect::<Result<_>>()?;

    let mut buckets: FxHashMap<VertexId, Vec<BucketEntry>> = FxHashMap::default();
    for (t, space) in spaces.into_iter().enumerate() {
        for s in space {
            buckets.entry(s.vertex).or_default().push(BucketEntry {
                target: t as u32,
                adjacent: s.adjacent,
                weight: s.weight,
            });
        }
    }

    sources
        .par_iter()
        .map(|&s| -> Result<Vec<Option<f32>>> {
            let mut row = vec![f32::INFINITY; targets.len()];
            for f in upward_search(hierarchy, turns, s, true)? {
                let Some(entries) = buckets.get(&f.vertex) else {
                    continue;
                };
                for b in entries {
                    if let (Some(a), Some(c)) = (f.adjacent, b.adjacent) {
                        if !turns.allows(a, f.vertex, c) {
                            continue;
                        }
                    }
                    let cell = &mut row[b.target as usize];
                    *cell = cell.min(f.weight + b.weight);
                }
            }
            Ok(row
                .into_iter()
                .map(|d| d.is_finite().then_some(d))
                .collect())
        })
        .collect()
}
