//! Validation of hierarchy correctness
//!
//! Compares hierarchy distances against Dijkstra on the original graph and
//! checks that every shortcut expands to original edges of the same weight.

use std::collections::BinaryHeap;

use butterfly_common::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::graph::{DirectedEdgeId, EdgeList, Hierarchy, VertexId, NO_VERTEX};
use crate::heap::HeapEntry;
use crate::query::{unpack_edge, BidirectionalQuery};
use crate::turns::{RestrictionProvider, TurnModel, NO_RESTRICTIONS};

/// Relative tolerance when comparing `f32` path weights
const TOLERANCE: f32 = 1e-4;

fn same_weight(a: f32, b: f32) -> bool {
    (a - b).abs() <= TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// Run Dijkstra on the original graph (ground truth)
pub fn dijkstra(base: &EdgeList, source: VertexId, target: VertexId) -> Result<Option<f32>> {
    base.check_vertex(source)?;
    base.check_vertex(target)?;
    let n = base.vertex_count() as usize;
    let mut dist = vec![f32::INFINITY; n];
    let mut heap = BinaryHeap::new();

    dist[source as usize] = 0.0;
    heap.push(HeapEntry::new(0.0, source));

    while let Some(HeapEntry { weight: d, item: u }) = heap.pop() {
        if u == target {
            return Ok(Some(d));
        }
        if d > dist[u as usize] {
            continue;
        }
        for (v, w) in base.successors(u) {
            let nd = d + w;
            if nd < dist[v as usize] {
                dist[v as usize] = nd;
                heap.push(HeapEntry::new(nd, v));
            }
        }
    }
    Ok(None)
}

/// Turn-aware Dijkstra: U-turns are banned and `restrictions` apply
pub fn dijkstra_with_turns(
    base: &EdgeList,
    restrictions: &dyn RestrictionProvider,
    source: VertexId,
    target: VertexId,
) -> Result<Option<f32>> {
    base.check_vertex(source)?;
    base.check_vertex(target)?;
    let turns = TurnModel::edge_based(restrictions);
    let mut dist: FxHashMap<(VertexId, VertexId), f32> = FxHashMap::default();
    let mut heap = BinaryHeap::new();

    let start = (source, NO_VERTEX);
    dist.insert(start, 0.0);
    heap.push(HeapEntry::new(0.0, start));

    while let Some(HeapEntry { weight: d, item: (u, prev) }) = heap.pop() {
        if u == target {
            return Ok(Some(d));
        }
        if dist.get(&(u, prev)).is_some_and(|&best| d > best) {
            continue;
        }
        for (v, w) in base.successors(u) {
            if prev != NO_VERTEX && !turns.allows(prev, u, v) {
                continue;
            }
            let next = (v, u);
            let nd = d + w;
            if dist.get(&next).map_or(true, |&best| nd < best) {
                dist.insert(next, nd);
                heap.push(HeapEntry::new(nd, next));
            }
        }
    }
    Ok(None)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub source: VertexId,
    pub target: VertexId,
    pub dijkstra_dist: Option<f32>,
    pub ch_dist: Option<f32>,
    /// Set when the distance matched but the unpacked path did not
    pub path_problem: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationResult {
    pub n_tests: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub unreachable_both: usize,
    /// First few failures
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.incorrect == 0
    }
}

const MAX_REPORTED: usize = 10;

/// Compare `n_tests` random queries against Dijkstra on `base`. Edge-based
/// hierarchies are compared with the turn-aware search.
pub fn validate_hierarchy(
    base: &EdgeList,
    hierarchy: &Hierarchy,
    restrictions: Option<&dyn RestrictionProvider>,
    n_tests: usize,
    seed: u64,
) -> Result<ValidationResult> {
    let n = hierarchy.vertex_count();
    if base.vertex_count() != n {
        return Err(Error::InvalidConfig(format!(
            "base graph has {} vertices but the hierarchy has {n}",
            base.vertex_count()
        )));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut result = ValidationResult {
        n_tests,
        ..ValidationResult::default()
    };
    if n == 0 {
        return Ok(result);
    }

    info!(n_tests, seed, "validating random queries");
    for i in 0..n_tests {
        let source = rng.random_range(0..n);
        let target = rng.random_range(0..n);

        let expected = if hierarchy.is_edge_based() {
            let r = restrictions.unwrap_or(&NO_RESTRICTIONS);
            dijkstra_with_turns(base, r, source, target)?
        } else {
            dijkstra(base, source, target)?
        };

        let mut query = BidirectionalQuery::between(hierarchy, source, target);
        if let Some(r) = restrictions {
            query = query.with_restrictions(r);
        }
        let route = query.run()?.route().cloned();
        let actual = route.as_ref().map(|r| r.weight);

        let distance_ok = match (expected, actual) {
            (None, None) => {
                result.unreachable_both += 1;
                true
            }
            (Some(e), Some(a)) => same_weight(e, a),
            _ => false,
        };
        let path_problem = match (&route, distance_ok) {
            (Some(r), true) => check_route(base, source, target, &r.vertices, r.weight).err(),
            _ => None,
        };

        if distance_ok && path_problem.is_none() {
            result.correct += 1;
        } else {
            result.incorrect += 1;
            if result.errors.len() < MAX_REPORTED {
                result.errors.push(ValidationError {
                    source,
                    target,
                    dijkstra_dist: expected,
                    ch_dist: actual,
                    path_problem,
                });
            }
        }

        if (i + 1) % 100 == 0 {
            debug!(
                done = i + 1,
                n_tests,
                correct = result.correct,
                incorrect = result.incorrect,
                "validation progress"
            );
        }
    }
    Ok(result)
}

/// The unpacked vertex path must start and end at the query endpoints, walk
/// only original edges, and add up to the reported weight.
fn check_route(
    base: &EdgeList,
    source: VertexId,
    target: VertexId,
    vertices: &[VertexId],
    weight: f32,
) -> std::result::Result<(), String> {
    if vertices.first() != Some(&source) || vertices.last() != Some(&target) {
        return Err(format!("path endpoints {:?} do not match query", vertices));
    }
    let mut total = 0.0f32;
    for pair in vertices.windows(2) {
        let step = base
            .successors(pair[0])
            .filter(|&(v, _)| v == pair[1])
            .map(|(_, w)| w)
            .reduce(f32::min)
            .ok_or_else(|| format!("no original edge {} -> {}", pair[0], pair[1]))?;
        total += step;
    }
    if same_weight(total, weight) {
        Ok(())
    } else {
        Err(format!("path weight {total} differs from route weight {weight}"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShortcutCheck {
    pub checked: usize,
    /// `(edge index, shortcut weight, unpacked weight)`
    pub mismatches: Vec<(u32, f32, f32)>,
}

/// Expand every shortcut and compare the sum of its original edges with
/// the stored weight.
pub fn verify_shortcuts(hierarchy: &Hierarchy) -> Result<ShortcutCheck> {
    let mut check = ShortcutCheck::default();

    for e in 0..hierarchy.edge_count() {
        let view = hierarchy.edge(e)?;
        if !view.is_shortcut() {
            continue;
        }
        let id = DirectedEdgeId::new(e, !view.direction.forward());
        let (_, originals) = unpack_edge(hierarchy, id)?;

        let mut total = 0.0f32;
        for o in &originals {
            total += hierarchy.edge(o.edge())?.weight;
        }
        check.checked += 1;
        if !same_weight(total, view.weight) {
            check.mismatches.push((e, view.weight, total));
        }
    }
    Ok(check)
}
