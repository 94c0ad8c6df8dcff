//! Bidirectional upward Dijkstra over a hierarchy

use std::collections::BinaryHeap;

use butterfly_common::{Error, Result};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::graph::{DirectedEdgeId, Hierarchy, VertexId};
use crate::heap::HeapEntry;
use crate::query::path::{PathArena, PathId, PathNode};
use crate::query::unpack::unpack_hop;
use crate::turns::{RestrictionProvider, TurnModel, NO_RESTRICTIONS};

/// Start or end point of a query with an initial weight offset.
///
/// `adjacent` only matters for edge-based hierarchies: for a source it is
/// the original vertex the route arrives from, for a target the one it must
/// continue to. Maneuvers through the seed vertex are checked against it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seed {
    pub vertex: VertexId,
    pub weight: f32,
    pub adjacent: Option<VertexId>,
}

impl Seed {
    pub fn at(vertex: VertexId) -> Self {
        Self::with_offset(vertex, 0.0)
    }

    pub fn with_offset(vertex: VertexId, weight: f32) -> Self {
        Self {
            vertex,
            weight,
            adjacent: None,
        }
    }

    pub fn with_adjacent(mut self, adjacent: VertexId) -> Self {
        self.adjacent = Some(adjacent);
        self
    }
}

/// Fully unpacked route
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Vertex where both frontiers met
    pub best_vertex: VertexId,
    pub weight: f32,
    /// Original vertices from source to target
    pub vertices: Vec<VertexId>,
    /// Original edges between consecutive `vertices`
    pub edges: Vec<DirectedEdgeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Route(Route),
    NoRoute { reason: String },
}

impl Outcome {
    pub fn route(&self) -> Option<&Route> {
        match self {
            Outcome::Route(r) => Some(r),
            Outcome::NoRoute { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub settled_forward: usize,
    pub settled_backward: usize,
}

/// `(vertex, adjacent original vertex)`; the second part is always `None`
/// for vertex-based hierarchies.
type StateKey = (VertexId, Option<VertexId>);

struct Frontier {
    forward: bool,
    arena: PathArena,
    heap: BinaryHeap<HeapEntry<PathId>>,
    tentative: FxHashMap<StateKey, f32>,
    settled: FxHashMap<StateKey, PathId>,
    /// Settled nodes per vertex, for meeting checks
    by_vertex: FxHashMap<VertexId, Vec<PathId>>,
}

impl Frontier {
    fn new(forward: bool) -> Self {
        Self {
            forward,
            arena: PathArena::default(),
            heap: BinaryHeap::new(),
            tentative: FxHashMap::default(),
            settled: FxHashMap::default(),
            by_vertex: FxHashMap::default(),
        }
    }

    fn min_weight(&self) -> f32 {
        self.heap.peek().map_or(f32::INFINITY, |e| e.weight)
    }

    fn offer(&mut self, node: PathNode) {
        let key = (node.vertex, node.adjacent);
        if self.settled.contains_key(&key) {
            return;
        }
        if self.tentative.get(&key).is_some_and(|&w| w <= node.weight) {
            return;
        }
        self.tentative.insert(key, node.weight);
        let id = self.arena.push(node);
        self.heap.push(HeapEntry::new(node.weight, id));
    }
}

#[derive(Debug, Clone, Copy)]
struct Meeting {
    weight: f32,
    vertex: VertexId,
    forward: PathId,
    backward: PathId,
}

/// One query between a set of source seeds and a set of target seeds.
///
/// ```no_run
/// # use butterfly_routing::{BidirectionalQuery, Hierarchy, Seed};
/// # fn demo(hierarchy: &Hierarchy) -> butterfly_routing::Result<()> {
/// let mut query = BidirectionalQuery::new(hierarchy, vec![Seed::at(0)], vec![Seed::at(7)]);
/// if let Some(route) = query.run()?.route() {
///     println!("{} via {:?}", route.weight, route.vertices);
/// }
/// # Ok(())
/// # }
/// ```
pub struct BidirectionalQuery<'h> {
    hierarchy: &'h Hierarchy,
    turns: TurnModel<'h>,
    sources: Vec<Seed>,
    targets: Vec<Seed>,
    outcome: Option<Outcome>,
    stats: QueryStats,
}

impl<'h> BidirectionalQuery<'h> {
    pub fn new(hierarchy: &'h Hierarchy, sources: Vec<Seed>, targets: Vec<Seed>) -> Self {
        let turns = if hierarchy.is_edge_based() {
            TurnModel::edge_based(&NO_RESTRICTIONS)
        } else {
            TurnModel::VertexBased
        };
        Self {
            hierarchy,
            turns,
            sources,
            targets,
            outcome: None,
            stats: QueryStats::default(),
        }
    }

    pub fn between(hierarchy: &'h Hierarchy, source: VertexId, target: VertexId) -> Self {
        Self::new(hierarchy, vec![Seed::at(source)], vec![Seed::at(target)])
    }

    /// Check maneuvers against `restrictions`. Ignored on vertex-based
    /// hierarchies.
    pub fn with_restrictions(mut self, restrictions: &'h dyn RestrictionProvider) -> Self {
        if self.hierarchy.is_edge_based() {
            self.turns = TurnModel::edge_based(restrictions);
        }
        self
    }

    /// Run the search on first call; later calls return the cached outcome
    pub fn run(&mut self) -> Result<&Outcome> {
        let outcome = match self.outcome.take() {
            Some(done) => done,
            None => self.search()?,
        };
        Ok(self.outcome.insert(outcome))
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn best_vertex(&self) -> Option<VertexId> {
        self.route().map(|r| r.best_vertex)
    }

    pub fn weight(&self) -> Option<f32> {
        self.route().map(|r| r.weight)
    }

    pub fn path(&self) -> Option<&[VertexId]> {
        self.route().map(|r| r.vertices.as_slice())
    }

    pub fn edge_path(&self) -> Option<&[DirectedEdgeId]> {
        self.route().map(|r| r.edges.as_slice())
    }

    pub fn stats(&self) -> QueryStats {
        self.stats
    }

    fn route(&self) -> Option<&Route> {
        self.outcome.as_ref().and_then(Outcome::route)
    }

    fn check_seeds(&self) -> Result<()> {
        for seed in self.sources.iter().chain(&self.targets) {
            self.hierarchy.check_vertex(seed.vertex)?;
            if !seed.weight.is_finite() || seed.weight < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "seed at vertex {} has invalid weight {}",
                    seed.vertex, seed.weight
                )));
            }
        }
        Ok(())
    }

    fn search(&mut self) -> Result<Outcome> {
        self.check_seeds()?;
        if self.sources.is_empty() || self.targets.is_empty() {
            return Ok(Outcome::NoRoute {
                reason: "no source or no target given".into(),
            });
        }

        let edge_based = self.hierarchy.is_edge_based();
        let mut fwd = Frontier::new(true);
        let mut bwd = Frontier::new(false);
        for (frontier, seeds) in [(&mut fwd, &self.sources), (&mut bwd, &self.targets)] {
            for seed in seeds {
                frontier.offer(PathNode {
                    vertex: seed.vertex,
                    weight: seed.weight,
                    edge: None,
                    parent: None,
                    adjacent: if edge_based { seed.adjacent } else { None },
                });
            }
        }

        let mut best: Option<Meeting> = None;
        loop {
            if fwd.heap.is_empty() && bwd.heap.is_empty() {
                break;
            }
            let best_weight = best.map_or(f32::INFINITY, |m| m.weight);
            let (fmin, bmin) = (fwd.min_weight(), bwd.min_weight());
            if best_weight < fmin && best_weight < bmin {
                break;
            }

            if fmin <= best_weight {
                self.step(&mut fwd, &bwd, &mut best)?;
            }
            if bwd.min_weight() <= best.map_or(f32::INFINITY, |m| m.weight) {
                self.step(&mut bwd, &fwd, &mut best)?;
            }
        }

        self.stats = QueryStats {
            settled_forward: fwd.settled.len(),
            settled_backward: bwd.settled.len(),
        };
        trace!(
            settled_forward = self.stats.settled_forward,
            settled_backward = self.stats.settled_backward,
            "query finished"
        );

        match best {
            Some(meeting) => Ok(Outcome::Route(self.reconstruct(&fwd, &bwd, meeting)?)),
            None => Ok(Outcome::NoRoute {
                reason: "target not reachable from source".into(),
            }),
        }
    }

    /// Settle the lightest node of `frontier`, relax its upward edges and
    /// look for a meeting with `other`.
    fn step(
        &self,
        frontier: &mut Frontier,
        other: &Frontier,
        best: &mut Option<Meeting>,
    ) -> Result<()> {
        let Some(HeapEntry { item: id, .. }) = frontier.heap.pop() else {
            return Ok(());
        };
        let node = *frontier.arena.get(id);
        let key = (node.vertex, node.adjacent);
        if frontier.settled.contains_key(&key) {
            return Ok(());
        }
        frontier.settled.insert(key, id);
        frontier.by_vertex.entry(node.vertex).or_default().push(id);

        let x = node.vertex;
        let edge_based = self.hierarchy.is_edge_based();
        for e in self.hierarchy.edge_range(x) {
            let view = self.hierarchy.edge(e)?;
            let usable = if frontier.forward {
                view.direction.forward()
            } else {
                view.direction.backward()
            };
            if !usable {
                continue;
            }
            let y = self.hierarchy.neighbor(e);

            let adjacent = if edge_based {
                let near = view.near_owner(y);
                if let Some(a) = node.adjacent {
                    let allowed = if frontier.forward {
                        self.turns.allows(a, x, near)
                    } else {
                        self.turns.allows(near, x, a)
                    };
                    if !allowed {
                        continue;
                    }
                }
                Some(view.near_neighbor(x))
            } else {
                None
            };

            frontier.offer(PathNode {
                vertex: y,
                weight: node.weight + view.weight,
                edge: Some(DirectedEdgeId::new(e, !frontier.forward)),
                parent: Some(id),
                adjacent,
            });
        }

        if let Some(candidates) = other.by_vertex.get(&x) {
            for &other_id in candidates {
                let other_node = other.arena.get(other_id);
                let (f_id, f_node, b_id, b_node) = if frontier.forward {
                    (id, &node, other_id, other_node)
                } else {
                    (other_id, other_node, id, &node)
                };
                if let (Some(a), Some(b)) = (f_node.adjacent, b_node.adjacent) {
                    if !self.turns.allows(a, x, b) {
                        continue;
                    }
                }
                let total = f_node.weight + b_node.weight;
                if best.map_or(true, |m| total < m.weight) {
                    *best = Some(Meeting {
                        weight: total,
                        vertex: x,
                        forward: f_id,
                        backward: b_id,
                    });
                }
            }
        }
        Ok(())
    }

    fn reconstruct(&self, fwd: &Frontier, bwd: &Frontier, meeting: Meeting) -> Result<Route> {
        let forward_chain = fwd.arena.chain(meeting.forward);
        let backward_chain = bwd.arena.chain(meeting.backward);

        let mut vertices = vec![forward_chain[0].vertex];
        let mut edges = Vec::new();

        // Source up to the meeting vertex
        for pair in forward_chain.windows(2) {
            let (parent, child) = (pair[0], pair[1]);
            if let Some(edge) = child.edge {
                unpack_hop(
                    self.hierarchy,
                    parent.vertex,
                    child.vertex,
                    edge,
                    &mut vertices,
                    &mut edges,
                )?;
            }
        }
        // Meeting vertex down to the target: backward nodes point towards
        // their seed, so walk the chain from its far end
        for pair in backward_chain.windows(2).rev() {
            let (toward_target, node) = (pair[0], pair[1]);
            if let Some(edge) = node.edge {
                unpack_hop(
                    self.hierarchy,
                    node.vertex,
                    toward_target.vertex,
                    edge,
                    &mut vertices,
                    &mut edges,
                )?;
            }
        }

        Ok(Route {
            best_vertex: meeting.vertex,
            weight: meeting.weight,
            vertices,
            edges,
        })
    }
}
