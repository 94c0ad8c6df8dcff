//! Hierarchy construction
//!
//! The builder runs three phases over a [`ContractionGraph`]:
//! 1. **Initializing**: compute a priority for every uncontracted vertex
//!    (in parallel with rayon unless disabled) and fill the queue.
//! 2. **Contracting**: pop the cheapest vertex, re-check its priority
//!    lazily and contract it once the queued value is confirmed.
//! 3. **Done**: the queue is empty; every vertex has a rank.

use std::cmp::Reverse;
use std::time::Instant;

use butterfly_common::{Error, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ch::lazy::{ContractionQueue, MissWindow, QueueKey};
use crate::ch::plan::{plan_contraction, ContractionPlan};
use crate::ch::{
    DijkstraWitnessCalculator, EdgeDifferencePriority, PriorityCalculator, PriorityContext,
    WitnessCalculator,
};
use crate::config::ChConfig;
use crate::graph::{ContractionGraph, VertexId};
use crate::progress::{NoProgress, Progress, ProgressEvent};
use crate::turns::{EdgeBasedWitnessCalculator, RestrictionProvider, TurnModel};

static NO_PROGRESS: NoProgress = NoProgress;

/// Counters collected over one [`HierarchyBuilder::run`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContractionStats {
    pub contracted: usize,
    pub shortcuts_added: usize,
    pub witnessed: usize,
    pub skipped_self_loops: usize,
    pub skipped_restricted: usize,
    pub queue_misses: usize,
    pub full_recalculations: usize,
    pub elapsed_ms: u64,
}

/// Per-run bookkeeping next to the graph: queue, miss window and the
/// neighbour counters the priority terms read.
#[derive(Clone)]
pub struct ContractionState {
    queue: ContractionQueue,
    misses: MissWindow,
    depth: Vec<u32>,
    contracted_neighbors: Vec<u32>,
}

impl std::fmt::Debug for ContractionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractionState")
            .field("queued", &self.queue.len())
            .field("misses", &self.misses)
            .field("vertices", &self.depth.len())
            .finish()
    }
}

impl ContractionState {
    pub fn new(vertex_count: u32, miss_window: usize) -> Self {
        Self {
            queue: ContractionQueue::with_default_hasher(),
            misses: MissWindow::new(miss_window),
            depth: vec![0; vertex_count as usize],
            contracted_neighbors: vec![0; vertex_count as usize],
        }
    }

    /// Longest chain of contracted vertices below `vertex`
    pub fn depth(&self, vertex: VertexId) -> u32 {
        self.depth[vertex as usize]
    }

    pub fn contracted_neighbors(&self, vertex: VertexId) -> u32 {
        self.contracted_neighbors[vertex as usize]
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn enqueue(&mut self, vertex: VertexId, priority: f32) {
        self.queue.push(vertex, Reverse(QueueKey { priority, vertex }));
    }
}

/// Result of contracting one vertex
#[derive(Debug, Clone, PartialEq)]
pub struct ContractedVertex {
    pub rank: u32,
    pub plan: ContractionPlan,
    /// Shortcut candidates that changed the graph when merged
    pub inserted: usize,
}

pub struct HierarchyBuilder<'a, P = EdgeDifferencePriority, W = DijkstraWitnessCalculator> {
    config: ChConfig,
    priority: P,
    witness: W,
    turns: TurnModel<'a>,
    progress: &'a dyn Progress,
}

impl<'a> HierarchyBuilder<'a> {
    /// Vertex-based builder with the edge-difference heuristic
    pub fn vertex_based(config: ChConfig) -> Self {
        let priority = EdgeDifferencePriority::from_config(&config);
        let witness =
            DijkstraWitnessCalculator::new(config.witness_max_settled, config.witness_max_weight);
        Self::new(config, priority, witness, TurnModel::VertexBased)
    }
}

impl<'a> HierarchyBuilder<'a, EdgeDifferencePriority, EdgeBasedWitnessCalculator> {
    /// Edge-based builder: U-turns are banned and `restrictions` forbid
    /// further maneuvers.
    pub fn edge_based(config: ChConfig, restrictions: &'a dyn RestrictionProvider) -> Self {
        let priority = EdgeDifferencePriority::from_config(&config);
        let witness =
            EdgeBasedWitnessCalculator::new(config.witness_max_settled, config.witness_max_weight);
        Self::new(config, priority, witness, TurnModel::edge_based(restrictions))
    }
}

impl<'a, P, W> HierarchyBuilder<'a, P, W>
where
    P: PriorityCalculator,
    W: WitnessCalculator,
{
    pub fn new(config: ChConfig, priority: P, witness: W, turns: TurnModel<'a>) -> Self {
        Self {
            config,
            priority,
            witness,
            turns,
            progress: &NO_PROGRESS,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &ChConfig {
        &self.config
    }

    /// Contract every uncontracted vertex of `graph`. Running again on a
    /// fully contracted graph does nothing.
    pub fn run(&self, graph: &mut ContractionGraph) -> Result<ContractionStats> {
        self.config.validate()?;
        if graph.is_edge_based() != self.turns.is_edge_based() {
            return Err(Error::InvalidConfig(format!(
                "graph is {} but the builder is {}",
                mode(graph.is_edge_based()),
                mode(self.turns.is_edge_based()),
            )));
        }
        graph.set_merge_epsilon(self.config.merge_epsilon);

        let started = Instant::now();
        let mut stats = ContractionStats::default();
        let mut state = ContractionState::new(graph.vertex_count(), self.config.miss_window);

        // Initializing
        let candidates: Vec<VertexId> = graph.uncontracted().collect();
        let total = candidates.len();
        for (v, p) in self.priorities(graph, &state, &candidates) {
            state.enqueue(v, p);
        }
        info!(
            candidates = total,
            edge_based = graph.is_edge_based(),
            "initial priorities computed"
        );
        self.progress.report(ProgressEvent::Initialized { vertices: total });

        // Contracting
        while let Some(vertex) = self.select_next(graph, &mut state, &mut stats) {
            let done = self.contract(graph, &mut state, vertex)?;
            stats.contracted += 1;
            stats.shortcuts_added += done.inserted;
            stats.witnessed += done.plan.witnessed;
            stats.skipped_self_loops += done.plan.skipped_self_loops;
            stats.skipped_restricted += done.plan.skipped_restricted;

            self.progress.report(ProgressEvent::Contracted {
                done: stats.contracted,
                total,
                shortcuts: stats.shortcuts_added,
            });
        }

        // Done
        stats.elapsed_ms = started.elapsed().as_millis() as u64;
        if stats.skipped_self_loops > 0 {
            warn!(
                pairs = stats.skipped_self_loops,
                "skipped self-loop shortcuts between parallel edges"
            );
        }
        info!(
            contracted = stats.contracted,
            shortcuts = stats.shortcuts_added,
            witnessed = stats.witnessed,
            misses = stats.queue_misses,
            recalculations = stats.full_recalculations,
            elapsed_ms = stats.elapsed_ms,
            "contraction complete"
        );
        self.progress.report(ProgressEvent::Finished(stats.clone()));
        Ok(stats)
    }

    /// Contract one vertex: plan its shortcuts, detach it, rank it, merge
    /// the shortcuts and update neighbour counters.
    pub fn contract(
        &self,
        graph: &mut ContractionGraph,
        state: &mut ContractionState,
        vertex: VertexId,
    ) -> Result<ContractedVertex> {
        graph.check_vertex(vertex)?;
        if let Some(rank) = graph.rank(vertex) {
            return Ok(ContractedVertex {
                rank,
                plan: ContractionPlan::default(),
                inserted: 0,
            });
        }
        graph.set_merge_epsilon(self.config.merge_epsilon);

        let plan = plan_contraction(graph, &self.witness, self.turns, vertex);
        if plan.skipped_self_loops > 0 {
            debug!(vertex, pairs = plan.skipped_self_loops, "skipping self-loop shortcuts");
        }

        let mut neighbors: Vec<VertexId> = graph.edges(vertex).iter().map(|e| e.neighbor).collect();
        neighbors.sort_unstable();
        neighbors.dedup();

        graph.detach(vertex)?;
        let rank = graph.mark_contracted(vertex)?;

        let mut inserted = 0;
        for sc in &plan.shortcuts {
            if graph.add_or_update_edge(sc.from, sc.to, sc.data.clone())?.is_some() {
                inserted += 1;
            }
        }

        let depth = state.depth(vertex) + 1;
        for n in neighbors {
            let i = n as usize;
            state.contracted_neighbors[i] += 1;
            state.depth[i] = state.depth[i].max(depth);
        }

        debug!(
            vertex,
            rank,
            candidates = plan.shortcuts.len(),
            inserted,
            "contracted"
        );
        Ok(ContractedVertex {
            rank,
            plan,
            inserted,
        })
    }

    fn priority_of(&self, graph: &ContractionGraph, state: &ContractionState, v: VertexId) -> f32 {
        let ctx = PriorityContext {
            graph,
            witness: &self.witness,
            turns: self.turns,
            state,
        };
        self.priority.calculate(&ctx, v)
    }

    fn priorities(
        &self,
        graph: &ContractionGraph,
        state: &ContractionState,
        vertices: &[VertexId],
    ) -> Vec<(VertexId, f32)> {
        if self.config.parallel_priorities {
            vertices
                .par_iter()
                .map(|&v| (v, self.priority_of(graph, state, v)))
                .collect()
        } else {
            vertices
                .iter()
                .map(|&v| (v, self.priority_of(graph, state, v)))
                .collect()
        }
    }

    /// Pop until a vertex whose queued priority is still current shows up
    fn select_next(
        &self,
        graph: &ContractionGraph,
        state: &mut ContractionState,
        stats: &mut ContractionStats,
    ) -> Option<VertexId> {
        while let Some((vertex, Reverse(key))) = state.queue.pop() {
            if graph.is_contracted(vertex) {
                continue;
            }

            let fresh = self.priority_of(graph, state, vertex);
            if fresh.total_cmp(&key.priority).is_eq() {
                state.misses.record(false);
                return Some(vertex);
            }

            state.enqueue(vertex, fresh);
            stats.queue_misses += 1;
            if state.misses.record(true) {
                self.recalculate(graph, state);
                stats.full_recalculations += 1;
            }
        }
        None
    }

    fn recalculate(&self, graph: &ContractionGraph, state: &mut ContractionState) {
        let remaining: Vec<VertexId> = state
            .queue
            .iter()
            .map(|(&v, _)| v)
            .filter(|&v| !graph.is_contracted(v))
            .collect();
        let fresh = self.priorities(graph, state, &remaining);

        state.queue.clear();
        for (v, p) in fresh {
            state.enqueue(v, p);
        }
        state.misses.reset();

        debug!(remaining = remaining.len(), "full priority recalculation");
        self.progress.report(ProgressEvent::Recalculated {
            remaining: remaining.len(),
        });
    }
}

fn mode(edge_based: bool) -> &'static str {
    if edge_based {
        "edge-based"
    } else {
        "vertex-based"
    }
}
