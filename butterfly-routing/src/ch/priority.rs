//! Contraction order heuristics

use crate::ch::plan::{plan_contraction, simulate_insertions};
use crate::ch::{ContractionState, WitnessCalculator};
use crate::config::ChConfig;
use crate::graph::{ContractionGraph, VertexId};
use crate::turns::TurnModel;

/// Everything a priority calculator may look at
#[derive(Clone, Copy)]
pub struct PriorityContext<'a> {
    pub graph: &'a ContractionGraph,
    pub witness: &'a dyn WitnessCalculator,
    pub turns: TurnModel<'a>,
    pub state: &'a ContractionState,
}

/// Lower priority means contracted earlier
pub trait PriorityCalculator: Send + Sync {
    fn calculate(&self, ctx: &PriorityContext<'_>, vertex: VertexId) -> f32;
}

/// `difference * (added - removed) + depth * depth(v) + contracted * contracted_neighbors(v)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeDifferencePriority {
    pub difference_factor: f32,
    pub depth_factor: f32,
    pub contracted_factor: f32,
}

impl EdgeDifferencePriority {
    pub fn from_config(config: &ChConfig) -> Self {
        Self {
            difference_factor: config.difference_factor,
            depth_factor: config.depth_factor,
            contracted_factor: config.contracted_factor,
        }
    }
}

impl Default for EdgeDifferencePriority {
    fn default() -> Self {
        Self::from_config(&ChConfig::default())
    }
}

impl PriorityCalculator for EdgeDifferencePriority {
    fn calculate(&self, ctx: &PriorityContext<'_>, vertex: VertexId) -> f32 {
        let plan = plan_contraction(ctx.graph, ctx.witness, ctx.turns, vertex);
        let added = simulate_insertions(ctx.graph, &plan.shortcuts) as f32;
        let removed = plan.removed as f32;

        self.difference_factor * (added - removed)
            + self.depth_factor * ctx.state.depth(vertex) as f32
            + self.contracted_factor * ctx.state.contracted_neighbors(vertex) as f32
    }
}
