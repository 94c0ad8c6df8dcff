//! Contraction hierarchies for butterfly-osm
//!
//! Preprocessing turns a weighted directed road graph into a hierarchy: every
//! vertex is contracted in a cost-driven order and shortcut edges preserve the
//! shortest-path distances the removed vertex used to carry. Queries then run a
//! bidirectional Dijkstra that only ever climbs the hierarchy.
//!
//! Pipeline:
//! 1. [`ContractionGraph::from_provider`] builds the mutable graph from a base
//!    network and a cost function.
//! 2. [`HierarchyBuilder::run`] contracts it in place (vertex-based, or
//!    edge-based with turn restrictions and U-turn prevention).
//! 3. [`ContractionGraph::into_hierarchy`] freezes the result into an immutable
//!    [`Hierarchy`] that any number of [`BidirectionalQuery`]s can share.

pub mod ch;
pub mod config;
pub mod formats;
pub mod graph;
pub mod matrix;
pub mod progress;
pub mod query;
pub mod turns;
pub mod validate;

mod heap;

pub use ch::{
    ContractionState, ContractionStats, DijkstraWitnessCalculator, EdgeDifferencePriority,
    HierarchyBuilder, PriorityCalculator, WitnessCalculator,
};
pub use config::ChConfig;
pub use graph::{
    BaseGraphProvider, ContractionGraph, DirectedEdgeId, Direction, EdgeData, EdgeList,
    Hierarchy, VertexId, NO_EDGE, NO_VERTEX,
};
pub use progress::{NoProgress, Progress, ProgressEvent, TracingProgress};
pub use query::{BidirectionalQuery, Outcome, Route, Seed};
pub use turns::{
    EdgeBasedWitnessCalculator, NoRestrictions, RestrictionProvider, TurnModel,
    TurnRestrictionIndex,
};

pub use butterfly_common::{Error, Result};
