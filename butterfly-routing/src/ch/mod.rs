//! Contraction hierarchy construction
//!
//! - [`witness`]: bounded local searches that make shortcuts unnecessary
//! - [`plan`]: which shortcuts contracting one vertex would insert
//! - [`priority`]: contraction order heuristics
//! - [`builder`]: the lazy-update contraction loop

pub mod builder;
pub mod lazy;
pub mod plan;
pub mod priority;
pub mod witness;

pub use builder::{ContractedVertex, ContractionState, ContractionStats, HierarchyBuilder};
pub use lazy::MissWindow;
pub use plan::{plan_contraction, simulate_insertions, ContractionPlan, ShortcutCandidate};
pub use priority::{EdgeDifferencePriority, PriorityCalculator, PriorityContext};
pub use witness::{
    DijkstraWitnessCalculator, WitnessCalculator, WitnessLimits, WitnessQuery, WitnessTarget,
    Witnessed,
};
