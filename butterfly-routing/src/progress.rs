//! Progress reporting for long-running builds
//!
//! The library never draws anything itself. Callers pass a [`Progress`]
//! implementation; the CLI wires one to an indicatif bar.

use tracing::info;

use crate::ch::ContractionStats;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Initial priorities computed for `vertices` candidates
    Initialized { vertices: usize },
    /// `done` of `total` vertices contracted so far
    Contracted {
        done: usize,
        total: usize,
        shortcuts: usize,
    },
    /// Miss window overflowed; all `remaining` priorities recomputed
    Recalculated { remaining: usize },
    Finished(ContractionStats),
}

pub trait Progress: Sync {
    fn report(&self, event: ProgressEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Logs events through `tracing`, throttling per-vertex updates
#[derive(Debug, Clone, Copy)]
pub struct TracingProgress {
    every: usize,
}

impl TracingProgress {
    pub fn new(every: usize) -> Self {
        Self { every: every.max(1) }
    }
}

impl Default for TracingProgress {
    fn default() -> Self {
        Self::new(100_000)
    }
}

impl Progress for TracingProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Initialized { vertices } => {
                info!(vertices, "initial priorities computed");
            }
            ProgressEvent::Contracted {
                done,
                total,
                shortcuts,
            } => {
                if done % self.every == 0 || done == total {
                    let pct = if total == 0 { 100.0 } else { done as f64 * 100.0 / total as f64 };
                    info!(done, total, shortcuts, "contracted {:.1}%", pct);
                }
            }
            ProgressEvent::Recalculated { remaining } => {
                info!(remaining, "priorities fully recalculated");
            }
            ProgressEvent::Finished(stats) => {
                info!(
                    contracted = stats.contracted,
                    shortcuts = stats.shortcuts_added,
                    elapsed_ms = stats.elapsed_ms,
                    "contraction finished"
                );
            }
        }
    }
}
