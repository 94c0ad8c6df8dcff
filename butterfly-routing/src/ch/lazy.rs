//! Lazy-update bookkeeping for the contraction queue

use std::cmp::{Ordering, Reverse};
use std::collections::VecDeque;

use priority_queue::PriorityQueue;
use rustc_hash::FxBuildHasher;

use crate::graph::VertexId;

/// Queue key: priority first, vertex id as a deterministic tie-break
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueueKey {
    pub priority: f32,
    pub vertex: VertexId,
}

impl PartialEq for QueueKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueKey {}

impl PartialOrd for QueueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then(self.vertex.cmp(&other.vertex))
    }
}

/// Min-queue of uncontracted vertices
pub(crate) type ContractionQueue = PriorityQueue<VertexId, Reverse<QueueKey>, FxBuildHasher>;

/// Sliding window over the last `k` pop attempts.
///
/// Once every attempt in a full window was a miss, the queued priorities are
/// considered too stale and the caller recomputes all of them.
#[derive(Debug, Clone)]
pub struct MissWindow {
    window: VecDeque<bool>,
    capacity: usize,
    misses: usize,
}

impl MissWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            misses: 0,
        }
    }

    /// Record one pop attempt; returns true when the window is saturated
    /// with misses.
    pub fn record(&mut self, miss: bool) -> bool {
        if self.window.len() == self.capacity && self.window.pop_front() == Some(true) {
            self.misses -= 1;
        }
        self.window.push_back(miss);
        if miss {
            self.misses += 1;
        }
        self.misses == self.capacity
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.misses = 0;
    }
}
