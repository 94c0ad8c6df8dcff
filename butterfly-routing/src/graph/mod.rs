//! Graph representations
//!
//! - [`ContractionGraph`]: mutable adjacency lists used while contracting
//! - [`Hierarchy`]: immutable CSR snapshot read by queries
//! - [`EdgeList`]: plain input network implementing [`BaseGraphProvider`]

mod codec;
mod contraction;
mod hierarchy;
mod merge;
mod provider;

pub use codec::{decode, encode, encoded_len, EdgeView, MAX_VIA_SEQUENCE};
pub use contraction::{ContractionGraph, Edge};
pub use hierarchy::{DirectedEdgeId, Hierarchy};
pub use merge::merge_edges;
pub use provider::{BaseGraphProvider, EdgeList, InputEdge};

/// Dense vertex id in `0..vertex_count`
pub type VertexId = u32;

/// Sentinel for "no vertex"
pub const NO_VERTEX: VertexId = u32::MAX - 1;

/// Sentinel for "no edge"
pub const NO_EDGE: u32 = u32::MAX;

/// Traversal direction of an edge relative to the vertex that owns it.
///
/// An edge stored at `owner` pointing to `neighbor` is traversable
/// `owner -> neighbor` when [`Direction::forward`] holds and
/// `neighbor -> owner` when [`Direction::backward`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Direction {
    Forward = 1,
    Backward = 2,
    Both = 3,
}

impl Direction {
    pub fn from_flags(forward: bool, backward: bool) -> Option<Self> {
        match (forward, backward) {
            (true, true) => Some(Direction::Both),
            (true, false) => Some(Direction::Forward),
            (false, true) => Some(Direction::Backward),
            (false, false) => None,
        }
    }

    #[inline]
    pub fn forward(self) -> bool {
        matches!(self, Direction::Forward | Direction::Both)
    }

    #[inline]
    pub fn backward(self) -> bool {
        matches!(self, Direction::Backward | Direction::Both)
    }

    /// Same edge seen from the other endpoint
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
            Direction::Both => Direction::Both,
        }
    }

    pub(crate) fn code(self) -> u32 {
        self as u32
    }

    pub(crate) fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Direction::Forward),
            2 => Some(Direction::Backward),
            3 => Some(Direction::Both),
            _ => None,
        }
    }
}

/// Owned payload of one stored edge.
///
/// `via_seq1` lists the original vertices right after the owner and
/// `via_seq2` the ones right before the neighbor. Both stay empty for
/// vertex-based hierarchies.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeData {
    pub weight: f32,
    pub direction: Direction,
    pub contracted_via: Option<VertexId>,
    pub via_seq1: Vec<VertexId>,
    pub via_seq2: Vec<VertexId>,
}

impl EdgeData {
    pub fn original(weight: f32, direction: Direction) -> Self {
        Self {
            weight,
            direction,
            contracted_via: None,
            via_seq1: Vec::new(),
            via_seq2: Vec::new(),
        }
    }

    pub fn shortcut(
        weight: f32,
        direction: Direction,
        via: VertexId,
        via_seq1: Vec<VertexId>,
        via_seq2: Vec<VertexId>,
    ) -> Self {
        Self {
            weight,
            direction,
            contracted_via: Some(via),
            via_seq1,
            via_seq2,
        }
    }

    #[inline]
    pub fn is_shortcut(&self) -> bool {
        self.contracted_via.is_some()
    }

    /// The same edge as stored at the other endpoint
    pub fn reversed(&self) -> Self {
        Self {
            weight: self.weight,
            direction: self.direction.reversed(),
            contracted_via: self.contracted_via,
            via_seq1: self.via_seq2.clone(),
            via_seq2: self.via_seq1.clone(),
        }
    }

    /// Original vertex adjacent to the owner along this edge
    #[inline]
    pub fn near_owner(&self, neighbor: VertexId) -> VertexId {
        self.via_seq1.first().copied().unwrap_or(neighbor)
    }

    /// Original vertex adjacent to the neighbor along this edge
    #[inline]
    pub fn near_neighbor(&self, owner: VertexId) -> VertexId {
        self.via_seq2.first().copied().unwrap_or(owner)
    }

    /// Identity used when merging parallel edges: same endpoints and same
    /// sequences compete, different sequences coexist.
    pub(crate) fn same_key(&self, other: &EdgeData) -> bool {
        self.via_seq1 == other.via_seq1 && self.via_seq2 == other.via_seq2
    }
}
