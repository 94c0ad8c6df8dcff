//! Immutable contraction hierarchy in CSR form
//!
//! ```text
//! offsets[v]..offsets[v+1]          edges owned by vertex v
//! neighbors[e]                      other endpoint of edge e
//! payload_offsets[e]..[e+1]         encoded payload words of edge e
//! ranks[v]                          contraction rank (NO_VERTEX if never contracted)
//! ```

use std::ops::Range;

use butterfly_common::{Error, Result};

use super::codec::{decode, EdgeView};
use super::{VertexId, NO_EDGE, NO_VERTEX};

/// Edge index plus the side it is traversed from.
///
/// `reversed == false` means owner to neighbor; `true` means neighbor to
/// owner. Packed as `edge << 1 | reversed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirectedEdgeId(u32);

impl DirectedEdgeId {
    pub fn new(edge: u32, reversed: bool) -> Self {
        Self(edge << 1 | u32::from(reversed))
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        (raw != NO_EDGE).then_some(Self(raw))
    }

    #[inline]
    pub fn edge(self) -> u32 {
        self.0 >> 1
    }

    #[inline]
    pub fn is_reversed(self) -> bool {
        self.0 & 1 == 1
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hierarchy {
    pub(crate) edge_based: bool,
    pub(crate) ranks: Vec<u32>,
    pub(crate) offsets: Vec<u32>,
    pub(crate) neighbors: Vec<VertexId>,
    pub(crate) payload_offsets: Vec<u32>,
    pub(crate) payloads: Vec<u32>,
}

impl Hierarchy {
    /// Assemble from raw arrays, checking every structural invariant and
    /// decoding every payload once.
    pub(crate) fn from_parts(
        edge_based: bool,
        ranks: Vec<u32>,
        offsets: Vec<u32>,
        neighbors: Vec<VertexId>,
        payload_offsets: Vec<u32>,
        payloads: Vec<u32>,
    ) -> Result<Self> {
        let n = ranks.len();
        let m = neighbors.len();

        if n >= NO_VERTEX as usize || m >= (NO_EDGE >> 1) as usize {
            return Err(structure("graph too large for 32-bit ids"));
        }
        if offsets.len() != n + 1 || offsets.first() != Some(&0) {
            return Err(structure("vertex offsets have wrong length or start"));
        }
        if offsets.windows(2).any(|w| w[0] > w[1]) || offsets[n] as usize != m {
            return Err(structure("vertex offsets are not monotonic"));
        }
        if payload_offsets.len() != m + 1 || payload_offsets.first() != Some(&0) {
            return Err(structure("payload offsets have wrong length or start"));
        }
        if payload_offsets.windows(2).any(|w| w[0] > w[1])
            || payload_offsets[m] as usize != payloads.len()
        {
            return Err(structure("payload offsets are not monotonic"));
        }
        if let Some(&bad) = neighbors.iter().find(|&&v| v as usize >= n) {
            return Err(Error::VertexOutOfRange {
                vertex: bad,
                vertex_count: n as u32,
            });
        }
        if let Some(&bad) = ranks.iter().find(|&&r| r != NO_VERTEX && r as usize >= n) {
            return Err(structure_owned(format!("rank {bad} exceeds vertex count")));
        }

        let hierarchy = Self {
            edge_based,
            ranks,
            offsets,
            neighbors,
            payload_offsets,
            payloads,
        };
        for e in 0..m as u32 {
            let view = hierarchy.edge(e)?;
            if let Some(via) = view.contracted_via {
                if via as usize >= n {
                    return Err(Error::VertexOutOfRange {
                        vertex: via,
                        vertex_count: n as u32,
                    });
                }
            }
        }
        Ok(hierarchy)
    }

    pub fn vertex_count(&self) -> u32 {
        self.ranks.len() as u32
    }

    pub fn edge_count(&self) -> u32 {
        self.neighbors.len() as u32
    }

    pub fn is_edge_based(&self) -> bool {
        self.edge_based
    }

    pub fn rank(&self, vertex: VertexId) -> Option<u32> {
        self.ranks
            .get(vertex as usize)
            .copied()
            .filter(|&r| r != NO_VERTEX)
    }

    pub fn check_vertex(&self, vertex: VertexId) -> Result<()> {
        if vertex < self.vertex_count() {
            Ok(())
        } else {
            Err(Error::VertexOutOfRange {
                vertex,
                vertex_count: self.vertex_count(),
            })
        }
    }

    /// Indices of the edges owned by `vertex`
    #[inline]
    pub fn edge_range(&self, vertex: VertexId) -> Range<u32> {
        let v = vertex as usize;
        self.offsets[v]..self.offsets[v + 1]
    }

    #[inline]
    pub fn neighbor(&self, edge: u32) -> VertexId {
        self.neighbors[edge as usize]
    }

    /// Vertex whose list holds `edge`
    pub fn owner(&self, edge: u32) -> VertexId {
        // offsets[v] <= edge < offsets[v+1]; skip empty lists sharing an offset
        (self.offsets.partition_point(|&o| o <= edge) - 1) as VertexId
    }

    /// Decode the payload of `edge`
    pub fn edge(&self, edge: u32) -> Result<EdgeView<'_>> {
        let e = edge as usize;
        let range = self
            .payload_offsets
            .get(e..e + 2)
            .ok_or(Error::MalformedEdge {
                reason: "edge index out of range",
                len: 0,
            })?;
        decode(&self.payloads[range[0] as usize..range[1] as usize])
    }

    /// Edges owned by `vertex` as `(edge index, neighbor, payload)`
    pub fn edges(
        &self,
        vertex: VertexId,
    ) -> impl Iterator<Item = Result<(u32, VertexId, EdgeView<'_>)>> + '_ {
        self.edge_range(vertex)
            .map(move |e| self.edge(e).map(|view| (e, self.neighbor(e), view)))
    }

    /// Number of shortcut edges
    pub fn shortcut_count(&self) -> Result<u32> {
        let mut count = 0;
        for e in 0..self.edge_count() {
            if self.edge(e)?.is_shortcut() {
                count += 1;
            }
        }
        Ok(count)
    }
}

fn structure(reason: &str) -> Error {
    structure_owned(reason.to_string())
}

fn structure_owned(reason: String) -> Error {
    Error::InvalidFormat {
        path: "<memory>".into(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ContractionGraph, Direction, EdgeData};

    fn small() -> Hierarchy {
        let mut g = ContractionGraph::new(4, false);
        g.add_edge(0, 1, EdgeData::original(1.0, Direction::Both)).unwrap();
        g.add_edge(2, 3, EdgeData::original(1.0, Direction::Forward)).unwrap();
        g.into_hierarchy().unwrap()
    }

    #[test]
    fn test_directed_edge_id_packing() {
        let id = DirectedEdgeId::new(21, true);
        assert_eq!(id.edge(), 21);
        assert!(id.is_reversed());
        assert_eq!(id.raw(), 43);
        assert_eq!(DirectedEdgeId::from_raw(NO_EDGE), None);
        assert_eq!(DirectedEdgeId::from_raw(42), Some(DirectedEdgeId::new(21, false)));
    }

    #[test]
    fn test_owner_lookup() {
        let h = small();
        for v in 0..h.vertex_count() {
            for e in h.edge_range(v) {
                assert_eq!(h.owner(e), v);
            }
        }
    }

    #[test]
    fn test_edges_iterator() {
        let h = small();
        let edges: Vec<_> = h.edges(2).collect::<Result<_>>().unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].1, 3);
        assert_eq!(edges[0].2.direction, Direction::Forward);
        assert_eq!(h.rank(0), None);
    }

    #[test]
    fn test_rejects_bad_neighbor() {
        let h = small();
        let mut neighbors = h.neighbors.clone();
        neighbors[0] = 99;
        let res = Hierarchy::from_parts(
            false,
            h.ranks.clone(),
            h.offsets.clone(),
            neighbors,
            h.payload_offsets.clone(),
            h.payloads.clone(),
        );
        assert!(matches!(res, Err(Error::VertexOutOfRange { vertex: 99, .. })));
    }

    #[test]
    fn test_rejects_corrupt_payload() {
        let h = small();
        let mut payloads = h.payloads.clone();
        payloads[1] = 0; // direction bits cleared
        let res = Hierarchy::from_parts(
            false,
            h.ranks.clone(),
            h.offsets.clone(),
            h.neighbors.clone(),
            h.payload_offsets.clone(),
            payloads,
        );
        assert!(matches!(res, Err(Error::MalformedEdge { .. })));
    }
}
