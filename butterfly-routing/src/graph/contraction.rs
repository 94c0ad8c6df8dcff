//! Mutable graph used during contraction
//!
//! Every edge lives in the adjacency lists of both endpoints while both are
//! uncontracted. Contracting a vertex strips the copies held by its
//! neighbours; the contracted vertex keeps its own list untouched, which then
//! holds exactly its upward edges.

use butterfly_common::{Error, Result};
use tracing::debug;

use super::codec::{encode, encoded_len};
use super::merge::merge_edges;
use super::{BaseGraphProvider, Direction, EdgeData, Hierarchy, VertexId, NO_VERTEX};

/// One stored edge, seen from the vertex whose list holds it
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub neighbor: VertexId,
    pub data: EdgeData,
}

#[derive(Debug, Clone)]
pub struct ContractionGraph {
    adjacency: Vec<Vec<Edge>>,
    ranks: Vec<Option<u32>>,
    next_rank: u32,
    edge_based: bool,
    merge_epsilon: f32,
}

impl ContractionGraph {
    pub fn new(vertex_count: u32, edge_based: bool) -> Self {
        Self {
            adjacency: vec![Vec::new(); vertex_count as usize],
            ranks: vec![None; vertex_count as usize],
            next_rank: 0,
            edge_based,
            merge_epsilon: 0.0,
        }
    }

    /// Build from a base network. `cost` maps each edge payload to a weight
    /// and direction; returning `None` drops the edge.
    pub fn from_provider<P, F>(provider: &P, edge_based: bool, cost: F) -> Result<Self>
    where
        P: BaseGraphProvider,
        F: Fn(&P::Data) -> Option<(f32, Direction)>,
    {
        let n = provider.vertex_count();
        let mut graph = Self::new(n, edge_based);
        let mut dropped = 0usize;

        for from in 0..n {
            for (to, payload) in provider.edges_from(from) {
                let Some((weight, direction)) = cost(payload) else {
                    dropped += 1;
                    continue;
                };
                if !weight.is_finite() || weight < 0.0 {
                    return Err(Error::InvalidWeight { from, to, weight });
                }
                graph.add_or_update_edge(from, to, EdgeData::original(weight, direction))?;
            }
        }

        debug!(
            vertices = n,
            edges = graph.edge_count(),
            dropped,
            edge_based,
            "contraction graph built"
        );
        Ok(graph)
    }

    pub fn vertex_count(&self) -> u32 {
        self.adjacency.len() as u32
    }

    /// Number of distinct edges; each is stored at both endpoints while both
    /// are live and once after either is contracted.
    pub fn edge_count(&self) -> usize {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(v, list)| list.iter().map(move |e| (v as VertexId, e)))
            .filter(|(v, e)| {
                self.is_contracted(*v) || !self.is_contracted(e.neighbor) && *v <= e.neighbor
            })
            .count()
    }

    pub fn is_edge_based(&self) -> bool {
        self.edge_based
    }

    pub fn merge_epsilon(&self) -> f32 {
        self.merge_epsilon
    }

    /// Tolerance under which opposite one-way winners merge into `Both`
    pub fn set_merge_epsilon(&mut self, epsilon: f32) {
        self.merge_epsilon = epsilon;
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

    /// Edges stored at `vertex`
    #[inline]
    pub fn edges(&self, vertex: VertexId) -> &[Edge] {
        &self.adjacency[vertex as usize]
    }

    #[inline]
    pub fn degree(&self, vertex: VertexId) -> usize {
        self.adjacency[vertex as usize].len()
    }

    /// Edges from `from` to `to` carrying the given via sequences
    pub fn edges_between(
        &self,
        from: VertexId,
        to: VertexId,
        via_seq1: &[VertexId],
        via_seq2: &[VertexId],
    ) -> Vec<EdgeData> {
        self.adjacency[from as usize]
            .iter()
            .filter(|e| e.neighbor == to && e.data.via_seq1 == via_seq1 && e.data.via_seq2 == via_seq2)
            .map(|e| e.data.clone())
            .collect()
    }

    /// Raw insert at both endpoints, no merging. Self-loops are ignored since
    /// they never shorten a path.
    pub fn add_edge(&mut self, from: VertexId, to: VertexId, data: EdgeData) -> Result<()> {
        self.check_vertex(from)?;
        self.check_vertex(to)?;
        if from == to {
            debug!(vertex = from, "ignoring self-loop");
            return Ok(());
        }

        let reversed = data.reversed();
        self.adjacency[from as usize].push(Edge { neighbor: to, data });
        self.adjacency[to as usize].push(Edge {
            neighbor: from,
            data: reversed,
        });
        Ok(())
    }

    /// Remove every edge between `from` and `to`, returning how many distinct
    /// edges went away.
    pub fn remove_edge(&mut self, from: VertexId, to: VertexId) -> Result<usize> {
        self.check_vertex(from)?;
        self.check_vertex(to)?;

        let list = &mut self.adjacency[from as usize];
        let before = list.len();
        list.retain(|e| e.neighbor != to);
        let removed = before - list.len();

        if from != to {
            self.adjacency[to as usize].retain(|e| e.neighbor != from);
        }
        Ok(removed)
    }

    /// Insert `data` between `from` and `to`, merging with the parallel edges
    /// of the same via sequences.
    ///
    /// Returns `None` when nothing changed, otherwise the change in the
    /// number of stored edges for the pair.
    pub fn add_or_update_edge(
        &mut self,
        from: VertexId,
        to: VertexId,
        data: EdgeData,
    ) -> Result<Option<isize>> {
        self.check_vertex(from)?;
        self.check_vertex(to)?;
        if from == to {
            debug!(vertex = from, "ignoring self-loop");
            return Ok(None);
        }

        let existing = self.edges_between(from, to, &data.via_seq1, &data.via_seq2);
        let Some(merged) = merge_edges(&existing, data.clone(), self.merge_epsilon) else {
            return Ok(None);
        };

        self.adjacency[from as usize]
            .retain(|e| !(e.neighbor == to && e.data.same_key(&data)));
        let mirrored = data.reversed();
        self.adjacency[to as usize]
            .retain(|e| !(e.neighbor == from && e.data.same_key(&mirrored)));

        let delta = merged.len() as isize - existing.len() as isize;
        for edge in merged {
            self.adjacency[to as usize].push(Edge {
                neighbor: from,
                data: edge.reversed(),
            });
            self.adjacency[from as usize].push(Edge {
                neighbor: to,
                data: edge,
            });
        }
        Ok(Some(delta))
    }

    /// Strip the copies of `vertex`'s edges held by its neighbours. The
    /// vertex keeps its own list.
    pub fn detach(&mut self, vertex: VertexId) -> Result<()> {
        self.check_vertex(vertex)?;

        let mut neighbors: Vec<VertexId> =
            self.adjacency[vertex as usize].iter().map(|e| e.neighbor).collect();
        neighbors.sort_unstable();
        neighbors.dedup();

        for n in neighbors {
            self.adjacency[n as usize].retain(|e| e.neighbor != vertex);
        }
        Ok(())
    }

    /// Assign the next rank to `vertex` and return it
    pub fn mark_contracted(&mut self, vertex: VertexId) -> Result<u32> {
        self.check_vertex(vertex)?;
        if let Some(rank) = self.ranks[vertex as usize] {
            return Ok(rank);
        }
        let rank = self.next_rank;
        self.ranks[vertex as usize] = Some(rank);
        self.next_rank += 1;
        Ok(rank)
    }

    #[inline]
    pub fn is_contracted(&self, vertex: VertexId) -> bool {
        self.ranks[vertex as usize].is_some()
    }

    pub fn rank(&self, vertex: VertexId) -> Option<u32> {
        self.ranks[vertex as usize]
    }

    pub fn contracted_count(&self) -> u32 {
        self.next_rank
    }

    pub fn uncontracted(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.vertex_count()).filter(|&v| !self.is_contracted(v))
    }

    /// Freeze into an immutable CSR hierarchy. Uncontracted vertices keep
    /// every edge they still hold and get no rank.
    pub fn into_hierarchy(self) -> Result<Hierarchy> {
        let n = self.adjacency.len();
        let total: usize = self.adjacency.iter().map(Vec::len).sum();
        let words: usize = self
            .adjacency
            .iter()
            .flatten()
            .map(|e| encoded_len(&e.data))
            .sum();

        let mut offsets = Vec::with_capacity(n + 1);
        let mut neighbors = Vec::with_capacity(total);
        let mut payload_offsets = Vec::with_capacity(total + 1);
        let mut payloads = Vec::with_capacity(words);

        offsets.push(0u32);
        payload_offsets.push(0u32);
        for list in &self.adjacency {
            for edge in list {
                neighbors.push(edge.neighbor);
                encode(&edge.data, &mut payloads)?;
                payload_offsets.push(payloads.len() as u32);
            }
            offsets.push(neighbors.len() as u32);
        }

        let ranks = self
            .ranks
            .iter()
            .map(|r| r.unwrap_or(NO_VERTEX))
            .collect();

        Hierarchy::from_parts(
            self.edge_based,
            ranks,
            offsets,
            neighbors,
            payload_offsets,
            payloads,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeList;

    fn path_graph() -> ContractionGraph {
        let mut g = ContractionGraph::new(3, false);
        g.add_edge(0, 1, EdgeData::original(1.0, Direction::Both)).unwrap();
        g.add_edge(1, 2, EdgeData::original(2.0, Direction::Forward)).unwrap();
        g
    }

    #[test]
    fn test_edges_stored_at_both_endpoints() {
        let g = path_graph();
        assert_eq!(g.degree(1), 2);
        assert_eq!(g.edges(2)[0].neighbor, 1);
        assert_eq!(g.edges(2)[0].data.direction, Direction::Backward);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_add_or_update_merges_and_mirrors() {
        let mut g = ContractionGraph::new(2, false);
        assert_eq!(
            g.add_or_update_edge(0, 1, EdgeData::original(3.0, Direction::Forward)).unwrap(),
            Some(1)
        );
        assert_eq!(
            g.add_or_update_edge(1, 0, EdgeData::original(3.0, Direction::Forward)).unwrap(),
            Some(0)
        );
        assert_eq!(g.edges(0).len(), 1);
        assert_eq!(g.edges(0)[0].data.direction, Direction::Both);
        assert_eq!(g.edges(1)[0].data.direction, Direction::Both);

        // Worse edge is a no-op
        assert_eq!(
            g.add_or_update_edge(0, 1, EdgeData::original(9.0, Direction::Both)).unwrap(),
            None
        );
    }

    #[test]
    fn test_distinct_sequences_coexist() {
        let mut g = ContractionGraph::new(3, true);
        g.add_or_update_edge(0, 1, EdgeData::shortcut(2.0, Direction::Forward, 2, vec![2], vec![2]))
            .unwrap();
        g.add_or_update_edge(0, 1, EdgeData::original(5.0, Direction::Forward))
            .unwrap();
        assert_eq!(g.edges(0).len(), 2);
        assert_eq!(g.edges(1).len(), 2);
    }

    #[test]
    fn test_remove_edge() {
        let mut g = path_graph();
        assert_eq!(g.remove_edge(1, 0).unwrap(), 1);
        assert_eq!(g.degree(0), 0);
        assert_eq!(g.degree(1), 1);
    }

    #[test]
    fn test_detach_keeps_own_list() {
        let mut g = path_graph();
        g.detach(1).unwrap();
        g.mark_contracted(1).unwrap();

        assert_eq!(g.degree(1), 2);
        assert_eq!(g.degree(0), 0);
        assert_eq!(g.degree(2), 0);
        assert_eq!(g.rank(1), Some(0));
    }

    #[test]
    fn test_out_of_range_vertex() {
        let mut g = path_graph();
        assert!(matches!(
            g.add_edge(0, 3, EdgeData::original(1.0, Direction::Both)),
            Err(Error::VertexOutOfRange { vertex: 3, vertex_count: 3 })
        ));
    }

    #[test]
    fn test_from_provider_applies_cost() {
        let mut base = EdgeList::new(3);
        base.push(0, 1, 4.0, Direction::Forward).unwrap();
        base.push(1, 2, 1.0, Direction::Both).unwrap();

        let g = ContractionGraph::from_provider(&base, false, |e| {
            (e.weight > 2.0).then_some((e.weight * 2.0, e.direction))
        })
        .unwrap();

        assert_eq!(g.degree(0), 1);
        assert_eq!(g.edges(0)[0].data.weight, 8.0);
        assert_eq!(g.degree(2), 0);
    }

    #[test]
    fn test_into_hierarchy_preserves_edges() {
        let mut g = path_graph();
        for v in 0..3 {
            g.detach(v).unwrap();
            g.mark_contracted(v).unwrap();
        }
        let h = g.into_hierarchy().unwrap();
        assert_eq!(h.vertex_count(), 3);
        assert_eq!(h.edge_count(), 2);
        assert_eq!(h.rank(2), Some(2));
    }
}
