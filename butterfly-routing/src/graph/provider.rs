//! Base graph input

use butterfly_common::{Error, Result};

use super::{Direction, VertexId};

/// Source network the contraction graph is built from.
///
/// Each edge is reported once, from the vertex it is attached to. The cost
/// function handed to [`ContractionGraph::from_provider`] turns the edge
/// payload into a weight and a direction, or drops the edge.
///
/// [`ContractionGraph::from_provider`]: super::ContractionGraph::from_provider
pub trait BaseGraphProvider {
    type Data;

    fn vertex_count(&self) -> u32;

    fn edges_from(&self, vertex: VertexId) -> impl Iterator<Item = (VertexId, &Self::Data)> + '_;
}

/// One edge of an [`EdgeList`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEdge {
    pub from: VertexId,
    pub to: VertexId,
    pub weight: f32,
    pub direction: Direction,
}

impl InputEdge {
    /// Whether the edge can be walked `from -> to`
    #[inline]
    pub fn forward(&self) -> bool {
        self.direction.forward()
    }

    /// Whether the edge can be walked `to -> from`
    #[inline]
    pub fn backward(&self) -> bool {
        self.direction.backward()
    }
}

/// Simple in-memory network: a list of weighted edges with an incidence index
#[derive(Debug, Clone, Default)]
pub struct EdgeList {
    edges: Vec<InputEdge>,
    /// Edge indices touching each vertex, from either end
    incident: Vec<Vec<u32>>,
    /// Edge indices whose `from` is the vertex
    outgoing: Vec<Vec<u32>>,
}

impl EdgeList {
    pub fn new(vertex_count: u32) -> Self {
        Self {
            edges: Vec::new(),
            incident: vec![Vec::new(); vertex_count as usize],
            outgoing: vec![Vec::new(); vertex_count as usize],
        }
    }

    pub fn from_edges(vertex_count: u32, edges: impl IntoIterator<Item = InputEdge>) -> Result<Self> {
        let mut list = Self::new(vertex_count);
        for e in edges {
            list.push(e.from, e.to, e.weight, e.direction)?;
        }
        Ok(list)
    }

    pub fn push(
        &mut self,
        from: VertexId,
        to: VertexId,
        weight: f32,
        direction: Direction,
    ) -> Result<()> {
        self.check_vertex(from)?;
        self.check_vertex(to)?;
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::InvalidWeight { from, to, weight });
        }

        let idx = self.edges.len() as u32;
        self.edges.push(InputEdge { from, to, weight, direction });
        self.outgoing[from as usize].push(idx);
        self.incident[from as usize].push(idx);
        if from != to {
            self.incident[to as usize].push(idx);
        }
        Ok(())
    }

    pub fn check_vertex(&self, vertex: VertexId) -> Result<()> {
        let vertex_count = self.vertex_count();
        if vertex < vertex_count {
            Ok(())
        } else {
            Err(Error::VertexOutOfRange { vertex, vertex_count })
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.incident.len() as u32
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[InputEdge] {
        &self.edges
    }

    /// Vertices reachable in one step from `vertex`, with the edge weight
    pub fn successors(&self, vertex: VertexId) -> impl Iterator<Item = (VertexId, f32)> + '_ {
        self.incident[vertex as usize].iter().filter_map(move |&i| {
            let e = &self.edges[i as usize];
            if e.from == vertex && e.forward() {
                Some((e.to, e.weight))
            } else if e.to == vertex && e.backward() {
                Some((e.from, e.weight))
            } else {
                None
            }
        })
    }

    /// Distinct vertices sharing an edge with `vertex`
    pub fn neighbors(&self, vertex: VertexId) -> Vec<VertexId> {
        let mut out: Vec<VertexId> = self.incident[vertex as usize]
            .iter()
            .map(|&i| {
                let e = &self.edges[i as usize];
                if e.from == vertex {
                    e.to
                } else {
                    e.from
                }
            })
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

impl BaseGraphProvider for EdgeList {
    type Data = InputEdge;

    fn vertex_count(&self) -> u32 {
        EdgeList::vertex_count(self)
    }

    fn edges_from(&self, vertex: VertexId) -> impl Iterator<Item = (VertexId, &InputEdge)> + '_ {
        self.outgoing[vertex as usize].iter().map(move |&i| {
            let e = &self.edges[i as usize];
            (e.to, e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successors_respect_direction() {
        let mut g = EdgeList::new(3);
        g.push(0, 1, 1.0, Direction::Forward).unwrap();
        g.push(1, 2, 2.0, Direction::Both).unwrap();

        let from1: Vec<_> = g.successors(1).collect();
        assert_eq!(from1, vec![(2, 2.0)]);

        let from2: Vec<_> = g.successors(2).collect();
        assert_eq!(from2, vec![(1, 2.0)]);
    }

    #[test]
    fn test_rejects_out_of_range_vertex() {
        let mut g = EdgeList::new(2);
        assert!(matches!(
            g.push(0, 5, 1.0, Direction::Both),
            Err(Error::VertexOutOfRange { vertex: 5, .. })
        ));
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut g = EdgeList::new(2);
        assert!(g.push(0, 1, -1.0, Direction::Both).is_err());
        assert!(g.push(0, 1, f32::NAN, Direction::Both).is_err());
    }

    #[test]
    fn test_neighbors_deduplicated() {
        let mut g = EdgeList::new(3);
        g.push(0, 1, 1.0, Direction::Forward).unwrap();
        g.push(1, 0, 1.0, Direction::Forward).unwrap();
        g.push(2, 0, 1.0, Direction::Forward).unwrap();
        assert_eq!(g.neighbors(0), vec![1, 2]);
    }
}
