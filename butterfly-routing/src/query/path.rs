//! Arena of search tree nodes
//!
//! Each frontier records how it reached every state as a node pointing at
//! its parent by index. Walking back from a node yields the hops of a path
//! without recursion or shared ownership.

use crate::graph::{DirectedEdgeId, VertexId};

pub(crate) type PathId = u32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PathNode {
    pub vertex: VertexId,
    pub weight: f32,
    /// Hierarchy edge used to reach this node, `None` for seeds
    pub edge: Option<DirectedEdgeId>,
    pub parent: Option<PathId>,
    /// Edge-based only: original vertex next to `vertex` on the walked side
    pub adjacent: Option<VertexId>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PathArena {
    nodes: Vec<PathNode>,
}

impl PathArena {
    pub fn push(&mut self, node: PathNode) -> PathId {
        let id = self.nodes.len() as PathId;
        self.nodes.push(node);
        id
    }

    #[inline]
    pub fn get(&self, id: PathId) -> &PathNode {
        &self.nodes[id as usize]
    }

    /// Nodes from the seed down to `id`
    pub fn chain(&self, id: PathId) -> Vec<&PathNode> {
        let mut out = Vec::new();
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            let node = self.get(c);
            out.push(node);
            cursor = node.parent;
        }
        out.reverse();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(vertex: VertexId, parent: Option<PathId>) -> PathNode {
        PathNode {
            vertex,
            weight: 0.0,
            edge: None,
            parent,
            adjacent: None,
        }
    }

    #[test]
    fn test_chain_runs_seed_first() {
        let mut arena = PathArena::default();
        let a = arena.push(node(5, None));
        let b = arena.push(node(6, Some(a)));
        let _side = arena.push(node(9, Some(a)));
        let c = arena.push(node(7, Some(b)));

        let vertices: Vec<VertexId> = arena.chain(c).iter().map(|n| n.vertex).collect();
        assert_eq!(vertices, vec![5, 6, 7]);
    }
}
