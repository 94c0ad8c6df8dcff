//! Shortcut unpacking
//!
//! A shortcut `a -> b` via `v` is stored with `v`'s upward edges towards
//! `a` and `b` still present in `v`'s list. Expansion replaces the shortcut
//! by those two halves until only original edges remain. An explicit stack
//! keeps deep hierarchies from exhausting the call stack.

use butterfly_common::{Error, Result};
use tracing::warn;

use crate::graph::{DirectedEdgeId, EdgeView, Hierarchy, VertexId};

/// Endpoints of `edge` in traversal order
pub fn endpoints(hierarchy: &Hierarchy, edge: DirectedEdgeId) -> (VertexId, VertexId) {
    let owner = hierarchy.owner(edge.edge());
    let neighbor = hierarchy.neighbor(edge.edge());
    if edge.is_reversed() {
        (neighbor, owner)
    } else {
        (owner, neighbor)
    }
}

/// Expand one hierarchy edge into original vertices (starting with its
/// tail) and original edges.
pub fn unpack_edge(
    hierarchy: &Hierarchy,
    edge: DirectedEdgeId,
) -> Result<(Vec<VertexId>, Vec<DirectedEdgeId>)> {
    let (from, to) = endpoints(hierarchy, edge);
    let mut vertices = vec![from];
    let mut edges = Vec::new();
    unpack_hop(hierarchy, from, to, edge, &mut vertices, &mut edges)?;
    Ok((vertices, edges))
}

/// Expand the hop `from -> to` over `edge`, appending every vertex after
/// `from` and every original edge.
pub(crate) fn unpack_hop(
    hierarchy: &Hierarchy,
    from: VertexId,
    to: VertexId,
    edge: DirectedEdgeId,
    vertices: &mut Vec<VertexId>,
    edges: &mut Vec<DirectedEdgeId>,
) -> Result<()> {
    let mut stack = vec![(from, to, edge)];

    while let Some((a, b, id)) = stack.pop() {
        let view = hierarchy.edge(id.edge())?;
        match view.contracted_via {
            None => {
                vertices.push(b);
                edges.push(id);
            }
            Some(via) => {
                let (left, right) = split_shortcut(hierarchy, a, b, id, via, &view)?;
                // Right half goes first so the left half pops next
                stack.push((via, b, right));
                stack.push((a, via, left));
            }
        }
    }
    Ok(())
}

/// Find the two halves of shortcut `a -> b` via `via` in `via`'s list
fn split_shortcut(
    hierarchy: &Hierarchy,
    a: VertexId,
    b: VertexId,
    id: DirectedEdgeId,
    via: VertexId,
    view: &EdgeView<'_>,
) -> Result<(DirectedEdgeId, DirectedEdgeId)> {
    let failed = || Error::UnpackFailed { from: a, to: b, via };

    // Original vertices right after `a` and right before `b` on the shortcut
    let (after_a, before_b) = if id.is_reversed() {
        (view.near_neighbor(b), view.near_owner(a))
    } else {
        (view.near_owner(b), view.near_neighbor(a))
    };
    let check_sequences = hierarchy.is_edge_based();

    let mut lefts = Vec::new();
    let mut rights = Vec::new();
    for e in hierarchy.edge_range(via) {
        let n = hierarchy.neighbor(e);
        if n != a && n != b {
            continue;
        }
        let half = hierarchy.edge(e)?;
        // Stored at `via`: backward means n -> via, forward means via -> n
        let near = half.near_neighbor(via);
        if n == a && half.direction.backward() && (!check_sequences || near == after_a) {
            lefts.push((DirectedEdgeId::new(e, true), half.weight));
        }
        if n == b && half.direction.forward() && (!check_sequences || near == before_b) {
            rights.push((DirectedEdgeId::new(e, false), half.weight));
        }
    }

    let mut best: Option<(f32, DirectedEdgeId, DirectedEdgeId)> = None;
    for &(l, lw) in &lefts {
        for &(r, rw) in &rights {
            let diff = (lw + rw - view.weight).abs();
            if best.map_or(true, |(d, _, _)| diff < d) {
                best = Some((diff, l, r));
            }
        }
    }

    let (diff, left, right) = best.ok_or_else(failed)?;
    if diff > 1e-3 * view.weight.max(1.0) {
        warn!(a, b, via, diff, "shortcut halves do not add up to its weight");
    }
    Ok((left, right))
}
