//! Parallel edge merging
//!
//! All edges between one ordered vertex pair that share the same via
//! sequences compete. After a merge the pair holds either a single `Both`
//! edge or at most one `Forward` and one `Backward` edge.

use std::cmp::Ordering;

use super::{Direction, EdgeData, VertexId};

/// Best traversal found for one direction while merging
#[derive(Debug, Clone, Copy)]
struct Best {
    weight: f32,
    via: Option<VertexId>,
    from_candidate: bool,
}

impl Best {
    /// Lower weight wins, then stored edges over the candidate, then
    /// `None` via before any vertex, then the lower via id.
    fn cmp_key(&self, other: &Best) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then(self.from_candidate.cmp(&other.from_candidate))
            .then_with(|| via_order(self.via, other.via))
    }
}

fn via_order(a: Option<VertexId>, b: Option<VertexId>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y),
    }
}

fn keep_better(slot: &mut Option<Best>, next: Best) {
    match slot {
        Some(current) if current.cmp_key(&next) != Ordering::Greater => {}
        _ => *slot = Some(next),
    }
}

/// Merge `candidate` into the `existing` edges of its pair.
///
/// Every element of `existing` must share the candidate's via sequences.
/// Returns `None` when the candidate changes nothing, otherwise the full
/// replacement list for the pair. Forward and backward winners collapse into
/// one `Both` edge when their weights differ by at most `epsilon` and they
/// share the same via vertex; the merged weight is the larger of the two.
pub fn merge_edges(
    existing: &[EdgeData],
    candidate: EdgeData,
    epsilon: f32,
) -> Option<Vec<EdgeData>> {
    if existing.is_empty() {
        return Some(vec![candidate]);
    }

    let mut forward: Option<Best> = None;
    let mut backward: Option<Best> = None;

    let offers = existing
        .iter()
        .map(|e| (e, false))
        .chain(std::iter::once((&candidate, true)));
    for (edge, from_candidate) in offers {
        let best = Best {
            weight: edge.weight,
            via: edge.contracted_via,
            from_candidate,
        };
        if edge.direction.forward() {
            keep_better(&mut forward, best);
        }
        if edge.direction.backward() {
            keep_better(&mut backward, best);
        }
    }

    let build = |best: Best, weight: f32, direction: Direction| EdgeData {
        weight,
        direction,
        contracted_via: best.via,
        via_seq1: candidate.via_seq1.clone(),
        via_seq2: candidate.via_seq2.clone(),
    };

    let merged = match (forward, backward) {
        (Some(f), Some(b)) if f.via == b.via && (f.weight - b.weight).abs() <= epsilon => {
            vec![build(f, f.weight.max(b.weight), Direction::Both)]
        }
        (Some(f), Some(b)) => vec![
            build(f, f.weight, Direction::Forward),
            build(b, b.weight, Direction::Backward),
        ],
        (Some(f), None) => vec![build(f, f.weight, Direction::Forward)],
        (None, Some(b)) => vec![build(b, b.weight, Direction::Backward)],
        // Every Direction value is forward or backward capable
        (None, None) => return None,
    };

    if same_edges(existing, &merged) {
        None
    } else {
        Some(merged)
    }
}

fn same_edges(existing: &[EdgeData], merged: &[EdgeData]) -> bool {
    existing.len() == merged.len() && merged.iter().all(|m| existing.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(weight: f32, direction: Direction) -> EdgeData {
        EdgeData::original(weight, direction)
    }

    fn via(weight: f32, direction: Direction, v: VertexId) -> EdgeData {
        EdgeData::shortcut(weight, direction, v, vec![], vec![])
    }

    #[test]
    fn test_insert_into_empty_pair() {
        let merged = merge_edges(&[], edge(3.0, Direction::Forward), 0.0).unwrap();
        assert_eq!(merged, vec![edge(3.0, Direction::Forward)]);
    }

    #[test]
    fn test_same_direction_not_better_is_noop() {
        let existing = [edge(3.0, Direction::Forward)];
        assert!(merge_edges(&existing, via(3.0, Direction::Forward, 0), 0.0).is_none());
        assert!(merge_edges(&existing, via(4.0, Direction::Forward, 0), 0.0).is_none());
    }

    #[test]
    fn test_same_direction_better_replaces() {
        let existing = [edge(3.0, Direction::Forward)];
        let merged = merge_edges(&existing, via(2.0, Direction::Forward, 5), 0.0).unwrap();
        assert_eq!(merged, vec![via(2.0, Direction::Forward, 5)]);
    }

    #[test]
    fn test_opposite_directions_collapse_into_both() {
        let existing = [edge(3.0, Direction::Forward)];
        let merged = merge_edges(&existing, edge(3.0, Direction::Backward), 0.0).unwrap();
        assert_eq!(merged, vec![edge(3.0, Direction::Both)]);
    }

    #[test]
    fn test_opposite_directions_with_different_weights_stay_split() {
        let existing = [edge(3.0, Direction::Forward)];
        let merged = merge_edges(&existing, edge(4.0, Direction::Backward), 0.0).unwrap();
        assert_eq!(
            merged,
            vec![edge(3.0, Direction::Forward), edge(4.0, Direction::Backward)]
        );
    }

    #[test]
    fn test_better_one_way_splits_both_edge() {
        let existing = [edge(5.0, Direction::Both)];
        let merged = merge_edges(&existing, via(4.0, Direction::Forward, 2), 0.0).unwrap();
        assert_eq!(
            merged,
            vec![via(4.0, Direction::Forward, 2), edge(5.0, Direction::Backward)]
        );
    }

    #[test]
    fn test_epsilon_merge_takes_max_weight() {
        let existing = [edge(10.0, Direction::Forward)];
        let merged = merge_edges(&existing, edge(10.05, Direction::Backward), 0.1).unwrap();
        assert_eq!(merged, vec![edge(10.05, Direction::Both)]);
    }

    #[test]
    fn test_different_via_never_collapses() {
        let existing = [via(3.0, Direction::Forward, 1)];
        let merged = merge_edges(&existing, via(3.0, Direction::Backward, 2), 0.0).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_result_independent_of_scan_order() {
        let a = [via(4.0, Direction::Forward, 9), edge(4.0, Direction::Backward)];
        let b = [edge(4.0, Direction::Backward), via(4.0, Direction::Forward, 9)];
        let candidate = via(2.0, Direction::Backward, 1);

        let mut left = merge_edges(&a, candidate.clone(), 0.0).unwrap();
        let mut right = merge_edges(&b, candidate, 0.0).unwrap();
        left.sort_by_key(|e| e.direction);
        right.sort_by_key(|e| e.direction);
        assert_eq!(left, right);
    }

    #[test]
    fn test_no_edges_are_lost() {
        // A cheaper Both replaces a one-way pair entirely
        let existing = [edge(3.0, Direction::Forward), edge(4.0, Direction::Backward)];
        let merged = merge_edges(&existing, via(2.0, Direction::Both, 7), 0.0).unwrap();
        assert_eq!(merged, vec![via(2.0, Direction::Both, 7)]);
    }
}
