//! Min-heap entry keyed by an `f32` weight

use std::cmp::Ordering;

/// Entry for `BinaryHeap` that pops the smallest weight first.
///
/// Weights are compared with `total_cmp`; callers never push NaN.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HeapEntry<T> {
    pub weight: f32,
    pub item: T,
}

impl<T> HeapEntry<T> {
    pub fn new(weight: f32, item: T) -> Self {
        Self { weight, item }
    }
}

impl<T> PartialEq for HeapEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.weight.total_cmp(&other.weight) == Ordering::Equal
    }
}

impl<T> Eq for HeapEntry<T> {}

impl<T> PartialOrd for HeapEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for HeapEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: reverse ordering
        other.weight.total_cmp(&self.weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn test_pops_smallest_first() {
        let mut heap = BinaryHeap::new();
        heap.push(HeapEntry::new(3.0, 'c'));
        heap.push(HeapEntry::new(1.0, 'a'));
        heap.push(HeapEntry::new(2.0, 'b'));

        let order: Vec<char> = std::iter::from_fn(|| heap.pop().map(|e| e.item)).collect();
        assert_eq!(order, vec!['a', 'b', 'c']);
    }
}
