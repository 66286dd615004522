use std::collections::BinaryHeap;

use crate::r#type::IndexableNum;
use crate::result_set::{write_neighbors, Neighbor, ResultSet};

/// The k nearest candidates, kept in an insertion-sorted array.
///
/// No duplicate detection: the traversal must offer each point at most once.
#[derive(Debug, Clone)]
pub struct KNNSimpleResultSet<N: IndexableNum> {
    capacity: usize,
    entries: Vec<Neighbor<N>>,
    worst_distance: N,
}

impl<N: IndexableNum> KNNSimpleResultSet<N> {
    /// An empty set keeping the `capacity` nearest candidates.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
            worst_distance: N::infinity(),
        }
    }

    /// The maximum number of neighbors kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<N: IndexableNum> ResultSet<N> for KNNSimpleResultSet<N> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    fn add_point(&mut self, dist: N, index: usize) {
        if self.capacity == 0 || dist >= self.worst_distance {
            return;
        }

        // open a slot at the end, or overwrite the current worst when full
        if self.entries.len() < self.capacity {
            self.entries.push(Neighbor::new(index, dist));
        }
        let mut i = self.entries.len() - 1;
        while i > 0 && self.entries[i - 1].distance > dist {
            self.entries[i] = self.entries[i - 1];
            i -= 1;
        }
        self.entries[i] = Neighbor::new(index, dist);

        if self.entries.len() == self.capacity {
            self.worst_distance = self.entries[self.capacity - 1].distance;
        }
    }

    fn worst_dist(&self) -> N {
        self.worst_distance
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.worst_distance = N::infinity();
    }

    fn neighbors(&self) -> Vec<Neighbor<N>> {
        self.entries.clone()
    }

    fn copy(&self, indices: &mut [usize], dists: &mut [N]) -> usize {
        write_neighbors(self.entries.iter(), indices, dists)
    }
}

/// The k nearest candidates, kept sorted, ignoring a point offered twice at the same
/// distance.
#[derive(Debug, Clone)]
pub struct KNNResultSet<N: IndexableNum> {
    capacity: usize,
    entries: Vec<Neighbor<N>>,
}

impl<N: IndexableNum> KNNResultSet<N> {
    /// An empty set keeping the `capacity` nearest candidates.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity + 1),
        }
    }

    /// The maximum number of neighbors kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<N: IndexableNum> ResultSet<N> for KNNResultSet<N> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    fn add_point(&mut self, dist: N, index: usize) {
        if self.capacity == 0 || dist >= self.worst_dist() {
            return;
        }

        // everything before `pos` is at most as far as the candidate
        let pos = self.entries.partition_point(|entry| entry.distance <= dist);
        if self.entries[..pos]
            .iter()
            .rev()
            .take_while(|entry| entry.distance == dist)
            .any(|entry| entry.index == index)
        {
            return;
        }

        self.entries.insert(pos, Neighbor::new(index, dist));
        if self.entries.len() > self.capacity {
            self.entries.pop();
        }
    }

    fn worst_dist(&self) -> N {
        match self.entries.last() {
            Some(last) if self.is_full() => last.distance,
            _ => N::infinity(),
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn neighbors(&self) -> Vec<Neighbor<N>> {
        self.entries.clone()
    }

    fn copy(&self, indices: &mut [usize], dists: &mut [N]) -> usize {
        write_neighbors(self.entries.iter(), indices, dists)
    }
}

/// The k nearest candidates, kept in a max-heap.
///
/// Insertion is `O(log k)`; the output is sorted when it is read.
#[derive(Debug, Clone)]
pub struct KNNResultSet2<N: IndexableNum> {
    capacity: usize,
    heap: BinaryHeap<Neighbor<N>>,
}

impl<N: IndexableNum> KNNResultSet2<N> {
    /// An empty heap keeping the `capacity` nearest candidates.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    /// The maximum number of neighbors kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<N: IndexableNum> ResultSet<N> for KNNResultSet2<N> {
    fn len(&self) -> usize {
        self.heap.len()
    }

    fn is_full(&self) -> bool {
        self.heap.len() == self.capacity
    }

    fn add_point(&mut self, dist: N, index: usize) {
        push_bounded(&mut self.heap, self.capacity, Neighbor::new(index, dist));
    }

    fn worst_dist(&self) -> N {
        match self.heap.peek() {
            Some(top) if self.is_full() => top.distance,
            _ => N::infinity(),
        }
    }

    fn clear(&mut self) {
        self.heap.clear();
    }

    fn neighbors(&self) -> Vec<Neighbor<N>> {
        self.heap.clone().into_sorted_vec()
    }
}

/// At most k candidates, all within a radius.
#[derive(Debug, Clone)]
pub struct KNNRadiusResultSet<N: IndexableNum> {
    capacity: usize,
    radius: N,
    heap: BinaryHeap<Neighbor<N>>,
}

impl<N: IndexableNum> KNNRadiusResultSet<N> {
    /// An empty set keeping at most `capacity` candidates within `radius`.
    pub fn new(capacity: usize, radius: N) -> Self {
        Self {
            capacity,
            radius,
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    /// The maximum number of neighbors kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The largest distance accepted.
    pub fn radius(&self) -> N {
        self.radius
    }
}

impl<N: IndexableNum> ResultSet<N> for KNNRadiusResultSet<N> {
    fn len(&self) -> usize {
        self.heap.len()
    }

    fn is_full(&self) -> bool {
        true
    }

    fn add_point(&mut self, dist: N, index: usize) {
        if self.radius <= N::zero() || dist > self.radius {
            return;
        }
        push_bounded(&mut self.heap, self.capacity, Neighbor::new(index, dist));
    }

    fn worst_dist(&self) -> N {
        match self.heap.peek() {
            Some(top) if self.heap.len() == self.capacity => top.distance,
            _ => self.radius,
        }
    }

    fn clear(&mut self) {
        self.heap.clear();
    }

    fn neighbors(&self) -> Vec<Neighbor<N>> {
        self.heap.clone().into_sorted_vec()
    }
}

/// Push onto a max-heap holding at most `capacity` entries. A full heap only accepts a
/// candidate strictly closer than its current worst entry.
#[inline]
fn push_bounded<N: IndexableNum>(
    heap: &mut BinaryHeap<Neighbor<N>>,
    capacity: usize,
    candidate: Neighbor<N>,
) {
    if capacity == 0 {
        return;
    }
    if heap.len() < capacity {
        heap.push(candidate);
    } else if let Some(mut top) = heap.peek_mut() {
        if candidate.distance < top.distance {
            *top = candidate;
        }
    }
}

#[cfg(test)]
mod test {
    use crate::result_set::test::{feed, ids, is_ascending};
    use crate::result_set::*;

    const CANDIDATES: [(f64, usize); 8] = [
        (5.0, 5),
        (1.0, 1),
        (7.0, 7),
        (3.0, 3),
        (0.5, 0),
        (9.0, 9),
        (2.0, 2),
        (4.0, 4),
    ];

    #[test]
    fn simple_keeps_k_best() {
        let mut set = KNNSimpleResultSet::new(3);
        assert_eq!(set.worst_dist(), f64::INFINITY);
        feed(&mut set, &CANDIDATES);
        assert!(set.is_full());
        assert_eq!(ids(&set), vec![0, 1, 2]);
        assert_eq!(set.worst_dist(), 2.0);
    }

    #[test]
    fn all_knn_variants_agree() {
        let mut simple = KNNSimpleResultSet::new(4);
        let mut sorted = KNNResultSet::new(4);
        let mut heap = KNNResultSet2::new(4);
        feed(&mut simple, &CANDIDATES);
        feed(&mut sorted, &CANDIDATES);
        feed(&mut heap, &CANDIDATES);

        assert_eq!(simple.neighbors(), sorted.neighbors());
        assert_eq!(sorted.neighbors(), heap.neighbors());
        assert!(is_ascending(&heap.neighbors()));
        assert_eq!(heap.worst_dist(), 3.0);
    }

    #[test]
    fn first_found_wins_ties_at_the_boundary() {
        let mut heap = KNNResultSet2::new(2);
        feed(&mut heap, &[(1.0, 10), (2.0, 20), (2.0, 30)]);
        assert_eq!(ids(&heap), vec![10, 20]);

        let mut simple = KNNSimpleResultSet::new(2);
        feed(&mut simple, &[(1.0, 10), (2.0, 20), (2.0, 30)]);
        assert_eq!(ids(&simple), vec![10, 20]);
    }

    #[test]
    fn sorted_set_ignores_repeated_candidates() {
        let mut set = KNNResultSet::new(3);
        feed(&mut set, &[(1.0, 1), (1.0, 1), (2.0, 2), (1.0, 1)]);
        assert_eq!(ids(&set), vec![1, 2]);
        assert!(!set.is_full());
    }

    #[test]
    fn zero_capacity_accepts_nothing() {
        let mut simple = KNNSimpleResultSet::new(0);
        let mut sorted = KNNResultSet::new(0);
        let mut heap = KNNResultSet2::new(0);
        feed(&mut simple, &CANDIDATES);
        feed(&mut sorted, &CANDIDATES);
        feed(&mut heap, &CANDIDATES);
        assert!(simple.is_empty() && sorted.is_empty() && heap.is_empty());

        // an empty set never narrows the search bound
        assert_eq!(simple.worst_dist(), f64::INFINITY);
        assert_eq!(sorted.worst_dist(), f64::INFINITY);
        assert_eq!(heap.worst_dist(), f64::INFINITY);

        let mut capped = KNNRadiusResultSet::new(0, 4.5);
        feed(&mut capped, &CANDIDATES);
        assert!(capped.is_empty());
        assert_eq!(capped.worst_dist(), 4.5);
    }

    #[test]
    fn knn_radius_caps_both_ways() {
        let mut set = KNNRadiusResultSet::new(3, 4.5);
        assert_eq!(set.worst_dist(), 4.5);
        feed(&mut set, &CANDIDATES);
        assert_eq!(ids(&set), vec![0, 1, 2]);
        assert_eq!(set.worst_dist(), 2.0);

        let mut set = KNNRadiusResultSet::new(10, 2.0);
        feed(&mut set, &CANDIDATES);
        assert_eq!(ids(&set), vec![0, 1, 2]);
        assert_eq!(set.worst_dist(), 2.0);

        set.clear();
        assert!(set.is_empty());
    }
}
