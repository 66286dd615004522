use std::collections::{BTreeSet, HashSet};

use crate::r#type::IndexableNum;
use crate::result_set::{Neighbor, ResultSet};

/// Ordered neighbors plus the set of ids they hold, so that a point offered again is
/// ignored regardless of its distance.
#[derive(Debug, Clone)]
struct UniqueEntries<N: IndexableNum> {
    ordered: BTreeSet<Neighbor<N>>,
    members: HashSet<usize>,
}

impl<N: IndexableNum> UniqueEntries<N> {
    fn new() -> Self {
        Self {
            ordered: BTreeSet::new(),
            members: HashSet::new(),
        }
    }

    fn len(&self) -> usize {
        self.ordered.len()
    }

    fn contains(&self, index: usize) -> bool {
        self.members.contains(&index)
    }

    fn worst(&self) -> Option<N> {
        self.ordered.last().map(|neighbor| neighbor.distance)
    }

    /// Insert a candidate and evict the farthest entries above `capacity`.
    fn insert(&mut self, neighbor: Neighbor<N>, capacity: Option<usize>) {
        self.members.insert(neighbor.index);
        self.ordered.insert(neighbor);
        if let Some(capacity) = capacity {
            while self.ordered.len() > capacity {
                if let Some(evicted) = self.ordered.pop_last() {
                    self.members.remove(&evicted.index);
                }
            }
        }
    }

    fn clear(&mut self) {
        self.ordered.clear();
        self.members.clear();
    }

    fn to_vec(&self) -> Vec<Neighbor<N>> {
        self.ordered.iter().copied().collect()
    }
}

/// The k nearest distinct point ids.
#[derive(Debug, Clone)]
pub struct KNNUniqueResultSet<N: IndexableNum> {
    capacity: usize,
    entries: UniqueEntries<N>,
}

impl<N: IndexableNum> KNNUniqueResultSet<N> {
    /// An empty set keeping the `capacity` nearest distinct ids.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: UniqueEntries::new(),
        }
    }

    /// The maximum number of neighbors kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<N: IndexableNum> ResultSet<N> for KNNUniqueResultSet<N> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    fn add_point(&mut self, dist: N, index: usize) {
        if self.capacity == 0 || dist >= self.worst_dist() || self.entries.contains(index) {
            return;
        }
        self.entries
            .insert(Neighbor::new(index, dist), Some(self.capacity));
    }

    fn worst_dist(&self) -> N {
        match self.entries.worst() {
            Some(worst) if self.is_full() => worst,
            _ => N::infinity(),
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn neighbors(&self) -> Vec<Neighbor<N>> {
        self.entries.to_vec()
    }
}

/// Every distinct point id within a radius.
#[derive(Debug, Clone)]
pub struct RadiusUniqueResultSet<N: IndexableNum> {
    radius: N,
    entries: UniqueEntries<N>,
}

impl<N: IndexableNum> RadiusUniqueResultSet<N> {
    /// An empty set of the distinct ids within `radius`.
    pub fn new(radius: N) -> Self {
        Self {
            radius,
            entries: UniqueEntries::new(),
        }
    }

    /// The largest distance accepted.
    pub fn radius(&self) -> N {
        self.radius
    }
}

impl<N: IndexableNum> ResultSet<N> for RadiusUniqueResultSet<N> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_full(&self) -> bool {
        true
    }

    fn add_point(&mut self, dist: N, index: usize) {
        if self.radius <= N::zero() || dist > self.radius || self.entries.contains(index) {
            return;
        }
        self.entries.insert(Neighbor::new(index, dist), None);
    }

    fn worst_dist(&self) -> N {
        self.radius
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn neighbors(&self) -> Vec<Neighbor<N>> {
        self.entries.to_vec()
    }
}

/// At most k distinct point ids, all within a radius.
#[derive(Debug, Clone)]
pub struct KNNRadiusUniqueResultSet<N: IndexableNum> {
    capacity: usize,
    radius: N,
    entries: UniqueEntries<N>,
}

impl<N: IndexableNum> KNNRadiusUniqueResultSet<N> {
    /// An empty set keeping at most `capacity` distinct ids within `radius`.
    pub fn new(capacity: usize, radius: N) -> Self {
        Self {
            capacity,
            radius,
            entries: UniqueEntries::new(),
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

impl<N: IndexableNum> ResultSet<N> for KNNRadiusUniqueResultSet<N> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_full(&self) -> bool {
        true
    }

    fn add_point(&mut self, dist: N, index: usize) {
        if self.capacity == 0
            || self.radius <= N::zero()
            || dist > self.radius
            || self.entries.contains(index)
        {
            return;
        }
        if self.entries.len() == self.capacity && dist >= self.worst_dist() {
            return;
        }
        self.entries
            .insert(Neighbor::new(index, dist), Some(self.capacity));
    }

    fn worst_dist(&self) -> N {
        match self.entries.worst() {
            Some(worst) if self.entries.len() == self.capacity => worst,
            _ => self.radius,
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn neighbors(&self) -> Vec<Neighbor<N>> {
        self.entries.to_vec()
    }
}

#[cfg(test)]
mod test {
    use crate::result_set::test::{feed, ids, is_ascending};
    use crate::result_set::*;

    #[test]
    fn knn_unique_drops_repeated_ids() {
        let mut set = KNNUniqueResultSet::new(3);
        feed(
            &mut set,
            &[(3.0, 3), (1.0, 1), (1.5, 1), (2.0, 2), (0.5, 3), (4.0, 4)],
        );
        // the first offer of id 3 is kept, the closer repeat is ignored
        assert_eq!(ids(&set), vec![1, 2, 3]);
        assert!(is_ascending(&set.neighbors()));
        assert_eq!(set.worst_dist(), 3.0);
    }

    #[test]
    fn evicted_ids_may_return() {
        let mut set = KNNUniqueResultSet::new(2);
        feed(&mut set, &[(1.0, 1), (2.0, 2), (0.5, 3)]);
        assert_eq!(ids(&set), vec![3, 1]);
        set.add_point(0.1, 2);
        assert_eq!(ids(&set), vec![2, 3]);
    }

    #[test]
    fn radius_unique() {
        let mut set = RadiusUniqueResultSet::new(2.0);
        feed(&mut set, &[(1.0, 1), (1.0, 1), (2.5, 2), (2.0, 3), (0.0, 1)]);
        assert_eq!(ids(&set), vec![1, 3]);
        assert_eq!(set.worst_dist(), 2.0);

        let mut empty = RadiusUniqueResultSet::new(0.0);
        feed(&mut empty, &[(0.0, 0)]);
        assert!(empty.is_empty());
    }

    #[test]
    fn knn_radius_unique() {
        let mut set = KNNRadiusUniqueResultSet::new(2, 3.0);
        assert_eq!(set.worst_dist(), 3.0);
        feed(
            &mut set,
            &[(2.5, 1), (4.0, 9), (2.5, 1), (1.0, 2), (0.5, 3), (0.2, 2)],
        );
        assert_eq!(ids(&set), vec![3, 2]);
        assert_eq!(set.worst_dist(), 1.0);

        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.worst_dist(), 3.0);
    }
}
