//! Accumulators that collect candidate neighbors during a traversal.
//!
//! An index offers every candidate it reaches to a [`ResultSet`] and prunes whole branches
//! using [`ResultSet::worst_dist`]. The variants differ in their capacity policy (a fixed
//! `k`, a radius bound, or both) and in whether point ids are deduplicated.

mod knn;
mod radius;
mod unique;

use std::cmp::Ordering;

pub use knn::{KNNRadiusResultSet, KNNResultSet, KNNResultSet2, KNNSimpleResultSet};
pub use radius::RadiusResultSet;
pub use unique::{KNNRadiusUniqueResultSet, KNNUniqueResultSet, RadiusUniqueResultSet};

use crate::r#type::IndexableNum;

/// A found point and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<N: IndexableNum> {
    /// Id of the point in the indexed dataset.
    pub index: usize,
    /// Distance to the query, in the units of the index's metric.
    pub distance: N,
}

impl<N: IndexableNum> Neighbor<N> {
    /// A neighbor with id `index` at `distance` from the query.
    pub fn new(index: usize, distance: N) -> Self {
        Self { index, distance }
    }
}

impl<N: IndexableNum> Eq for Neighbor<N> {}

impl<N: IndexableNum> Ord for Neighbor<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        // We don't allow NaN. This should only panic on NaN
        self.distance
            .partial_cmp(&other.distance)
            .unwrap()
            .then(self.index.cmp(&other.index))
    }
}

impl<N: IndexableNum> PartialOrd for Neighbor<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A bounded or unbounded collection of neighbors, ordered by ascending distance.
pub trait ResultSet<N: IndexableNum> {
    /// The number of neighbors currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`ResultSet::worst_dist`] is a finite bound that can prune branches.
    fn is_full(&self) -> bool;

    /// Offer a candidate. The set decides whether to keep it.
    fn add_point(&mut self, dist: N, index: usize);

    /// Candidates farther than this can no longer enter the set.
    fn worst_dist(&self) -> N;

    /// Forget every held neighbor, keeping the capacity policy.
    fn clear(&mut self);

    /// The held neighbors, ascending by distance.
    fn neighbors(&self) -> Vec<Neighbor<N>>;

    /// Write the best `min(len, indices.len(), dists.len())` neighbors, ascending, and return
    /// how many were written.
    fn copy(&self, indices: &mut [usize], dists: &mut [N]) -> usize {
        let neighbors = self.neighbors();
        write_neighbors(neighbors.iter(), indices, dists)
    }
}

pub(crate) fn write_neighbors<'a, N: IndexableNum + 'a>(
    neighbors: impl Iterator<Item = &'a Neighbor<N>>,
    indices: &mut [usize],
    dists: &mut [N],
) -> usize {
    let mut written = 0;
    for ((neighbor, index), dist) in neighbors.zip(indices.iter_mut()).zip(dists.iter_mut()) {
        *index = neighbor.index;
        *dist = neighbor.distance;
        written += 1;
    }
    written
}
