use crate::r#type::IndexableNum;
use crate::result_set::{Neighbor, ResultSet};

/// Every candidate within a fixed radius, without a count limit.
///
/// The set is always full and its worst distance is the radius itself.
#[derive(Debug, Clone)]
pub struct RadiusResultSet<N: IndexableNum> {
    radius: N,
    entries: Vec<Neighbor<N>>,
}

impl<N: IndexableNum> RadiusResultSet<N> {
    /// An empty set of the candidates within `radius`.
    pub fn new(radius: N) -> Self {
        Self {
            radius,
            entries: vec![],
        }
    }

    /// The largest distance accepted.
    pub fn radius(&self) -> N {
        self.radius
    }
}

impl<N: IndexableNum> ResultSet<N> for RadiusResultSet<N> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_full(&self) -> bool {
        true
    }

    fn add_point(&mut self, dist: N, index: usize) {
        if self.radius > N::zero() && dist <= self.radius {
            self.entries.push(Neighbor::new(index, dist));
        }
    }

    fn worst_dist(&self) -> N {
        self.radius
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn neighbors(&self) -> Vec<Neighbor<N>> {
        let mut sorted = self.entries.clone();
        sorted.sort();
        sorted
    }
}
