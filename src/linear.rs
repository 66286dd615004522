//! A brute-force index that scans every point.

use log::{debug, trace};

use crate::distance::{Distance, L2};
use crate::error::{Result, TreeIndexError};
use crate::matrix::MatrixRef;
use crate::params::SearchParams;
use crate::r#trait::NNIndex;
use crate::r#type::IndexableNum;
use crate::result_set::ResultSet;

/// An exhaustive index over a borrowed point set.
///
/// Every query measures its distance to every active point, so results are always exact.
/// Useful for very small point sets and as a reference for the tree.
#[derive(Debug, Clone)]
pub struct LinearIndex<'a, N: IndexableNum, D: Distance<N> = L2> {
    dataset: MatrixRef<'a, N>,
    distance: D,
    removed: Vec<bool>,
    num_removed: usize,
}

impl<'a, N: IndexableNum> LinearIndex<'a, N, L2> {
    /// Create an index over `dataset` using squared Euclidean distance.
    pub fn new(dataset: MatrixRef<'a, N>) -> Self {
        Self::new_with_distance(dataset, L2)
    }
}

impl<'a, N: IndexableNum, D: Distance<N>> LinearIndex<'a, N, D> {
    /// Create an index over `dataset` using the provided metric.
    pub fn new_with_distance(dataset: MatrixRef<'a, N>, distance: D) -> Self {
        Self {
            dataset,
            distance,
            removed: vec![false; dataset.rows()],
            num_removed: 0,
        }
    }

    /// The indexed points, including removed ones.
    pub fn dataset(&self) -> MatrixRef<'a, N> {
        self.dataset
    }

    /// Replace the indexed points. Points removed from the previous dataset are forgotten.
    pub fn rebuild_with(&mut self, dataset: MatrixRef<'a, N>) {
        self.dataset = dataset;
        self.removed = vec![false; dataset.rows()];
        self.num_removed = 0;
    }

    /// The number of removed points.
    pub fn removed(&self) -> usize {
        self.num_removed
    }
}

impl<N: IndexableNum, D: Distance<N>> NNIndex<N> for LinearIndex<'_, N, D> {
    fn veclen(&self) -> usize {
        self.dataset.cols()
    }

    fn size(&self) -> usize {
        self.dataset.rows() - self.num_removed
    }

    fn used_memory(&self) -> usize {
        self.removed.len()
    }

    fn build_index(&mut self) -> Result<()> {
        debug!("Linear index over {} points", self.size());
        Ok(())
    }

    fn rebuild(&mut self) -> Result<()> {
        self.build_index()
    }

    fn remove(&mut self, index: usize) -> Result<bool> {
        let Some(removed) = self.removed.get_mut(index) else {
            return Err(TreeIndexError::InvalidArgument(format!(
                "Point {} is out of range for an index of {} points.",
                index,
                self.dataset.rows()
            )));
        };
        if *removed {
            return Ok(false);
        }
        *removed = true;
        self.num_removed += 1;
        trace!("Removed point {}", index);
        Ok(true)
    }

    fn find_neighbors<R: ResultSet<N>>(&self, result: &mut R, query: &[N], _params: &SearchParams) {
        assert_eq!(
            query.len(),
            self.veclen(),
            "Query has {} coordinates, the index has {} dimensions.",
            query.len(),
            self.veclen()
        );
        for (id, point) in self.dataset.iter_rows().enumerate() {
            if self.removed[id] {
                continue;
            }
            let dist = self.distance.distance(query, point);
            if dist <= result.worst_dist() {
                result.add_point(dist, id);
            }
        }
    }
}
