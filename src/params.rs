//! Build and search parameters.
//!
//! Tree parameters are fixed when an index is constructed; search parameters are passed with
//! every query batch and never stored in the index.

use crate::error::{Result, TreeIndexError};

/// The default maximum number of points in a leaf bucket.
pub const DEFAULT_LEAF_SIZE: usize = 30;

/// The default fraction of removed points after which a rebuild is advised.
pub const DEFAULT_REBUILD_THRESHOLD: f32 = 0.5;

/// Parameters for a [`KDTreeIndex`][crate::kdtree::KDTreeIndex].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KDTreeParams {
    /// Maximum number of points held by a leaf.
    pub leaf_size: usize,
    /// Keep a private copy of the points permuted into leaf order.
    pub ordered: bool,
    /// Fraction of removed points after which
    /// [`needs_rebuild`][crate::kdtree::KDTreeIndex::needs_rebuild] reports true. `None`
    /// disables the check.
    pub rebuild_threshold: Option<f32>,
}

impl KDTreeParams {
    /// Parameters with the default leaf size.
    pub fn new() -> Self {
        Self::new_with_leaf_size(DEFAULT_LEAF_SIZE)
    }

    /// Parameters with the provided leaf size.
    pub fn new_with_leaf_size(leaf_size: usize) -> Self {
        Self {
            leaf_size,
            ordered: true,
            rebuild_threshold: Some(DEFAULT_REBUILD_THRESHOLD),
        }
    }

    pub fn ordered(mut self, ordered: bool) -> Self {
        self.ordered = ordered;
        self
    }

    pub fn rebuild_threshold(mut self, threshold: Option<f32>) -> Self {
        self.rebuild_threshold = threshold;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.leaf_size == 0 {
            return Err(TreeIndexError::InvalidArgument(
                "Leaf size must be at least 1.".to_string(),
            ));
        }
        if let Some(threshold) = self.rebuild_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(TreeIndexError::InvalidArgument(format!(
                    "Rebuild threshold {} is not within [0, 1].",
                    threshold
                )));
            }
        }
        Ok(())
    }
}

impl Default for KDTreeParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Selects the kind of index created by [`Index::new`][crate::Index::new].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndexParams {
    /// A single k-d tree.
    KDTree(KDTreeParams),
    /// A brute-force scan over every point.
    Linear,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self::KDTree(KDTreeParams::default())
    }
}

/// Parameters passed with every search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    /// Number of worker threads. Batches run on the calling thread when this is 0 or 1.
    pub cores: usize,
    /// Relative error allowed when pruning: a branch is skipped once its lower bound times
    /// `1 + eps` exceeds the current worst distance. `0.0` is exact.
    pub eps: f32,
    /// Budget of examined points after which no further branches are explored once the
    /// result set is full. `None` searches exhaustively.
    pub checks: Option<usize>,
    /// Upper bound on the results of a radius search.
    pub max_neighbors: Option<usize>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self {
            cores: 1,
            eps: 0.0,
            checks: None,
            max_neighbors: None,
        }
    }

    /// Search with the given number of worker threads.
    pub fn with_cores(cores: usize) -> Self {
        Self {
            cores,
            ..Self::new()
        }
    }

    pub fn eps(mut self, eps: f32) -> Self {
        self.eps = eps;
        self
    }

    pub fn checks(mut self, checks: Option<usize>) -> Self {
        self.checks = checks;
        self
    }

    pub fn max_neighbors(mut self, max_neighbors: Option<usize>) -> Self {
        self.max_neighbors = max_neighbors;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.eps.is_nan() || self.eps < 0.0 {
            return Err(TreeIndexError::InvalidArgument(format!(
                "eps must be non-negative, got {}.",
                self.eps
            )));
        }
        Ok(())
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let params = KDTreeParams::default();
        assert_eq!(params.leaf_size, DEFAULT_LEAF_SIZE);
        assert!(params.ordered);
        assert!(params.validate().is_ok());

        let search = SearchParams::default();
        assert_eq!(search.cores, 1);
        assert_eq!(search.checks, None);
        assert!(search.validate().is_ok());
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(KDTreeParams::new_with_leaf_size(0).validate().is_err());
        assert!(KDTreeParams::new()
            .rebuild_threshold(Some(1.5))
            .validate()
            .is_err());
        assert!(SearchParams::new().eps(-0.1).validate().is_err());
        assert!(SearchParams::new().eps(f32::NAN).validate().is_err());
    }
}
