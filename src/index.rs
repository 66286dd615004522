use crate::distance::{Distance, L2};
use crate::error::Result;
use crate::kdtree::KDTreeIndex;
use crate::linear::LinearIndex;
use crate::matrix::MatrixRef;
use crate::params::{IndexParams, SearchParams};
use crate::r#trait::NNIndex;
use crate::r#type::IndexableNum;
use crate::result_set::ResultSet;

/// An index of the kind selected by [`IndexParams`].
#[derive(Debug)]
pub enum Index<'a, N: IndexableNum, D: Distance<N> = L2> {
    KDTree(KDTreeIndex<'a, N, D>),
    Linear(LinearIndex<'a, N, D>),
}

impl<'a, N: IndexableNum> Index<'a, N, L2> {
    /// Create an unbuilt index over `dataset` using squared Euclidean distance.
    pub fn new(dataset: MatrixRef<'a, N>, params: IndexParams) -> Result<Self> {
        Self::new_with_distance(dataset, params, L2)
    }
}

impl<'a, N: IndexableNum, D: Distance<N>> Index<'a, N, D> {
    /// Create an unbuilt index over `dataset` using the provided metric.
    pub fn new_with_distance(
        dataset: MatrixRef<'a, N>,
        params: IndexParams,
        distance: D,
    ) -> Result<Self> {
        Ok(match params {
            IndexParams::KDTree(params) => Self::KDTree(KDTreeIndex::new_with_distance(
                dataset, params, distance,
            )?),
            IndexParams::Linear => Self::Linear(LinearIndex::new_with_distance(dataset, distance)),
        })
    }

    /// Replace the indexed points and build over all of them.
    pub fn rebuild_with(&mut self, dataset: MatrixRef<'a, N>) -> Result<()> {
        match self {
            Self::KDTree(index) => index.rebuild_with(dataset),
            Self::Linear(index) => {
                index.rebuild_with(dataset);
                Ok(())
            }
        }
    }

    pub fn as_kdtree(&self) -> Option<&KDTreeIndex<'a, N, D>> {
        match self {
            Self::KDTree(index) => Some(index),
            Self::Linear(_) => None,
        }
    }
}

impl<N: IndexableNum, D: Distance<N>> NNIndex<N> for Index<'_, N, D> {
    fn veclen(&self) -> usize {
        match self {
            Self::KDTree(index) => index.veclen(),
            Self::Linear(index) => index.veclen(),
        }
    }

    fn size(&self) -> usize {
        match self {
            Self::KDTree(index) => index.size(),
            Self::Linear(index) => index.size(),
        }
    }

    fn used_memory(&self) -> usize {
        match self {
            Self::KDTree(index) => index.used_memory(),
            Self::Linear(index) => index.used_memory(),
        }
    }

    fn build_index(&mut self) -> Result<()> {
        match self {
            Self::KDTree(index) => index.build_index(),
            Self::Linear(index) => index.build_index(),
        }
    }

    fn rebuild(&mut self) -> Result<()> {
        match self {
            Self::KDTree(index) => index.rebuild(),
            Self::Linear(index) => index.rebuild(),
        }
    }

    fn remove(&mut self, index: usize) -> Result<bool> {
        match self {
            Self::KDTree(tree) => tree.remove(index),
            Self::Linear(linear) => linear.remove(index),
        }
    }

    fn find_neighbors<R: ResultSet<N>>(&self, result: &mut R, query: &[N], params: &SearchParams) {
        match self {
            Self::KDTree(index) => index.find_neighbors(result, query, params),
            Self::Linear(index) => index.find_neighbors(result, query, params),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::params::KDTreeParams;
    use crate::test::{random_points, seeded_rng};
    use crate::*;

    #[test]
    fn dispatches_to_selected_kind() {
        let points = random_points(&mut seeded_rng(7), 200, 3);
        let queries = random_points(&mut seeded_rng(8), 20, 3);
        let params = SearchParams::default();

        let mut tree = Index::new(points.as_ref(), IndexParams::default()).unwrap();
        let mut linear = Index::new(points.as_ref(), IndexParams::Linear).unwrap();
        tree.build_index().unwrap();
        linear.build_index().unwrap();
        assert!(tree.as_kdtree().is_some());
        assert!(linear.as_kdtree().is_none());

        let (tree_ids, tree_dists) = tree.knn_search(queries.as_ref(), 4, &params).unwrap();
        let (linear_ids, linear_dists) = linear.knn_search(queries.as_ref(), 4, &params).unwrap();
        assert_eq!(tree_dists, linear_dists);
        assert_eq!(tree_ids, linear_ids);

        assert!(tree.remove(3).unwrap());
        assert!(linear.remove(3).unwrap());
        assert_eq!(tree.size(), 199);
        assert_eq!(linear.size(), 199);
    }

    #[test]
    fn invalid_tree_params_are_rejected() {
        let points = random_points(&mut seeded_rng(7), 10, 2);
        let params = IndexParams::KDTree(KDTreeParams::new_with_leaf_size(0));
        assert!(matches!(
            Index::new(points.as_ref(), params),
            Err(TreeIndexError::InvalidArgument(_))
        ));
    }
}
