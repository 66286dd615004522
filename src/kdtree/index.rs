use log::{debug, trace, warn};

use crate::allocator::{NodeId, PooledAllocator};
use crate::distance::{Distance, L2};
use crate::error::{Result, TreeIndexError};
use crate::indices::Indices;
use crate::kdtree::builder::TreeBuilder;
use crate::kdtree::traversal::Node;
use crate::matrix::{Matrix, MatrixRef};
use crate::params::KDTreeParams;
use crate::r#trait::NNIndex;
use crate::r#type::IndexableNum;

/// The extent of a set of points along one dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Interval<N: IndexableNum> {
    pub(crate) low: N,
    pub(crate) high: N,
}

impl<N: IndexableNum> Interval<N> {
    #[inline]
    pub(crate) fn span(&self) -> N {
        self.high - self.low
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeKind<N: IndexableNum> {
    /// A bucket of `len` active points stored at slots `start..start + len`.
    Leaf { start: usize, len: usize },
    /// Points of `child1` are at most `low` along `dim`, points of `child2` at least `high`.
    Split {
        dim: usize,
        low: N,
        high: N,
        child1: Option<NodeId>,
        child2: Option<NodeId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TreeNode<N: IndexableNum> {
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind<N>,
}

impl<N: IndexableNum> Default for TreeNode<N> {
    fn default() -> Self {
        Self {
            parent: None,
            kind: NodeKind::Leaf { start: 0, len: 0 },
        }
    }
}

/// A k-d tree over a borrowed, row-major point set.
///
/// Construct with [`KDTreeIndex::new`], then call
/// [`build_index`][crate::NNIndex::build_index] before searching. Searches are provided by
/// the [`NNIndex`][crate::NNIndex] trait.
///
/// Every leaf holds at most [`KDTreeParams::leaf_size`] points. Removing points never
/// restructures the tree; see [`needs_rebuild`][KDTreeIndex::needs_rebuild].
#[derive(Debug)]
pub struct KDTreeIndex<'a, N: IndexableNum, D: Distance<N> = L2> {
    pub(crate) dataset: MatrixRef<'a, N>,
    pub(crate) params: KDTreeParams,
    pub(crate) distance: D,

    /// Maps tree slots to point ids. Leaf buckets are contiguous slot ranges.
    pub(crate) ids: Indices,
    /// The active points permuted into slot order, when `params.ordered` is set.
    pub(crate) data: Option<Matrix<N>>,

    pub(crate) pool: PooledAllocator<TreeNode<N>>,
    pub(crate) root: Option<NodeId>,
    /// Exact bounding box of the points at build time.
    pub(crate) root_bbox: Vec<Interval<N>>,

    /// The leaf holding each point id, if the point is in the tree.
    pub(crate) point_leaf: Vec<Option<NodeId>>,
    pub(crate) removed: Vec<bool>,
    pub(crate) num_removed: usize,

    built_size: usize,
    removed_since_build: usize,
}

impl<'a, N: IndexableNum> KDTreeIndex<'a, N, L2> {
    /// Create an unbuilt index over `dataset` using squared Euclidean distance.
    pub fn new(dataset: MatrixRef<'a, N>, params: KDTreeParams) -> Result<Self> {
        Self::new_with_distance(dataset, params, L2)
    }
}

impl<'a, N: IndexableNum, D: Distance<N>> KDTreeIndex<'a, N, D> {
    /// Create an unbuilt index over `dataset` using the provided metric.
    pub fn new_with_distance(
        dataset: MatrixRef<'a, N>,
        params: KDTreeParams,
        distance: D,
    ) -> Result<Self> {
        params.validate()?;
        if dataset.rows() > u32::MAX as usize {
            return Err(TreeIndexError::InvalidArgument(format!(
                "Cannot index {} points, at most {} are supported.",
                dataset.rows(),
                u32::MAX
            )));
        }

        Ok(Self {
            dataset,
            params,
            distance,
            ids: Indices::default(),
            data: None,
            pool: PooledAllocator::new(),
            root: None,
            root_bbox: vec![],
            point_leaf: vec![],
            removed: vec![false; dataset.rows()],
            num_removed: 0,
            built_size: 0,
            removed_since_build: 0,
        })
    }

    /// Partition the active points into a new tree, replacing any previous one.
    pub(crate) fn build(&mut self) -> Result<()> {
        self.pool.clear();
        self.root = None;
        self.root_bbox = vec![];
        self.data = None;
        self.point_leaf = vec![None; self.dataset.rows()];

        self.ids = if self.num_removed == 0 {
            Indices::identity(self.dataset.rows())
        } else {
            let active: Vec<usize> = (0..self.dataset.rows())
                .filter(|&id| !self.removed[id])
                .collect();
            Indices::from_ids(active.into_iter(), self.dataset.rows() - 1)
        };
        let num_active = self.ids.len();
        self.built_size = num_active;
        self.removed_since_build = 0;

        if num_active > 0 {
            let mut builder = TreeBuilder {
                dataset: self.dataset,
                ids: &mut self.ids,
                pool: &mut self.pool,
                point_leaf: &mut self.point_leaf,
                leaf_size: self.params.leaf_size,
            };
            let mut bbox = builder.compute_bounding_box(0, num_active);
            self.root = Some(builder.divide_tree(0, num_active, &mut bbox, None)?);
            self.root_bbox = bbox;
        }

        if self.params.ordered {
            self.data = Some(Matrix::select_rows(self.dataset, self.ids.iter()));
        }

        debug!(
            "Built k-d tree over {} points: {} nodes, depth {}, {} bytes",
            self.built_size,
            self.num_nodes(),
            self.depth(),
            self.used_memory()
        );
        Ok(())
    }

    /// Replace the indexed points and build a new tree over all of them.
    ///
    /// Points removed from the previous dataset are forgotten.
    pub fn rebuild_with(&mut self, dataset: MatrixRef<'a, N>) -> Result<()> {
        if dataset.rows() > u32::MAX as usize {
            return Err(TreeIndexError::InvalidArgument(format!(
                "Cannot index {} points, at most {} are supported.",
                dataset.rows(),
                u32::MAX
            )));
        }
        self.dataset = dataset;
        self.removed = vec![false; dataset.rows()];
        self.num_removed = 0;
        self.build()
    }

    /// Mark a point as removed and detach it from its leaf.
    pub(crate) fn remove_point(&mut self, id: usize) -> Result<bool> {
        if id >= self.dataset.rows() {
            return Err(TreeIndexError::InvalidArgument(format!(
                "Point {} is out of range for an index of {} points.",
                id,
                self.dataset.rows()
            )));
        }
        if self.removed[id] {
            return Ok(false);
        }
        self.removed[id] = true;
        self.num_removed += 1;

        if let Some(leaf) = self.point_leaf.get_mut(id).and_then(Option::take) {
            self.detach(leaf, id);
            let was_advised = self.needs_rebuild();
            self.removed_since_build += 1;
            if !was_advised && self.needs_rebuild() {
                warn!(
                    "{} of {} points removed since the last build, consider rebuilding the k-d tree",
                    self.removed_since_build, self.built_size
                );
            }
        }
        trace!("Removed point {}", id);
        Ok(true)
    }

    /// Drop `id` from the bucket of `leaf`, unlinking the leaf once it is empty.
    fn detach(&mut self, leaf: NodeId, id: usize) {
        let (start, len) = match self.pool.get(leaf).kind {
            NodeKind::Leaf { start, len } => (start, len),
            NodeKind::Split { .. } => unreachable!("points only live in leaves"),
        };
        let Some(slot) = (start..start + len).find(|&slot| self.ids.get(slot) == id) else {
            return;
        };

        // move the point past the end of the active range
        let last = start + len - 1;
        self.ids.swap(slot, last);
        if let Some(data) = self.data.as_mut() {
            data.swap_rows(slot, last);
        }
        self.pool.get_mut(leaf).kind = NodeKind::Leaf {
            start,
            len: len - 1,
        };

        if len == 1 {
            self.unlink(leaf);
        }
    }

    /// Remove an empty node from its parent, and the parent too once it has no children.
    fn unlink(&mut self, mut node: NodeId) {
        loop {
            let Some(parent) = self.pool.get(node).parent else {
                self.root = None;
                return;
            };
            let now_empty = match &mut self.pool.get_mut(parent).kind {
                NodeKind::Split { child1, child2, .. } => {
                    if *child1 == Some(node) {
                        *child1 = None;
                    } else if *child2 == Some(node) {
                        *child2 = None;
                    }
                    child1.is_none() && child2.is_none()
                }
                NodeKind::Leaf { .. } => unreachable!("leaves have no children"),
            };
            if !now_empty {
                return;
            }
            node = parent;
        }
    }

    /// Whether the points removed since the last build exceed
    /// [`KDTreeParams::rebuild_threshold`].
    ///
    /// Removed points no longer cost search time individually, but the tree keeps the shape
    /// it had for the full point set.
    pub fn needs_rebuild(&self) -> bool {
        match self.params.rebuild_threshold {
            Some(threshold) if self.built_size > 0 => {
                self.removed_since_build as f32 / self.built_size as f32 > threshold
            }
            _ => false,
        }
    }

    /// The parameters this tree was created with.
    pub fn params(&self) -> &KDTreeParams {
        &self.params
    }

    /// The indexed points.
    pub fn dataset(&self) -> MatrixRef<'a, N> {
        self.dataset
    }

    /// The number of removed points.
    pub fn removed(&self) -> usize {
        self.num_removed
    }

    /// Whether the point with this id has been removed.
    pub fn is_removed(&self, id: usize) -> bool {
        self.removed.get(id).copied().unwrap_or(false)
    }

    /// Whether the tree has been built and still holds at least one point.
    pub fn is_built(&self) -> bool {
        self.root.is_some()
    }

    /// The number of nodes reachable from the root.
    pub fn num_nodes(&self) -> usize {
        self.root().map_or(0, |root| count_nodes(&root))
    }

    /// The number of nodes on the longest path from the root to a leaf.
    pub fn depth(&self) -> usize {
        self.root().map_or(0, |root| node_depth(&root))
    }

    /// Access the root node of the tree for manual traversal.
    ///
    /// Returns `None` before the tree is built, or once every point has been removed.
    pub fn root(&self) -> Option<Node<'_, 'a, N, D>> {
        self.root.map(|id| Node::new(self, id))
    }
}

fn count_nodes<N: IndexableNum, D: Distance<N>>(node: &Node<'_, '_, N, D>) -> usize {
    1 + node
        .children()
        .map(|child| count_nodes(&child))
        .sum::<usize>()
}

fn node_depth<N: IndexableNum, D: Distance<N>>(node: &Node<'_, '_, N, D>) -> usize {
    1 + node
        .children()
        .map(|child| node_depth(&child))
        .max()
        .unwrap_or(0)
}
