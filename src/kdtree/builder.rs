use crate::allocator::{NodeId, PooledAllocator};
use crate::error::Result;
use crate::indices::Indices;
use crate::kdtree::index::{Interval, NodeKind, TreeNode};
use crate::matrix::MatrixRef;
use crate::r#type::IndexableNum;

/// Recursive middle-split construction over a slot permutation.
///
/// Slots `start..start + count` of `ids` hold the points of the node being built; the
/// builder reorders them in place so that every node's points are contiguous.
pub(crate) struct TreeBuilder<'b, N: IndexableNum> {
    pub(crate) dataset: MatrixRef<'b, N>,
    pub(crate) ids: &'b mut Indices,
    pub(crate) pool: &'b mut PooledAllocator<TreeNode<N>>,
    pub(crate) point_leaf: &'b mut [Option<NodeId>],
    pub(crate) leaf_size: usize,
}

impl<N: IndexableNum> TreeBuilder<'_, N> {
    #[inline]
    fn value(&self, slot: usize, dim: usize) -> N {
        self.dataset.row(self.ids.get(slot))[dim]
    }

    /// The exact extent of the points in `start..start + count` along every dimension.
    pub(crate) fn compute_bounding_box(&self, start: usize, count: usize) -> Vec<Interval<N>> {
        let mut bbox: Vec<Interval<N>> = self
            .dataset
            .row(self.ids.get(start))
            .iter()
            .map(|&value| Interval {
                low: value,
                high: value,
            })
            .collect();
        for slot in start + 1..start + count {
            let point = self.dataset.row(self.ids.get(slot));
            for (interval, &value) in bbox.iter_mut().zip(point) {
                if value < interval.low {
                    interval.low = value;
                }
                if value > interval.high {
                    interval.high = value;
                }
            }
        }
        bbox
    }

    /// Build the subtree over `start..start + count` and return its root.
    ///
    /// `bbox` is an approximation of the points' extent on entry and their exact extent on
    /// return.
    pub(crate) fn divide_tree(
        &mut self,
        start: usize,
        count: usize,
        bbox: &mut [Interval<N>],
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        let node = self.pool.push(TreeNode {
            parent,
            kind: NodeKind::Leaf { start, len: count },
        })?;

        if count <= self.leaf_size {
            bbox.copy_from_slice(&self.compute_bounding_box(start, count));
            for slot in start..start + count {
                self.point_leaf[self.ids.get(slot)] = Some(node);
            }
            return Ok(node);
        }

        let (dim, cut, split) = self.middle_split(start, count, bbox);

        let mut left_bbox = bbox.to_vec();
        left_bbox[dim].high = cut;
        let child1 = self.divide_tree(start, split, &mut left_bbox, Some(node))?;

        let mut right_bbox = bbox.to_vec();
        right_bbox[dim].low = cut;
        let child2 = self.divide_tree(start + split, count - split, &mut right_bbox, Some(node))?;

        self.pool.get_mut(node).kind = NodeKind::Split {
            dim,
            low: left_bbox[dim].high,
            high: right_bbox[dim].low,
            child1: Some(child1),
            child2: Some(child2),
        };

        for ((interval, left), right) in bbox.iter_mut().zip(&left_bbox).zip(&right_bbox) {
            interval.low = left.low.min(right.low);
            interval.high = left.high.max(right.high);
        }
        Ok(node)
    }

    /// Choose the split dimension, the cut value and the number of slots going left.
    fn middle_split(
        &mut self,
        start: usize,
        count: usize,
        bbox: &[Interval<N>],
    ) -> (usize, N, usize) {
        // largest span of the approximate box
        let mut dim = 0;
        let mut max_span = bbox[0].span();
        for (i, interval) in bbox.iter().enumerate().skip(1) {
            if interval.span() > max_span {
                max_span = interval.span();
                dim = i;
            }
        }

        // confirm with the exact extent of the points
        let (min, max) = self.compute_min_max(start, count, dim);
        let mut cut = (min + max) / (N::one() + N::one());
        let mut max_span = max - min;
        let approx_dim = dim;
        for (i, interval) in bbox.iter().enumerate() {
            if i == approx_dim || interval.span() <= max_span {
                continue;
            }
            let (min, max) = self.compute_min_max(start, count, i);
            if max - min > max_span {
                max_span = max - min;
                dim = i;
                cut = (min + max) / (N::one() + N::one());
            }
        }

        let (lim1, lim2) = self.plane_split(start, count, dim, cut);

        let half = count / 2;
        let split = if lim1 > half {
            lim1
        } else if lim2 < half {
            lim2
        } else {
            half
        };
        (dim, cut, split)
    }

    fn compute_min_max(&self, start: usize, count: usize, dim: usize) -> (N, N) {
        let first = self.value(start, dim);
        (start + 1..start + count).fold((first, first), |(min, max), slot| {
            let value = self.value(slot, dim);
            (min.min(value), max.max(value))
        })
    }

    /// Partition the slots so that the first `lim1` points are below `cut` along `dim` and
    /// the first `lim2` are at most `cut`.
    fn plane_split(&mut self, start: usize, count: usize, dim: usize, cut: N) -> (usize, usize) {
        let mut left = 0;
        let mut right = count;
        loop {
            while left < right && self.value(start + left, dim) < cut {
                left += 1;
            }
            while left < right && self.value(start + right - 1, dim) >= cut {
                right -= 1;
            }
            if left >= right {
                break;
            }
            self.ids.swap(start + left, start + right - 1);
            left += 1;
            right -= 1;
        }
        let lim1 = left;

        right = count;
        loop {
            while left < right && self.value(start + left, dim) <= cut {
                left += 1;
            }
            while left < right && self.value(start + right - 1, dim) > cut {
                right -= 1;
            }
            if left >= right {
                break;
            }
            self.ids.swap(start + left, start + right - 1);
            left += 1;
            right -= 1;
        }
        (lim1, left)
    }
}
