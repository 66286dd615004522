use tinyvec::TinyVec;

use crate::allocator::NodeId;
use crate::distance::Distance;
use crate::error::Result;
use crate::kdtree::index::NodeKind;
use crate::kdtree::KDTreeIndex;
use crate::params::SearchParams;
use crate::r#trait::NNIndex;
use crate::r#type::IndexableNum;
use crate::result_set::ResultSet;

impl<N: IndexableNum, D: Distance<N>> NNIndex<N> for KDTreeIndex<'_, N, D> {
    fn veclen(&self) -> usize {
        self.dataset.cols()
    }

    fn size(&self) -> usize {
        self.dataset.rows() - self.num_removed
    }

    fn used_memory(&self) -> usize {
        self.pool.reserved_bytes()
            + self.ids.as_bytes().len()
            + self
                .data
                .as_ref()
                .map_or(0, |data| std::mem::size_of_val(data.as_slice()))
            + std::mem::size_of_val(self.point_leaf.as_slice())
            + self.removed.len()
    }

    fn build_index(&mut self) -> Result<()> {
        self.build()
    }

    fn rebuild(&mut self) -> Result<()> {
        self.build()
    }

    fn remove(&mut self, index: usize) -> Result<bool> {
        self.remove_point(index)
    }

    fn find_neighbors<R: ResultSet<N>>(&self, result: &mut R, query: &[N], params: &SearchParams) {
        assert_eq!(
            query.len(),
            self.veclen(),
            "Query has {} coordinates, the index has {} dimensions.",
            query.len(),
            self.veclen()
        );
        let Some(root) = self.root else {
            return;
        };

        // Use TinyVec to avoid heap allocations for up to 8 dimensions
        let mut dists: TinyVec<[N; 8]> = TinyVec::with_capacity(query.len());
        let mut min_dist = N::zero();
        for (&value, interval) in query.iter().zip(&self.root_bbox) {
            let dist = if value < interval.low {
                self.distance.accum_dist(value, interval.low)
            } else if value > interval.high {
                self.distance.accum_dist(value, interval.high)
            } else {
                N::zero()
            };
            min_dist = min_dist + dist;
            dists.push(dist);
        }

        let mut search = Search {
            tree: self,
            query,
            eps_error: N::one() + N::from(params.eps).unwrap_or_else(N::zero),
            max_checks: params.checks,
            checks: 0,
            dists,
        };
        search.search_level(result, root, min_dist);
    }
}

/// The state of a single query's branch-and-bound descent.
struct Search<'s, 'a, 'q, N: IndexableNum, D: Distance<N>> {
    tree: &'s KDTreeIndex<'a, N, D>,
    query: &'q [N],
    eps_error: N,
    max_checks: Option<usize>,
    checks: usize,
    /// Per-dimension contributions to the lower bound of the current node's distance.
    dists: TinyVec<[N; 8]>,
}

impl<N: IndexableNum, D: Distance<N>> Search<'_, '_, '_, N, D> {
    fn budget_exhausted<R: ResultSet<N>>(&self, result: &R) -> bool {
        self.max_checks
            .is_some_and(|max_checks| self.checks >= max_checks && result.is_full())
    }

    fn search_level<R: ResultSet<N>>(&mut self, result: &mut R, node: NodeId, min_dist: N) {
        match self.tree.pool.get(node).kind {
            NodeKind::Leaf { start, len } => {
                let worst_dist = result.worst_dist();
                for slot in start..start + len {
                    let id = self.tree.ids.get(slot);
                    let point = match &self.tree.data {
                        Some(data) => data.row(slot),
                        None => self.tree.dataset.row(id),
                    };
                    let dist = self.tree.distance.distance(self.query, point);
                    if dist <= worst_dist {
                        result.add_point(dist, id);
                    }
                }
                self.checks += len;
            }
            NodeKind::Split {
                dim,
                low,
                high,
                child1,
                child2,
            } => {
                let value = self.query[dim];
                let (best, other, cut_dist) = if (value - low) + (value - high) < N::zero() {
                    (child1, child2, self.tree.distance.accum_dist(value, high))
                } else {
                    (child2, child1, self.tree.distance.accum_dist(value, low))
                };

                if let Some(best) = best {
                    self.search_level(result, best, min_dist);
                }

                let Some(other) = other else {
                    return;
                };
                if self.budget_exhausted(result) {
                    return;
                }

                let previous = self.dists[dim];
                let min_dist = min_dist + cut_dist - previous;
                self.dists[dim] = cut_dist;
                if min_dist * self.eps_error <= result.worst_dist() {
                    self.search_level(result, other, min_dist);
                }
                self.dists[dim] = previous;
            }
        }
    }
}
