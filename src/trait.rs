use crate::error::{Result, TreeIndexError};
use crate::matrix::{Matrix, MatrixRef};
use crate::params::SearchParams;
use crate::r#type::IndexableNum;
use crate::result_set::{KNNRadiusResultSet, KNNResultSet2, Neighbor, RadiusResultSet, ResultSet};
use crate::threadpool::ThreadPool;

/// The search capabilities shared by every index kind.
///
/// Implementors provide the per-query primitive [`find_neighbors`][NNIndex::find_neighbors];
/// batched k-nearest-neighbor and radius searches, optionally spread over a
/// [`ThreadPool`], are provided on top of it. Searches take `&self`, so an index can be
/// queried from many threads at once, while mutations take `&mut self`.
pub trait NNIndex<N: IndexableNum>: Sync {
    /// The dimension of the indexed points.
    fn veclen(&self) -> usize;

    /// The number of active (not removed) points.
    fn size(&self) -> usize;

    /// Bytes held by the index structure, excluding the caller's points.
    fn used_memory(&self) -> usize;

    /// Build the search structure over the active points.
    fn build_index(&mut self) -> Result<()>;

    /// Discard the search structure and build it again over the active points.
    fn rebuild(&mut self) -> Result<()>;

    /// Exclude a point from all further results.
    ///
    /// Returns `Ok(false)` if the point had already been removed.
    fn remove(&mut self, index: usize) -> Result<bool>;

    /// Offer the candidate neighbors of a single query to `result`.
    ///
    /// ## Panics
    ///
    /// - If `query` does not have [`veclen`][NNIndex::veclen] coordinates. The batched
    ///   searches check this before any traversal.
    fn find_neighbors<R: ResultSet<N>>(&self, result: &mut R, query: &[N], params: &SearchParams);

    /// Find the `k` nearest neighbors of every query row.
    ///
    /// Returns `queries.rows() × k` matrices of point ids and distances, each row ascending by
    /// distance. Rows with fewer than `k` results are padded with `usize::MAX` and infinity.
    fn knn_search(
        &self,
        queries: MatrixRef<'_, N>,
        k: usize,
        params: &SearchParams,
    ) -> Result<(Matrix<usize>, Matrix<N>)> {
        let mut indices = Matrix::filled(queries.rows(), k, usize::MAX);
        let mut dists = Matrix::filled(queries.rows(), k, N::infinity());
        self.knn_search_into(queries, &mut indices, &mut dists, k, params)?;
        Ok((indices, dists))
    }

    /// Like [`knn_search`][NNIndex::knn_search], writing into existing matrices with at least
    /// `queries.rows()` rows and `k` columns.
    fn knn_search_into(
        &self,
        queries: MatrixRef<'_, N>,
        indices: &mut Matrix<usize>,
        dists: &mut Matrix<N>,
        k: usize,
        params: &SearchParams,
    ) -> Result<()> {
        self.knn_search_with(queries, indices, dists, k, params, || KNNResultSet2::new(k))
    }

    /// Like [`knn_search_into`][NNIndex::knn_search_into], collecting every query's
    /// candidates into a result set produced by `factory`.
    fn knn_search_with<R, F>(
        &self,
        queries: MatrixRef<'_, N>,
        indices: &mut Matrix<usize>,
        dists: &mut Matrix<N>,
        k: usize,
        params: &SearchParams,
        factory: F,
    ) -> Result<()>
    where
        R: ResultSet<N>,
        F: Fn() -> R + Sync,
    {
        with_pool(params, |pool| {
            knn_batch(self, pool, queries, indices, dists, k, params, &factory)
        })
    }

    /// Like [`knn_search`][NNIndex::knn_search], running on an existing pool regardless of
    /// [`SearchParams::cores`].
    fn knn_search_in(
        &self,
        pool: &ThreadPool,
        queries: MatrixRef<'_, N>,
        k: usize,
        params: &SearchParams,
    ) -> Result<(Matrix<usize>, Matrix<N>)> {
        let mut indices = Matrix::filled(queries.rows(), k, usize::MAX);
        let mut dists = Matrix::filled(queries.rows(), k, N::infinity());
        knn_batch(
            self,
            Some(pool),
            queries,
            &mut indices,
            &mut dists,
            k,
            params,
            &|| KNNResultSet2::new(k),
        )?;
        Ok((indices, dists))
    }

    /// Find every point within `radius` of each query row.
    ///
    /// `radius` is in the units of the index's metric, so it is a squared distance for
    /// [`L2`][crate::distance::L2]. Each query's neighbors are ascending by distance and are
    /// capped at [`SearchParams::max_neighbors`] when it is set.
    fn radius_search(
        &self,
        queries: MatrixRef<'_, N>,
        radius: N,
        params: &SearchParams,
    ) -> Result<Vec<Vec<Neighbor<N>>>> {
        match params.max_neighbors {
            Some(max_neighbors) => self.radius_search_with(queries, radius, params, || {
                KNNRadiusResultSet::new(max_neighbors, radius)
            }),
            None => {
                self.radius_search_with(queries, radius, params, || RadiusResultSet::new(radius))
            }
        }
    }

    /// Like [`radius_search`][NNIndex::radius_search], collecting every query's candidates
    /// into a result set produced by `factory`.
    fn radius_search_with<R, F>(
        &self,
        queries: MatrixRef<'_, N>,
        radius: N,
        params: &SearchParams,
        factory: F,
    ) -> Result<Vec<Vec<Neighbor<N>>>>
    where
        R: ResultSet<N>,
        F: Fn() -> R + Sync,
    {
        with_pool(params, |pool| {
            radius_batch(self, pool, queries, radius, params, &factory)
        })
    }

    /// Like [`radius_search`][NNIndex::radius_search], running on an existing pool regardless
    /// of [`SearchParams::cores`].
    fn radius_search_in(
        &self,
        pool: &ThreadPool,
        queries: MatrixRef<'_, N>,
        radius: N,
        params: &SearchParams,
    ) -> Result<Vec<Vec<Neighbor<N>>>> {
        match params.max_neighbors {
            Some(max_neighbors) => radius_batch(self, Some(pool), queries, radius, params, &|| {
                KNNRadiusResultSet::new(max_neighbors, radius)
            }),
            None => radius_batch(self, Some(pool), queries, radius, params, &|| {
                RadiusResultSet::new(radius)
            }),
        }
    }
}

/// Run `f` on a fresh pool when more than one core is requested.
fn with_pool<T>(
    params: &SearchParams,
    f: impl FnOnce(Option<&ThreadPool>) -> Result<T>,
) -> Result<T> {
    if params.cores > 1 {
        let pool = ThreadPool::new(params.cores)?;
        f(Some(&pool))
    } else {
        f(None)
    }
}

fn check_queries<N: IndexableNum, I: NNIndex<N> + ?Sized>(
    index: &I,
    queries: &MatrixRef<'_, N>,
    params: &SearchParams,
) -> Result<()> {
    params.validate()?;
    if !queries.is_empty() && queries.cols() != index.veclen() {
        return Err(TreeIndexError::DimensionMismatch {
            expected: index.veclen(),
            actual: queries.cols(),
        });
    }
    Ok(())
}

/// Rows handled by each task so that every worker gets one contiguous range.
fn rows_per_task(num_rows: usize, pool: &ThreadPool) -> usize {
    num_rows.div_ceil(pool.current_num_threads()).max(1)
}

#[allow(clippy::too_many_arguments)]
fn knn_batch<N, I, R, F>(
    index: &I,
    pool: Option<&ThreadPool>,
    queries: MatrixRef<'_, N>,
    indices: &mut Matrix<usize>,
    dists: &mut Matrix<N>,
    k: usize,
    params: &SearchParams,
    factory: &F,
) -> Result<()>
where
    N: IndexableNum,
    I: NNIndex<N> + ?Sized,
    R: ResultSet<N>,
    F: Fn() -> R + Sync,
{
    check_queries(index, &queries, params)?;
    let num_queries = queries.rows();
    for (name, rows, cols) in [
        ("indices", indices.rows(), indices.cols()),
        ("dists", dists.rows(), dists.cols()),
    ] {
        if rows < num_queries || cols < k {
            return Err(TreeIndexError::InvalidArgument(format!(
                "Output {} is {}×{}, need at least {}×{}.",
                name, rows, cols, num_queries, k
            )));
        }
    }
    if k == 0 || num_queries == 0 {
        return Ok(());
    }

    let index_cols = indices.cols();
    let dist_cols = dists.cols();
    let index_rows = &mut indices.as_mut_slice()[..num_queries * index_cols];
    let dist_rows = &mut dists.as_mut_slice()[..num_queries * dist_cols];

    match pool {
        None => knn_rows(
            index,
            queries,
            (index_rows, index_cols),
            (dist_rows, dist_cols),
            k,
            params,
            factory,
        ),
        Some(pool) => {
            let chunk_rows = rows_per_task(num_queries, pool);
            pool.scope(|scope| {
                let chunks = index_rows
                    .chunks_mut(chunk_rows * index_cols)
                    .zip(dist_rows.chunks_mut(chunk_rows * dist_cols))
                    .enumerate();
                for (chunk_index, (index_chunk, dist_chunk)) in chunks {
                    let start = chunk_index * chunk_rows;
                    let num_rows = index_chunk.len() / index_cols;
                    let chunk_queries = queries.slice_rows(start, start + num_rows);
                    scope.run_task(move || {
                        knn_rows(
                            index,
                            chunk_queries,
                            (index_chunk, index_cols),
                            (dist_chunk, dist_cols),
                            k,
                            params,
                            factory,
                        )
                    });
                }
            });
        }
    }
    Ok(())
}

/// Search a contiguous block of queries, writing one output row per query.
fn knn_rows<N, I, R, F>(
    index: &I,
    queries: MatrixRef<'_, N>,
    (indices, index_cols): (&mut [usize], usize),
    (dists, dist_cols): (&mut [N], usize),
    k: usize,
    params: &SearchParams,
    factory: &F,
) where
    N: IndexableNum,
    I: NNIndex<N> + ?Sized,
    R: ResultSet<N>,
    F: Fn() -> R,
{
    let mut result = factory();
    for (i, query) in queries.iter_rows().enumerate() {
        result.clear();
        index.find_neighbors(&mut result, query, params);

        let index_row = &mut indices[i * index_cols..i * index_cols + k];
        let dist_row = &mut dists[i * dist_cols..i * dist_cols + k];
        let found = result.copy(index_row, dist_row);
        index_row[found..].fill(usize::MAX);
        dist_row[found..].fill(N::infinity());
    }
}

fn radius_batch<N, I, R, F>(
    index: &I,
    pool: Option<&ThreadPool>,
    queries: MatrixRef<'_, N>,
    radius: N,
    params: &SearchParams,
    factory: &F,
) -> Result<Vec<Vec<Neighbor<N>>>>
where
    N: IndexableNum,
    I: NNIndex<N> + ?Sized,
    R: ResultSet<N>,
    F: Fn() -> R + Sync,
{
    check_queries(index, &queries, params)?;
    let num_queries = queries.rows();
    let mut output = vec![vec![]; num_queries];
    if radius <= N::zero() || num_queries == 0 {
        return Ok(output);
    }

    match pool {
        None => radius_rows(index, queries, &mut output, params, factory),
        Some(pool) => {
            let chunk_rows = rows_per_task(num_queries, pool);
            pool.scope(|scope| {
                for (chunk_index, chunk) in output.chunks_mut(chunk_rows).enumerate() {
                    let start = chunk_index * chunk_rows;
                    let chunk_queries = queries.slice_rows(start, start + chunk.len());
                    scope.run_task(move || {
                        radius_rows(index, chunk_queries, chunk, params, factory)
                    });
                }
            });
        }
    }
    Ok(output)
}

fn radius_rows<N, I, R, F>(
    index: &I,
    queries: MatrixRef<'_, N>,
    output: &mut [Vec<Neighbor<N>>],
    params: &SearchParams,
    factory: &F,
) where
    N: IndexableNum,
    I: NNIndex<N> + ?Sized,
    R: ResultSet<N>,
    F: Fn() -> R,
{
    let mut result = factory();
    for (query, neighbors) in queries.iter_rows().zip(output.iter_mut()) {
        result.clear();
        index.find_neighbors(&mut result, query, params);
        *neighbors = result.neighbors();
    }
}
