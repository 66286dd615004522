//! Shared fixtures for the crate's tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::distance::{Distance, L2};
use crate::matrix::Matrix;

pub(crate) fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// `n` points with coordinates uniformly drawn from `[-100, 100)`.
pub(crate) fn random_points(rng: &mut StdRng, n: usize, dim: usize) -> Matrix<f64> {
    let data = (0..n * dim)
        .map(|_| rng.gen_range(-100.0..100.0))
        .collect();
    Matrix::from_vec(data, dim).unwrap()
}

/// Every `(distance, id)` pair of the points not in `removed`, ascending.
pub(crate) fn brute_force(
    points: &Matrix<f64>,
    query: &[f64],
    removed: &[usize],
) -> Vec<(f64, usize)> {
    let mut all: Vec<(f64, usize)> = points
        .iter_rows()
        .enumerate()
        .filter(|(id, _)| !removed.contains(id))
        .map(|(id, point)| (L2.distance(query, point), id))
        .collect();
    all.sort_by(|a, b| a.partial_cmp(b).unwrap());
    all
}

/// Install a test logger honoring `RUST_LOG`. Safe to call from every test.
pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
