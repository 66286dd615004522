//! Distance functors used by the indexes.
//!
//! Tree pruning needs a metric whose full distance is the sum of per-dimension
//! contributions, so the bound to a splitting plane can be updated one dimension at a time.

use crate::r#type::IndexableNum;

/// A distance between points of equal dimension.
pub trait Distance<N: IndexableNum>: Clone + Default + Send + Sync {
    /// The distance between two points.
    fn distance(&self, a: &[N], b: &[N]) -> N;

    /// The contribution of a single dimension to [`Distance::distance`].
    fn accum_dist(&self, a: N, b: N) -> N;
}

/// Squared Euclidean distance.
///
/// Returned distances, and radii passed to radius searches, are squared.
#[derive(Debug, Clone, Copy, Default)]
pub struct L2;

impl<N: IndexableNum> Distance<N> for L2 {
    #[inline]
    fn distance(&self, a: &[N], b: &[N]) -> N {
        debug_assert_eq!(a.len(), b.len());

        // four lanes at a time, then the tail
        let mut chunks_a = a.chunks_exact(4);
        let mut chunks_b = b.chunks_exact(4);
        let mut result = N::zero();
        for (ca, cb) in (&mut chunks_a).zip(&mut chunks_b) {
            let d0 = ca[0] - cb[0];
            let d1 = ca[1] - cb[1];
            let d2 = ca[2] - cb[2];
            let d3 = ca[3] - cb[3];
            result = result + d0 * d0 + d1 * d1 + d2 * d2 + d3 * d3;
        }
        for (&x, &y) in chunks_a.remainder().iter().zip(chunks_b.remainder()) {
            let d = x - y;
            result = result + d * d;
        }
        result
    }

    #[inline]
    fn accum_dist(&self, a: N, b: N) -> N {
        (a - b) * (a - b)
    }
}

/// Manhattan distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct L1;

impl<N: IndexableNum> Distance<N> for L1 {
    #[inline]
    fn distance(&self, a: &[N], b: &[N]) -> N {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b)
            .fold(N::zero(), |acc, (&x, &y)| acc + (x - y).abs())
    }

    #[inline]
    fn accum_dist(&self, a: N, b: N) -> N {
        (a - b).abs()
    }
}
