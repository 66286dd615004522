//! Data structures to hold point ids that may be either `u16` or `u32` to save space.

use bytemuck::cast_slice;

/// Point counts below this threshold store their ids as `u16`.
const U16_THRESHOLD: usize = 65536;

/// An owned permutation of point ids that may be either `u16` or `u32`.
///
/// The k-d tree keeps its points in "slot" order: leaf buckets are contiguous slot ranges,
/// and this array maps each slot back to the id of the point in the caller's dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Indices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl Indices {
    /// The identity permutation `0..num_items`.
    pub fn identity(num_items: usize) -> Self {
        debug_assert!(num_items <= u32::MAX as usize);
        if num_items < U16_THRESHOLD {
            Self::U16((0..num_items as u16).collect())
        } else {
            Self::U32((0..num_items as u32).collect())
        }
    }

    /// A permutation holding exactly the given ids, in order.
    pub fn from_ids(ids: impl ExactSizeIterator<Item = usize>, max_id: usize) -> Self {
        if max_id < U16_THRESHOLD {
            Self::U16(ids.map(|id| id as u16).collect())
        } else {
            Self::U32(ids.map(|id| id as u32).collect())
        }
    }

    #[inline]
    pub fn bytes_per_element(&self) -> usize {
        match self {
            Self::U16(_) => 2,
            Self::U32(_) => 4,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U16(arr) => arr.len(),
            Self::U32(arr) => arr.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, index: usize) -> usize {
        match self {
            Self::U16(arr) => arr[index] as usize,
            Self::U32(arr) => arr[index] as usize,
        }
    }

    #[inline]
    pub fn swap(&mut self, a: usize, b: usize) {
        match self {
            Self::U16(arr) => arr.swap(a, b),
            Self::U32(arr) => arr.swap(a, b),
        }
    }

    /// The raw little-endian bytes backing this permutation.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::U16(arr) => cast_slice(arr),
            Self::U32(arr) => cast_slice(arr),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }
}

impl Default for Indices {
    fn default() -> Self {
        Self::U16(Vec::new())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn picks_narrow_width_for_small_sets() {
        let ids = Indices::identity(100);
        assert!(matches!(ids, Indices::U16(_)));
        assert_eq!(ids.bytes_per_element(), 2);
        assert_eq!(ids.as_bytes().len(), 200);

        let ids = Indices::identity(70_000);
        assert!(matches!(ids, Indices::U32(_)));
        assert_eq!(ids.get(69_999), 69_999);
    }

    #[test]
    fn from_ids_keeps_order() {
        let ids = Indices::from_ids([7usize, 3, 70_000].into_iter(), 70_000);
        assert!(matches!(ids, Indices::U32(_)));
        assert_eq!(ids.iter().collect::<Vec<_>>(), vec![7, 3, 70_000]);

        let mut ids = Indices::from_ids([1usize, 2, 3].into_iter(), 3);
        ids.swap(0, 2);
        assert_eq!(ids.iter().collect::<Vec<_>>(), vec![3, 2, 1]);
    }
}
