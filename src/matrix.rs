//! Dense, row-major point storage.
//!
//! [`Matrix`] owns its buffer and [`MatrixRef`] borrows one. Rows are points (or queries),
//! columns are dimensions. Indexes never copy the caller's points: they hold a
//! [`MatrixRef`] onto them.

use bytemuck::Pod;
use geo_traits::{CoordTrait, Dimensions};

use crate::error::{Result, TreeIndexError};
use crate::r#type::IndexableNum;

/// An owned, row-major matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T> Matrix<T> {
    /// Wrap an existing row-major buffer.
    ///
    /// The buffer length must be a multiple of `cols`.
    pub fn from_vec(data: Vec<T>, cols: usize) -> Result<Self> {
        let rows = num_rows(data.len(), cols)?;
        Ok(Self { data, rows, cols })
    }

    /// The number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// The number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_inner(self) -> Vec<T> {
        self.data
    }

    #[inline]
    pub fn row(&self, index: usize) -> &[T] {
        &self.data[index * self.cols..(index + 1) * self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, index: usize) -> &mut [T] {
        &mut self.data[index * self.cols..(index + 1) * self.cols]
    }

    /// Iterate over the rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }

    /// Exchange two rows in place.
    pub fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for col in 0..self.cols {
            self.data.swap(a * self.cols + col, b * self.cols + col);
        }
    }

    /// Split the buffer into disjoint, mutable blocks of `rows_per_chunk` rows.
    ///
    /// The last block may hold fewer rows.
    pub fn row_chunks_mut(&mut self, rows_per_chunk: usize) -> impl Iterator<Item = &mut [T]> {
        let chunk_len = (rows_per_chunk * self.cols).max(1);
        self.data.chunks_mut(chunk_len)
    }

    /// Borrow this matrix.
    pub fn as_ref(&self) -> MatrixRef<'_, T> {
        MatrixRef {
            data: &self.data,
            rows: self.rows,
            cols: self.cols,
        }
    }
}

impl<T: Clone> Matrix<T> {
    /// A `rows × cols` matrix with every entry set to `value`.
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: vec![value; rows * cols],
            rows,
            cols,
        }
    }

    /// Copy the given rows, in order, into a new matrix.
    pub fn select_rows(source: MatrixRef<'_, T>, rows: impl Iterator<Item = usize>) -> Self
    where
        T: Copy,
    {
        let mut data = Vec::with_capacity(source.data.len());
        let mut count = 0;
        for row in rows {
            data.extend_from_slice(source.row(row));
            count += 1;
        }
        Self {
            data,
            rows: count,
            cols: source.cols,
        }
    }
}

impl<T: Clone + Default> Matrix<T> {
    /// A `rows × cols` matrix of default values.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, T::default())
    }
}

impl<N: IndexableNum> Matrix<N> {
    /// Collect coordinates into a matrix, one row per coordinate.
    ///
    /// All coordinates must share the same dimension.
    pub fn from_coords<C: CoordTrait<T = N>>(coords: impl IntoIterator<Item = C>) -> Result<Self> {
        let mut data = vec![];
        let mut cols = None;
        let mut rows = 0;
        for coord in coords {
            let size = coord.dim().size();
            let cols = *cols.get_or_insert(size);
            if size != cols {
                return Err(TreeIndexError::DimensionMismatch {
                    expected: cols,
                    actual: size,
                });
            }
            data.extend((0..cols).map(|n| coord.nth_or_panic(n)));
            rows += 1;
        }
        Ok(Self {
            data,
            rows,
            cols: cols.unwrap_or(0),
        })
    }
}

/// A borrowed, row-major matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixRef<'a, T> {
    data: &'a [T],
    rows: usize,
    cols: usize,
}

impl<'a, T> MatrixRef<'a, T> {
    /// Borrow an existing row-major buffer.
    ///
    /// The buffer length must be a multiple of `cols`.
    pub fn try_new(data: &'a [T], cols: usize) -> Result<Self> {
        let rows = num_rows(data.len(), cols)?;
        Ok(Self { data, rows, cols })
    }

    /// The number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// The number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    #[inline]
    pub fn row(&self, index: usize) -> &'a [T] {
        &self.data[index * self.cols..(index + 1) * self.cols]
    }

    /// Iterate over the rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &'a [T]> + 'a {
        let cols = self.cols;
        let data = self.data;
        (0..self.rows).map(move |i| &data[i * cols..(i + 1) * cols])
    }

    /// The rows `start..end` as their own matrix.
    pub fn slice_rows(&self, start: usize, end: usize) -> MatrixRef<'a, T> {
        MatrixRef {
            data: &self.data[start * self.cols..end * self.cols],
            rows: end - start,
            cols: self.cols,
        }
    }
}

impl<'a, T: Pod> MatrixRef<'a, T> {
    /// Reinterpret a raw native-endian byte buffer as a matrix with `cols` columns.
    ///
    /// The buffer must be aligned for `T` and its length a multiple of `cols * size_of::<T>()`.
    pub fn try_from_bytes(bytes: &'a [u8], cols: usize) -> Result<Self> {
        let data: &[T] = bytemuck::try_cast_slice(bytes).map_err(|err| {
            TreeIndexError::InvalidArgument(format!(
                "Cannot view {} bytes as a matrix: {}.",
                bytes.len(),
                err
            ))
        })?;
        Self::try_new(data, cols)
    }
}

impl<'a, N: IndexableNum> MatrixRef<'a, N> {
    /// The row at `index` as a coordinate.
    pub fn point(&self, index: usize) -> PointRef<'a, N> {
        PointRef {
            coords: self.row(index),
        }
    }
}

fn num_rows(len: usize, cols: usize) -> Result<usize> {
    if cols == 0 {
        if len == 0 {
            return Ok(0);
        }
        return Err(TreeIndexError::InvalidArgument(
            "A non-empty matrix needs at least one column.".to_string(),
        ));
    }
    if len % cols != 0 {
        return Err(TreeIndexError::InvalidArgument(format!(
            "Buffer of length {} is not a multiple of {} columns.",
            len, cols
        )));
    }
    Ok(len / cols)
}

/// A single row of a matrix, viewed as a coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRef<'a, N: IndexableNum> {
    coords: &'a [N],
}

impl<N: IndexableNum> PointRef<'_, N> {
    pub fn as_slice(&self) -> &[N] {
        self.coords
    }
}

impl<N: IndexableNum> CoordTrait for PointRef<'_, N> {
    type T = N;

    fn dim(&self) -> Dimensions {
        match self.coords.len() {
            2 => Dimensions::Xy,
            3 => Dimensions::Xyz,
            4 => Dimensions::Xyzm,
            n => Dimensions::Unknown(n),
        }
    }

    fn x(&self) -> Self::T {
        self.nth_or_panic(0)
    }

    fn y(&self) -> Self::T {
        self.nth_or_panic(1)
    }

    fn nth_or_panic(&self, n: usize) -> Self::T {
        match self.coords.get(n) {
            Some(value) => *value,
            None => panic!("Invalid index of coord"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rows_and_columns() {
        let matrix = Matrix::from_vec(vec![1., 2., 3., 4., 5., 6.], 3).unwrap();
        assert_eq!(matrix.rows(), 2);
        assert_eq!(matrix.cols(), 3);
        assert_eq!(matrix.row(1), &[4., 5., 6.]);

        let view = matrix.as_ref();
        assert_eq!(view.iter_rows().count(), 2);
        assert_eq!(view.slice_rows(1, 2).row(0), &[4., 5., 6.]);
    }

    #[test]
    fn rejects_ragged_buffers() {
        assert!(Matrix::from_vec(vec![1., 2., 3.], 2).is_err());
        assert!(MatrixRef::try_new(&[1.0f64], 0).is_err());
        let empty = MatrixRef::<f64>::try_new(&[], 0).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn views_bytes() {
        let values = [1.0f64, 2.0, 3.0, 4.0];
        let bytes: &[u8] = bytemuck::cast_slice(&values);
        let view = MatrixRef::<f64>::try_from_bytes(bytes, 2).unwrap();
        assert_eq!(view.rows(), 2);
        assert_eq!(view.row(1), &[3.0, 4.0]);
        assert!(MatrixRef::<f64>::try_from_bytes(&bytes[..12], 2).is_err());
    }

    #[test]
    fn row_chunks_are_disjoint() {
        let mut matrix = Matrix::<usize>::new(5, 2);
        for (i, chunk) in matrix.row_chunks_mut(2).enumerate() {
            chunk.fill(i);
        }
        assert_eq!(matrix.row(0), &[0, 0]);
        assert_eq!(matrix.row(3), &[1, 1]);
        assert_eq!(matrix.row(4), &[2, 2]);
    }

    #[test]
    fn coordinates_round_trip() {
        let matrix = Matrix::from_vec(vec![1.0f32, 2., 3., 4., 5., 6.], 3).unwrap();
        let view = matrix.as_ref();
        let point = view.point(1);
        assert_eq!(point.dim(), Dimensions::Xyz);
        assert_eq!(point.x(), 4.);
        assert_eq!(point.nth_or_panic(2), 6.);

        let copy =
            Matrix::from_coords(view.iter_rows().map(|row| PointRef { coords: row })).unwrap();
        assert_eq!(copy, matrix);

        let selected = Matrix::select_rows(view, [1, 0].into_iter());
        assert_eq!(selected.row(0), &[4., 5., 6.]);
    }
}
