//! Row-major dense matrix.
//!
//! [`Matrix`] is the storage used for everything indexed `sample × output` or
//! `feature × entry` during training: scores, gradients, feature deltas,
//! usability masks and discretized feature values. Rows are contiguous so a
//! sample's outputs (or a feature's values) can be borrowed as one slice.

use std::ops::{Index, IndexMut};

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Dense row-major matrix.
///
/// # Example
///
/// ```
/// use visioner::data::Matrix;
///
/// let mut m = Matrix::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3);
/// assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
///
/// m[(0, 2)] = 9.0;
/// assert_eq!(m.get(0, 2), Some(&9.0));
/// assert_eq!(m.get(2, 0), None);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Clone + Default> Matrix<T> {
    /// Create a `rows × cols` matrix filled with `T::default()`.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_elem(rows, cols, T::default())
    }

    /// Change the shape.
    ///
    /// Contents are reset to `T::default()` whenever the shape changes and
    /// left untouched otherwise.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        if rows != self.rows || cols != self.cols {
            self.data.clear();
            self.data.resize(rows * cols, T::default());
            self.rows = rows;
            self.cols = cols;
        }
    }
}

impl<T: Clone> Matrix<T> {
    /// Create a `rows × cols` matrix with every element set to `value`.
    pub fn from_elem(rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: vec![value; rows * cols],
            rows,
            cols,
        }
    }

    /// Copy an ndarray view into a row-major matrix.
    pub fn from_array(array: ArrayView2<'_, T>) -> Self {
        let (rows, cols) = array.dim();
        Self {
            data: array.iter().cloned().collect(),
            rows,
            cols,
        }
    }

    /// Copy into an owned ndarray.
    pub fn to_array(&self) -> Array2<T> {
        Array2::from_shape_fn((self.rows, self.cols), |(r, c)| self[(r, c)].clone())
    }

    /// Set every element to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl<T> Matrix<T> {
    /// Create a matrix from row-major data, taking ownership.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != rows * cols`.
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "Data length {} does not match dimensions {}x{}",
            data.len(),
            rows,
            cols
        );
        Self { data, rows, cols }
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Whether the matrix holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow row `r`.
    #[inline]
    pub fn row(&self, r: usize) -> &[T] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Mutably borrow row `r`.
    #[inline]
    pub fn row_mut(&mut self, r: usize) -> &mut [T] {
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Element at `(r, c)`, or `None` if out of bounds.
    #[inline]
    pub fn get(&self, r: usize, c: usize) -> Option<&T> {
        if r >= self.rows || c >= self.cols {
            return None;
        }
        self.data.get(r * self.cols + c)
    }

    /// Iterate over rows.
    pub fn iter_rows(&self) -> impl ExactSizeIterator<Item = &[T]> + '_ {
        // chunks_exact(0) panics, so an empty-column matrix yields empty rows
        let cols = self.cols.max(1);
        let rows = self.rows;
        self.data.chunks_exact(cols).take(rows)
    }

    /// Row-major element slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable row-major element slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (r, c): (usize, usize)) -> &T {
        debug_assert!(r < self.rows && c < self.cols, "index ({r}, {c}) out of bounds");
        &self.data[r * self.cols + c]
    }
}

impl<T> IndexMut<(usize, usize)> for Matrix<T> {
    #[inline]
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut T {
        debug_assert!(r < self.rows && c < self.cols, "index ({r}, {c}) out of bounds");
        &mut self.data[r * self.cols + c]
    }
}
