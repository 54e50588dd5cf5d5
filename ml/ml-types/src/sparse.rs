//! Sparse resampling operators between mesh levels.

use serde::{Deserialize, Serialize};

use crate::error::{HierarchyError, Result};

/// Sparse linear operator stored as coordinate triples.
///
/// Applying it to a per-vertex signal computes
/// `out[row] += value * signal[col]` for every triple; repeated rows
/// accumulate. `rows` is the output vertex count and `cols` the input
/// vertex count, so a down-transform has `rows < cols`.
///
/// # Example
///
/// ```
/// use ml_types::SparseOperator;
///
/// // Average vertices 0 and 1 into one coarse vertex, keep vertex 2.
/// let op = SparseOperator::from_triples(2, 3, &[(0, 0, 0.5), (0, 1, 0.5), (1, 2, 1.0)]).unwrap();
/// let out = op.apply(&[2.0, 4.0, 7.0], 1).unwrap();
/// assert_eq!(out, vec![3.0, 7.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseOperator {
    rows: usize,
    cols: usize,
    row_indices: Vec<u32>,
    col_indices: Vec<u32>,
    values: Vec<f32>,
}

impl SparseOperator {
    /// Creates an operator from parallel coordinate arrays.
    ///
    /// # Errors
    ///
    /// Returns an error if the arrays differ in length or any coordinate
    /// is outside `rows × cols`.
    pub fn new(
        rows: usize,
        cols: usize,
        row_indices: Vec<u32>,
        col_indices: Vec<u32>,
        values: Vec<f32>,
    ) -> Result<Self> {
        let op = Self {
            rows,
            cols,
            row_indices,
            col_indices,
            values,
        };
        op.validate()?;
        Ok(op)
    }

    /// Creates an operator from `(row, col, value)` triples.
    ///
    /// # Errors
    ///
    /// Same as [`SparseOperator::new`].
    pub fn from_triples(rows: usize, cols: usize, triples: &[(u32, u32, f32)]) -> Result<Self> {
        let (row_indices, (col_indices, values)) = triples
            .iter()
            .map(|&(r, c, v)| (r, (c, v)))
            .unzip();
        Self::new(rows, cols, row_indices, col_indices, values)
    }

    /// Identity operator on `n` vertices.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn identity(n: usize) -> Self {
        let idx: Vec<u32> = (0..n as u32).collect();
        Self {
            rows: n,
            cols: n,
            row_indices: idx.clone(),
            col_indices: idx,
            values: vec![1.0; n],
        }
    }

    /// Checks array lengths and coordinate bounds.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::DataSizeMismatch`] or
    /// [`HierarchyError::IndexOutOfRange`].
    pub fn validate(&self) -> Result<()> {
        let nnz = self.values.len();
        for len in [self.row_indices.len(), self.col_indices.len()] {
            if len != nnz {
                return Err(HierarchyError::data_size_mismatch(nnz, len));
            }
        }
        if let Some(&r) = self.row_indices.iter().find(|&&r| r as usize >= self.rows) {
            return Err(HierarchyError::index_out_of_range("operator row", r, self.rows));
        }
        if let Some(&c) = self.col_indices.iter().find(|&&c| c as usize >= self.cols) {
            return Err(HierarchyError::index_out_of_range("operator column", c, self.cols));
        }
        Ok(())
    }

    /// Output vertex count.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Input vertex count.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Number of stored triples.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Row coordinate of every triple.
    #[must_use]
    pub fn row_indices(&self) -> &[u32] {
        &self.row_indices
    }

    /// Column coordinate of every triple.
    #[must_use]
    pub fn col_indices(&self) -> &[u32] {
        &self.col_indices
    }

    /// Weight of every triple.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Iterate `(row, col, value)` triples in storage order.
    pub fn triples(&self) -> impl Iterator<Item = (u32, u32, f32)> + '_ {
        self.row_indices
            .iter()
            .zip(&self.col_indices)
            .zip(&self.values)
            .map(|((&r, &c), &v)| (r, c, v))
    }

    /// Apply to a row-major `cols × channels` signal on the CPU.
    ///
    /// Returns a row-major `rows × channels` signal.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::DataSizeMismatch`] if `signal` is not
    /// `cols * channels` long.
    pub fn apply(&self, signal: &[f32], channels: usize) -> Result<Vec<f32>> {
        if signal.len() != self.cols * channels {
            return Err(HierarchyError::data_size_mismatch(
                self.cols * channels,
                signal.len(),
            ));
        }
        let mut out = vec![0.0; self.rows * channels];
        for (r, c, v) in self.triples() {
            let src = &signal[c as usize * channels..(c as usize + 1) * channels];
            let dst = &mut out[r as usize * channels..(r as usize + 1) * channels];
            for (d, s) in dst.iter_mut().zip(src) {
                *d = v.mul_add(*s, *d);
            }
        }
        Ok(out)
    }
}
