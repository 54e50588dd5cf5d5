//! Spiral neighbor tables.

use serde::{Deserialize, Serialize};

use crate::error::{HierarchyError, Result};

/// Fixed-length ordered neighbor sequence for every vertex of one level.
///
/// Stored row-major: the spiral of vertex `v` is
/// `indices[v * length..(v + 1) * length]`. The first entry of a spiral is
/// conventionally the vertex itself.
///
/// # Example
///
/// ```
/// use ml_types::SpiralTable;
///
/// let table = SpiralTable::from_rows(&[vec![0, 1, 2], vec![1, 2, 0], vec![2, 0, 1]]).unwrap();
/// assert_eq!(table.vertex_count(), 3);
/// assert_eq!(table.length(), 3);
/// assert_eq!(table.spiral(1), Some(&[1, 2, 0][..]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpiralTable {
    vertex_count: usize,
    length: usize,
    indices: Vec<u32>,
}

impl SpiralTable {
    /// Creates a table from a flat row-major index buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is not `vertex_count * length` long or
    /// any index is `>= vertex_count`.
    pub fn new(vertex_count: usize, length: usize, indices: Vec<u32>) -> Result<Self> {
        let expected = vertex_count * length;
        if indices.len() != expected {
            return Err(HierarchyError::data_size_mismatch(expected, indices.len()));
        }
        let table = Self {
            vertex_count,
            length,
            indices,
        };
        table.validate()?;
        Ok(table)
    }

    /// Creates a table from one spiral per vertex.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::RaggedSpiral`] if spirals differ in length,
    /// or an index error as in [`SpiralTable::new`].
    pub fn from_rows(rows: &[Vec<u32>]) -> Result<Self> {
        let length = rows.first().map_or(0, Vec::len);
        let mut indices = Vec::with_capacity(rows.len() * length);
        for (vertex, row) in rows.iter().enumerate() {
            if row.len() != length {
                return Err(HierarchyError::RaggedSpiral {
                    vertex,
                    expected: length,
                    actual: row.len(),
                });
            }
            indices.extend_from_slice(row);
        }
        Self::new(rows.len(), length, indices)
    }

    /// Checks that every index addresses a vertex of this level.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::IndexOutOfRange`] for the first bad index.
    pub fn validate(&self) -> Result<()> {
        if self.indices.len() != self.vertex_count * self.length {
            return Err(HierarchyError::data_size_mismatch(
                self.vertex_count * self.length,
                self.indices.len(),
            ));
        }
        match self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.vertex_count)
        {
            Some(&index) => Err(HierarchyError::index_out_of_range(
                "spiral",
                index,
                self.vertex_count,
            )),
            None => Ok(()),
        }
    }

    /// Number of vertices at this level.
    #[must_use]
    pub const fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Spiral length (neighbors per vertex).
    #[must_use]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Flat row-major indices.
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Spiral of one vertex.
    #[must_use]
    pub fn spiral(&self, vertex: usize) -> Option<&[u32]> {
        if vertex >= self.vertex_count {
            return None;
        }
        let start = vertex * self.length;
        self.indices.get(start..start + self.length)
    }
}
