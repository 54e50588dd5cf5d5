//! Multi-resolution mesh hierarchy.
//!
//! The hierarchy is built offline (mesh decimation plus spiral extraction)
//! and handed to the model fully formed. This module only stores it,
//! checks that its pieces fit together, and moves it to and from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HierarchyError, Result};
use crate::sparse::SparseOperator;
use crate::spiral::SpiralTable;

/// Spiral tables and resampling operators for every level.
///
/// Level 0 is the full-resolution template. For `n` levels:
///
/// - `spirals[k]` covers the vertices of level `k`
/// - `down[k]` maps level `k` to level `k + 1` (`down[n - 1]` maps to the
///   coarsest latent grid)
/// - `up[k]` maps back from `down[k]`'s output to level `k`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshHierarchy {
    /// Spiral table per level, finest first.
    pub spirals: Vec<SpiralTable>,
    /// Down-transform per level, finest first.
    pub down: Vec<SparseOperator>,
    /// Up-transform per level, finest first.
    pub up: Vec<SparseOperator>,
}

impl MeshHierarchy {
    /// Creates and validates a hierarchy.
    ///
    /// # Errors
    ///
    /// See [`MeshHierarchy::validate`].
    pub fn new(
        spirals: Vec<SpiralTable>,
        down: Vec<SparseOperator>,
        up: Vec<SparseOperator>,
    ) -> Result<Self> {
        let hierarchy = Self { spirals, down, up };
        hierarchy.validate()?;
        Ok(hierarchy)
    }

    /// Checks that every level connects to the next.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Empty`], [`HierarchyError::LevelCountMismatch`],
    /// [`HierarchyError::ShapeMismatch`] when an operator's dimensions do not
    /// match the spiral tables around it, or any per-artifact error.
    pub fn validate(&self) -> Result<()> {
        let levels = self.spirals.len();
        if levels == 0 {
            return Err(HierarchyError::Empty);
        }
        if self.down.len() != levels || self.up.len() != levels {
            return Err(HierarchyError::LevelCountMismatch {
                spirals: levels,
                down: self.down.len(),
                up: self.up.len(),
            });
        }

        for (k, ((spiral, down), up)) in self.spirals.iter().zip(&self.down).zip(&self.up).enumerate() {
            spiral.validate()?;
            down.validate()?;
            up.validate()?;

            let vertices = spiral.vertex_count();
            check(format!("down[{k}] cols"), vertices, down.cols())?;
            check(format!("up[{k}] rows"), vertices, up.rows())?;
            check(format!("up[{k}] cols"), down.rows(), up.cols())?;
            if let Some(next) = self.spirals.get(k + 1) {
                check(format!("down[{k}] rows"), next.vertex_count(), down.rows())?;
            }
        }
        Ok(())
    }

    /// Number of levels.
    #[must_use]
    pub fn levels(&self) -> usize {
        self.spirals.len()
    }

    /// Vertex count of the full-resolution template.
    #[must_use]
    pub fn template_vertex_count(&self) -> usize {
        self.spirals.first().map_or(0, SpiralTable::vertex_count)
    }

    /// Vertex count after the last down-transform.
    #[must_use]
    pub fn coarsest_vertex_count(&self) -> usize {
        self.down.last().map_or(0, SparseOperator::rows)
    }

    /// Parse and validate a hierarchy from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Serialization`] on malformed JSON or any
    /// validation error.
    pub fn from_json(json: &str) -> Result<Self> {
        let hierarchy: Self = serde_json::from_str(json)?;
        hierarchy.validate()?;
        Ok(hierarchy)
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Serialization`] on failure.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load and validate a hierarchy from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Io`] if the file cannot be read, otherwise as
    /// [`MeshHierarchy::from_json`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Write the hierarchy to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Io`] or [`HierarchyError::Serialization`].
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

fn check(location: String, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(HierarchyError::ShapeMismatch {
            location,
            expected,
            actual,
        })
    }
}
