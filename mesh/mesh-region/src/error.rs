//! Error types for mesh region operations.

use thiserror::Error;

/// Result type for region operations.
pub type RegionResult<T> = Result<T, RegionError>;

/// Errors that can occur during region operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegionError {
    /// The color source cannot be turned into one color key per vertex.
    #[error("unsupported color source: {reason}")]
    UnsupportedColorSource {
        /// Why the source was rejected.
        reason: String,
    },

    /// The specified region was not found.
    #[error("region '{key}' not found")]
    RegionNotFound {
        /// The missing region key.
        key: String,
    },

    /// An invalid vertex index was provided.
    #[error("invalid vertex index {index} (mesh has {vertex_count} vertices)")]
    InvalidVertexIndex {
        /// The invalid index.
        index: u32,
        /// Total number of vertices in the mesh.
        vertex_count: usize,
    },

    /// A color key string could not be parsed.
    #[error("invalid color key '{input}': expected 3 or 4 comma-separated values in 0-255")]
    InvalidColorKey {
        /// The rejected input.
        input: String,
    },

    /// The mesh is empty.
    #[error("mesh is empty")]
    EmptyMesh,
}

impl RegionError {
    /// Creates an unsupported color source error.
    #[must_use]
    pub fn unsupported_color_source(reason: impl Into<String>) -> Self {
        Self::UnsupportedColorSource {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RegionError::unsupported_color_source("5 color channels");
        assert!(err.to_string().contains("5 color channels"));

        let err = RegionError::InvalidVertexIndex {
            index: 12,
            vertex_count: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains("10"));

        let err = RegionError::RegionNotFound {
            key: "255,0,0,255".to_string(),
        };
        assert!(err.to_string().contains("255,0,0,255"));
    }
}
