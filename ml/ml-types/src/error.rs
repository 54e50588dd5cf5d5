//! Error types for ml-types crate.

use thiserror::Error;

/// Result type for hierarchy operations.
pub type Result<T> = std::result::Result<T, HierarchyError>;

/// Errors raised when building or validating hierarchy artifacts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// The hierarchy has no levels.
    #[error("hierarchy has no levels")]
    Empty,

    /// Spiral tables and transforms disagree on the number of levels.
    #[error("level count mismatch: {spirals} spiral tables, {down} down-transforms, {up} up-transforms")]
    LevelCountMismatch {
        /// Number of spiral tables.
        spirals: usize,
        /// Number of down-transforms.
        down: usize,
        /// Number of up-transforms.
        up: usize,
    },

    /// A spiral row has the wrong length.
    #[error("spiral for vertex {vertex} has length {actual}, expected {expected}")]
    RaggedSpiral {
        /// Vertex whose spiral is ragged.
        vertex: usize,
        /// Common spiral length.
        expected: usize,
        /// Length found.
        actual: usize,
    },

    /// An index points outside its valid range.
    #[error("{what} index {index} out of range (size {size})")]
    IndexOutOfRange {
        /// What was being indexed.
        what: String,
        /// The offending index.
        index: u32,
        /// Valid exclusive upper bound.
        size: usize,
    },

    /// Two connected artifacts disagree on a dimension.
    #[error("shape mismatch at {location}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Where the mismatch was found.
        location: String,
        /// Expected size.
        expected: usize,
        /// Actual size.
        actual: usize,
    },

    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    DataSizeMismatch {
        /// Expected size.
        expected: usize,
        /// Actual size.
        actual: usize,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),
}

impl HierarchyError {
    /// Creates an index-out-of-range error.
    #[must_use]
    pub fn index_out_of_range(what: impl Into<String>, index: u32, size: usize) -> Self {
        Self::IndexOutOfRange {
            what: what.into(),
            index,
            size,
        }
    }

    /// Creates a shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(location: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            location: location.into(),
            expected,
            actual,
        }
    }

    /// Creates a data size mismatch error.
    #[must_use]
    pub const fn data_size_mismatch(expected: usize, actual: usize) -> Self {
        Self::DataSizeMismatch { expected, actual }
    }
}

impl From<std::io::Error> for HierarchyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for HierarchyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
