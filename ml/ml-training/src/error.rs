//! Error types for ml-training crate.

use thiserror::Error;

/// Errors that can occur while configuring or running training.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// Invalid experiment or training configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Model construction or forward pass failed.
    #[error("model error: {0}")]
    Model(String),

    /// Template mesh could not be loaded or segmented.
    #[error("template error: {0}")]
    Template(String),

    /// Mesh hierarchy could not be loaded or is inconsistent.
    #[error("hierarchy error: {0}")]
    Hierarchy(String),

    /// Checkpoint error.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// Loss computation error.
    #[error("loss error: {0}")]
    Loss(String),

    /// Numerical instability detected.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),
}

impl TrainingError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Creates a model error.
    #[must_use]
    pub fn model(reason: impl Into<String>) -> Self {
        Self::Model(reason.into())
    }

    /// Creates a template error.
    #[must_use]
    pub fn template(reason: impl Into<String>) -> Self {
        Self::Template(reason.into())
    }

    /// Creates a checkpoint error.
    #[must_use]
    pub fn checkpoint(reason: impl Into<String>) -> Self {
        Self::Checkpoint(reason.into())
    }

    /// Creates a loss error.
    #[must_use]
    pub fn loss(reason: impl Into<String>) -> Self {
        Self::Loss(reason.into())
    }

    /// Creates a numerical instability error.
    #[must_use]
    pub fn numerical_instability(reason: impl Into<String>) -> Self {
        Self::NumericalInstability(reason.into())
    }
}

impl From<std::io::Error> for TrainingError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TrainingError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

impl From<ml_models::ModelError> for TrainingError {
    fn from(err: ml_models::ModelError) -> Self {
        match err {
            ml_models::ModelError::CheckpointNotFound(_)
            | ml_models::ModelError::LoadCheckpoint { .. }
            | ml_models::ModelError::SaveCheckpoint { .. } => Self::Checkpoint(err.to_string()),
            other => Self::Model(other.to_string()),
        }
    }
}

impl From<ml_types::HierarchyError> for TrainingError {
    fn from(err: ml_types::HierarchyError) -> Self {
        Self::Hierarchy(err.to_string())
    }
}

impl From<mesh_region::RegionError> for TrainingError {
    fn from(err: mesh_region::RegionError) -> Self {
        Self::Template(err.to_string())
    }
}

impl From<mesh_io::IoError> for TrainingError {
    fn from(err: mesh_io::IoError) -> Self {
        Self::Template(err.to_string())
    }
}

/// Result type for training operations.
pub type Result<T> = std::result::Result<T, TrainingError>;
