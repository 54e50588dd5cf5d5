//! Mesh file I/O for colored template meshes.
//!
//! Template meshes are stored as **PLY** (binary or ASCII) with per-vertex
//! RGBA colors that label anatomical regions.
//!
//! # Example
//!
//! ```no_run
//! use mesh_io::{load_mesh, save_mesh};
//!
//! let mesh = load_mesh("template.ply").unwrap();
//! save_mesh(&mesh, "template_copy.ply").unwrap();
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod ply;

pub use error::{IoError, IoResult};
pub use ply::{load_ply, save_ply};

use std::path::Path;

use mesh_types::IndexedMesh;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    /// PLY (Polygon File Format).
    Ply,
}

impl MeshFormat {
    /// Detect format from a file extension (case-insensitive).
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "ply" => Some(Self::Ply),
            _ => None,
        }
    }

    /// Detect format from a file path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

fn detect_format(path: &Path) -> IoResult<MeshFormat> {
    MeshFormat::from_path(path).ok_or_else(|| IoError::UnknownFormat {
        extension: path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_string(),
    })
}

/// Load a mesh, detecting the format from the file extension.
///
/// # Errors
///
/// Returns [`IoError::UnknownFormat`] for unsupported extensions, or the
/// format-specific loader's error.
pub fn load_mesh<P: AsRef<Path>>(path: P) -> IoResult<IndexedMesh> {
    let path = path.as_ref();
    match detect_format(path)? {
        MeshFormat::Ply => load_ply(path),
    }
}

/// Save a mesh, detecting the format from the file extension.
///
/// PLY files are written in binary little-endian.
///
/// # Errors
///
/// Returns [`IoError::UnknownFormat`] for unsupported extensions, or the
/// format-specific writer's error.
pub fn save_mesh<P: AsRef<Path>>(mesh: &IndexedMesh, path: P) -> IoResult<()> {
    let path = path.as_ref();
    match detect_format(path)? {
        MeshFormat::Ply => save_ply(mesh, path, true),
    }
}
