//! Core mesh types for the shape autoencoder workspace.
//!
//! - [`Vertex`] - A point in 3D space with an optional RGBA label color
//! - [`VertexColor`] - 8-bit RGBA color, hashable so it can key regions
//! - [`IndexedMesh`] - A triangle mesh with indexed vertices
//!
//! Template meshes are painted with one flat color per anatomical region;
//! `mesh-region` turns those colors into regions and `ml-models` consumes
//! the positions as a per-vertex signal.
//!
//! # Example
//!
//! ```
//! use mesh_types::{Vertex, VertexColor, IndexedMesh, Point3, MeshTopology};
//!
//! let mut mesh = IndexedMesh::new();
//! mesh.vertices.push(Vertex::new(Point3::new(0.0, 0.0, 0.0)).with_color(VertexColor::RED));
//! mesh.vertices.push(Vertex::new(Point3::new(1.0, 0.0, 0.0)).with_color(VertexColor::RED));
//! mesh.vertices.push(Vertex::new(Point3::new(0.5, 1.0, 0.0)).with_color(VertexColor::BLUE));
//! mesh.faces.push([0, 1, 2]);
//!
//! assert_eq!(mesh.face_count(), 1);
//! assert!(mesh.has_colors());
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod mesh;
mod traits;
mod vertex;

pub use mesh::IndexedMesh;
pub use traits::MeshTopology;
pub use vertex::{Vertex, VertexColor};

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
