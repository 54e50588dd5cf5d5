//! Color-region segmentation and vertex pruning for template meshes.
//!
//! Template meshes label their anatomical regions by painting each one a
//! flat vertex color. This crate recovers those regions and prepares the
//! template for the autoencoder.
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero ML dependencies**. It only needs
//! `mesh-types` and can be used from CLI tools and data pipelines.
//!
//! # Overview
//!
//! - [`VertexAdjacency`] - One-ring neighbors and the random-walk Laplacian
//! - [`ColorKey`] / [`ColorSource`] - Exact color identity and where colors come from
//! - [`segment_by_color`] - Split a mesh into [`Region`]s of feature and contour vertices
//! - [`prune_vertices`] - Remove vertices, drop incident faces, reindex the rest
//! - [`prepare_template`] - Segment, optionally excise a region, re-segment
//!
//! # Quick Start
//!
//! ```
//! use mesh_types::{IndexedMesh, Vertex, VertexColor};
//! use mesh_region::{prepare_template, ColorKey};
//!
//! let mut mesh = IndexedMesh::new();
//! for i in 0..6 {
//!     let color = if i < 3 { VertexColor::RED } else { VertexColor::BLUE };
//!     mesh.vertices.push(Vertex::from_coords(f64::from(i), 0.0, 0.0).with_color(color));
//! }
//! mesh.faces.push([0, 1, 2]);
//! mesh.faces.push([3, 4, 5]);
//!
//! // Drop the red patch and keep the blue one.
//! let template = prepare_template(&mesh, Some(ColorKey::from(VertexColor::RED))).unwrap();
//! assert_eq!(template.mesh.vertices.len(), 3);
//! assert_eq!(template.regions.len(), 1);
//! ```
//!
//! # Quality Standards
//!
//! - Zero clippy/doc warnings
//! - Zero `unwrap`/`expect` in library code

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod adjacency;
mod color;
mod error;
mod prune;
mod segment;
mod template;

pub use adjacency::VertexAdjacency;
pub use color::{ColorKey, ColorSource};
pub use error::{RegionError, RegionResult};
pub use prune::{prune_vertices, KeepMask, PrunedMesh};
pub use segment::{segment_by_color, Region, RegionMap, MIN_FEATURE_VERTICES};
pub use template::{prepare_template, Template};

// Re-export for convenience
pub use mesh_types::{IndexedMesh, Vertex, VertexColor};
