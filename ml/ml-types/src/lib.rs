//! Hierarchy artifacts consumed by the spiral mesh autoencoder.
//!
//! - [`SpiralTable`] - Fixed-length neighbor sequences for one mesh level
//! - [`SparseOperator`] - Down/up resampling operator between two levels
//! - [`MeshHierarchy`] - All levels, validated to connect end to end
//!
//! # Layer 0 Crate
//!
//! This crate has **no ML framework dependency**. Hierarchies are produced
//! by offline tooling and stored as JSON; `ml-models` turns them into
//! tensors.
//!
//! # Example
//!
//! ```
//! use ml_types::{MeshHierarchy, SparseOperator, SpiralTable};
//!
//! let spirals = vec![SpiralTable::from_rows(&[vec![0, 1], vec![1, 0]]).unwrap()];
//! let down = vec![SparseOperator::from_triples(1, 2, &[(0, 0, 0.5), (0, 1, 0.5)]).unwrap()];
//! let up = vec![SparseOperator::from_triples(2, 1, &[(0, 0, 1.0), (1, 0, 1.0)]).unwrap()];
//!
//! let hierarchy = MeshHierarchy::new(spirals, down, up).unwrap();
//! assert_eq!(hierarchy.levels(), 1);
//! assert_eq!(hierarchy.coarsest_vertex_count(), 1);
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

mod error;
mod hierarchy;
mod sparse;
mod spiral;

pub use error::{HierarchyError, Result};
pub use hierarchy::MeshHierarchy;
pub use sparse::SparseOperator;
pub use spiral::SpiralTable;
