//! Vertex adjacency derived from mesh faces.
//!
//! Provides one-ring neighbor lookups and the random-walk graph Laplacian of
//! the edge graph.

use hashbrown::HashSet;

use crate::error::{RegionError, RegionResult};

/// Undirected vertex adjacency graph of a triangle mesh.
///
/// Every face contributes its three edges; duplicate edges are merged.
/// Neighbor lists are sorted by vertex index, which fixes the enumeration
/// order used by region absorption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAdjacency {
    /// Sorted one-ring neighbors, indexed by vertex.
    neighbors: Vec<Vec<u32>>,
    /// Number of unique undirected edges.
    edge_count: usize,
}

impl VertexAdjacency {
    /// Build adjacency for `vertex_count` vertices from triangle faces.
    ///
    /// Vertices that appear in no face get an empty one-ring.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::InvalidVertexIndex`] if a face references a
    /// vertex `>= vertex_count`.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_region::VertexAdjacency;
    ///
    /// let adj = VertexAdjacency::build(4, &[[0, 1, 2], [1, 3, 2]]).unwrap();
    /// assert_eq!(adj.neighbors(1), &[0, 2, 3]);
    /// assert_eq!(adj.edge_count(), 5);
    /// ```
    pub fn build(vertex_count: usize, faces: &[[u32; 3]]) -> RegionResult<Self> {
        let mut edges: HashSet<(u32, u32)> = HashSet::with_capacity(faces.len() * 3 / 2);

        for face in faces {
            for &v in face {
                if v as usize >= vertex_count {
                    return Err(RegionError::InvalidVertexIndex {
                        index: v,
                        vertex_count,
                    });
                }
            }
            edges.insert(normalize_edge(face[0], face[1]));
            edges.insert(normalize_edge(face[1], face[2]));
            edges.insert(normalize_edge(face[2], face[0]));
        }
        // Degenerate faces can produce self-loops.
        edges.retain(|&(a, b)| a != b);

        let mut neighbors = vec![Vec::new(); vertex_count];
        for &(a, b) in &edges {
            neighbors[a as usize].push(b);
            neighbors[b as usize].push(a);
        }
        for ring in &mut neighbors {
            ring.sort_unstable();
        }

        Ok(Self {
            neighbors,
            edge_count: edges.len(),
        })
    }

    /// One-ring neighbors of `vertex`, sorted ascending.
    ///
    /// Returns an empty slice for out-of-range vertices.
    #[must_use]
    pub fn neighbors(&self, vertex: u32) -> &[u32] {
        self.neighbors
            .get(vertex as usize)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of vertices covered by this graph.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Number of unique undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Degree of `vertex` (size of its one-ring).
    #[must_use]
    pub fn degree(&self, vertex: u32) -> usize {
        self.neighbors(vertex).len()
    }

    /// Random-walk normalized Laplacian `L = I - D⁻¹A` as sparse
    /// `(row, col, value)` triples.
    ///
    /// Rows are emitted in vertex order, the diagonal first. Isolated
    /// vertices keep only their unit diagonal.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn random_walk_laplacian(&self) -> Vec<(u32, u32, f64)> {
        let mut entries = Vec::with_capacity(self.vertex_count() + 2 * self.edge_count);
        for (row, ring) in self.neighbors.iter().enumerate() {
            let row = row as u32;
            entries.push((row, row, 1.0));
            if ring.is_empty() {
                continue;
            }
            let weight = -1.0 / ring.len() as f64;
            entries.extend(ring.iter().map(|&col| (row, col, weight)));
        }
        entries
    }
}

/// Normalize edge direction so v0 < v1.
#[inline]
fn normalize_edge(v0: u32, v1: u32) -> (u32, u32) {
    if v0 < v1 { (v0, v1) } else { (v1, v0) }
}
