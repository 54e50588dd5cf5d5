//! Vertex removal with face reindexing.

use mesh_types::{IndexedMesh, MeshTopology};
use tracing::debug;

use crate::error::{RegionError, RegionResult};

/// Which original vertices survived a prune.
///
/// Lets per-vertex arrays computed on the unpruned mesh (colors, labels,
/// attributes) be re-aligned to the pruned one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepMask {
    keep: Vec<bool>,
}

impl KeepMask {
    /// Mask that keeps every one of `vertex_count` vertices.
    #[must_use]
    pub fn all(vertex_count: usize) -> Self {
        Self {
            keep: vec![true; vertex_count],
        }
    }

    /// Whether original vertex `index` was kept.
    #[must_use]
    pub fn is_kept(&self, index: usize) -> bool {
        self.keep.get(index).copied().unwrap_or(false)
    }

    /// Number of vertices in the original mesh.
    #[must_use]
    pub fn original_len(&self) -> usize {
        self.keep.len()
    }

    /// Number of surviving vertices.
    #[must_use]
    pub fn kept_len(&self) -> usize {
        self.keep.iter().filter(|&&k| k).count()
    }

    /// Raw mask, one entry per original vertex.
    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.keep
    }

    /// Filter a per-vertex array down to the surviving vertices.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_region::KeepMask;
    ///
    /// let mask = KeepMask::all(3);
    /// assert_eq!(mask.apply(&["a", "b", "c"]), vec!["a", "b", "c"]);
    /// ```
    #[must_use]
    pub fn apply<T: Clone>(&self, values: &[T]) -> Vec<T> {
        values
            .iter()
            .zip(&self.keep)
            .filter_map(|(v, &keep)| keep.then(|| v.clone()))
            .collect()
    }
}

/// A mesh with vertices removed, plus the mask describing the removal.
#[derive(Debug, Clone)]
pub struct PrunedMesh {
    /// The reindexed mesh.
    pub mesh: IndexedMesh,
    /// Surviving vertices of the input mesh.
    pub keep_mask: KeepMask,
}

/// Remove the listed vertices and every face touching them.
///
/// A face survives only if all three of its vertices survive; surviving
/// faces are remapped to the compacted vertex numbering. Vertex attributes
/// travel with their vertex. Duplicate indices in `remove` are allowed and
/// an empty list is a no-op.
///
/// # Errors
///
/// Returns [`RegionError::InvalidVertexIndex`] if any index in `remove` is
/// out of range.
///
/// # Example
///
/// ```
/// use mesh_types::{IndexedMesh, Vertex};
/// use mesh_region::prune_vertices;
///
/// let mut mesh = IndexedMesh::new();
/// for i in 0..4 {
///     mesh.vertices.push(Vertex::from_coords(f64::from(i), 0.0, 0.0));
/// }
/// mesh.faces.push([0, 1, 2]);
/// mesh.faces.push([1, 3, 2]);
///
/// let pruned = prune_vertices(&mesh, &[0]).unwrap();
/// assert_eq!(pruned.mesh.vertices.len(), 3);
/// assert_eq!(pruned.mesh.faces, vec![[0, 2, 1]]);
/// ```
pub fn prune_vertices(mesh: &IndexedMesh, remove: &[u32]) -> RegionResult<PrunedMesh> {
    let vertex_count = mesh.vertex_count();
    let mut keep = vec![true; vertex_count];
    for &index in remove {
        let slot = keep
            .get_mut(index as usize)
            .ok_or(RegionError::InvalidVertexIndex {
                index,
                vertex_count,
            })?;
        *slot = false;
    }

    // Old index → new index; None for removed vertices.
    let mut remap: Vec<Option<u32>> = Vec::with_capacity(vertex_count);
    let mut next = 0u32;
    for &kept in &keep {
        if kept {
            remap.push(Some(next));
            next += 1;
        } else {
            remap.push(None);
        }
    }

    let vertices = mesh
        .vertices
        .iter()
        .zip(&keep)
        .filter_map(|(v, &kept)| kept.then(|| v.clone()))
        .collect();

    let faces: Vec<[u32; 3]> = mesh
        .faces
        .iter()
        .filter_map(|face| {
            let a = remap.get(face[0] as usize).copied().flatten()?;
            let b = remap.get(face[1] as usize).copied().flatten()?;
            let c = remap.get(face[2] as usize).copied().flatten()?;
            Some([a, b, c])
        })
        .collect();

    debug!(
        removed = vertex_count - next as usize,
        faces_removed = mesh.face_count() - faces.len(),
        "Pruned vertices"
    );

    Ok(PrunedMesh {
        mesh: IndexedMesh::from_parts(vertices, faces),
        keep_mask: KeepMask { keep },
    })
}
