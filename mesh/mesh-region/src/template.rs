//! Template mesh preparation.
//!
//! A template is the colored reference mesh every training shape is in
//! correspondence with. Preparing it segments the regions, optionally cuts
//! one region out of the surface, and computes the graph Laplacian used by
//! smoothness terms.

use mesh_types::{IndexedMesh, MeshTopology};
use tracing::{debug, info};

use crate::adjacency::VertexAdjacency;
use crate::color::ColorKey;
use crate::error::RegionResult;
use crate::prune::{prune_vertices, KeepMask};
use crate::segment::{segment_by_color, RegionMap};

/// A segmented template mesh ready for hierarchy construction.
#[derive(Debug, Clone)]
pub struct Template {
    /// Final mesh, after any region excision.
    pub mesh: IndexedMesh,
    /// Regions of the final mesh.
    pub regions: RegionMap,
    /// Which vertices of the input mesh survive in `mesh`.
    pub keep_mask: KeepMask,
    /// Random-walk Laplacian `I - D⁻¹A` of `mesh` as `(row, col, value)`.
    pub laplacian: Vec<(u32, u32, f64)>,
}

/// Segment a colored template and optionally excise one region.
///
/// When `remove` names a region, all of its vertices (feature and contour)
/// are pruned from the mesh and the remainder is segmented again, so region
/// indices always refer to the returned mesh.
///
/// # Errors
///
/// Returns [`RegionError::RegionNotFound`](crate::RegionError::RegionNotFound)
/// if `remove` names a color not present after segmentation, or any error
/// from [`segment_by_color`].
///
/// # Example
///
/// ```
/// use mesh_types::{IndexedMesh, Vertex, VertexColor};
/// use mesh_region::prepare_template;
///
/// let mut mesh = IndexedMesh::new();
/// for i in 0..4 {
///     mesh.vertices.push(Vertex::from_coords(f64::from(i), 0.0, 0.0).with_color(VertexColor::RED));
/// }
/// mesh.faces.push([0, 1, 2]);
/// mesh.faces.push([1, 3, 2]);
///
/// let template = prepare_template(&mesh, None).unwrap();
/// assert_eq!(template.regions.len(), 1);
/// assert_eq!(template.keep_mask.kept_len(), 4);
/// ```
pub fn prepare_template(mesh: &IndexedMesh, remove: Option<ColorKey>) -> RegionResult<Template> {
    let regions = segment_by_color(mesh)?;

    let (mesh, regions, keep_mask) = match remove {
        None => (mesh.clone(), regions, KeepMask::all(mesh.vertex_count())),
        Some(key) => {
            let excised = regions.require(key)?.all_vertices();
            let pruned = prune_vertices(mesh, &excised)?;
            info!(
                region = %key,
                removed = excised.len(),
                remaining = pruned.mesh.vertex_count(),
                "Excised template region"
            );
            let regions = segment_by_color(&pruned.mesh)?;
            (pruned.mesh, regions, pruned.keep_mask)
        }
    };

    let laplacian = VertexAdjacency::build(mesh.vertex_count(), &mesh.faces)?.random_walk_laplacian();

    info!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        regions = regions.len(),
        "Prepared template"
    );
    debug!(feature_counts = ?regions.feature_counts(), "Template region sizes");

    Ok(Template {
        mesh,
        regions,
        keep_mask,
        laplacian,
    })
}
