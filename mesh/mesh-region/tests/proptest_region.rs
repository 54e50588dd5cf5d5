//! Property-based tests for pruning and segmentation.
//!
//! Run with: cargo test -p mesh-region -- proptest

use std::collections::BTreeSet;

use mesh_region::{prune_vertices, segment_by_color, MIN_FEATURE_VERTICES};
use mesh_types::{IndexedMesh, Vertex, VertexColor};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

const PALETTE: [VertexColor; 3] = [VertexColor::RED, VertexColor::GREEN, VertexColor::BLUE];

/// Generate a colored mesh with valid face indices.
fn arb_colored_mesh(max_vertices: usize, max_faces: usize) -> impl Strategy<Value = IndexedMesh> {
    (3..=max_vertices).prop_flat_map(move |n| {
        let colors = prop::collection::vec(0..PALETTE.len(), n);
        #[allow(clippy::cast_possible_truncation)]
        let face = prop::array::uniform3(0..n as u32);
        let faces = prop::collection::vec(face, 0..=max_faces);
        (colors, faces).prop_map(|(colors, faces)| {
            let vertices = colors
                .iter()
                .enumerate()
                .map(|(i, &c)| {
                    #[allow(clippy::cast_precision_loss)]
                    let x = i as f64;
                    Vertex::from_coords(x, 0.0, 0.0).with_color(PALETTE[c])
                })
                .collect();
            IndexedMesh::from_parts(vertices, faces)
        })
    })
}

/// A mesh together with a removal list (possibly with duplicates).
fn arb_mesh_and_removal() -> impl Strategy<Value = (IndexedMesh, Vec<u32>)> {
    arb_colored_mesh(30, 40).prop_flat_map(|mesh| {
        #[allow(clippy::cast_possible_truncation)]
        let n = mesh.vertices.len() as u32;
        let removal = prop::collection::vec(0..n, 0..n as usize);
        (Just(mesh), removal)
    })
}

// =============================================================================
// Pruning
// =============================================================================

proptest! {
    #[test]
    fn proptest_prune_keeps_only_valid_faces((mesh, remove) in arb_mesh_and_removal()) {
        let pruned = prune_vertices(&mesh, &remove).unwrap();
        let n = pruned.mesh.vertices.len();
        let distinct: BTreeSet<u32> = remove.iter().copied().collect();

        prop_assert_eq!(n, mesh.vertices.len() - distinct.len());
        prop_assert_eq!(pruned.keep_mask.kept_len(), n);
        for &v in &distinct {
            prop_assert!(!pruned.keep_mask.is_kept(v as usize));
        }
        for face in &pruned.mesh.faces {
            for &v in face {
                prop_assert!((v as usize) < n);
            }
        }
    }

    #[test]
    fn proptest_prune_face_count_matches_survivors((mesh, remove) in arb_mesh_and_removal()) {
        let pruned = prune_vertices(&mesh, &remove).unwrap();
        let expected = mesh
            .faces
            .iter()
            .filter(|f| f.iter().all(|&v| !remove.contains(&v)))
            .count();
        prop_assert_eq!(pruned.mesh.faces.len(), expected);
    }

    #[test]
    fn proptest_prune_preserves_vertex_order((mesh, remove) in arb_mesh_and_removal()) {
        let pruned = prune_vertices(&mesh, &remove).unwrap();
        let expected = pruned.keep_mask.apply(&mesh.vertices);
        prop_assert_eq!(pruned.mesh.vertices, expected);
    }
}

// =============================================================================
// Segmentation
// =============================================================================

proptest! {
    #[test]
    fn proptest_segmentation_is_deterministic(mesh in arb_colored_mesh(40, 60)) {
        let first = segment_by_color(&mesh).unwrap();
        let second = segment_by_color(&mesh).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn proptest_surviving_regions_are_large_enough(mesh in arb_colored_mesh(40, 60)) {
        let regions = segment_by_color(&mesh).unwrap();
        for (_, region) in regions.iter() {
            prop_assert!(region.feature.len() >= MIN_FEATURE_VERTICES);
        }
    }
}
