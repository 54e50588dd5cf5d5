//! End-to-end: colored template → excised mesh → hierarchy → autoencoder.

use burn::prelude::Backend;
use burn::tensor::{Tensor, TensorData};
use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;
use mesh_region::{prepare_template, ColorKey, VertexAdjacency};
use mesh_types::{IndexedMesh, Vertex, VertexColor};
use ml_models::{AutoencoderConfig, ForwardVariant, SpiralAutoencoder};
use ml_types::{MeshHierarchy, SparseOperator, SpiralTable};

type TestBackend = NdArray<f32>;
type TrainBackend = Autodiff<NdArray<f32>>;

const SPIRAL_LENGTH: usize = 3;

/// 4×4 grid, left half red, right half blue.
fn painted_grid() -> IndexedMesh {
    let (cols, rows) = (4_u32, 4_u32);
    let mut mesh = IndexedMesh::new();
    for r in 0..rows {
        for c in 0..cols {
            let color = if c < 2 { VertexColor::RED } else { VertexColor::BLUE };
            mesh.vertices
                .push(Vertex::from_coords(f64::from(c), f64::from(r), 0.1 * f64::from(r * c)).with_color(color));
        }
    }
    for r in 0..rows - 1 {
        for c in 0..cols - 1 {
            let v = r * cols + c;
            mesh.faces.push([v, v + 1, v + cols]);
            mesh.faces.push([v + 1, v + cols + 1, v + cols]);
        }
    }
    mesh
}

/// Spiral of `v`: itself, then its lowest-numbered neighbors, padded with `v`.
fn spirals_from_mesh(mesh: &IndexedMesh) -> SpiralTable {
    let adjacency = VertexAdjacency::build(mesh.vertices.len(), &mesh.faces).unwrap();
    let rows: Vec<Vec<u32>> = (0..mesh.vertices.len())
        .map(|v| {
            let v = u32::try_from(v).unwrap();
            let mut spiral = vec![v];
            spiral.extend(adjacency.neighbors(v).iter().copied().take(SPIRAL_LENGTH - 1));
            spiral.resize(SPIRAL_LENGTH, v);
            spiral
        })
        .collect();
    SpiralTable::from_rows(&rows).unwrap()
}

fn ring_spirals(n: u32) -> SpiralTable {
    let rows: Vec<Vec<u32>> = (0..n).map(|v| vec![v, (v + 1) % n, (v + n - 1) % n]).collect();
    SpiralTable::from_rows(&rows).unwrap()
}

/// Averages vertex pairs `(2i, 2i + 1)` into vertex `i`.
fn pair_down(fine: u32) -> SparseOperator {
    let triples: Vec<_> = (0..fine).map(|v| (v / 2, v, 0.5)).collect();
    SparseOperator::from_triples(fine as usize / 2, fine as usize, &triples).unwrap()
}

/// Copies vertex `i` into vertices `2i` and `2i + 1`.
fn pair_up(fine: u32) -> SparseOperator {
    let triples: Vec<_> = (0..fine).map(|v| (v, v / 2, 1.0)).collect();
    SparseOperator::from_triples(fine as usize, fine as usize / 2, &triples).unwrap()
}

fn positions<B: Backend>(mesh: &IndexedMesh, batch: usize, device: &B::Device) -> Tensor<B, 3> {
    let single = mesh.positions_f32();
    let vertices = single.len() / 3;
    let data: Vec<f32> = (0..batch)
        .flat_map(|i| single.iter().map(move |p| p + 0.01 * i as f32))
        .collect();
    Tensor::from_data(TensorData::new(data, [batch, vertices, 3]), device)
}

fn prepared() -> (IndexedMesh, MeshHierarchy) {
    let template = prepare_template(&painted_grid(), Some(ColorKey::from(VertexColor::RED))).unwrap();
    assert_eq!(template.mesh.vertices.len(), 8);
    assert_eq!(template.mesh.first_dangling_face(), None);

    let hierarchy = MeshHierarchy::new(
        vec![spirals_from_mesh(&template.mesh), ring_spirals(4)],
        vec![pair_down(8), pair_down(4)],
        vec![pair_up(8), pair_up(4)],
    )
    .unwrap();
    (template.mesh, hierarchy)
}

#[test]
fn excised_template_feeds_the_autoencoder() {
    let (mesh, hierarchy) = prepared();
    assert_eq!(hierarchy.template_vertex_count(), 8);
    assert_eq!(hierarchy.coarsest_vertex_count(), 2);

    let device = <TestBackend as Backend>::Device::default();
    let config = AutoencoderConfig::new(vec![8, 16], 6).with_variational(true);
    let model = SpiralAutoencoder::<TestBackend>::new(&config, &hierarchy, &device).unwrap();

    let out = model.forward(positions(&mesh, 3, &device)).unwrap();
    assert_eq!(out.reconstruction.dims(), [3, 8, 3]);
    assert_eq!(out.latent.dims(), [3, 6]);
    assert_eq!(out.attribute_prediction.map(|p| p.dims()), Some([3, 1]));
}

#[test]
fn hierarchy_survives_json_and_builds_every_variant() {
    let (mesh, hierarchy) = prepared();
    let hierarchy = MeshHierarchy::from_json(&hierarchy.to_json().unwrap()).unwrap();
    let device = <TestBackend as Backend>::Device::default();

    for variant in ForwardVariant::ALL {
        let (mode, extra, detach) = variant.flags();
        let config = AutoencoderConfig::new(vec![4, 8], 5)
            .with_forward_mode(mode)
            .with_extra_layers(extra)
            .with_detach_features(detach)
            .with_regressor_hidden(8, 4);
        let model = SpiralAutoencoder::<TestBackend>::new(&config, &hierarchy, &device).unwrap();
        let out = model.forward(positions(&mesh, 2, &device)).unwrap();
        assert_eq!(out.reconstruction.dims(), [2, 8, 3]);
    }
}

#[test]
fn training_pass_backpropagates_to_the_input() {
    let (mesh, hierarchy) = prepared();
    let device = <TrainBackend as Backend>::Device::default();
    let config = AutoencoderConfig::new(vec![4, 8], 5).with_variational(true).with_dropout(0.0);
    let model = SpiralAutoencoder::<TrainBackend>::new(&config, &hierarchy, &device).unwrap();

    let x = positions::<TrainBackend>(&mesh, 4, &device).require_grad();
    let out = model.forward(x.clone()).unwrap();
    let loss = (out.reconstruction - x.clone()).abs().mean();
    let grads = loss.backward();

    let input_grad = x.grad(&grads).map(|g| g.abs().sum().into_scalar());
    assert!(input_grad.is_some_and(|g| g > 0.0));
}
