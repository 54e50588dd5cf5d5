//! Experiment files on disk → template, hierarchy, model, losses, checkpoints.

use burn::prelude::Backend;
use burn::tensor::{Tensor, TensorData};
use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;
use mesh_types::{IndexedMesh, Vertex, VertexColor};
use ml_models::{AutoencoderConfig, SpiralAutoencoder, load_checkpoint};
use ml_training::{
    ExperimentConfig, LossAccumulator, LossWeights, TemplateConfig, Trainer, TrainingConfig, TrainingError,
    select_rows,
};
use ml_types::{MeshHierarchy, SparseOperator, SpiralTable};

type TrainBackend = Autodiff<NdArray<f32>>;
type TestBackend = NdArray<f32>;

/// 4 columns by 5 rows; the top two rows are green and get excised,
/// leaving 12 vertices.
fn painted_grid() -> IndexedMesh {
    let mut mesh = IndexedMesh::new();
    for r in 0..5_u32 {
        for c in 0..4_u32 {
            let color = if r >= 3 { VertexColor::GREEN } else { VertexColor::BLUE };
            mesh.vertices
                .push(Vertex::from_coords(f64::from(c), f64::from(r), 0.0).with_color(color));
        }
    }
    for r in 0..4 {
        for c in 0..3 {
            let v = r * 4 + c;
            mesh.faces.push([v, v + 1, v + 4]);
            mesh.faces.push([v + 1, v + 5, v + 4]);
        }
    }
    mesh
}

fn ring_spirals(n: u32) -> SpiralTable {
    let rows: Vec<Vec<u32>> = (0..n).map(|v| vec![v, (v + 1) % n, (v + n - 1) % n]).collect();
    SpiralTable::from_rows(&rows).unwrap()
}

/// Averages `stride` consecutive vertices into one.
fn group_down(fine: u32, stride: u32) -> SparseOperator {
    #[allow(clippy::cast_precision_loss)]
    let weight = 1.0 / stride as f32;
    let triples: Vec<_> = (0..fine).map(|v| (v / stride, v, weight)).collect();
    SparseOperator::from_triples((fine / stride) as usize, fine as usize, &triples).unwrap()
}

fn group_up(fine: u32, stride: u32) -> SparseOperator {
    let triples: Vec<_> = (0..fine).map(|v| (v, v / stride, 1.0)).collect();
    SparseOperator::from_triples(fine as usize, (fine / stride) as usize, &triples).unwrap()
}

fn write_experiment(dir: &std::path::Path) -> std::path::PathBuf {
    mesh_io::save_ply(&painted_grid(), dir.join("template.ply"), true).unwrap();

    let hierarchy = MeshHierarchy::new(
        vec![ring_spirals(12), ring_spirals(4)],
        vec![group_down(12, 3), group_down(4, 2)],
        vec![group_up(12, 3), group_up(4, 2)],
    )
    .unwrap();
    hierarchy.save(dir.join("hierarchy.json")).unwrap();

    let experiment = ExperimentConfig::new(
        TemplateConfig::new(dir.join("template.ply")).with_remove_region("0,255,0"),
        dir.join("hierarchy.json"),
        dir.join("run"),
    )
    .with_model(AutoencoderConfig::new(vec![4, 8], 5).with_variational(true).with_dropout(0.0))
    .with_training(TrainingConfig::new(3).with_batch_size(2).with_seed(11))
    .with_loss(LossWeights::reconstruction_only().with_kl(0.01).with_laplacian(0.5));

    let path = dir.join("experiment.json");
    experiment.save(&path).unwrap();
    path
}

#[test]
fn experiment_drives_a_training_epoch() {
    let dir = tempfile::tempdir().unwrap();
    let experiment = ExperimentConfig::load(write_experiment(dir.path())).unwrap();

    let template = experiment.load_template().unwrap();
    assert_eq!(template.mesh.vertices.len(), 12);
    let hierarchy = experiment.load_hierarchy().unwrap();
    assert_eq!(hierarchy.template_vertex_count(), template.mesh.vertices.len());

    let device = <TrainBackend as Backend>::Device::default();
    let model = SpiralAutoencoder::<TrainBackend>::new(&experiment.model, &hierarchy, &device).unwrap();
    let mut trainer = Trainer::from_experiment(&experiment, &template).unwrap();

    let shapes = 5;
    let base = template.mesh.positions_f32();
    let data: Vec<f32> = (0..shapes)
        .flat_map(|i| base.iter().map(move |p| p * (1.0 + 0.1 * i as f32)))
        .collect();
    let positions = Tensor::<TrainBackend, 3>::from_data(TensorData::new(data, [shapes, 12, 3]), &device);
    let ages = Tensor::<TrainBackend, 2>::from_data(
        TensorData::new(vec![0.1_f32, 0.3, 0.5, 0.7, 0.9], [shapes, 1]),
        &device,
    );

    let mut state = trainer.initial_state();
    let mut epoch_losses = LossAccumulator::new();
    for indices in trainer.batches(state.epoch, shapes) {
        let batch = select_rows(positions.clone(), &indices);
        let attributes = select_rows(ages.clone(), &indices);
        let (_, losses) = trainer.losses(&model, batch, attributes, None).unwrap();

        let values = losses.values(trainer.weights());
        trainer.ensure_finite(&values, &state).unwrap();
        epoch_losses.add(&values, indices.len());

        let _grads = losses.total(trainer.weights()).backward();
        state.next_batch();
    }

    assert_eq!(state.batch, 3);
    assert_eq!(epoch_losses.samples(), shapes);
    let mean = epoch_losses.mean();
    assert!(mean.laplacian > 0.0);
    assert!(mean.total >= mean.reconstruction);
}

#[test]
fn checkpoint_resume_restores_weights() {
    let dir = tempfile::tempdir().unwrap();
    let experiment = ExperimentConfig::load(write_experiment(dir.path())).unwrap();
    let hierarchy = experiment.load_hierarchy().unwrap();
    let device = <TestBackend as Backend>::Device::default();
    let model = SpiralAutoencoder::<TestBackend>::new(&experiment.model, &hierarchy, &device).unwrap();
    let trainer = Trainer::new(experiment.training.clone(), experiment.loss);

    let checkpoints = experiment.checkpoint_dir().unwrap();
    trainer
        .save_epoch(&model, &checkpoints, "autoencoder", 2, experiment.checkpoint_format)
        .unwrap();

    let (path, epoch) = Trainer::resume_point(&checkpoints, "autoencoder").unwrap().unwrap();
    assert_eq!(epoch, 2);

    let fresh = SpiralAutoencoder::<TestBackend>::new(&experiment.model, &hierarchy, &device).unwrap();
    let restored = load_checkpoint(fresh, &path, &device).unwrap();

    let x = Tensor::<TestBackend, 3>::ones([1, 12, 3], &device);
    let expected = model.forward(x.clone()).unwrap().reconstruction.into_data().to_vec::<f32>().unwrap();
    let actual = restored.forward(x).unwrap().reconstruction.into_data().to_vec::<f32>().unwrap();
    assert_eq!(actual, expected);
}

#[test]
fn missing_region_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut experiment = ExperimentConfig::load(write_experiment(dir.path())).unwrap();
    experiment.template = experiment.template.with_remove_region("255,0,0");
    assert!(matches!(experiment.load_template(), Err(TrainingError::Template(_))));
}
