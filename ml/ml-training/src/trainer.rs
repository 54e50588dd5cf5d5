//! Training bookkeeping and per-batch loss evaluation.
//!
//! The optimizer step itself stays with the caller: [`Trainer`] decides
//! batch order, learning rate, validation and checkpoint cadence, and turns
//! a batch into weighted losses ready for `backward()`.

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::Backend;
use burn::tensor::{Int, Tensor, TensorData};
use mesh_region::Template;
use ml_models::{
    CheckpointFormat, FactorDiscriminator, ForwardOutput, SpiralAutoencoder, latest_checkpoint, save_checkpoint,
};
use ml_types::SparseOperator;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{ExperimentConfig, TrainingConfig};
use crate::error::{Result, TrainingError};
use crate::loss::{AutoencoderLosses, LossWeights, discriminator_loss, laplacian_operator, permute_latent_dims};
use crate::metrics::{EpochMetrics, LossValues, TrainingMetrics};

/// State of a training run.
///
/// # Example
///
/// ```
/// use ml_training::TrainingState;
///
/// let state = TrainingState::new();
/// assert_eq!(state.epoch, 0);
/// assert!(!state.is_finished());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    /// Current epoch (0-indexed).
    pub epoch: usize,

    /// Current batch within epoch.
    pub batch: usize,

    /// Total epochs to run.
    pub total_epochs: usize,

    /// Best validation loss seen.
    pub best_val_loss: Option<f32>,

    /// Epochs without improvement (for early stopping).
    pub epochs_without_improvement: usize,

    /// Whether training has finished.
    pub finished: bool,

    /// Accumulated metrics.
    pub metrics: TrainingMetrics,
}

impl Default for TrainingState {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingState {
    /// Creates a new training state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: 0,
            batch: 0,
            total_epochs: 0,
            best_val_loss: None,
            epochs_without_improvement: 0,
            finished: false,
            metrics: TrainingMetrics::new(),
        }
    }

    /// Creates a training state for the given config.
    #[must_use]
    pub fn from_config(config: &TrainingConfig) -> Self {
        Self {
            total_epochs: config.epochs,
            ..Self::new()
        }
    }

    /// Creates a state that continues after `completed` epochs.
    #[must_use]
    pub fn resumed(config: &TrainingConfig, completed: usize) -> Self {
        Self {
            epoch: completed,
            finished: completed >= config.epochs,
            ..Self::from_config(config)
        }
    }

    /// Returns true if training is finished.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns the progress as a fraction [0, 1].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f32 {
        if self.total_epochs == 0 {
            0.0
        } else {
            self.epoch as f32 / self.total_epochs as f32
        }
    }

    /// Advances to the next epoch.
    pub const fn next_epoch(&mut self) {
        self.epoch += 1;
        self.batch = 0;
        if self.epoch >= self.total_epochs {
            self.finished = true;
        }
    }

    /// Advances to the next batch.
    pub const fn next_batch(&mut self) {
        self.batch += 1;
    }

    /// Records validation loss and checks for improvement.
    ///
    /// Returns true if this is a new best.
    pub fn record_val_loss(&mut self, val_loss: f32) -> bool {
        let improved = self.best_val_loss.map_or(true, |best| val_loss < best);
        if improved {
            self.best_val_loss = Some(val_loss);
            self.epochs_without_improvement = 0;
        } else {
            self.epochs_without_improvement += 1;
        }
        improved
    }

    /// Checks if early stopping should trigger.
    #[must_use]
    pub const fn should_early_stop(&self, patience: usize) -> bool {
        patience > 0 && self.epochs_without_improvement >= patience
    }

    /// Marks training as early stopped.
    pub fn early_stop(&mut self, reason: impl Into<String>) {
        self.finished = true;
        self.metrics.set_early_stopped(reason);
    }
}

/// Drives one autoencoder training run.
///
/// # Example
///
/// ```
/// use ml_training::{LossWeights, Trainer, TrainingConfig};
///
/// let mut trainer = Trainer::new(TrainingConfig::new(10).with_batch_size(4).with_seed(1), LossWeights::default());
/// let batches = trainer.batches(0, 10);
/// assert_eq!(batches.len(), 3);
/// assert_eq!(trainer.num_batches(10), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
    weights: LossWeights,
    laplacian: Option<SparseOperator>,
    rng: StdRng,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new(TrainingConfig::default(), LossWeights::default())
    }
}

impl Trainer {
    /// Creates a trainer; an unseeded config draws its seed from entropy.
    #[must_use]
    pub fn new(config: TrainingConfig, weights: LossWeights) -> Self {
        let rng = config.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            config,
            weights,
            laplacian: None,
            rng,
        }
    }

    /// Creates a trainer for an experiment over its prepared template.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::Template`] if the template Laplacian is
    /// malformed.
    pub fn from_experiment(experiment: &ExperimentConfig, template: &Template) -> Result<Self> {
        let mut trainer = Self::new(experiment.training.clone(), experiment.loss);
        if experiment.loss.laplacian > 0.0 {
            trainer.laplacian = Some(laplacian_operator(template)?);
        }
        Ok(trainer)
    }

    /// Sets the Laplacian operator used by the smoothness term.
    #[must_use]
    pub fn with_laplacian(mut self, laplacian: SparseOperator) -> Self {
        self.laplacian = Some(laplacian);
        self
    }

    /// Returns the training configuration.
    #[must_use]
    pub const fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Returns the loss weights.
    #[must_use]
    pub const fn weights(&self) -> &LossWeights {
        &self.weights
    }

    /// Creates initial training state.
    #[must_use]
    pub fn initial_state(&self) -> TrainingState {
        TrainingState::from_config(&self.config)
    }

    /// Autoencoder learning rate for `epoch`.
    #[must_use]
    pub fn compute_lr(&self, epoch: usize) -> f32 {
        self.config
            .lr_schedule
            .compute_lr(self.config.optimizer.learning_rate, epoch, self.config.epochs)
    }

    /// Returns whether validation should run this epoch.
    #[must_use]
    pub const fn should_validate(&self, epoch: usize) -> bool {
        self.config.val_frequency > 0 && (epoch + 1) % self.config.val_frequency == 0
    }

    /// Returns whether a checkpoint should be saved this epoch.
    #[must_use]
    pub const fn should_checkpoint(&self, epoch: usize) -> bool {
        self.config.checkpoint_frequency > 0 && (epoch + 1) % self.config.checkpoint_frequency == 0
    }

    /// Number of batches per epoch for `dataset_size` instances.
    #[must_use]
    pub const fn num_batches(&self, dataset_size: usize) -> usize {
        match self.config.batch_size {
            0 => 0,
            size if self.config.drop_last => dataset_size / size,
            size => dataset_size.div_ceil(size),
        }
    }

    /// Instance indices of every batch in `epoch`.
    ///
    /// With a seed, the order depends only on the seed and the epoch.
    #[must_use]
    pub fn batches(&mut self, epoch: usize, dataset_size: usize) -> Vec<Vec<usize>> {
        let mut order: Vec<usize> = (0..dataset_size).collect();
        if self.config.shuffle {
            match self.config.seed {
                Some(seed) => order.shuffle(&mut StdRng::seed_from_u64(seed.wrapping_add(epoch as u64))),
                None => order.shuffle(&mut self.rng),
            }
        }
        let batches: Vec<Vec<usize>> = order
            .chunks(self.config.batch_size.max(1))
            .take(self.num_batches(dataset_size))
            .map(<[usize]>::to_vec)
            .collect();
        debug!(epoch, batches = batches.len(), dataset_size, "Planned epoch");
        batches
    }

    /// Forward pass plus every enabled loss term.
    ///
    /// `batch` is `[batch, vertices, 3]`, `attributes` is `[batch, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::Model`] if the forward pass rejects the
    /// batch, or [`TrainingError::Loss`] if an enabled term is missing an
    /// input.
    pub fn losses<B: Backend>(
        &self,
        model: &SpiralAutoencoder<B>,
        batch: Tensor<B, 3>,
        attributes: Tensor<B, 2>,
        critic: Option<&FactorDiscriminator<B>>,
    ) -> Result<(ForwardOutput<B>, AutoencoderLosses<B>)> {
        let output = model.forward(batch.clone())?;
        let losses = AutoencoderLosses::compute(
            &output,
            batch,
            attributes,
            &self.weights,
            model.swap_rows(),
            self.laplacian.as_ref(),
            critic,
        )?;
        Ok((output, losses))
    }

    /// Discriminator loss on detached latent codes and a fresh permutation.
    pub fn critic_loss<B: Backend>(&mut self, critic: &FactorDiscriminator<B>, latent: Tensor<B, 2>) -> Tensor<B, 1> {
        let latent = latent.detach();
        let permuted = permute_latent_dims(latent.clone(), &mut self.rng);
        discriminator_loss(critic.forward(latent), critic.forward(permuted))
    }

    /// Fails on NaN or infinite losses.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::NumericalInstability`] naming the epoch and batch.
    pub fn ensure_finite(&self, values: &LossValues, state: &TrainingState) -> Result<()> {
        if values.is_finite() {
            Ok(())
        } else {
            Err(TrainingError::numerical_instability(format!(
                "non-finite loss at epoch {} batch {}: {values:?}",
                state.epoch, state.batch
            )))
        }
    }

    /// Closes an epoch: records metrics, tracks the best validation loss,
    /// applies early stopping and advances `state`.
    pub fn end_epoch(&self, state: &mut TrainingState, metrics: EpochMetrics) {
        info!(
            epoch = metrics.epoch,
            train_loss = metrics.train_loss(),
            val_loss = ?metrics.val_loss(),
            reconstruction = metrics.train.reconstruction,
            lr = metrics.learning_rate,
            "Epoch complete"
        );

        let val_loss = metrics.val_loss();
        state.metrics.add_epoch(metrics);
        if let Some(val_loss) = val_loss {
            if !state.record_val_loss(val_loss) && state.should_early_stop(self.config.early_stopping_patience) {
                let reason = format!("no improvement for {} epochs", state.epochs_without_improvement);
                warn!(epoch = state.epoch, %reason, "Early stopping");
                state.early_stop(reason);
            }
        }
        state.next_epoch();
    }

    /// File stem for `key`'s checkpoint after `epoch`, e.g. `autoencoder_epoch_0007`.
    #[must_use]
    pub fn checkpoint_stem(dir: impl AsRef<Path>, key: &str, epoch: usize) -> PathBuf {
        dir.as_ref().join(format!("{key}_epoch_{epoch:04}"))
    }

    /// Saves `model` under [`Trainer::checkpoint_stem`].
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::Checkpoint`] if the recorder fails.
    pub fn save_epoch<B, M>(
        &self,
        model: &M,
        dir: impl AsRef<Path>,
        key: &str,
        epoch: usize,
        format: CheckpointFormat,
    ) -> Result<PathBuf>
    where
        B: Backend,
        M: Module<B>,
    {
        Ok(save_checkpoint::<B, M>(model, Self::checkpoint_stem(dir, key, epoch), format)?)
    }

    /// Newest checkpoint for `key` in `dir` and the epoch it was saved after.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::Checkpoint`] if the name carries no epoch, or
    /// [`TrainingError::Io`] if `dir` cannot be read.
    pub fn resume_point(dir: impl AsRef<Path>, key: &str) -> Result<Option<(PathBuf, usize)>> {
        let Some(path) = latest_checkpoint(dir, key).map_err(|e| TrainingError::Io(e.to_string()))? else {
            return Ok(None);
        };
        let epoch = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.rsplit('_').next())
            .and_then(|digits| digits.parse::<usize>().ok())
            .ok_or_else(|| TrainingError::checkpoint(format!("no epoch in {}", path.display())))?;
        info!(path = %path.display(), epoch, "Found checkpoint to resume");
        Ok(Some((path, epoch)))
    }
}

/// Gathers the rows `indices` of a dataset tensor along the batch axis.
pub fn select_rows<B: Backend, const D: usize>(data: Tensor<B, D>, indices: &[usize]) -> Tensor<B, D> {
    let rows: Vec<i64> = indices
        .iter()
        .map(|&i| i64::try_from(i).unwrap_or(i64::MAX))
        .collect();
    let index = Tensor::<B, 1, Int>::from_data(TensorData::new(rows, [indices.len()]), &data.device());
    data.select(0, index)
}
