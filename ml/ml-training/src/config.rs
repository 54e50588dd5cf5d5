//! Experiment and training configuration.

use std::fs;
use std::path::{Path, PathBuf};

use mesh_region::{ColorKey, Template, prepare_template};
use ml_models::{AutoencoderConfig, CheckpointFormat, checkpoint_dir};
use ml_types::MeshHierarchy;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TrainingError};
use crate::loss::LossWeights;

/// Configuration for a training run.
///
/// # Example
///
/// ```
/// use ml_training::TrainingConfig;
///
/// let config = TrainingConfig::default();
/// assert_eq!(config.epochs, 300);
/// assert_eq!(config.batch_size, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of training epochs.
    pub epochs: usize,

    /// Batch size.
    pub batch_size: usize,

    /// Autoencoder optimizer.
    pub optimizer: OptimizerConfig,

    /// Factor discriminator optimizer.
    pub discriminator_optimizer: OptimizerConfig,

    /// Learning rate schedule.
    pub lr_schedule: LearningRateSchedule,

    /// Whether to shuffle data each epoch.
    pub shuffle: bool,

    /// Drop the final batch when it is smaller than `batch_size`.
    pub drop_last: bool,

    /// Validation frequency (epochs between validations).
    pub val_frequency: usize,

    /// Checkpoint frequency (epochs between saves).
    pub checkpoint_frequency: usize,

    /// Early stopping patience (0 = disabled).
    pub early_stopping_patience: usize,

    /// Gradient clipping threshold (0.0 = disabled).
    pub gradient_clip: f32,

    /// Random seed for batch order and latent permutations.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::new(300)
    }
}

impl TrainingConfig {
    /// Creates a new training config with the given epochs.
    #[must_use]
    pub const fn new(epochs: usize) -> Self {
        Self {
            epochs,
            batch_size: 16,
            optimizer: OptimizerConfig::adam(1e-4),
            discriminator_optimizer: OptimizerConfig::adam(1e-4).with_betas(0.5, 0.9),
            lr_schedule: LearningRateSchedule::Constant,
            shuffle: true,
            drop_last: false,
            val_frequency: 1,
            checkpoint_frequency: 10,
            early_stopping_patience: 0,
            gradient_clip: 0.0,
            seed: None,
        }
    }

    /// Sets the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the autoencoder optimizer.
    #[must_use]
    pub const fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Sets the learning rate schedule.
    #[must_use]
    pub const fn with_lr_schedule(mut self, schedule: LearningRateSchedule) -> Self {
        self.lr_schedule = schedule;
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Disables shuffling.
    #[must_use]
    pub const fn without_shuffle(mut self) -> Self {
        self.shuffle = false;
        self
    }

    /// Drops incomplete trailing batches.
    #[must_use]
    pub const fn with_drop_last(mut self) -> Self {
        self.drop_last = true;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns `true` if all values are valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.epochs > 0
            && self.batch_size > 0
            && self.val_frequency > 0
            && self.checkpoint_frequency > 0
            && self.gradient_clip >= 0.0
            && self.optimizer.is_valid()
            && self.discriminator_optimizer.is_valid()
    }
}

/// Adam optimizer hyperparameters.
///
/// # Example
///
/// ```
/// use ml_training::OptimizerConfig;
///
/// let adam = OptimizerConfig::adam(1e-3).with_weight_decay(1e-5);
/// assert_eq!(adam.learning_rate, 1e-3);
/// assert!(adam.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Base learning rate.
    pub learning_rate: f32,

    /// Weight decay (L2 regularization).
    pub weight_decay: f32,

    /// First moment decay.
    pub beta1: f32,

    /// Second moment decay.
    pub beta2: f32,

    /// Epsilon for numerical stability.
    pub epsilon: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::adam(1e-4)
    }
}

impl OptimizerConfig {
    /// Creates an Adam config with the usual moment decays.
    #[must_use]
    pub const fn adam(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            weight_decay: 0.0,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }

    /// Sets weight decay.
    #[must_use]
    pub const fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// Sets both moment decays.
    #[must_use]
    pub const fn with_betas(mut self, beta1: f32, beta2: f32) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    /// Validates the configuration.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.learning_rate > 0.0
            && self.weight_decay >= 0.0
            && (0.0..1.0).contains(&self.beta1)
            && (0.0..1.0).contains(&self.beta2)
            && self.epsilon > 0.0
    }
}

/// Learning rate schedule.
///
/// # Example
///
/// ```
/// use ml_training::LearningRateSchedule;
///
/// let schedule = LearningRateSchedule::step(0.1, 30);
/// assert!((schedule.compute_lr(1.0, 30, 100) - 0.1).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum LearningRateSchedule {
    /// Constant learning rate.
    #[default]
    Constant,

    /// Step decay: multiply by factor every `step_size` epochs.
    Step {
        /// Decay factor.
        factor: f32,
        /// Epochs between decays.
        step_size: usize,
    },

    /// Exponential decay: lr * gamma^epoch.
    Exponential {
        /// Decay rate per epoch.
        gamma: f32,
    },

    /// Cosine annealing to minimum.
    Cosine {
        /// Minimum learning rate.
        min_lr: f32,
    },

    /// Linear warmup followed by cosine decay.
    WarmupCosine {
        /// Warmup epochs.
        warmup_epochs: usize,
        /// Minimum learning rate.
        min_lr: f32,
    },
}

impl LearningRateSchedule {
    /// Creates a step decay schedule.
    #[must_use]
    pub const fn step(factor: f32, step_size: usize) -> Self {
        Self::Step { factor, step_size }
    }

    /// Creates an exponential decay schedule.
    #[must_use]
    pub const fn exponential(gamma: f32) -> Self {
        Self::Exponential { gamma }
    }

    /// Creates a cosine annealing schedule.
    #[must_use]
    pub const fn cosine(min_lr: f32) -> Self {
        Self::Cosine { min_lr }
    }

    /// Creates a warmup + cosine schedule.
    #[must_use]
    pub const fn warmup_cosine(warmup_epochs: usize, min_lr: f32) -> Self {
        Self::WarmupCosine {
            warmup_epochs,
            min_lr,
        }
    }

    /// Computes the learning rate for a 0-indexed `epoch` of `total_epochs`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap
    )]
    pub fn compute_lr(&self, base_lr: f32, epoch: usize, total_epochs: usize) -> f32 {
        let cosine = |progress: f32, min_lr: f32| {
            min_lr + (base_lr - min_lr) * (1.0 + (std::f32::consts::PI * progress).cos()) / 2.0
        };

        match *self {
            Self::Constant => base_lr,
            Self::Step { factor, step_size } => base_lr * factor.powi((epoch / step_size.max(1)) as i32),
            Self::Exponential { gamma } => base_lr * gamma.powi(epoch as i32),
            Self::Cosine { min_lr } => cosine(epoch as f32 / total_epochs.max(1) as f32, min_lr),
            Self::WarmupCosine {
                warmup_epochs,
                min_lr,
            } => {
                if epoch < warmup_epochs {
                    base_lr * (epoch + 1) as f32 / warmup_epochs as f32
                } else {
                    let remaining = total_epochs.saturating_sub(warmup_epochs).max(1);
                    cosine((epoch - warmup_epochs) as f32 / remaining as f32, min_lr)
                }
            }
        }
    }
}

/// Which template mesh to use and which colored region to cut out of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Colored template mesh (PLY).
    pub mesh_path: PathBuf,

    /// Region to excise, as `"r,g,b"` or `"r,g,b,a"`.
    #[serde(default)]
    pub remove_region: Option<String>,
}

impl TemplateConfig {
    /// Creates a template config that keeps every region.
    #[must_use]
    pub fn new(mesh_path: impl Into<PathBuf>) -> Self {
        Self {
            mesh_path: mesh_path.into(),
            remove_region: None,
        }
    }

    /// Names a region to excise.
    #[must_use]
    pub fn with_remove_region(mut self, key: impl Into<String>) -> Self {
        self.remove_region = Some(key.into());
        self
    }

    /// Parses the region to excise, if any.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::Template`] if the key is malformed.
    pub fn remove_key(&self) -> Result<Option<ColorKey>> {
        self.remove_region
            .as_deref()
            .map(str::parse::<ColorKey>)
            .transpose()
            .map_err(TrainingError::from)
    }
}

/// Everything needed to build and train one autoencoder.
///
/// Stored as JSON. Relative paths are resolved against the working
/// directory.
///
/// # Example
///
/// ```
/// use ml_training::{ExperimentConfig, TemplateConfig};
///
/// let config = ExperimentConfig::new(TemplateConfig::new("template.ply"), "hierarchy.json", "runs/demo");
/// let json = config.to_json().unwrap();
/// assert_eq!(ExperimentConfig::from_json(&json).unwrap(), config);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Template mesh.
    pub template: TemplateConfig,

    /// Precomputed mesh hierarchy (JSON).
    pub hierarchy_path: PathBuf,

    /// Run directory for checkpoints and metrics.
    pub output_dir: PathBuf,

    /// Autoencoder architecture.
    #[serde(default)]
    pub model: AutoencoderConfig,

    /// Optimization and bookkeeping.
    #[serde(default)]
    pub training: TrainingConfig,

    /// Loss term weights.
    #[serde(default)]
    pub loss: LossWeights,

    /// Checkpoint file format.
    #[serde(default)]
    pub checkpoint_format: CheckpointFormat,
}

impl ExperimentConfig {
    /// Creates an experiment with default model, training and loss settings.
    #[must_use]
    pub fn new(template: TemplateConfig, hierarchy_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            template,
            hierarchy_path: hierarchy_path.into(),
            output_dir: output_dir.into(),
            model: AutoencoderConfig::default(),
            training: TrainingConfig::default(),
            loss: LossWeights::default(),
            checkpoint_format: CheckpointFormat::default(),
        }
    }

    /// Sets the model architecture.
    #[must_use]
    pub fn with_model(mut self, model: AutoencoderConfig) -> Self {
        self.model = model;
        self
    }

    /// Sets the training settings.
    #[must_use]
    pub fn with_training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    /// Sets the loss weights.
    #[must_use]
    pub const fn with_loss(mut self, loss: LossWeights) -> Self {
        self.loss = loss;
        self
    }

    /// Parses and validates a JSON config.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] for malformed JSON or
    /// inconsistent settings.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads and validates a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::Io`] if the file cannot be read, or any
    /// error from [`ExperimentConfig::from_json`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::from_json(&fs::read_to_string(path)?)?;
        info!(path = %path.display(), output_dir = %config.output_dir.display(), "Loaded experiment config");
        Ok(config)
    }

    /// Writes the config as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::Io`] if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Checks cross-section consistency.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        self.model
            .validate()
            .map_err(|e| TrainingError::invalid_config(e.to_string()))?;
        if !self.training.is_valid() {
            return Err(TrainingError::invalid_config("training settings out of range"));
        }
        if !self.loss.is_valid() {
            return Err(TrainingError::invalid_config("loss weights must be non-negative"));
        }
        self.template.remove_key()?;

        if !self.model.disentangle && (self.loss.adversarial > 0.0 || self.loss.latent_attribute > 0.0) {
            return Err(TrainingError::invalid_config(
                "attribute loss weights need a disentangling model",
            ));
        }
        if self.model.swap_features {
            if let Some(&row) = self
                .model
                .batch_diagonal_idx
                .iter()
                .find(|&&row| row >= self.training.batch_size)
            {
                return Err(TrainingError::invalid_config(format!(
                    "swap row {row} outside batch size {}",
                    self.training.batch_size
                )));
            }
            if !self.training.drop_last {
                return Err(TrainingError::invalid_config(
                    "swap mode needs drop_last so every batch holds the swap rows",
                ));
            }
        }
        if !self.model.variational && self.loss.kl > 0.0 {
            warn!(weight = self.loss.kl, "KL weight set on a non-variational model; the term is always zero");
        }
        Ok(())
    }

    /// Ensures the run's checkpoint directory exists and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::Io`] if it cannot be created.
    pub fn checkpoint_dir(&self) -> Result<PathBuf> {
        checkpoint_dir(&self.output_dir).map_err(|e| TrainingError::Io(e.to_string()))
    }

    /// Loads the template mesh and applies the configured excision.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::Template`] if the mesh cannot be read or the
    /// region to remove is absent.
    pub fn load_template(&self) -> Result<Template> {
        let mesh = mesh_io::load_mesh(&self.template.mesh_path)?;
        let template = prepare_template(&mesh, self.template.remove_key()?)?;
        info!(
            path = %self.template.mesh_path.display(),
            vertices = template.mesh.vertices.len(),
            regions = template.regions.len(),
            "Prepared template"
        );
        Ok(template)
    }

    /// Loads the mesh hierarchy.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::Hierarchy`] if it cannot be read or is
    /// inconsistent.
    pub fn load_hierarchy(&self) -> Result<MeshHierarchy> {
        Ok(MeshHierarchy::load(&self.hierarchy_path)?)
    }
}
