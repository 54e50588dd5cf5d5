//! Disentangled spiral mesh autoencoder.

use std::sync::Arc;

use burn::module::{Ignored, Module};
use burn::nn;
use burn::prelude::Backend;
use burn::tensor::activation::sigmoid;
use burn::tensor::{Distribution, Tensor};
use ml_types::{MeshHierarchy, SparseOperator, SpiralTable};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::blocks::{DecoderBlock, EncoderBlock};
use crate::error::{ModelError, Result};
use crate::init::xavier_linear;
use crate::mlp::{AttributeRegressor, FeatureProjection};
use crate::pool::index_tensor;
use crate::spiral::SpiralConv;
use crate::variant::ForwardVariant;

/// Configuration for [`SpiralAutoencoder`].
///
/// `out_channels[k]` is the width of encoder level `k` (finest first) and
/// must have one entry per hierarchy level.
///
/// # Example
///
/// ```
/// use ml_models::AutoencoderConfig;
///
/// let config = AutoencoderConfig::new(vec![16, 32], 8)
///     .with_variational(true)
///     .with_forward_mode(2);
/// assert!(config.is_valid());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoencoderConfig {
    /// Per-vertex input channels (3 for positions).
    pub in_channels: usize,

    /// Encoder channel widths, finest level first.
    pub out_channels: Vec<usize>,

    /// Latent vector size, including the attribute scalar when
    /// disentangling.
    pub latent_size: usize,

    /// Adds a log-variance head and samples during training.
    pub variational: bool,

    /// Reserves the last latent entry for the attribute and trains the
    /// adversarial regressor on the rest.
    pub disentangle: bool,

    /// Feeds only `batch_diagonal_idx` rows to the regressor.
    pub swap_features: bool,

    /// Batch rows used in swap mode.
    pub batch_diagonal_idx: Vec<usize>,

    /// Primary forward mode, 1 or 2.
    pub forward_mode: u8,

    /// Adds the feature projection sub-network.
    pub extra_layers: bool,

    /// Regresses on a projection of detached features.
    pub detach_features: bool,

    /// Dropout probability in the projection and regressor.
    pub dropout: f64,

    /// Regressor hidden widths.
    pub regressor_hidden: (usize, usize),

    /// Gradient reversal scale.
    pub reversal_scale: f64,
}

impl Default for AutoencoderConfig {
    fn default() -> Self {
        Self::new(vec![16, 16, 16, 32], 16)
    }
}

impl AutoencoderConfig {
    /// Creates a disentangling, non-variational configuration for 3D positions.
    #[must_use]
    pub fn new(out_channels: Vec<usize>, latent_size: usize) -> Self {
        Self {
            in_channels: 3,
            out_channels,
            latent_size,
            variational: false,
            disentangle: true,
            swap_features: false,
            batch_diagonal_idx: Vec::new(),
            forward_mode: 1,
            extra_layers: false,
            detach_features: false,
            dropout: 0.2,
            regressor_hidden: (64, 32),
            reversal_scale: 1.0,
        }
    }

    /// Sets the input channel count.
    #[must_use]
    pub fn with_in_channels(mut self, in_channels: usize) -> Self {
        self.in_channels = in_channels;
        self
    }

    /// Enables or disables the variational head.
    #[must_use]
    pub fn with_variational(mut self, variational: bool) -> Self {
        self.variational = variational;
        self
    }

    /// Enables or disables disentanglement.
    #[must_use]
    pub fn with_disentangle(mut self, disentangle: bool) -> Self {
        self.disentangle = disentangle;
        self
    }

    /// Enables swap mode with the given batch rows.
    #[must_use]
    pub fn with_swap_rows(mut self, rows: Vec<usize>) -> Self {
        self.swap_features = true;
        self.batch_diagonal_idx = rows;
        self
    }

    /// Sets the primary forward mode.
    #[must_use]
    pub fn with_forward_mode(mut self, mode: u8) -> Self {
        self.forward_mode = mode;
        self
    }

    /// Enables or disables the feature projection.
    #[must_use]
    pub fn with_extra_layers(mut self, extra_layers: bool) -> Self {
        self.extra_layers = extra_layers;
        self
    }

    /// Enables or disables feature detaching.
    #[must_use]
    pub fn with_detach_features(mut self, detach_features: bool) -> Self {
        self.detach_features = detach_features;
        self
    }

    /// Sets the dropout probability.
    #[must_use]
    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    /// Sets the regressor hidden widths.
    #[must_use]
    pub fn with_regressor_hidden(mut self, first: usize, second: usize) -> Self {
        self.regressor_hidden = (first, second);
        self
    }

    /// Sets the gradient reversal scale.
    #[must_use]
    pub fn with_reversal_scale(mut self, scale: f64) -> Self {
        self.reversal_scale = scale;
        self
    }

    /// Resolves the forward variant from the selector flags.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] for an unsupported combination.
    pub fn variant(&self) -> Result<ForwardVariant> {
        ForwardVariant::resolve(self.forward_mode, self.extra_layers, self.detach_features)
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.in_channels == 0 {
            return Err(ModelError::invalid_config("in_channels must be positive"));
        }
        if self.out_channels.is_empty() || self.out_channels.contains(&0) {
            return Err(ModelError::invalid_config(
                "out_channels must be non-empty and positive",
            ));
        }
        let variant = self.variant()?;
        let needs_split = self.disentangle || variant.uses_projection();
        if self.latent_size < if needs_split { 2 } else { 1 } {
            return Err(ModelError::invalid_config(format!(
                "latent_size {} too small to split off an attribute scalar",
                self.latent_size
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::invalid_config(format!(
                "dropout {} outside [0, 1)",
                self.dropout
            )));
        }
        if self.regressor_hidden.0 == 0 || self.regressor_hidden.1 == 0 {
            return Err(ModelError::invalid_config("regressor widths must be positive"));
        }
        if !self.reversal_scale.is_finite() {
            return Err(ModelError::invalid_config("reversal_scale must be finite"));
        }
        if self.swap_features && self.batch_diagonal_idx.is_empty() {
            return Err(ModelError::invalid_config(
                "swap_features needs at least one batch row",
            ));
        }
        Ok(())
    }

    /// Returns `true` if [`validate`](Self::validate) succeeds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Everything one forward pass produces.
#[derive(Debug, Clone)]
pub struct ForwardOutput<B: Backend> {
    /// Reconstructed per-vertex signal, `[batch, vertices, in_channels]`.
    pub reconstruction: Tensor<B, 3>,
    /// Latent code that was decoded, `[batch, latent_size]`.
    pub latent: Tensor<B, 2>,
    /// Mean latent code (projected in the mean-projection variants).
    pub mean: Tensor<B, 2>,
    /// Log-variance, when variational.
    pub log_var: Option<Tensor<B, 2>>,
    /// Regressor output `[rows, 1]`, when disentangling.
    pub attribute_prediction: Option<Tensor<B, 2>>,
}

#[derive(Debug, Clone)]
struct ForwardPlan {
    variant: ForwardVariant,
    disentangle: bool,
    swap_rows: Option<Vec<u32>>,
    latent_size: usize,
    coarse_vertices: usize,
    coarse_channels: usize,
}

/// Spiral convolutional autoencoder with an adversarial attribute branch.
///
/// The encoder runs one [`EncoderBlock`] per hierarchy level, finest to
/// coarsest, then flattens into a dense mean head (plus a log-variance
/// head when variational). The decoder mirrors it: dense expansion,
/// one [`DecoderBlock`] per level coarsest to finest, and a final plain
/// [`SpiralConv`] back to the input channels.
///
/// Training mode is an autodiff backend; evaluation is the inner backend
/// (`model.valid()`). Sampling, dropout and batch statistics are only
/// active in training mode.
#[derive(Debug, Module)]
pub struct SpiralAutoencoder<B: Backend> {
    encoder: Vec<EncoderBlock<B>>,
    mean: nn::Linear<B>,
    log_var: Option<nn::Linear<B>>,
    expand: nn::Linear<B>,
    decoder: Vec<DecoderBlock<B>>,
    head: SpiralConv<B>,
    projection: Option<FeatureProjection<B>>,
    regressor: Option<AttributeRegressor<B>>,
    plan: Ignored<ForwardPlan>,
}

impl<B: Backend> SpiralAutoencoder<B> {
    /// Builds the model over `hierarchy`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] if the configuration is invalid
    /// or its level count differs from the hierarchy's, and
    /// [`ModelError::Hierarchy`] if the hierarchy is inconsistent.
    pub fn new(config: &AutoencoderConfig, hierarchy: &MeshHierarchy, device: &B::Device) -> Result<Self> {
        config.validate()?;
        hierarchy.validate()?;
        let variant = config.variant()?;

        let levels = hierarchy.levels();
        if config.out_channels.len() != levels {
            return Err(ModelError::invalid_config(format!(
                "{} channel widths for {levels} hierarchy levels",
                config.out_channels.len()
            )));
        }

        let spirals: Vec<Arc<SpiralTable>> = hierarchy.spirals.iter().cloned().map(Arc::new).collect();
        let down: Vec<Arc<SparseOperator>> = hierarchy.down.iter().cloned().map(Arc::new).collect();
        let up: Vec<Arc<SparseOperator>> = hierarchy.up.iter().cloned().map(Arc::new).collect();

        let out = &config.out_channels;
        let last = levels - 1;
        let latent = config.latent_size;

        let encoder = (0..levels)
            .map(|k| {
                let input = if k == 0 { config.in_channels } else { out[k - 1] };
                EncoderBlock::new(input, out[k], Arc::clone(&spirals[k]), Arc::clone(&down[k]), device)
            })
            .collect();

        let coarse_vertices = hierarchy.coarsest_vertex_count();
        let flat = coarse_vertices * out[last];

        let decoder = (0..levels)
            .map(|idx| {
                let level = last - idx;
                let input = if idx == 0 { out[last] } else { out[level + 1] };
                DecoderBlock::new(input, out[level], Arc::clone(&spirals[level]), Arc::clone(&up[level]), device)
            })
            .collect();

        let features = latent.saturating_sub(1);
        let projection = variant
            .uses_projection()
            .then(|| FeatureProjection::new(features, config.dropout, device));
        let regressor = config.disentangle.then(|| {
            AttributeRegressor::new(
                features,
                config.regressor_hidden,
                config.dropout,
                config.reversal_scale,
                device,
            )
        });

        let swap_rows = if config.swap_features {
            let rows = config
                .batch_diagonal_idx
                .iter()
                .map(|&row| u32::try_from(row))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| ModelError::invalid_config("swap row index exceeds u32"))?;
            Some(rows)
        } else {
            None
        };

        info!(
            %variant,
            levels,
            latent_size = latent,
            variational = config.variational,
            disentangle = config.disentangle,
            template_vertices = hierarchy.template_vertex_count(),
            coarse_vertices,
            "Built spiral autoencoder"
        );

        Ok(Self {
            encoder,
            mean: xavier_linear(flat, latent, device),
            log_var: config.variational.then(|| xavier_linear(flat, latent, device)),
            expand: xavier_linear(latent, flat, device),
            decoder,
            head: SpiralConv::new(out[0], config.in_channels, Arc::clone(&spirals[0]), device),
            projection,
            regressor,
            plan: Ignored(ForwardPlan {
                variant,
                disentangle: config.disentangle,
                swap_rows,
                latent_size: latent,
                coarse_vertices,
                coarse_channels: out[last],
            }),
        })
    }

    /// The forward variant fixed at construction.
    #[must_use]
    pub fn variant(&self) -> ForwardVariant {
        self.plan.variant
    }

    /// Latent vector size.
    #[must_use]
    pub fn latent_size(&self) -> usize {
        self.plan.latent_size
    }

    /// Whether the model has a log-variance head.
    #[must_use]
    pub fn is_variational(&self) -> bool {
        self.log_var.is_some()
    }

    /// Whether the model carries the adversarial attribute regressor.
    #[must_use]
    pub fn is_disentangled(&self) -> bool {
        self.regressor.is_some()
    }

    /// Batch rows fed to the regressor in swap mode.
    #[must_use]
    pub fn swap_rows(&self) -> Option<&[u32]> {
        self.plan.swap_rows.as_deref()
    }

    /// Encodes `[batch, vertices, in_channels]` into the mean latent code
    /// and, when variational, its log-variance.
    ///
    /// Without the variational head the mean is squashed by a sigmoid.
    ///
    /// # Errors
    ///
    /// Returns a shape error if `x` does not match the finest level.
    pub fn encode(&self, x: Tensor<B, 3>) -> Result<(Tensor<B, 2>, Option<Tensor<B, 2>>)> {
        let x = self.encoder.iter().try_fold(x, |x, block| block.forward(x))?;
        let [batch, vertices, channels] = x.dims();
        let flat = x.reshape([batch, vertices * channels]);

        let mean = self.mean.forward(flat.clone());
        Ok(match &self.log_var {
            Some(head) => (mean, Some(head.forward(flat))),
            None => (sigmoid(mean), None),
        })
    }

    /// Draws `mean + eps · exp(log_var / 2)` with `eps ~ N(0, 1)`.
    ///
    /// When disentangling, only the feature sub-vector is perturbed; the
    /// attribute scalar is passed through from `mean` unchanged.
    pub fn reparameterize(&self, mean: Tensor<B, 2>, log_var: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, latent] = mean.dims();
        let perturbed = if self.plan.disentangle { latent.saturating_sub(1) } else { latent };

        let mu = mean.clone().slice([0..batch, 0..perturbed]);
        let std = log_var.slice([0..batch, 0..perturbed]).mul_scalar(0.5).exp();
        let eps = Tensor::<B, 2>::random([batch, perturbed], Distribution::Normal(0.0, 1.0), &mean.device());
        let sampled = mu + eps * std;

        if perturbed == latent {
            sampled
        } else {
            Tensor::cat(vec![sampled, mean.slice([0..batch, perturbed..latent])], 1)
        }
    }

    /// Decodes `[batch, latent_size]` into `[batch, vertices, in_channels]`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ShapeMismatch`] if the latent width is wrong.
    pub fn decode(&self, z: Tensor<B, 2>) -> Result<Tensor<B, 3>> {
        let [batch, latent] = z.dims();
        if latent != self.plan.latent_size {
            return Err(ModelError::shape_mismatch(
                format!("[batch, {}]", self.plan.latent_size),
                format!("{:?}", z.dims()),
            ));
        }
        let x = self
            .expand
            .forward(z)
            .reshape([batch, self.plan.coarse_vertices, self.plan.coarse_channels]);
        let x = self.decoder.iter().try_fold(x, |x, block| block.forward(x))?;
        self.head.try_forward(x)
    }

    /// Runs the configured forward variant.
    ///
    /// # Errors
    ///
    /// Returns a shape error if `x` does not match the finest level or a
    /// swap row is outside the batch.
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<ForwardOutput<B>> {
        let (mean, log_var) = self.encode(x)?;

        let (latent, mean, attribute_prediction) = match self.plan.variant {
            ForwardVariant::SampleThenRegress => {
                let z = self.sample(mean.clone(), log_var.as_ref());
                let prediction = self.regress(split_attribute(z.clone()).0)?;
                (z, mean, prediction)
            }
            ForwardVariant::RegressThenSample => {
                let prediction = self.regress(split_attribute(mean.clone()).0)?;
                let z = self.sample(mean.clone(), log_var.as_ref());
                (z, mean, prediction)
            }
            ForwardVariant::ProjectSampled => {
                let (features, attribute) = split_attribute(self.sample(mean.clone(), log_var.as_ref()));
                let projected = self.project(features)?;
                let prediction = self.regress(projected.clone())?;
                (Tensor::cat(vec![projected, attribute], 1), mean, prediction)
            }
            ForwardVariant::ProjectMean => {
                let (features, attribute) = split_attribute(mean);
                let projected = self.project(features)?;
                let prediction = self.regress(projected.clone())?;
                let mean = Tensor::cat(vec![projected, attribute], 1);
                (self.sample(mean.clone(), log_var.as_ref()), mean, prediction)
            }
            ForwardVariant::ProjectDetached => {
                let (features, attribute) = split_attribute(mean);
                let prediction = if self.regressor.is_some() {
                    self.regress(self.project(features.clone().detach())?)?
                } else {
                    None
                };
                let mean = Tensor::cat(vec![self.project(features)?, attribute], 1);
                (self.sample(mean.clone(), log_var.as_ref()), mean, prediction)
            }
        };

        let reconstruction = self.decode(latent.clone())?;
        Ok(ForwardOutput {
            reconstruction,
            latent,
            mean,
            log_var,
            attribute_prediction,
        })
    }

    fn sample(&self, mean: Tensor<B, 2>, log_var: Option<&Tensor<B, 2>>) -> Tensor<B, 2> {
        match log_var {
            Some(log_var) if B::ad_enabled() => self.reparameterize(mean, log_var.clone()),
            _ => mean,
        }
    }

    fn project(&self, features: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        self.projection
            .as_ref()
            .map(|projection| projection.forward(features))
            .ok_or_else(|| ModelError::invalid_config("variant needs a feature projection"))
    }

    fn regress(&self, features: Tensor<B, 2>) -> Result<Option<Tensor<B, 2>>> {
        let Some(regressor) = &self.regressor else {
            return Ok(None);
        };
        let features = match &self.plan.swap_rows {
            Some(rows) => {
                let [batch, _] = features.dims();
                if let Some(&row) = rows.iter().find(|&&row| row as usize >= batch) {
                    return Err(ModelError::shape_mismatch(
                        format!("swap row below batch size {batch}"),
                        format!("row {row}"),
                    ));
                }
                let rows = index_tensor::<B>(rows, &features.device());
                features.select(0, rows)
            }
            None => features,
        };
        Ok(Some(regressor.forward(features)))
    }
}

/// Splits `[batch, L]` into the leading `L - 1` features and the trailing
/// attribute column.
fn split_attribute<B: Backend>(z: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let [batch, latent] = z.dims();
    let features = latent.saturating_sub(1);
    (z.clone().slice([0..batch, 0..features]), z.slice([0..batch, features..latent]))
}
