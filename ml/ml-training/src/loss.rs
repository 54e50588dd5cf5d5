//! Loss functions for the disentangled mesh autoencoder.
//!
//! Every function returns a one-element tensor so terms can be weighted
//! and summed before a single `backward()`.

use burn::nn::loss::{CrossEntropyLossConfig, MseLoss, Reduction};
use burn::prelude::Backend;
use burn::tensor::{ElementConversion, Int, Tensor, TensorData};
use mesh_region::Template;
use ml_models::{FactorDiscriminator, ForwardOutput, pool};
use ml_types::SparseOperator;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainingError};
use crate::metrics::LossValues;

/// Weights for combining the autoencoder loss terms.
///
/// A zero weight skips the term entirely.
///
/// # Example
///
/// ```
/// use ml_training::LossWeights;
///
/// let weights = LossWeights::default();
/// assert!((weights.reconstruction - 1.0).abs() < 1e-6);
/// assert_eq!(weights.kl, 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LossWeights {
    /// Mean absolute per-vertex error.
    pub reconstruction: f32,

    /// KL divergence to the unit Gaussian (variational models).
    pub kl: f32,

    /// Trailing latent entry regressed onto the attribute.
    pub latent_attribute: f32,

    /// Adversarial regressor error behind gradient reversal.
    pub adversarial: f32,

    /// Factor discriminator total-correlation estimate.
    pub total_correlation: f32,

    /// Error between Laplacian coordinates of reconstruction and target.
    pub laplacian: f32,
}

impl Default for LossWeights {
    fn default() -> Self {
        Self {
            reconstruction: 1.0,
            kl: 0.0,
            latent_attribute: 1.0,
            adversarial: 1.0,
            total_correlation: 0.0,
            laplacian: 0.0,
        }
    }
}

impl LossWeights {
    /// Weights for a plain autoencoder: reconstruction only.
    #[must_use]
    pub const fn reconstruction_only() -> Self {
        Self {
            reconstruction: 1.0,
            kl: 0.0,
            latent_attribute: 0.0,
            adversarial: 0.0,
            total_correlation: 0.0,
            laplacian: 0.0,
        }
    }

    /// Sets the KL weight.
    #[must_use]
    pub const fn with_kl(mut self, weight: f32) -> Self {
        self.kl = weight;
        self
    }

    /// Sets the total-correlation weight.
    #[must_use]
    pub const fn with_total_correlation(mut self, weight: f32) -> Self {
        self.total_correlation = weight;
        self
    }

    /// Sets the Laplacian weight.
    #[must_use]
    pub const fn with_laplacian(mut self, weight: f32) -> Self {
        self.laplacian = weight;
        self
    }

    /// Validates the weights.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [
            self.reconstruction,
            self.kl,
            self.latent_attribute,
            self.adversarial,
            self.total_correlation,
            self.laplacian,
        ]
        .iter()
        .all(|w| w.is_finite() && *w >= 0.0)
    }
}

/// Mean absolute error between reconstruction and target, `[batch, vertices, channels]`.
pub fn reconstruction_loss<B: Backend>(reconstruction: Tensor<B, 3>, target: Tensor<B, 3>) -> Tensor<B, 1> {
    (reconstruction - target).abs().mean()
}

/// KL divergence from `N(mean, exp(log_var))` to `N(0, 1)`.
///
/// Summed over latent dimensions, averaged over the batch.
pub fn kl_divergence<B: Backend>(mean: Tensor<B, 2>, log_var: Tensor<B, 2>) -> Tensor<B, 1> {
    let per_dim = log_var.clone().add_scalar(1.0) - mean.powf_scalar(2.0) - log_var.exp();
    per_dim.sum_dim(1).mul_scalar(-0.5).mean()
}

/// Mean squared error between predicted and true attribute, both `[batch, 1]`.
pub fn attribute_loss<B: Backend>(prediction: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1> {
    MseLoss::new().forward(prediction, target, Reduction::Mean)
}

/// Mean squared error between the trailing latent entry and the attribute.
pub fn latent_attribute_loss<B: Backend>(latent: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1> {
    let [batch, size] = latent.dims();
    attribute_loss(latent.slice([0..batch, size.saturating_sub(1)..size]), target)
}

/// Total-correlation estimate from discriminator logits `[batch, 2]`.
///
/// Class 0 is "joint sample", class 1 "permuted sample"; the mean logit
/// gap approximates the KL between the aggregate posterior and the
/// product of its marginals.
pub fn total_correlation<B: Backend>(logits: Tensor<B, 2>) -> Tensor<B, 1> {
    let [batch, _] = logits.dims();
    (logits.clone().slice([0..batch, 0..1]) - logits.slice([0..batch, 1..2])).mean()
}

/// Cross-entropy of the discriminator on joint (class 0) and permuted
/// (class 1) codes, averaged.
pub fn discriminator_loss<B: Backend>(joint_logits: Tensor<B, 2>, permuted_logits: Tensor<B, 2>) -> Tensor<B, 1> {
    let device = joint_logits.device();
    let criterion = CrossEntropyLossConfig::new().init(&device);

    let [joint, _] = joint_logits.dims();
    let [permuted, _] = permuted_logits.dims();
    let zeros = Tensor::<B, 1, Int>::zeros([joint], &device);
    let ones = Tensor::<B, 1, Int>::ones([permuted], &device);

    (criterion.forward(joint_logits, zeros) + criterion.forward(permuted_logits, ones)).mul_scalar(0.5)
}

/// Shuffles every latent dimension independently across the batch.
///
/// Each column keeps its multiset of values but loses its pairing with
/// the other columns, giving samples from the product of marginals.
#[allow(clippy::cast_possible_wrap)]
pub fn permute_latent_dims<B: Backend, R: Rng + ?Sized>(latent: Tensor<B, 2>, rng: &mut R) -> Tensor<B, 2> {
    let [batch, size] = latent.dims();
    let device = latent.device();
    let columns = (0..size)
        .map(|dim| {
            let mut order: Vec<i64> = (0..batch as i64).collect();
            order.shuffle(rng);
            let order = Tensor::<B, 1, Int>::from_data(TensorData::new(order, [batch]), &device);
            latent.clone().slice([0..batch, dim..dim + 1]).select(0, order)
        })
        .collect();
    Tensor::cat(columns, 1)
}

/// Laplacian coordinate error between reconstruction and target.
///
/// # Errors
///
/// Returns [`TrainingError::Model`] if the operator does not match the
/// vertex count.
pub fn laplacian_loss<B: Backend>(
    reconstruction: Tensor<B, 3>,
    target: Tensor<B, 3>,
    laplacian: &SparseOperator,
) -> Result<Tensor<B, 1>> {
    Ok(pool(reconstruction - target, laplacian)?.abs().mean())
}

/// Builds the sparse Laplacian operator of a prepared template.
///
/// # Errors
///
/// Returns [`TrainingError::Template`] if the triples are out of range.
#[allow(clippy::cast_possible_truncation)]
pub fn laplacian_operator(template: &Template) -> Result<SparseOperator> {
    let n = template.mesh.vertices.len();
    let triples: Vec<(u32, u32, f32)> = template
        .laplacian
        .iter()
        .map(|&(row, col, value)| (row, col, value as f32))
        .collect();
    SparseOperator::from_triples(n, n, &triples).map_err(|e| TrainingError::template(e.to_string()))
}

/// Per-term autoencoder losses for one batch.
///
/// Terms with zero weight, or that the model cannot produce, are `None`.
#[derive(Debug, Clone)]
pub struct AutoencoderLosses<B: Backend> {
    /// Reconstruction error.
    pub reconstruction: Tensor<B, 1>,
    /// KL divergence.
    pub kl: Option<Tensor<B, 1>>,
    /// Latent attribute regression error.
    pub latent_attribute: Option<Tensor<B, 1>>,
    /// Adversarial regressor error.
    pub adversarial: Option<Tensor<B, 1>>,
    /// Total-correlation penalty.
    pub total_correlation: Option<Tensor<B, 1>>,
    /// Laplacian coordinate error.
    pub laplacian: Option<Tensor<B, 1>>,
}

impl<B: Backend> AutoencoderLosses<B> {
    /// Computes every enabled term from a forward pass.
    ///
    /// `attributes` is `[batch, 1]`. When the regressor saw only swap rows,
    /// `swap_rows` selects the matching targets.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::Loss`] if an enabled term needs a
    /// Laplacian operator or critic that was not supplied.
    pub fn compute(
        output: &ForwardOutput<B>,
        target: Tensor<B, 3>,
        attributes: Tensor<B, 2>,
        weights: &LossWeights,
        swap_rows: Option<&[u32]>,
        laplacian: Option<&SparseOperator>,
        critic: Option<&FactorDiscriminator<B>>,
    ) -> Result<Self> {
        let enabled = |w: f32| w > 0.0;

        let kl = match &output.log_var {
            Some(log_var) if enabled(weights.kl) => Some(kl_divergence(output.mean.clone(), log_var.clone())),
            _ => None,
        };

        let latent_attribute = (enabled(weights.latent_attribute) && output.attribute_prediction.is_some())
            .then(|| latent_attribute_loss(output.mean.clone(), attributes.clone()));

        let adversarial = match &output.attribute_prediction {
            Some(prediction) if enabled(weights.adversarial) => {
                let targets = match swap_rows {
                    Some(rows) => {
                        let rows: Vec<i64> = rows.iter().map(|&r| i64::from(r)).collect();
                        let len = rows.len();
                        let index = Tensor::<B, 1, Int>::from_data(TensorData::new(rows, [len]), &attributes.device());
                        attributes.select(0, index)
                    }
                    None => attributes,
                };
                Some(attribute_loss(prediction.clone(), targets))
            }
            _ => None,
        };

        let total_correlation = if enabled(weights.total_correlation) {
            let critic = critic.ok_or_else(|| TrainingError::loss("total correlation needs a discriminator"))?;
            Some(total_correlation(critic.forward(output.latent.clone())))
        } else {
            None
        };

        let laplacian = if enabled(weights.laplacian) {
            let operator = laplacian.ok_or_else(|| TrainingError::loss("laplacian term needs a template operator"))?;
            Some(laplacian_loss(output.reconstruction.clone(), target.clone(), operator)?)
        } else {
            None
        };

        Ok(Self {
            reconstruction: reconstruction_loss(output.reconstruction.clone(), target),
            kl,
            latent_attribute,
            adversarial,
            total_correlation,
            laplacian,
        })
    }

    /// Weighted sum of all present terms.
    pub fn total(&self, weights: &LossWeights) -> Tensor<B, 1> {
        self.weighted(weights)
            .into_iter()
            .fold(self.reconstruction.clone().mul_scalar(weights.reconstruction), |acc, term| acc + term)
    }

    /// Reads every term back as `f32`.
    pub fn values(&self, weights: &LossWeights) -> LossValues {
        let read = |t: &Tensor<B, 1>| t.clone().into_scalar().elem::<f32>();
        let maybe = |t: &Option<Tensor<B, 1>>| t.as_ref().map_or(0.0, read);
        LossValues {
            reconstruction: read(&self.reconstruction),
            kl: maybe(&self.kl),
            latent_attribute: maybe(&self.latent_attribute),
            adversarial: maybe(&self.adversarial),
            total_correlation: maybe(&self.total_correlation),
            laplacian: maybe(&self.laplacian),
            total: read(&self.total(weights)),
        }
    }

    fn weighted(&self, weights: &LossWeights) -> Vec<Tensor<B, 1>> {
        [
            (&self.kl, weights.kl),
            (&self.latent_attribute, weights.latent_attribute),
            (&self.adversarial, weights.adversarial),
            (&self.total_correlation, weights.total_correlation),
            (&self.laplacian, weights.laplacian),
        ]
        .into_iter()
        .filter_map(|(term, w)| term.as_ref().map(|t| t.clone().mul_scalar(w)))
        .collect()
    }
}
