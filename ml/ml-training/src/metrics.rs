//! Training metrics and logging.

use serde::{Deserialize, Serialize};

/// Scalar value of every autoencoder loss term.
///
/// Disabled terms read 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LossValues {
    /// Reconstruction error.
    pub reconstruction: f32,
    /// KL divergence.
    pub kl: f32,
    /// Latent attribute regression error.
    pub latent_attribute: f32,
    /// Adversarial regressor error.
    pub adversarial: f32,
    /// Total-correlation penalty.
    pub total_correlation: f32,
    /// Laplacian coordinate error.
    pub laplacian: f32,
    /// Weighted sum.
    pub total: f32,
}

impl LossValues {
    fn terms_mut(&mut self) -> [&mut f32; 7] {
        [
            &mut self.reconstruction,
            &mut self.kl,
            &mut self.latent_attribute,
            &mut self.adversarial,
            &mut self.total_correlation,
            &mut self.laplacian,
            &mut self.total,
        ]
    }

    fn terms(&self) -> [f32; 7] {
        [
            self.reconstruction,
            self.kl,
            self.latent_attribute,
            self.adversarial,
            self.total_correlation,
            self.laplacian,
            self.total,
        ]
    }

    /// Returns `true` if every term is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.terms().iter().all(|v| v.is_finite())
    }
}

/// Running sample-weighted mean of [`LossValues`] over an epoch.
///
/// # Example
///
/// ```
/// use ml_training::{LossAccumulator, LossValues};
///
/// let mut acc = LossAccumulator::new();
/// acc.add(&LossValues { total: 1.0, ..LossValues::default() }, 2);
/// acc.add(&LossValues { total: 4.0, ..LossValues::default() }, 1);
/// assert!((acc.mean().total - 2.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossAccumulator {
    sum: LossValues,
    samples: usize,
}

impl LossAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one batch of `samples` instances.
    #[allow(clippy::cast_precision_loss)]
    pub fn add(&mut self, values: &LossValues, samples: usize) {
        let weight = samples as f32;
        for (sum, value) in self.sum.terms_mut().into_iter().zip(values.terms()) {
            *sum += value * weight;
        }
        self.samples += samples;
    }

    /// Number of instances seen.
    #[must_use]
    pub const fn samples(&self) -> usize {
        self.samples
    }

    /// Mean per instance; all zeros if nothing was added.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> LossValues {
        let mut mean = self.sum;
        if self.samples > 0 {
            let n = self.samples as f32;
            for term in mean.terms_mut() {
                *term /= n;
            }
        }
        mean
    }
}

/// Metrics for a single training epoch.
///
/// # Example
///
/// ```
/// use ml_training::{EpochMetrics, LossValues};
///
/// let train = LossValues { total: 0.5, ..LossValues::default() };
/// let metrics = EpochMetrics::new(0, train, None);
/// assert!((metrics.train_loss() - 0.5).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Epoch number (0-indexed).
    pub epoch: usize,

    /// Mean training losses.
    pub train: LossValues,

    /// Mean validation losses (if computed).
    pub val: Option<LossValues>,

    /// Mean factor discriminator loss (if trained).
    pub discriminator_loss: Option<f32>,

    /// Learning rate used.
    pub learning_rate: f32,

    /// Training time in seconds.
    pub train_time_secs: f32,

    /// Validation time in seconds.
    pub val_time_secs: Option<f32>,

    /// Number of training samples processed.
    pub train_samples: usize,

    /// Number of validation samples processed.
    pub val_samples: Option<usize>,
}

impl EpochMetrics {
    /// Creates new epoch metrics.
    #[must_use]
    pub const fn new(epoch: usize, train: LossValues, val: Option<LossValues>) -> Self {
        Self {
            epoch,
            train,
            val,
            discriminator_loss: None,
            learning_rate: 0.0,
            train_time_secs: 0.0,
            val_time_secs: None,
            train_samples: 0,
            val_samples: None,
        }
    }

    /// Sets the learning rate.
    #[must_use]
    pub const fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Sets the mean discriminator loss.
    #[must_use]
    pub const fn with_discriminator_loss(mut self, loss: f32) -> Self {
        self.discriminator_loss = Some(loss);
        self
    }

    /// Sets the training time.
    #[must_use]
    pub const fn with_train_time(mut self, secs: f32) -> Self {
        self.train_time_secs = secs;
        self
    }

    /// Sets the validation time.
    #[must_use]
    pub const fn with_val_time(mut self, secs: f32) -> Self {
        self.val_time_secs = Some(secs);
        self
    }

    /// Sets sample counts.
    #[must_use]
    pub const fn with_samples(mut self, train: usize, val: Option<usize>) -> Self {
        self.train_samples = train;
        self.val_samples = val;
        self
    }

    /// Weighted training loss.
    #[must_use]
    pub const fn train_loss(&self) -> f32 {
        self.train.total
    }

    /// Weighted validation loss.
    #[must_use]
    pub fn val_loss(&self) -> Option<f32> {
        self.val.map(|v| v.total)
    }

    /// Returns total time (train + val) in seconds.
    #[must_use]
    pub fn total_time_secs(&self) -> f32 {
        self.train_time_secs + self.val_time_secs.unwrap_or(0.0)
    }

    /// Returns true if validation loss is lower than `previous_best`.
    #[must_use]
    pub fn val_improved(&self, previous_best: Option<f32>) -> bool {
        match (self.val_loss(), previous_best) {
            (Some(current), Some(best)) => current < best,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// Aggregate metrics for a training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Metrics for each epoch.
    pub epoch_metrics: Vec<EpochMetrics>,

    /// Best validation loss seen.
    pub best_val_loss: Option<f32>,

    /// Epoch with best validation loss.
    pub best_epoch: Option<usize>,

    /// Total training time in seconds.
    pub total_time_secs: f32,

    /// Whether training was early stopped.
    pub early_stopped: bool,

    /// Reason for stopping (if not completed normally).
    pub stop_reason: Option<String>,
}

impl TrainingMetrics {
    /// Creates new empty training metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds metrics for an epoch.
    pub fn add_epoch(&mut self, metrics: EpochMetrics) {
        if metrics.val_improved(self.best_val_loss) {
            self.best_val_loss = metrics.val_loss();
            self.best_epoch = Some(metrics.epoch);
        }
        self.total_time_secs += metrics.total_time_secs();
        self.epoch_metrics.push(metrics);
    }

    /// Returns the number of completed epochs.
    #[must_use]
    pub fn epochs_completed(&self) -> usize {
        self.epoch_metrics.len()
    }

    /// Returns the final training loss.
    #[must_use]
    pub fn final_loss(&self) -> f32 {
        self.epoch_metrics.last().map_or(f32::NAN, EpochMetrics::train_loss)
    }

    /// Returns the initial training loss.
    #[must_use]
    pub fn initial_loss(&self) -> f32 {
        self.epoch_metrics.first().map_or(f32::NAN, EpochMetrics::train_loss)
    }

    /// Fractional loss reduction from the first to the last epoch.
    #[must_use]
    pub fn loss_improvement(&self) -> f32 {
        let initial = self.initial_loss();
        let final_loss = self.final_loss();
        if initial > 0.0 && !initial.is_nan() && !final_loss.is_nan() {
            1.0 - (final_loss / initial)
        } else {
            0.0
        }
    }

    /// Training losses per epoch.
    #[must_use]
    pub fn train_losses(&self) -> Vec<f32> {
        self.epoch_metrics.iter().map(EpochMetrics::train_loss).collect()
    }

    /// Marks training as early stopped.
    pub fn set_early_stopped(&mut self, reason: impl Into<String>) {
        self.early_stopped = true;
        self.stop_reason = Some(reason.into());
    }

    /// Returns a human-readable summary.
    #[must_use]
    #[allow(clippy::let_underscore_must_use)] // String::write_fmt is infallible
    pub fn summary(&self) -> String {
        use std::fmt::Write;

        let mut s = String::new();
        let _ = writeln!(s, "Training Summary");
        let _ = writeln!(s, "================");
        let _ = writeln!(s, "Epochs completed: {}", self.epochs_completed());
        let _ = writeln!(s, "Total time: {:.1}s", self.total_time_secs);
        let _ = writeln!(
            s,
            "Initial loss: {:.4} -> Final loss: {:.4}",
            self.initial_loss(),
            self.final_loss()
        );
        if let Some(last) = self.epoch_metrics.last() {
            let t = &last.train;
            let _ = writeln!(
                s,
                "Final terms: rec {:.4} kl {:.4} attr {:.4} adv {:.4} tc {:.4} lap {:.4}",
                t.reconstruction, t.kl, t.latent_attribute, t.adversarial, t.total_correlation, t.laplacian
            );
        }
        if let Some(best) = self.best_val_loss {
            let _ = writeln!(s, "Best val loss: {:.4} (epoch {})", best, self.best_epoch.unwrap_or(0));
        }
        if self.early_stopped {
            let _ = writeln!(s, "Early stopped: {}", self.stop_reason.as_deref().unwrap_or("yes"));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(value: f32) -> LossValues {
        LossValues {
            reconstruction: value,
            total: value,
            ..LossValues::default()
        }
    }

    #[test]
    fn accumulator_weights_by_samples() {
        let mut acc = LossAccumulator::new();
        assert_eq!(acc.mean(), LossValues::default());

        acc.add(&total(1.0), 3);
        acc.add(&total(5.0), 1);
        assert_eq!(acc.samples(), 4);
        assert!((acc.mean().total - 2.0).abs() < 1e-6);
        assert!((acc.mean().reconstruction - 2.0).abs() < 1e-6);
    }

    #[test]
    fn loss_values_finiteness() {
        assert!(total(1.0).is_finite());
        let mut bad = total(1.0);
        bad.kl = f32::INFINITY;
        assert!(!bad.is_finite());
    }

    #[test]
    fn epoch_metrics_builder() {
        let metrics = EpochMetrics::new(1, total(0.3), Some(total(0.4)))
            .with_learning_rate(1e-3)
            .with_discriminator_loss(0.69)
            .with_train_time(10.0)
            .with_val_time(2.0)
            .with_samples(1000, Some(200));

        assert!((metrics.learning_rate - 1e-3).abs() < 1e-6);
        assert_eq!(metrics.discriminator_loss, Some(0.69));
        assert!((metrics.total_time_secs() - 12.0).abs() < 1e-6);
        assert_eq!(metrics.val_samples, Some(200));
        assert_eq!(metrics.val_loss(), Some(0.4));
    }

    #[test]
    fn epoch_metrics_val_improved() {
        let metrics = EpochMetrics::new(0, total(0.5), Some(total(0.4)));
        assert!(metrics.val_improved(Some(0.5)));
        assert!(!metrics.val_improved(Some(0.3)));
        assert!(metrics.val_improved(None));
        assert!(!EpochMetrics::new(0, total(0.5), None).val_improved(Some(0.5)));
    }

    #[test]
    fn training_metrics_tracks_best() {
        let mut metrics = TrainingMetrics::new();
        metrics.add_epoch(EpochMetrics::new(0, total(1.0), Some(total(0.9))).with_train_time(5.0));
        metrics.add_epoch(EpochMetrics::new(1, total(0.5), Some(total(0.45))).with_train_time(5.0));
        metrics.add_epoch(EpochMetrics::new(2, total(0.4), Some(total(0.6))).with_train_time(5.0));

        assert_eq!(metrics.epochs_completed(), 3);
        assert_eq!(metrics.best_epoch, Some(1));
        assert_eq!(metrics.best_val_loss, Some(0.45));
        assert!((metrics.total_time_secs - 15.0).abs() < 1e-6);
        assert!((metrics.loss_improvement() - 0.6).abs() < 1e-6);
        assert_eq!(metrics.train_losses(), vec![1.0, 0.5, 0.4]);
    }

    #[test]
    fn training_metrics_summary() {
        let mut metrics = TrainingMetrics::new();
        metrics.add_epoch(EpochMetrics::new(0, total(1.0), Some(total(0.9))));
        metrics.set_early_stopped("no improvement for 10 epochs");

        let summary = metrics.summary();
        assert!(summary.contains("Epochs completed: 1"));
        assert!(summary.contains("Final terms: rec 1.0000"));
        assert!(summary.contains("Best val loss:"));
        assert!(summary.contains("Early stopped: no improvement"));
    }

    #[test]
    fn training_metrics_serialization() {
        let mut metrics = TrainingMetrics::new();
        metrics.add_epoch(EpochMetrics::new(0, total(0.5), Some(total(0.4))).with_discriminator_loss(0.7));

        let json = serde_json::to_string(&metrics).unwrap();
        let parsed: TrainingMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, metrics);
    }
}
