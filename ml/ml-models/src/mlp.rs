//! Feed-forward heads operating on the latent feature sub-vector.

use burn::module::Module;
use burn::nn;
use burn::prelude::Backend;
use burn::tensor::Tensor;
use burn::tensor::activation::relu;

use crate::init::xavier_linear;
use crate::reversal::reverse_gradient;

/// Linear → ReLU → batch norm → dropout.
#[derive(Debug, Module)]
pub struct HiddenLayer<B: Backend> {
    linear: nn::Linear<B>,
    norm: nn::BatchNorm<B, 0>,
    dropout: nn::Dropout,
}

impl<B: Backend> HiddenLayer<B> {
    fn new(d_input: usize, d_output: usize, dropout: f64, device: &B::Device) -> Self {
        Self {
            linear: xavier_linear(d_input, d_output, device),
            norm: nn::BatchNormConfig::new(d_output).init(device),
            dropout: nn::DropoutConfig::new(dropout).init(),
        }
    }

    fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.linear.forward(x));
        self.dropout.forward(self.norm.forward(x))
    }
}

/// Square feed-forward transform of the feature sub-vector.
///
/// Two hidden layers of width `features`, then a final linear map back to
/// `features`. Batch norm and dropout follow Burn's training/inference
/// convention (active only on autodiff backends).
#[derive(Debug, Module)]
pub struct FeatureProjection<B: Backend> {
    hidden: Vec<HiddenLayer<B>>,
    output: nn::Linear<B>,
}

impl<B: Backend> FeatureProjection<B> {
    /// Creates a projection over `features` channels.
    #[must_use]
    pub fn new(features: usize, dropout: f64, device: &B::Device) -> Self {
        Self {
            hidden: vec![
                HiddenLayer::new(features, features, dropout, device),
                HiddenLayer::new(features, features, dropout, device),
            ],
            output: xavier_linear(features, features, device),
        }
    }

    /// `[batch, features] -> [batch, features]`.
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.hidden.iter().fold(x, |x, layer| layer.forward(x));
        self.output.forward(x)
    }
}

/// Adversarial attribute regressor.
///
/// Reverses the gradient of its input, then predicts one scalar per row
/// through two hidden layers of widths `hidden.0` and `hidden.1`.
#[derive(Debug, Module)]
pub struct AttributeRegressor<B: Backend> {
    hidden: Vec<HiddenLayer<B>>,
    output: nn::Linear<B>,
    reversal_scale: f64,
}

impl<B: Backend> AttributeRegressor<B> {
    /// Creates a regressor from `features` inputs.
    #[must_use]
    pub fn new(
        features: usize,
        hidden: (usize, usize),
        dropout: f64,
        reversal_scale: f64,
        device: &B::Device,
    ) -> Self {
        Self {
            hidden: vec![
                HiddenLayer::new(features, hidden.0, dropout, device),
                HiddenLayer::new(hidden.0, hidden.1, dropout, device),
            ],
            output: xavier_linear(hidden.1, 1, device),
            reversal_scale,
        }
    }

    /// `[batch, features] -> [batch, 1]`.
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = reverse_gradient(x, self.reversal_scale);
        let x = self.hidden.iter().fold(x, |x, layer| layer.forward(x));
        self.output.forward(x)
    }
}
