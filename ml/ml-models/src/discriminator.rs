//! Factor-independence critic over latent codes.

use burn::module::Module;
use burn::nn;
use burn::prelude::Backend;
use burn::tensor::Tensor;
use burn::tensor::activation::leaky_relu;

use crate::init::{LEAKY_SLOPE, kaiming_leaky_linear};

/// Hidden width of every discriminator layer.
pub const DISCRIMINATOR_HIDDEN: usize = 1000;

/// Six-layer perceptron classifying latent codes as joint samples or
/// dimension-permuted samples.
///
/// Architecture: `latent -> 1000 -> 1000 -> 1000 -> 1000 -> 1000 -> 2`,
/// leaky ReLU (slope 0.2) between layers, raw logits out.
///
/// # Example
///
/// ```ignore
/// let critic = FactorDiscriminator::<MyBackend>::new(16, &device);
/// let logits = critic.forward(z); // [batch, 2]
/// ```
#[derive(Debug, Module)]
pub struct FactorDiscriminator<B: Backend> {
    hidden: Vec<nn::Linear<B>>,
    output: nn::Linear<B>,
}

impl<B: Backend> FactorDiscriminator<B> {
    /// Creates a discriminator over `latent_size`-dimensional codes.
    #[must_use]
    pub fn new(latent_size: usize, device: &B::Device) -> Self {
        Self::with_hidden(latent_size, DISCRIMINATOR_HIDDEN, device)
    }

    /// Creates a discriminator with a custom hidden width.
    #[must_use]
    pub fn with_hidden(latent_size: usize, hidden: usize, device: &B::Device) -> Self {
        let mut layers = vec![kaiming_leaky_linear(latent_size, hidden, device)];
        layers.extend((0..4).map(|_| kaiming_leaky_linear(hidden, hidden, device)));
        Self {
            hidden: layers,
            output: kaiming_leaky_linear(hidden, 2, device),
        }
    }

    /// `[batch, latent_size] -> [batch, 2]` logits.
    pub fn forward(&self, z: Tensor<B, 2>) -> Tensor<B, 2> {
        let z = self
            .hidden
            .iter()
            .fold(z, |z, layer| leaky_relu(layer.forward(z), LEAKY_SLOPE));
        self.output.forward(z)
    }

    /// Number of linear layers.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.hidden.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Distribution;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn six_layers_two_logits() {
        let device = <TestBackend as Backend>::Device::default();
        let critic = FactorDiscriminator::<TestBackend>::with_hidden(8, 32, &device);
        assert_eq!(critic.depth(), 6);

        let z = Tensor::<TestBackend, 2>::random([5, 8], Distribution::Default, &device);
        assert_eq!(critic.forward(z).dims(), [5, 2]);
    }

    #[test]
    fn default_width() {
        let device = <TestBackend as Backend>::Device::default();
        let critic = FactorDiscriminator::<TestBackend>::new(4, &device);
        assert_eq!(critic.output.weight.val().dims(), [DISCRIMINATOR_HIDDEN, 2]);
        assert_eq!(critic.hidden[0].weight.val().dims(), [4, DISCRIMINATOR_HIDDEN]);
    }
}
