//! Linear layer initialization helpers.

use burn::module::Param;
use burn::nn::{self, Initializer};
use burn::prelude::Backend;
use burn::tensor::Tensor;

/// Negative slope of the discriminator's leaky activations.
pub const LEAKY_SLOPE: f64 = 0.2;

/// Linear layer with Xavier-uniform weights and a zero bias.
pub fn xavier_linear<B: Backend>(d_input: usize, d_output: usize, device: &B::Device) -> nn::Linear<B> {
    let mut linear = nn::LinearConfig::new(d_input, d_output)
        .with_initializer(Initializer::XavierUniform { gain: 1.0 })
        .init(device);
    linear.bias = Some(Param::from_tensor(Tensor::zeros([d_output], device)));
    linear
}

/// Linear layer with Kaiming-uniform weights tuned for leaky ReLU.
///
/// Gain is `sqrt(2 / (1 + slope²))`, computed from fan-in.
pub fn kaiming_leaky_linear<B: Backend>(
    d_input: usize,
    d_output: usize,
    device: &B::Device,
) -> nn::Linear<B> {
    let gain = (2.0 / (1.0 + LEAKY_SLOPE * LEAKY_SLOPE)).sqrt();
    nn::LinearConfig::new(d_input, d_output)
        .with_initializer(Initializer::KaimingUniform {
            gain,
            fan_out_only: false,
        })
        .init(device)
}
