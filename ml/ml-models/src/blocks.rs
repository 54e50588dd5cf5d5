//! Encoder and decoder blocks.

use std::sync::Arc;

use burn::module::{Ignored, Module};
use burn::prelude::Backend;
use burn::tensor::Tensor;
use ml_types::{SparseOperator, SpiralTable};

use crate::error::Result;
use crate::pool::pool;
use crate::spiral::SpiralConv;

/// Exponential linear unit with `alpha = 1`.
pub fn elu<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    x.clone().clamp_min(0.0) + (x.clamp_max(0.0).exp() - 1.0)
}

/// Spiral convolution, ELU, then downsampling.
#[derive(Debug, Module)]
pub struct EncoderBlock<B: Backend> {
    conv: SpiralConv<B>,
    down: Ignored<Arc<SparseOperator>>,
}

impl<B: Backend> EncoderBlock<B> {
    /// Creates a block convolving over `spirals` and pooling with `down`.
    #[must_use]
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        spirals: Arc<SpiralTable>,
        down: Arc<SparseOperator>,
        device: &B::Device,
    ) -> Self {
        Self {
            conv: SpiralConv::new(in_channels, out_channels, spirals, device),
            down: Ignored(down),
        }
    }

    /// `[batch, vertices, in] -> [batch, down.rows(), out]`.
    ///
    /// # Errors
    ///
    /// Propagates shape errors from the convolution or pooling.
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        pool(elu(self.conv.try_forward(x)?), &self.down.0)
    }
}

/// Upsampling, spiral convolution, then ELU.
#[derive(Debug, Module)]
pub struct DecoderBlock<B: Backend> {
    up: Ignored<Arc<SparseOperator>>,
    conv: SpiralConv<B>,
}

impl<B: Backend> DecoderBlock<B> {
    /// Creates a block pooling with `up` and convolving over `spirals`.
    #[must_use]
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        spirals: Arc<SpiralTable>,
        up: Arc<SparseOperator>,
        device: &B::Device,
    ) -> Self {
        Self {
            up: Ignored(up),
            conv: SpiralConv::new(in_channels, out_channels, spirals, device),
        }
    }

    /// `[batch, up.cols(), in] -> [batch, up.rows(), out]`.
    ///
    /// # Errors
    ///
    /// Propagates shape errors from the pooling or convolution.
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        Ok(elu(self.conv.try_forward(pool(x, &self.up.0)?)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn device() -> <TestBackend as Backend>::Device {
        <TestBackend as Backend>::Device::default()
    }

    fn square_spirals() -> Arc<SpiralTable> {
        Arc::new(
            SpiralTable::from_rows(&[vec![0, 1, 3], vec![1, 2, 0], vec![2, 3, 1], vec![3, 0, 2]]).unwrap(),
        )
    }

    fn halve() -> Arc<SparseOperator> {
        Arc::new(SparseOperator::from_triples(2, 4, &[(0, 0, 0.5), (0, 1, 0.5), (1, 2, 0.5), (1, 3, 0.5)]).unwrap())
    }

    fn double() -> Arc<SparseOperator> {
        Arc::new(SparseOperator::from_triples(4, 2, &[(0, 0, 1.0), (1, 0, 1.0), (2, 1, 1.0), (3, 1, 1.0)]).unwrap())
    }

    #[test]
    fn elu_values() {
        let x = Tensor::<TestBackend, 1>::from_data(TensorData::new(vec![-2.0_f32, 0.0, 1.5], [3]), &device());
        let y = elu(x).into_data().to_vec::<f32>().unwrap();
        assert_relative_eq!(y[0], (-2.0_f32).exp() - 1.0, epsilon = 1e-6);
        assert_relative_eq!(y[1], 0.0);
        assert_relative_eq!(y[2], 1.5);
    }

    #[test]
    fn encoder_block_downsamples() {
        let block = EncoderBlock::<TestBackend>::new(3, 8, square_spirals(), halve(), &device());
        let x = Tensor::<TestBackend, 3>::ones([2, 4, 3], &device());
        assert_eq!(block.forward(x).unwrap().dims(), [2, 2, 8]);
    }

    #[test]
    fn decoder_block_upsamples() {
        let block = DecoderBlock::<TestBackend>::new(8, 4, square_spirals(), double(), &device());
        let x = Tensor::<TestBackend, 3>::ones([2, 2, 8], &device());
        let y = block.forward(x).unwrap();
        assert_eq!(y.dims(), [2, 4, 4]);
        // ELU output is bounded below by -1.
        let min = y.min().into_scalar();
        assert!(min >= -1.0);
    }

    #[test]
    fn encoder_rejects_wrong_vertex_count() {
        let block = EncoderBlock::<TestBackend>::new(3, 8, square_spirals(), halve(), &device());
        let x = Tensor::<TestBackend, 3>::ones([1, 5, 3], &device());
        assert!(block.forward(x).is_err());
    }
}
