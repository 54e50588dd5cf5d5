//! Spiral convolution.

use std::sync::Arc;

use burn::module::{Ignored, Module};
use burn::nn;
use burn::prelude::Backend;
use burn::tensor::Tensor;
use ml_types::SpiralTable;

use crate::error::{ModelError, Result};
use crate::init::xavier_linear;
use crate::pool::index_tensor;

/// Convolution over fixed-length ordered vertex neighborhoods.
///
/// For every vertex the features of its spiral neighbors are concatenated
/// into one `length × in_channels` vector and mapped to `out_channels` by
/// a shared linear layer.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use ml_models::SpiralConv;
///
/// let conv = SpiralConv::<MyBackend>::new(3, 16, Arc::new(spiral_table), &device);
/// let y = conv.try_forward(x)?; // [batch, vertices, 3] -> [batch, vertices, 16]
/// ```
#[derive(Debug, Module)]
pub struct SpiralConv<B: Backend> {
    layer: nn::Linear<B>,
    spirals: Ignored<Arc<SpiralTable>>,
    in_channels: usize,
    out_channels: usize,
}

impl<B: Backend> SpiralConv<B> {
    /// Creates a convolution over `spirals` with Xavier weights and zero bias.
    #[must_use]
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        spirals: Arc<SpiralTable>,
        device: &B::Device,
    ) -> Self {
        let layer = xavier_linear(in_channels * spirals.length(), out_channels, device);
        Self {
            layer,
            spirals: Ignored(spirals),
            in_channels,
            out_channels,
        }
    }

    /// Applies the convolution.
    ///
    /// Accepts `[vertices, in_channels]` or
    /// `[batch, vertices, in_channels]`; batched input gathers along the
    /// vertex axis identically for every instance.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidRank`] for any other rank and
    /// [`ModelError::ShapeMismatch`] if the vertex or channel count does not
    /// match the spiral table and layer.
    pub fn try_forward<const D: usize>(&self, x: Tensor<B, D>) -> Result<Tensor<B, D>> {
        if D != 2 && D != 3 {
            return Err(ModelError::invalid_rank(D));
        }
        let table = &self.spirals.0;
        let dims = x.dims();
        let (vertex_axis, channel_axis) = (D.saturating_sub(2), D.saturating_sub(1));
        if dims[vertex_axis] != table.vertex_count() || dims[channel_axis] != self.in_channels {
            return Err(ModelError::shape_mismatch(
                format!("[.., {}, {}]", table.vertex_count(), self.in_channels),
                format!("{dims:?}"),
            ));
        }

        let indices = index_tensor::<B>(table.indices(), &x.device());
        let gathered = x.select(vertex_axis, indices);

        let mut shape = gathered.dims();
        shape[vertex_axis] = table.vertex_count();
        shape[channel_axis] = table.length() * self.in_channels;
        Ok(self.layer.forward(gathered.reshape(shape)))
    }

    /// Input channel count.
    #[must_use]
    pub const fn in_channels(&self) -> usize {
        self.in_channels
    }

    /// Output channel count.
    #[must_use]
    pub const fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Spiral length.
    #[must_use]
    pub fn spiral_length(&self) -> usize {
        self.spirals.0.length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn::module::Param;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn device() -> <TestBackend as Backend>::Device {
        <TestBackend as Backend>::Device::default()
    }

    fn ring_spirals() -> Arc<SpiralTable> {
        Arc::new(SpiralTable::from_rows(&[vec![0, 1, 2], vec![1, 2, 0], vec![2, 0, 1]]).unwrap())
    }

    #[test]
    fn output_shapes() {
        let conv = SpiralConv::<TestBackend>::new(2, 5, ring_spirals(), &device());
        assert_eq!(conv.spiral_length(), 3);

        let single = Tensor::<TestBackend, 2>::ones([3, 2], &device());
        assert_eq!(conv.try_forward(single).unwrap().dims(), [3, 5]);

        let batched = Tensor::<TestBackend, 3>::ones([4, 3, 2], &device());
        assert_eq!(conv.try_forward(batched).unwrap().dims(), [4, 3, 5]);
    }

    #[test]
    fn gathers_neighbors_in_spiral_order() {
        // One input channel, one output channel; weights [1, 10, 100] read
        // the spiral as a base-10 number.
        let mut conv = SpiralConv::<TestBackend>::new(1, 1, ring_spirals(), &device());
        conv.layer.weight = Param::from_tensor(Tensor::from_data(
            TensorData::new(vec![1.0_f32, 10.0, 100.0], [3, 1]),
            &device(),
        ));

        let x = Tensor::<TestBackend, 3>::from_data(TensorData::new(vec![1.0_f32, 2.0, 3.0], [1, 3, 1]), &device());
        let y = conv.try_forward(x).unwrap().into_data().to_vec::<f32>().unwrap();

        assert_relative_eq!(y[0], 321.0);
        assert_relative_eq!(y[1], 132.0);
        assert_relative_eq!(y[2], 213.0);
    }

    #[test]
    fn batch_instances_do_not_mix() {
        let conv = SpiralConv::<TestBackend>::new(2, 4, ring_spirals(), &device());
        let a = Tensor::<TestBackend, 2>::random([3, 2], burn::tensor::Distribution::Default, &device());
        let b = Tensor::<TestBackend, 2>::random([3, 2], burn::tensor::Distribution::Default, &device());

        let batched = Tensor::stack::<3>(vec![a.clone(), b], 0);
        let out = conv.try_forward(batched).unwrap();
        let first = out.slice([0..1, 0..3, 0..4]).reshape([3, 4]);
        let single = conv.try_forward(a).unwrap();

        let first = first.into_data().to_vec::<f32>().unwrap();
        let single = single.into_data().to_vec::<f32>().unwrap();
        for (x, y) in first.iter().zip(&single) {
            assert_relative_eq!(*x, *y, epsilon = 1e-6);
        }
    }

    #[test]
    fn rank_four_is_rejected() {
        let conv = SpiralConv::<TestBackend>::new(2, 4, ring_spirals(), &device());
        let x = Tensor::<TestBackend, 4>::ones([1, 1, 3, 2], &device());
        assert!(matches!(conv.try_forward(x), Err(ModelError::InvalidRank { rank: 4 })));
    }

    #[test]
    fn rank_one_is_rejected() {
        let conv = SpiralConv::<TestBackend>::new(2, 4, ring_spirals(), &device());
        let x = Tensor::<TestBackend, 1>::ones([6], &device());
        assert!(matches!(conv.try_forward(x), Err(ModelError::InvalidRank { rank: 1 })));
    }

    #[test]
    fn channel_mismatch_is_rejected() {
        let conv = SpiralConv::<TestBackend>::new(2, 4, ring_spirals(), &device());
        let x = Tensor::<TestBackend, 3>::ones([1, 3, 5], &device());
        assert!(matches!(conv.try_forward(x), Err(ModelError::ShapeMismatch { .. })));
    }
}
