//! Gradient reversal.

use burn::prelude::Backend;
use burn::tensor::Tensor;

/// Identity in the forward pass; multiplies the gradient by `-scale` in the
/// backward pass.
///
/// Built from a detach splice: `x.detach() + (x - x.detach()) * -scale`. The
/// second term is exactly zero in value but carries the scaled, negated
/// gradient back to `x`.
pub fn reverse_gradient<B: Backend, const D: usize>(x: Tensor<B, D>, scale: f64) -> Tensor<B, D> {
    let frozen = x.clone().detach();
    frozen.clone() + (x - frozen) * (-scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn::module::Param;
    use burn::nn;
    use burn::tensor::TensorData;
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn device() -> <TestBackend as Backend>::Device {
        <TestBackend as Backend>::Device::default()
    }

    fn input() -> Tensor<TestBackend, 2> {
        Tensor::from_data(TensorData::new(vec![0.5_f32, -1.0, 2.0, 3.0, 0.25, -0.75], [2, 3]), &device())
            .require_grad()
    }

    #[test]
    fn forward_is_identity() {
        let x = input();
        let y = reverse_gradient(x.clone(), 2.5);
        let x = x.into_data().to_vec::<f32>().unwrap();
        let y = y.into_data().to_vec::<f32>().unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn gradient_through_toy_regressor_is_negated_and_scaled() {
        // Regressor: y = sum(x · w), so dy/dx = w for every row.
        let weights = vec![0.3_f32, -1.2, 2.0];
        let mut linear = nn::LinearConfig::new(3, 1).with_bias(false).init::<TestBackend>(&device());
        linear.weight = Param::from_tensor(Tensor::from_data(TensorData::new(weights.clone(), [3, 1]), &device()));

        let scale = 0.7;
        let x = input();
        let loss = linear.forward(reverse_gradient(x.clone(), scale)).sum();
        let grads = loss.backward();
        let grad = x.grad(&grads).map(|g| g.into_data().to_vec::<f32>().unwrap());

        let grad = grad.unwrap();
        #[allow(clippy::cast_possible_truncation)]
        let scale = scale as f32;
        for row in grad.chunks(3) {
            for (g, w) in row.iter().zip(&weights) {
                assert_relative_eq!(*g, -scale * w, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn regressor_weights_still_get_plain_gradient() {
        let mut linear = nn::LinearConfig::new(3, 1).with_bias(false).init::<TestBackend>(&device());
        linear.weight = Param::from_tensor(
            Tensor::from_data(TensorData::new(vec![1.0_f32, 1.0, 1.0], [3, 1]), &device()).require_grad(),
        );

        let x = input();
        let loss = linear.forward(reverse_gradient(x, 3.0)).sum();
        let grads = loss.backward();
        let grad = linear
            .weight
            .grad(&grads)
            .map(|g| g.into_data().to_vec::<f32>().unwrap())
            .unwrap();

        // d(loss)/dw_j = sum over rows of x_ij, unaffected by the reversal.
        assert_relative_eq!(grad[0], 3.5, epsilon = 1e-6);
        assert_relative_eq!(grad[1], -0.75, epsilon = 1e-6);
        assert_relative_eq!(grad[2], 1.25, epsilon = 1e-6);
    }
}
