//! Sparse pooling between mesh resolutions.

use burn::prelude::Backend;
use burn::tensor::{Int, Tensor, TensorData};
use ml_types::SparseOperator;

use crate::error::{ModelError, Result};

/// Upload vertex indices as an integer tensor.
pub(crate) fn index_tensor<B: Backend>(indices: &[u32], device: &B::Device) -> Tensor<B, 1, Int> {
    let data: Vec<i64> = indices.iter().map(|&i| i64::from(i)).collect();
    Tensor::from_data(TensorData::new(data, [indices.len()]), device)
}

/// Apply a sparse resampling operator to a per-vertex signal.
///
/// Computes `out[row] += value * x[col]` along the vertex axis for every
/// `(row, col, value)` triple of `operator`. The vertex axis is the
/// second-to-last one, so `x` may be `[vertices, channels]` or
/// `[batch, vertices, channels]`; the output has `operator.rows()` vertices.
///
/// # Errors
///
/// Returns [`ModelError::InvalidRank`] for ranks other than 2 or 3, or
/// [`ModelError::ShapeMismatch`] if the vertex count differs from
/// `operator.cols()`.
pub fn pool<B: Backend, const D: usize>(x: Tensor<B, D>, operator: &SparseOperator) -> Result<Tensor<B, D>> {
    if D != 2 && D != 3 {
        return Err(ModelError::invalid_rank(D));
    }
    let axis = D.saturating_sub(2);
    let dims = x.dims();
    if dims[axis] != operator.cols() {
        return Err(ModelError::shape_mismatch(
            format!("{} input vertices", operator.cols()),
            format!("{} vertices in {dims:?}", dims[axis]),
        ));
    }

    let device = x.device();
    let rows = index_tensor::<B>(operator.row_indices(), &device);
    let cols = index_tensor::<B>(operator.col_indices(), &device);

    let mut weight_shape = [1; D];
    weight_shape[axis] = operator.nnz();
    let weights = Tensor::<B, 1>::from_data(
        TensorData::new(operator.values().to_vec(), [operator.nnz()]),
        &device,
    )
    .reshape(weight_shape);

    let contributions = x.select(axis, cols) * weights;

    let mut out_shape = dims;
    out_shape[axis] = operator.rows();
    Ok(Tensor::<B, D>::zeros(out_shape, &device).select_assign(axis, rows, contributions))
}
