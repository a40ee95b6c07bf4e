//! Matrix-vector multiplication

use crate::front::Tensor;
use crate::ir::error::{Error, Result};
use crate::ir::repack::result_repack;

/// Multiply an `N x M` matrix by an `M` vector, where `M` may span several dimensions.
pub fn mul_mv<T: Tensor>(matrix: &T, vector: &T) -> Result<T> {
    let m_shape = matrix.shape();
    if m_shape.is_empty() || vector.shape().as_slice() != &m_shape[1..] {
        return Err(Error::KernelShape {
            kernel: "mul_mv",
            shapes: vec![m_shape.clone(), vector.shape().clone()],
        });
    }
    let n = m_shape[0];
    result_repack(|| {
        let mut products = vector.replicate(0, n)?.mul(matrix)?;
        while products.shape().len() > 1 {
            products = products.sum(-1)?;
        }
        Ok(products)
    })
}
