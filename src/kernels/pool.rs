//! Average pooling

use ndarray::arr0;

use crate::front::{as_input, Input, Tensor, Vector};
use crate::ir::error::Result;
use crate::ir::op::index::shift_wrap_selection;
use crate::ir::repack::result_repack;

use super::sum_all;

/// The shifts that bring each tap of a centered `filter_size` window onto its output position.
pub fn conv_shifts(filter_size: usize) -> impl Iterator<Item = isize> {
    let start = -((filter_size / 2) as isize);
    (start..start + filter_size as isize).rev()
}

/// Average over `kernel_size x kernel_size` windows of the last two dimensions, keeping every
/// `stride`-th output. Windows are centered; taps that fall outside the image count as zero.
pub fn avg_pool2d<T: Tensor>(image: &T, kernel_size: usize, stride: usize) -> Result<T> {
    let dims = image.shape().len();
    result_repack(|| {
        let w = as_input(arr0(1.0 / (kernel_size * kernel_size) as f64).into_dyn())
            .broadcast_to(image.shape())?;
        let mut products = Vec::new();
        for s_i in conv_shifts(kernel_size) {
            let image_i = image.shift(-2, s_i)?;
            let w_i = w.put(shift_wrap_selection(dims - 2, s_i), 0.0)?;

            for s_j in conv_shifts(kernel_size) {
                let image_ij = image_i.shift(-1, s_j)?;
                let w_ij = w_i.put(shift_wrap_selection(dims - 1, s_j), 0.0)?;
                products.push(image_ij.mul(&T::lift(&w_ij)?)?);
            }
        }
        sum_all("avg_pool2d", products)?
            .stride(-1, stride)?
            .stride(-2, stride)
    })
}

/// Average over the last two dimensions, removing them.
pub fn global_avg_pool2d<T: Tensor>(image: &T) -> Result<T> {
    let shape = image.shape();
    let scale = (shape[shape.len() - 1] * shape[shape.len() - 2]) as f64;
    result_repack(|| image.sum(-1)?.sum(-1)?.mul(1.0 / scale))
}
