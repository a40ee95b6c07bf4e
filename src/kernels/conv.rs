//! 2-D convolution

use crate::front::{Input, Tensor};
use crate::ir::error::{Error, Result};
use crate::ir::op::index::{dim_selection, IndexElem, Slice};
use crate::ir::repack::result_repack;

use super::sum_all;

/// Zero the weights at output positions along `dim` that a shift by `shift` leaves invalid:
/// those the shift vacated and those past the output size.
pub fn conv_zero_weights<I: Input>(
    w: &I,
    dim: usize,
    kernel: usize,
    pad: usize,
    shift: isize,
) -> Result<I> {
    let size_i = w.shape()[dim] as isize;
    let size_o = size_i + 2 * pad as isize - (kernel as isize - 1);

    let start = shift.max(0);
    let end = size_o.min(size_i + shift);

    w.put(dim_selection(dim, Slice::up_to(start).into()), 0.0)?
        .put(dim_selection(dim, Slice::starting_at(end).into()), 0.0)
}

/// Convolve `image` (`C x H x W`) with `weights` (`K x C x R x S`), giving `K x H' x W'`.
///
/// Strides must be powers of 2. Padding must be at most `((R-1)/2, (S-1)/2)`; an output smaller
/// than the image is zero-padded to the image size before striding.
pub fn conv2d_raw<T: Tensor, I: Input>(
    image: &T,
    weights: &I,
    stride: (usize, usize),
    padding: (usize, usize),
) -> Result<T> {
    let (img_shape, w_shape) = (image.shape(), weights.shape());
    if img_shape.len() != 3 || w_shape.len() != 4 || img_shape[0] != w_shape[1] {
        return Err(Error::KernelShape {
            kernel: "conv2d",
            shapes: vec![img_shape.clone(), w_shape.clone()],
        });
    }
    let (h, w) = (img_shape[1], img_shape[2]);
    let (k, c, r, s) = (w_shape[0], w_shape[1], w_shape[2], w_shape[3]);
    let (p_r, p_s) = padding;

    result_repack(|| {
        let mut products = Vec::with_capacity(r * s);
        for i in 0..r {
            let s_i = p_r as isize - i as isize;
            let image_i = image.shift(-2, s_i)?;

            for j in 0..s {
                let s_j = p_s as isize - j as isize;
                let image_ij = image_i.shift(-1, s_j)?.replicate(0, k)?;

                let w_ij = weights
                    .get(vec![
                        Slice::full().into(),
                        Slice::full().into(),
                        IndexElem::At(i as isize),
                        IndexElem::At(j as isize),
                    ])?
                    .reshape(&[k, c, 1, 1])?
                    .broadcast_to(&[k, c, h, w])?;
                let w_ij = conv_zero_weights(&w_ij, 2, r, p_r, s_i)?;
                let w_ij = conv_zero_weights(&w_ij, 3, s, p_s, s_j)?;

                products.push(image_ij.mul(&T::lift(&w_ij)?)?);
            }
        }

        let mut result = sum_all("conv2d", products)?;
        result = result.stride(2, stride.0)?.stride(3, stride.1)?;
        result.sum(1)
    })
}

/// Convolution that keeps the image size (before striding).
pub fn conv2d<T: Tensor, I: Input>(image: &T, weights: &I, stride: usize) -> Result<T> {
    let (r, s) = match weights.shape().as_slice() {
        [_, _, r, s] => (*r, *s),
        _ => (1, 1),
    };
    conv2d_raw(
        image,
        weights,
        (stride, stride),
        (r.saturating_sub(1) / 2, s.saturating_sub(1) / 2),
    )
}

/// Convolution without padding; the valid region is zero-padded to the image size.
pub fn conv2d_unpadded<T: Tensor, I: Input>(image: &T, weights: &I, stride: usize) -> Result<T> {
    conv2d_raw(image, weights, (stride, stride), (0, 0))
}
