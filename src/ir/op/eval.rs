//! Numeric evaluation of single nodes on host tensors

use std::rc::Rc;

use ndarray::{ArrayD, Axis, IxDyn, Slice};

use super::index::{resolve, select, select_mut};
use super::{Op, OpKind, TensorV};
use crate::cfg::cfg_or_default;
use crate::ir::error::{Error, Result};

/// Cyclically shift `t` by `by` along `dim`: `out[i] = t[i - by]`.
pub fn roll(t: &TensorV, dim: usize, by: isize) -> Result<TensorV> {
    let n = t.shape()[dim] as isize;
    if n == 0 {
        return Ok(t.clone());
    }
    let s = by.rem_euclid(n);
    if s == 0 {
        return Ok(t.clone());
    }
    let head = t.slice_axis(Axis(dim), Slice::from(n - s..));
    let tail = t.slice_axis(Axis(dim), Slice::from(..n - s));
    Ok(ndarray::concatenate(Axis(dim), &[head, tail])?)
}

/// The range along a dimension of size `n` that a shift by `by` wraps around.
fn wrap_range(n: usize, by: isize) -> Slice {
    if by >= 0 {
        Slice::from(..by)
    } else {
        Slice::from(n as isize + by..)
    }
}

fn reshaped(t: &TensorV, shape: &[usize]) -> Result<TensorV> {
    Ok(ArrayD::from_shape_vec(
        IxDyn(shape),
        t.iter().copied().collect(),
    )?)
}

fn broadcast(t: &TensorV, shape: &[usize]) -> Result<TensorV> {
    t.broadcast(IxDyn(shape))
        .map(|v| v.to_owned())
        .ok_or_else(|| Error::Broadcast {
            from: t.shape().to_vec(),
            to: shape.to_vec(),
        })
}

impl Op {
    /// Compute this node's value from its parents' values, given in operand order.
    ///
    /// Fails for [OpKind::Input] nodes, whose values must be bound externally.
    pub fn evaluate(&self, parents: &[Rc<TensorV>]) -> Result<Rc<TensorV>> {
        let shape = self.shape().as_slice();
        let out = match self.kind() {
            OpKind::Input { name, .. } => return Err(Error::EvaluateInput(name.clone())),
            OpKind::Const(t) => return Ok(t.clone()),
            OpKind::Encrypt | OpKind::Output { .. } | OpKind::Bootstrap | OpKind::ChetRepack => {
                return Ok(parents[0].clone())
            }
            OpKind::Add => &*parents[0] + &*parents[1],
            OpKind::Mul => &*parents[0] * &*parents[1],
            OpKind::Rotate { dim, by } => roll(&parents[0], *dim as usize, *by)?,
            OpKind::VectorRotate { by } => roll(&parents[0], 0, *by)?,
            OpKind::UnpaddedShift { dim, by } => {
                let d = *dim as usize;
                let mut out = roll(&parents[0], d, *by)?;
                let wrap = wrap_range(shape[d], *by);
                // fill with garbage, unless it's all 0
                if out.slice_axis(Axis(d), wrap).iter().any(|x| *x != 0.0) {
                    out.slice_axis_mut(Axis(d), wrap)
                        .fill(cfg_or_default().shift_garbage());
                }
                out
            }
            OpKind::ReorderDim { order } => {
                let order: Vec<usize> = order.iter().map(|&i| i as usize).collect();
                parents[0]
                    .view()
                    .permuted_axes(IxDyn(&order))
                    .as_standard_layout()
                    .into_owned()
            }
            OpKind::Stride { dim, by } => parents[0]
                .slice_axis(Axis(*dim as usize), Slice::new(0, None, *by as isize))
                .to_owned(),
            OpKind::Shrink { dim, size } => parents[0]
                .slice_axis(Axis(*dim as usize), Slice::from(..*size as isize))
                .to_owned(),
            OpKind::Extend { dim, .. } => {
                let t = &parents[0];
                let d = *dim as usize;
                let mut out = ArrayD::<f64>::zeros(IxDyn(shape));
                out.slice_axis_mut(Axis(d), Slice::from(..t.shape()[d] as isize))
                    .assign(&**t);
                out
            }
            OpKind::Sum { dim } => {
                let d = Axis(*dim as usize);
                parents[0].sum_axis(d).insert_axis(d)
            }
            OpKind::Replicate { .. } | OpKind::Broadcast { .. } => broadcast(&parents[0], shape)?,
            OpKind::DropDim { dim } => parents[0].index_axis(Axis(*dim as usize), 0).to_owned(),
            OpKind::InsertDim { dim } => parents[0]
                .view()
                .insert_axis(Axis(*dim as usize))
                .to_owned(),
            OpKind::Reshape { .. } | OpKind::Flatten => reshaped(&parents[0], shape)?,
            OpKind::GetItem { index } => {
                let r = resolve(parents[0].shape(), index)?;
                select(parents[0].view(), &r).to_owned()
            }
            OpKind::SetItem { index } => {
                let mut out = (*parents[0]).clone();
                let r = resolve(out.shape(), index)?;
                let mut region = select_mut(out.view_mut(), &r);
                let rhs = parents[1]
                    .broadcast(region.raw_dim())
                    .ok_or_else(|| Error::Broadcast {
                        from: parents[1].shape().to_vec(),
                        to: region.shape().to_vec(),
                    })?;
                region.assign(&rhs);
                out
            }
            OpKind::UFunc(f) => {
                let views = parents
                    .iter()
                    .map(|p| {
                        p.broadcast(IxDyn(shape)).ok_or_else(|| Error::Broadcast {
                            from: p.shape().to_vec(),
                            to: shape.to_vec(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                let mut iters: Vec<_> = views.iter().map(|v| v.iter()).collect();
                let mut args = Vec::with_capacity(iters.len());
                let data = (0..views.first().map_or(0, |v| v.len()))
                    .map(|_| {
                        args.clear();
                        args.extend(iters.iter_mut().filter_map(Iterator::next).copied());
                        f.call(&args)
                    })
                    .collect();
                ArrayD::from_shape_vec(IxDyn(shape), data)?
            }
            OpKind::Module { module, .. } => {
                let params: Vec<&TensorV> = parents[1..].iter().map(|p| &**p).collect();
                module.forward(&parents[0], &params)?
            }
        };
        Ok(Rc::new(out))
    }
}
