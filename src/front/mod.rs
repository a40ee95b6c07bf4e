//! Value types for writing tensor programs
//!
//! Programs are written against three nested families of values:
//! * [Vector]: a (possibly) encrypted vector; only low-level code uses these directly
//! * [Tensor]: a (possibly) encrypted multi-dimensional tensor
//! * [Input]: an unencrypted tensor, which supports preprocessing that cannot be done on
//!   ciphertexts
//!
//! Every Input is a Tensor, and every Tensor is a Vector, so code written for a Tensor also
//! works on an Input.
//!
//! Programs obtain Inputs from [input], [public_in], [secret_in] (graph inputs) or [as_input],
//! [zeros], [ones] (host data, evaluated eagerly), and then call [Input::enc] to get a Tensor.
//! Encrypting a Secret Input produces a ciphertext; encrypting a Public one leaves it in the
//! clear. Results of multi-operand operations are as confidential as their most confidential
//! operand.
//!
//! Operations return [Result]: an operator whose parameters do not fit its operands fails
//! before any node is built.

use std::rc::Rc;

use ndarray::IxDyn;

use crate::ir::error::{Error, Result};
use crate::ir::op::index::Index;
use crate::ir::op::{HostModule, Op, OpKind, TensorV, UFunc};
use crate::ir::repack::{auto_repack_enabled, with_manual_repack};
use crate::ir::shape::{broadcast_shapes, numel, Shape};

mod host;
mod input;
mod ops;
mod tensor;
mod vector;

pub use host::HostInput;
pub use input::OpInput;
pub use tensor::OpTensor;
pub use vector::OpVector;

/// An operand of the value protocol: a value of the family, or a scalar to embed.
#[derive(Clone, Debug)]
pub enum Operand<V> {
    /// a value
    Value(V),
    /// a constant, embedded with [Vector::from_const]
    Scalar(f64),
}

impl<V: Vector> From<V> for Operand<V> {
    fn from(v: V) -> Self {
        Operand::Value(v)
    }
}

impl<V: Vector> From<&V> for Operand<V> {
    fn from(v: &V) -> Self {
        Operand::Value(v.clone())
    }
}

impl<V: Vector> From<f64> for Operand<V> {
    fn from(s: f64) -> Self {
        Operand::Scalar(s)
    }
}

/// A (possibly) encrypted vector.
pub trait Vector: Clone + Sized {
    /// The node holding this value.
    fn op(&self) -> &Op;

    /// View `op` as a value of this family, checking the family's constraints.
    fn wrap(op: Op) -> Result<Self>;

    /// A 0-dimensional constant of this family.
    fn from_const(v: f64) -> Self;

    /// Build `kind` over `args` (no coercion, broadcasting or repacking).
    fn apply_raw(kind: OpKind, args: &[Self]) -> Result<Self> {
        Self::wrap(Op::new(kind, args.iter().map(|a| a.op().clone()).collect())?)
    }

    /// Normalize the packing of this value.
    fn repack(&self) -> Result<Self> {
        Ok(self.clone())
    }

    /// View another value's node as this family.
    fn lift(other: &impl Vector) -> Result<Self> {
        Self::wrap(other.op().clone())
    }

    /// The static shape.
    fn shape(&self) -> &Shape {
        self.op().shape()
    }

    /// The number of elements.
    fn len(&self) -> usize {
        numel(self.shape())
    }

    /// Does this value hold no elements?
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The construction protocol: embed scalars, optionally broadcast every operand to the
    /// common shape, build the node, then repack if automatic repacking is on.
    fn apply_self(kind: OpKind, args: Vec<Operand<Self>>, broadcast: bool) -> Result<Self> {
        let mut args: Vec<Self> = args
            .into_iter()
            .map(|a| match a {
                Operand::Value(v) => v,
                Operand::Scalar(s) => Self::from_const(s),
            })
            .collect();
        if args.is_empty() {
            return Err(Error::NoValueOperand);
        }
        if broadcast {
            let shape = broadcast_shapes(&args.iter().map(|a| a.shape()).collect::<Vec<_>>())?;
            args = args
                .iter()
                .map(|a| a.broadcast_to(&shape))
                .collect::<Result<_>>()?;
        }
        let result = Self::apply_raw(kind, &args)?;
        if auto_repack_enabled() {
            result.repack()
        } else {
            Ok(result)
        }
    }

    /// Apply a unary operator.
    fn apply(&self, kind: OpKind) -> Result<Self> {
        Self::apply_self(kind, vec![Operand::Value(self.clone())], false)
    }

    /// Apply an operator to this value followed by `others`.
    fn apply_with(&self, kind: OpKind, others: Vec<Operand<Self>>) -> Result<Self> {
        let mut args = vec![Operand::Value(self.clone())];
        args.extend(others);
        Self::apply_self(kind, args, false)
    }

    /// Like [Vector::apply_with], broadcasting every operand to the common shape first.
    fn apply_broadcast(&self, kind: OpKind, others: Vec<Operand<Self>>) -> Result<Self> {
        let mut args = vec![Operand::Value(self.clone())];
        args.extend(others);
        Self::apply_self(kind, args, true)
    }

    /// `self + other`
    fn add(&self, other: impl Into<Operand<Self>>) -> Result<Self> {
        self.apply_broadcast(OpKind::Add, vec![other.into()])
    }

    /// `other + self`
    fn radd(&self, other: impl Into<Operand<Self>>) -> Result<Self> {
        Self::apply_self(
            OpKind::Add,
            vec![other.into(), Operand::Value(self.clone())],
            true,
        )
    }

    /// `self * other`
    fn mul(&self, other: impl Into<Operand<Self>>) -> Result<Self> {
        self.apply_broadcast(OpKind::Mul, vec![other.into()])
    }

    /// `self - other`, as `self + (-1 * other)`
    fn sub(&self, other: impl Into<Operand<Self>>) -> Result<Self> {
        match other.into() {
            Operand::Scalar(s) => self.add(-s),
            Operand::Value(v) => self.add(v.neg()?),
        }
    }

    /// `other - self`, as `other + (-1 * self)`
    fn rsub(&self, other: impl Into<Operand<Self>>) -> Result<Self> {
        self.neg()?.radd(other)
    }

    /// `-self`, as `self * -1`
    fn neg(&self) -> Result<Self> {
        self.mul(-1.0)
    }

    /// Cyclically rotate the whole vector by `by` slots.
    fn rotate(&self, by: isize) -> Result<Self> {
        if by == 0 {
            return Ok(self.clone());
        }
        self.apply(OpKind::VectorRotate { by })
    }

    /// Refresh the ciphertext.
    fn bootstrap(&self) -> Result<Self> {
        self.apply(OpKind::Bootstrap)
    }

    /// Broadcast to `shape`; ciphertexts cannot change shape this way.
    fn broadcast_to(&self, shape: &[usize]) -> Result<Self> {
        if shape == self.shape().as_slice() {
            Ok(self.clone())
        } else {
            self.apply(OpKind::Broadcast {
                shape: shape.to_vec(),
            })
        }
    }
}

/// A (possibly) encrypted tensor.
///
/// Dimensions are `isize` and may count from the end.
pub trait Tensor: Vector {
    /// Apply a shape-changing operator, keeping `self` if the shape would not change.
    fn reshape_or_self(&self, kind: OpKind) -> Result<Self> {
        let result = self.apply(kind)?;
        if result.shape() != self.shape() {
            Ok(result)
        } else {
            Ok(self.clone())
        }
    }

    /// Cyclically rotate along `dim`.
    fn rotate_dim(&self, dim: isize, by: isize) -> Result<Self> {
        if by == 0 {
            return Ok(self.clone());
        }
        self.apply(OpKind::Rotate { dim, by })
    }

    /// Shift along `dim`; the vacated region holds unspecified values.
    fn shift(&self, dim: isize, by: isize) -> Result<Self> {
        if by == 0 {
            return Ok(self.clone());
        }
        self.apply(OpKind::UnpaddedShift { dim, by })
    }

    /// Insert a dimension of size `n` at `dim`, copying the value along it.
    fn replicate(&self, dim: isize, n: usize) -> Result<Self> {
        self.insert_dim(dim)?
            .reshape_or_self(OpKind::Replicate { dim, n })
    }

    /// Sum along `dim`, removing it.
    fn sum(&self, dim: isize) -> Result<Self> {
        self.reshape_or_self(OpKind::Sum { dim })?.drop_dim(dim)
    }

    /// Zero-pad `dim` to `size`.
    fn extend(&self, dim: isize, size: usize) -> Result<Self> {
        self.reshape_or_self(OpKind::Extend { dim, size })
    }

    /// Truncate `dim` to `size`.
    fn shrink(&self, dim: isize, size: usize) -> Result<Self> {
        self.reshape_or_self(OpKind::Shrink { dim, size })
    }

    /// Keep every `by`-th element along `dim`.
    fn stride(&self, dim: isize, by: usize) -> Result<Self> {
        self.reshape_or_self(OpKind::Stride { dim, by })
    }

    /// Insert a dimension of size 1 at `dim`.
    fn insert_dim(&self, dim: isize) -> Result<Self> {
        self.insert_dim_sized(dim, 1)
    }

    /// Insert a zero-padded dimension of size `size` at `dim`.
    fn insert_dim_sized(&self, dim: isize, size: usize) -> Result<Self> {
        self.apply(OpKind::InsertDim { dim })?.extend(dim, size)
    }

    /// Remove `dim`, keeping only its first entry.
    fn drop_dim(&self, dim: isize) -> Result<Self> {
        self.shrink(dim, 1)?.apply(OpKind::DropDim { dim })
    }

    /// Permute the trailing dimensions.
    fn reorder_dim(&self, order: &[isize]) -> Result<Self> {
        self.apply(OpKind::ReorderDim {
            order: order.to_vec(),
        })
    }

    /// Swap the last two dimensions.
    fn t(&self) -> Result<Self> {
        self.reorder_dim(&[-1, -2])
    }
}

/// An unencrypted tensor.
pub trait Input: Tensor {
    /// What [Input::enc] produces.
    type Enc: Tensor;

    /// Encrypt, if Secret.
    fn enc(&self) -> Result<Self::Enc>;

    /// Encrypt, if Secret, as a vector.
    fn enc_vector(&self) -> Result<OpVector> {
        OpVector::wrap(self.op().encrypted())
    }

    /// `self / other`
    fn div(&self, other: impl Into<Operand<Self>>) -> Result<Self> {
        self.apply_broadcast(OpKind::UFunc(UFunc::divide()), vec![other.into()])
    }

    /// `other / self`
    fn rdiv(&self, other: impl Into<Operand<Self>>) -> Result<Self> {
        Self::apply_self(
            OpKind::UFunc(UFunc::divide()),
            vec![other.into(), Operand::Value(self.clone())],
            true,
        )
    }

    /// `self ^ other`
    fn pow(&self, other: impl Into<Operand<Self>>) -> Result<Self> {
        self.apply_broadcast(OpKind::UFunc(UFunc::pow()), vec![other.into()])
    }

    /// `other ^ self`
    fn rpow(&self, other: impl Into<Operand<Self>>) -> Result<Self> {
        Self::apply_self(
            OpKind::UFunc(UFunc::pow()),
            vec![other.into(), Operand::Value(self.clone())],
            true,
        )
    }

    /// Elementwise square root.
    fn sqrt(&self) -> Result<Self> {
        self.apply(OpKind::UFunc(UFunc::sqrt()))
    }

    /// Select a sub-array.
    fn get(&self, index: Index) -> Result<Self> {
        self.apply(OpKind::GetItem { index })
    }

    /// A copy with the selection `index` overwritten by `value`.
    fn put(&self, index: Index, value: impl Into<Operand<Self>>) -> Result<Self> {
        self.apply_with(OpKind::SetItem { index }, vec![value.into()])
    }

    /// Reinterpret the elements with a new shape.
    fn reshape(&self, shape: &[usize]) -> Result<Self> {
        self.apply(OpKind::Reshape {
            shape: shape.to_vec(),
        })
    }

    /// Collapse to one dimension.
    fn flatten(&self) -> Result<Self> {
        self.apply(OpKind::Flatten)
    }

    /// Apply a host module; its parameters become Public inputs named `<prefix>.<param>`.
    fn apply_module(&self, module: Rc<dyn HostModule>, prefix: &str) -> Result<Self> {
        self.apply(OpKind::Module {
            module,
            prefix: prefix.to_owned(),
        })
    }
}

/// Repack a tensor-family value under manual repack.
fn tensor_repack<T: Tensor>(t: &T) -> Result<T> {
    with_manual_repack(|| t.apply(OpKind::ChetRepack))
}

/// A program input.
pub fn input(name: &str, shape: &[usize], secret: bool) -> Result<OpInput> {
    OpInput::wrap(Op::input(name, shape.to_vec(), secret)?)
}

/// A Public program input.
pub fn public_in(name: &str, shape: &[usize]) -> Result<OpInput> {
    input(name, shape, false)
}

/// A Secret program input.
pub fn secret_in(name: &str, shape: &[usize]) -> Result<OpInput> {
    input(name, shape, true)
}

/// An encrypted program input.
pub fn tensor(name: &str, shape: &[usize]) -> Result<OpTensor> {
    secret_in(name, shape)?.enc()
}

/// Host data as an eagerly evaluated Input.
pub fn as_input(value: impl Into<Rc<TensorV>>) -> HostInput {
    HostInput::new(value)
}

/// An all-zero host Input.
pub fn zeros(shape: &[usize]) -> HostInput {
    as_input(TensorV::zeros(IxDyn(shape)))
}

/// An all-one host Input.
pub fn ones(shape: &[usize]) -> HostInput {
    as_input(TensorV::ones(IxDyn(shape)))
}
