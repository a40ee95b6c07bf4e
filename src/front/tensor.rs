use super::{tensor_repack, Tensor, Vector};
use crate::ir::error::Result;
use crate::ir::op::Op;

/// A tensor held by a graph node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OpTensor {
    op: Op,
}

impl Vector for OpTensor {
    fn op(&self) -> &Op {
        &self.op
    }

    fn wrap(op: Op) -> Result<Self> {
        Ok(OpTensor { op })
    }

    fn from_const(v: f64) -> Self {
        OpTensor { op: Op::scalar(v) }
    }

    fn repack(&self) -> Result<Self> {
        tensor_repack(self)
    }

    fn rotate(&self, by: isize) -> Result<Self> {
        self.rotate_dim(0, by)
    }
}

impl Tensor for OpTensor {}

impl OpTensor {
    /// The underlying node.
    pub fn into_op(self) -> Op {
        self.op
    }
}
