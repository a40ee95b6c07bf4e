use super::{tensor_repack, Input, OpTensor, Tensor, Vector};
use crate::ir::error::{Error, Result};
use crate::ir::op::Op;

/// An unencrypted tensor held by a graph node.
///
/// Build these with [super::input], [super::public_in] or [super::secret_in].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OpInput {
    op: Op,
}

impl Vector for OpInput {
    fn op(&self) -> &Op {
        &self.op
    }

    fn wrap(op: Op) -> Result<Self> {
        if op.is_encrypted() {
            return Err(Error::EncryptedInput);
        }
        Ok(OpInput { op })
    }

    fn from_const(v: f64) -> Self {
        OpInput { op: Op::scalar(v) }
    }

    fn repack(&self) -> Result<Self> {
        tensor_repack(self)
    }

    fn rotate(&self, by: isize) -> Result<Self> {
        self.rotate_dim(0, by)
    }
}

impl Tensor for OpInput {}

impl Input for OpInput {
    type Enc = OpTensor;

    fn enc(&self) -> Result<OpTensor> {
        OpTensor::wrap(self.op.encrypted())
    }
}
