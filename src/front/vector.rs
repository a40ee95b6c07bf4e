use super::Vector;
use crate::ir::error::{Error, Result};
use crate::ir::op::Op;
use crate::ir::shape::{is_pow_of_2, numel};

/// A vector held by a graph node: at most one dimension, with a power-of-two (or zero) length.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OpVector {
    op: Op,
}

impl Vector for OpVector {
    fn op(&self) -> &Op {
        &self.op
    }

    fn wrap(op: Op) -> Result<Self> {
        let shape = op.shape();
        if shape.len() > 1 {
            return Err(Error::VectorRank(shape.clone()));
        }
        let n = numel(shape);
        if n != 0 && !is_pow_of_2(n) {
            return Err(Error::VectorSize(shape.clone()));
        }
        Ok(OpVector { op })
    }

    fn from_const(v: f64) -> Self {
        OpVector { op: Op::scalar(v) }
    }
}

impl OpVector {
    /// The underlying node.
    pub fn into_op(self) -> Op {
        self.op
    }
}
