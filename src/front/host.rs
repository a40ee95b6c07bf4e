use std::rc::Rc;

use super::{Input, Tensor, Vector};
use crate::ir::error::{Error, Result};
use crate::ir::op::{Op, OpKind, TensorV};

/// An Input known at compile time, backed by a host tensor.
///
/// Operations are validated by building the node, and then evaluated immediately. The node is a
/// `Const`, so a host input embeds into any graph it is combined with.
#[derive(Clone, Debug)]
pub struct HostInput {
    value: Rc<TensorV>,
    op: Op,
}

impl HostInput {
    /// Wrap host data.
    pub fn new(value: impl Into<Rc<TensorV>>) -> Self {
        let value = value.into();
        let op = Op::constant(value.clone());
        HostInput { value, op }
    }

    /// The host data.
    pub fn value(&self) -> &Rc<TensorV> {
        &self.value
    }
}

impl Vector for HostInput {
    fn op(&self) -> &Op {
        &self.op
    }

    fn wrap(op: Op) -> Result<Self> {
        match op.const_value() {
            Some(v) => Ok(HostInput {
                value: v.clone(),
                op,
            }),
            None => Err(Error::NotSupported),
        }
    }

    fn from_const(v: f64) -> Self {
        HostInput::new(ndarray::arr0(v).into_dyn())
    }

    fn apply_raw(kind: OpKind, args: &[Self]) -> Result<Self> {
        let op = Op::new(kind, args.iter().map(|a| a.op.clone()).collect())?;
        let parents = op
            .parents()
            .iter()
            .map(|p| {
                p.const_value().cloned().ok_or_else(|| {
                    Error::EvaluateInput(p.input_name().unwrap_or_default().to_owned())
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(HostInput::new(op.evaluate(&parents)?))
    }

    fn rotate(&self, by: isize) -> Result<Self> {
        self.rotate_dim(0, by)
    }
}

impl Tensor for HostInput {}

impl Input for HostInput {
    type Enc = HostInput;

    fn enc(&self) -> Result<HostInput> {
        Ok(self.clone())
    }
}
