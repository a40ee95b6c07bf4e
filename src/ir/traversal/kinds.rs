//! The traversals the dataflow is built from

use std::collections::BTreeMap;
use std::rc::Rc;

use log::trace;

use super::OpVisitor;
use crate::ir::error::{Error, Result};
use crate::ir::op::{Op, OpKind, TensorV};
use crate::ir::shape::Shape;

/// Node identifiers: `(is_encrypted, n)`, with a separate count per flag.
///
/// Numbering follows first visit, so parents are numbered before their children.
#[derive(Default)]
pub struct IdAssign {
    next: [usize; 2],
}

impl OpVisitor for IdAssign {
    type Value = (bool, usize);
    fn visit(&mut self, op: &Op, _: Vec<(bool, usize)>) -> Result<(bool, usize)> {
        let enc = op.is_encrypted();
        let n = &mut self.next[enc as usize];
        let id = (enc, *n);
        *n += 1;
        Ok(id)
    }
}

/// Declared inputs, as `(name, shape)`.
#[derive(Default)]
pub struct Inputs;

impl OpVisitor for Inputs {
    type Value = Vec<(String, Shape)>;
    fn visit(&mut self, op: &Op, _: Vec<Self::Value>) -> Result<Self::Value> {
        Ok(match op.kind() {
            OpKind::Input { name, shape, .. } => vec![(name.clone(), shape.clone())],
            _ => Vec::new(),
        })
    }
}

/// The unencrypted nodes that an encryption turns into ciphertexts.
#[derive(Default)]
pub struct CtIn;

impl OpVisitor for CtIn {
    type Value = Vec<Op>;
    fn visit(&mut self, op: &Op, _: Vec<Vec<Op>>) -> Result<Vec<Op>> {
        Ok(match op.kind() {
            OpKind::Encrypt => op.parents().to_vec(),
            _ => Vec::new(),
        })
    }
}

/// The unencrypted nodes that encrypted operators consume as plaintext operands.
#[derive(Default)]
pub struct PtIn;

impl OpVisitor for PtIn {
    type Value = Vec<Op>;
    fn visit(&mut self, op: &Op, _: Vec<Vec<Op>>) -> Result<Vec<Op>> {
        if op.is_encrypted() && !matches!(op.kind(), OpKind::Encrypt) {
            Ok(op
                .parents()
                .iter()
                .filter(|p| !p.is_encrypted())
                .cloned()
                .collect())
        } else {
            Ok(Vec::new())
        }
    }
}

/// Host evaluation, with inputs bound by name.
pub struct Evaluate<'a> {
    inputs: &'a BTreeMap<String, TensorV>,
    evaluations: usize,
}

impl<'a> Evaluate<'a> {
    /// Evaluate against `inputs`.
    pub fn new(inputs: &'a BTreeMap<String, TensorV>) -> Self {
        Self {
            inputs,
            evaluations: 0,
        }
    }
    /// How many nodes have been computed.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }
}

impl OpVisitor for Evaluate<'_> {
    type Value = Rc<TensorV>;
    fn visit(&mut self, op: &Op, parents: Vec<Rc<TensorV>>) -> Result<Rc<TensorV>> {
        self.evaluations += 1;
        let out = match op.input_name() {
            Some(name) => Rc::new(
                self.inputs
                    .get(name)
                    .ok_or_else(|| Error::MissingInput(name.to_owned()))?
                    .clone(),
            ),
            None => op.evaluate(&parents)?,
        };
        trace!("{} = {:?}", op, out.shape());
        assert_eq!(
            out.shape(),
            op.shape().as_slice(),
            "Evaluated {} has the wrong shape",
            op
        );
        Ok(out)
    }
}

/// Sum of [Op::useful_ops] over encrypted nodes.
#[derive(Default)]
pub struct UsefulOps {
    total: usize,
}

impl UsefulOps {
    /// The running total.
    pub fn total(&self) -> usize {
        self.total
    }
}

impl OpVisitor for UsefulOps {
    type Value = ();
    fn visit(&mut self, op: &Op, _: Vec<()>) -> Result<()> {
        if op.is_encrypted() {
            self.total += op.useful_ops();
        }
        Ok(())
    }
}
