//! The dataflow handed to the backend
//!
//! A [Dataflow] is built from named program results. It numbers every node, finds the
//! program inputs and the values the backend must receive (ciphertext inputs to encrypt,
//! plaintext operands of encrypted operators), and can
//! * encode the encrypted operators in the backend's text format ([Dataflow::encode])
//! * evaluate any of these on host tensors, to produce backend inputs and reference outputs

use std::collections::BTreeMap;
use std::rc::Rc;

use fxhash::FxHashSet;
use log::debug;
use serde::Serialize;

use crate::cfg::cfg_or_default;
use crate::front::Vector;
use crate::ir::error::{Error, Result};
use crate::ir::op::{Op, TensorV};
use crate::ir::shape::Shape;
use crate::ir::traversal::kinds::{CtIn, Evaluate, IdAssign, Inputs, PtIn, UsefulOps};
use crate::ir::traversal::{traverse_gc, OpTraversal};

pub mod encode;

use encode::{encode_op, format_rows};

/// The default name of a program's single input.
pub const STDIN: &str = "input";
/// The default name of a program's single output.
pub const STDOUT: &str = "result";

/// Input and output shapes, by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Manifest {
    /// declared inputs
    pub inputs: BTreeMap<String, Shape>,
    /// program outputs
    pub outputs: BTreeMap<String, Shape>,
}

/// A program, ready for the backend.
pub struct Dataflow {
    outputs: Vec<Op>,
    ids: OpTraversal<IdAssign>,
    pt_in: Vec<Op>,
    ct_in: Vec<Op>,
    in_shapes: Vec<(String, Shape)>,
    out_shapes: Vec<(String, Shape)>,
    useful_ops: usize,
}

impl Dataflow {
    /// A dataflow whose outputs are the given `(name, node)` pairs, in order.
    pub fn new<S: Into<String>>(outputs: impl IntoIterator<Item = (S, Op)>) -> Result<Self> {
        let mut names = FxHashSet::default();
        let outputs = outputs
            .into_iter()
            .map(|(name, op)| {
                let name = name.into();
                if !names.insert(name.clone()) {
                    return Err(Error::DuplicateOutput(name));
                }
                Op::output(&op, name)
            })
            .collect::<Result<Vec<_>>>()?;

        let ids = OpTraversal::new(IdAssign::default()).traverse(&outputs)?;
        let pt_in = OpTraversal::new(PtIn).traverse(&outputs)?.unique_values();
        let ct_in = OpTraversal::new(CtIn).traverse(&outputs)?.unique_values();
        let in_shapes = OpTraversal::new(Inputs).traverse(&outputs)?.unique_values();
        check_input_names(&in_shapes)?;
        let out_shapes = outputs
            .iter()
            .filter_map(|o| Some((o.output_name()?.to_owned(), o.shape().clone())))
            .collect();
        let useful_ops = OpTraversal::new(UsefulOps::default())
            .traverse(&outputs)?
            .visitor()
            .total();

        debug!(
            "Dataflow: {} nodes, {} inputs, {} outputs, {} plaintext and {} ciphertext backend inputs",
            ids.len(),
            in_shapes.len(),
            outputs.len(),
            pt_in.len(),
            ct_in.len()
        );

        Ok(Dataflow {
            outputs,
            ids,
            pt_in,
            ct_in,
            in_shapes,
            out_shapes,
            useful_ops,
        })
    }

    /// A dataflow with the single output [STDOUT].
    pub fn single(out: &impl Vector) -> Result<Self> {
        Dataflow::new([(STDOUT, out.op().clone())])
    }

    /// The `(encrypted, n)` identifier of a node.
    ///
    /// Panics if `op` is not part of this dataflow.
    pub fn id(&self, op: &Op) -> (bool, usize) {
        *self
            .ids
            .value(op)
            .unwrap_or_else(|| panic!("{} is not part of this dataflow", op))
    }

    /// The encoded encrypted operators, one line each, in id order.
    pub fn encode(&self) -> String {
        let rows: Vec<[String; 4]> = self
            .ids
            .sorted_items()
            .into_iter()
            .filter(|(_, (enc, _))| *enc)
            .map(|(op, _)| encode_op(op, |p| self.id(p)))
            .collect();
        format_rows(&rows)
    }

    /// Declared inputs, in discovery order.
    pub fn in_shapes(&self) -> &[(String, Shape)] {
        &self.in_shapes
    }

    /// Outputs, in declaration order.
    pub fn out_shapes(&self) -> &[(String, Shape)] {
        &self.out_shapes
    }

    /// The output nodes.
    pub fn outputs_ops(&self) -> &[Op] {
        &self.outputs
    }

    /// Input and output shapes.
    pub fn manifest(&self) -> Manifest {
        Manifest {
            inputs: self.in_shapes.iter().cloned().collect(),
            outputs: self.out_shapes.iter().cloned().collect(),
        }
    }

    /// Estimated scalar operations the backend performs.
    pub fn useful_ops(&self) -> usize {
        self.useful_ops
    }

    fn eval(&self, ops: &[Op], inputs: &BTreeMap<String, TensorV>) -> Result<Vec<TensorV>> {
        verify_shapes(inputs, &self.in_shapes)?;
        let values = if cfg_or_default().gc_evaluation() {
            traverse_gc(Evaluate::new(inputs), ops)?.into_values()
        } else {
            OpTraversal::new(Evaluate::new(inputs))
                .traverse(ops)?
                .into_values()
        };
        Ok(ops
            .iter()
            .map(|op| {
                let v = values[op].clone();
                Rc::try_unwrap(v).unwrap_or_else(|v| (*v).clone())
            })
            .collect())
    }

    fn eval_by_id(
        &self,
        ops: &[Op],
        inputs: &BTreeMap<String, TensorV>,
    ) -> Result<BTreeMap<String, TensorV>> {
        let values = self.eval(ops, inputs)?;
        Ok(ops
            .iter()
            .map(|op| self.id(op).1.to_string())
            .zip(values)
            .collect())
    }

    /// Plaintext operands of encrypted operators, keyed by id.
    pub fn pt_in(&self, inputs: &BTreeMap<String, TensorV>) -> Result<BTreeMap<String, TensorV>> {
        self.eval_by_id(&self.pt_in, inputs)
    }

    /// Values to encrypt, keyed by id.
    pub fn ct_in(&self, inputs: &BTreeMap<String, TensorV>) -> Result<BTreeMap<String, TensorV>> {
        self.eval_by_id(&self.ct_in, inputs)
    }

    /// Program outputs, keyed by name.
    pub fn outputs(&self, inputs: &BTreeMap<String, TensorV>) -> Result<BTreeMap<String, TensorV>> {
        let values = self.eval(&self.outputs, inputs)?;
        Ok(self
            .out_shapes
            .iter()
            .map(|(name, _)| name.clone())
            .zip(values)
            .collect())
    }
}

fn check_input_names(in_shapes: &[(String, Shape)]) -> Result<()> {
    let mut seen: BTreeMap<&str, &Shape> = BTreeMap::new();
    for (name, shape) in in_shapes {
        if let Some(first) = seen.insert(name.as_str(), shape) {
            return Err(Error::ConflictingInput {
                name: name.clone(),
                first: first.clone(),
                second: shape.clone(),
            });
        }
    }
    Ok(())
}

/// Check that `tensors` has every expected input, with its declared shape.
pub fn verify_shapes(
    tensors: &BTreeMap<String, TensorV>,
    expected: &[(String, Shape)],
) -> Result<()> {
    for (name, shape) in expected {
        match tensors.get(name) {
            None => return Err(Error::MissingInput(name.clone())),
            Some(t) if t.shape() != shape.as_slice() => {
                return Err(Error::InputShape {
                    name: name.clone(),
                    expected: shape.clone(),
                    found: t.shape().to_vec(),
                })
            }
            Some(_) => {}
        }
    }
    Ok(())
}
