//! Programs built through the value API, lowered to a [Dataflow], and evaluated three ways:
//! eagerly on the host, with a caching traversal, and with a collecting traversal.

use std::collections::{BTreeMap, HashSet};

use ndarray::{Array1, ArrayD};
use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;

use tdf::front::{as_input, public_in, tensor, HostInput, OpTensor, Tensor, Vector};
use tdf::ir::repack::with_manual_repack;
use tdf::ir::traversal::kinds::Evaluate;
use tdf::ir::traversal::{traverse_gc, OpTraversal, PostOrderIter};
use tdf::target::df::Dataflow;
use tdf::Result;

const N: usize = 8;
/// Longer programs can square their way to infinity.
const MAX_STEPS: usize = 8;

#[derive(Clone, Debug)]
enum Step {
    AddW,
    MulW,
    Sub(usize),
    Mul(usize),
    Rotate(isize),
    Bootstrap,
}

impl Arbitrary for Step {
    fn arbitrary(g: &mut Gen) -> Self {
        match u8::arbitrary(g) % 6 {
            0 => Step::AddW,
            1 => Step::MulW,
            2 => Step::Sub(usize::arbitrary(g)),
            3 => Step::Mul(usize::arbitrary(g)),
            4 => Step::Rotate((i8::arbitrary(g) % N as i8) as isize),
            _ => Step::Bootstrap,
        }
    }
}

/// Every intermediate value of `steps` applied to `x`.
fn program<T: Tensor>(x: &T, w: &T, steps: &[Step]) -> Result<Vec<T>> {
    let mut vals = vec![x.clone()];
    for s in steps {
        let last = vals[vals.len() - 1].clone();
        let next = match s {
            Step::AddW => last.add(w)?,
            Step::MulW => last.mul(w)?,
            Step::Sub(i) => last.sub(&vals[i % vals.len()])?,
            Step::Mul(i) => last.mul(&vals[i % vals.len()])?,
            Step::Rotate(by) => last.rotate_dim(0, *by)?,
            Step::Bootstrap => last.bootstrap()?,
        };
        vals.push(next);
    }
    Ok(vals)
}

fn values() -> (ArrayD<f64>, ArrayD<f64>) {
    let x = Array1::from_shape_fn(N, |i| 0.1 * i as f64 - 0.3).into_dyn();
    let w = Array1::from_shape_fn(N, |i| 0.5 - 0.05 * (i * i) as f64).into_dyn();
    (x, w)
}

fn lowered(steps: &[Step]) -> Dataflow {
    let _ = env_logger::builder().is_test(true).try_init();
    let steps = &steps[..steps.len().min(MAX_STEPS)];
    let ops = with_manual_repack(|| {
        let x = tensor("x", &[N])?;
        let w = OpTensor::lift(&public_in("w", &[N])?)?;
        program(&x, &w, steps)
    })
    .unwrap();
    let mid = &ops[ops.len() / 2];
    let last = &ops[ops.len() - 1];
    Dataflow::new([("mid", mid.op().clone()), ("last", last.op().clone())]).unwrap()
}

fn inputs() -> BTreeMap<String, ArrayD<f64>> {
    let (x, w) = values();
    let mut m = BTreeMap::new();
    m.insert("x".to_owned(), x);
    m.insert("w".to_owned(), w);
    m
}

#[quickcheck]
fn lowered_matches_host(steps: Vec<Step>) -> bool {
    let (x, w) = values();
    let steps = &steps[..steps.len().min(MAX_STEPS)];
    let host = program(&as_input(x), &as_input(w), steps).unwrap();
    let mid: &HostInput = &host[host.len() / 2];
    let last: &HostInput = &host[host.len() - 1];
    let out = lowered(steps).outputs(&inputs()).unwrap();
    out["mid"] == **mid.value() && out["last"] == **last.value()
}

#[quickcheck]
fn gc_evaluates_each_node_once(steps: Vec<Step>) -> bool {
    let df = lowered(&steps);
    let ins = inputs();
    let roots = df.outputs_ops();
    let nodes = roots
        .iter()
        .flat_map(|r| PostOrderIter::new(r.clone()))
        .collect::<HashSet<_>>()
        .len();
    let gc = traverse_gc(Evaluate::new(&ins), roots).unwrap();
    let cached = OpTraversal::new(Evaluate::new(&ins)).traverse(roots).unwrap();
    gc.visitor().inner().evaluations() == nodes
        && cached.visitor().evaluations() == nodes
        && cached.len() == nodes
        && gc.len() == roots.len()
        && roots.iter().all(|r| gc.value(r) == cached.value(r))
}

#[test]
fn encoding_lists_encrypted_nodes() {
    let df = lowered(&[Step::MulW, Step::Rotate(1), Step::Mul(1)]);
    let text = df.encode();
    let opcodes: Vec<&str> = text
        .lines()
        .map(|l| l.split_whitespace().next().unwrap())
        .collect();
    // `mid` is numbered as soon as its operand is, before the last product
    assert_eq!(
        opcodes,
        vec!["InputC", "MulCP", "RotateC", "OutputC", "MulCC", "OutputC"]
    );
    assert_eq!(df.useful_ops(), 2 * N);
    assert_eq!(df.in_shapes().len(), 2);
}
