use super::kinds::*;
use super::*;
use crate::ir::op::{Op, OpKind};
use crate::op;

use ndarray::{arr1, ArrayD, IxDyn};
use std::collections::BTreeMap;

fn diamond() -> (Op, Op, Op) {
    let x = Op::input("x", vec![4], true).unwrap();
    let a = op![OpKind::Add; x, x].unwrap();
    let b = op![OpKind::Mul; a, x].unwrap();
    let c = op![OpKind::Add; a, b].unwrap();
    (x, a, c)
}

#[derive(Default)]
struct Depth {
    visits: usize,
}

impl OpVisitor for Depth {
    type Value = usize;
    fn visit(&mut self, _: &Op, parents: Vec<usize>) -> Result<usize> {
        self.visits += 1;
        Ok(parents.into_iter().max().map_or(0, |d| d + 1))
    }
}

#[test]
fn each_node_visited_once() {
    let (_, _, c) = diamond();
    let t = OpTraversal::new(Depth::default()).traverse([&c]).unwrap();
    assert_eq!(t.visitor().visits, 4);
    assert_eq!(t.value(&c), Some(&3));
    assert_eq!(t.len(), 4);
}

#[test]
fn parents_in_operand_order() {
    struct Names;
    impl OpVisitor for Names {
        type Value = String;
        fn visit(&mut self, op: &Op, parents: Vec<String>) -> Result<String> {
            Ok(match op.input_name() {
                Some(n) => n.to_owned(),
                None => format!("({})", parents.join(" ")),
            })
        }
    }
    let x = Op::input("x", vec![2], false).unwrap();
    let y = Op::input("y", vec![2], false).unwrap();
    let z = op![OpKind::Add; y, x].unwrap();
    let w = op![OpKind::Mul; z, x].unwrap();
    let mut t = OpTraversal::new(Names);
    assert_eq!(t.get(&w).unwrap(), "((y x) x)");
}

#[test]
fn visit_order_is_post_order() {
    let (x, a, c) = diamond();
    let t = OpTraversal::new(Depth::default()).traverse([&c]).unwrap();
    let order: Vec<&Op> = t.iter().map(|(o, _)| o).collect();
    assert_eq!(order[0], &x);
    assert_eq!(order[1], &a);
    assert_eq!(order[3], &c);
}

#[test]
fn deep_chain() {
    let mut x = Op::input("x", vec![2], false).unwrap();
    for _ in 0..100_000 {
        x = op![OpKind::Bootstrap; x].unwrap();
    }
    let mut t = OpTraversal::new(Depth::default());
    assert_eq!(t.get(&x).unwrap(), 100_000);
}

#[test]
fn ids_number_each_class() {
    let x = Op::input("x", vec![4], true).unwrap();
    let k = Op::input("k", vec![4], false).unwrap();
    let y = op![OpKind::Encrypt; x].unwrap();
    let z = op![OpKind::Mul; y, k].unwrap();
    let o = Op::output(&z, "o").unwrap();
    let t = OpTraversal::new(IdAssign::default()).traverse([&o]).unwrap();
    // operands are visited last to first
    assert_eq!(t.value(&k), Some(&(false, 0)));
    assert_eq!(t.value(&x), Some(&(false, 1)));
    assert_eq!(t.value(&y), Some(&(true, 0)));
    assert_eq!(t.value(&z), Some(&(true, 1)));
    assert_eq!(t.value(&o), Some(&(true, 2)));
    let sorted: Vec<_> = t.sorted_items().into_iter().map(|(_, id)| *id).collect();
    assert_eq!(
        sorted,
        vec![(false, 0), (false, 1), (true, 0), (true, 1), (true, 2)]
    );
}

#[test]
fn inputs_deduplicated_in_order() {
    let x = Op::input("x", vec![2], true).unwrap();
    let y = Op::input("y", vec![2], false).unwrap();
    let s = op![OpKind::Add; x, y].unwrap();
    let p = op![OpKind::Mul; s, x].unwrap();
    let t = OpTraversal::new(Inputs).traverse([&p]).unwrap();
    assert_eq!(
        t.unique_values(),
        vec![("x".to_owned(), vec![2]), ("y".to_owned(), vec![2])]
    );
}

#[test]
fn ct_and_pt_inputs() {
    let x = Op::input("x", vec![2], true).unwrap();
    let w = Op::input("w", vec![2], false).unwrap();
    let y = op![OpKind::Encrypt; x].unwrap();
    let z = op![OpKind::Mul; y, w].unwrap();
    let z2 = op![OpKind::Add; z, w].unwrap();
    let ct = OpTraversal::new(CtIn).traverse([&z2]).unwrap().unique_values();
    assert_eq!(ct, vec![x]);
    let pt = OpTraversal::new(PtIn).traverse([&z2]).unwrap().unique_values();
    assert_eq!(pt, vec![w]);
}

#[test]
fn useful_ops_counts_encrypted() {
    let x = Op::input("x", vec![2, 4], true).unwrap();
    let k = Op::input("k", vec![2, 4], false).unwrap();
    let plain = op![OpKind::Mul; k, k].unwrap();
    let y = op![OpKind::Encrypt; x].unwrap();
    let z = op![OpKind::Mul; y, plain].unwrap();
    let s = op![OpKind::Sum { dim: 1 }; z].unwrap();
    let t = OpTraversal::new(UsefulOps::default())
        .traverse([&s])
        .unwrap();
    assert_eq!(t.visitor().total(), 8 + 8);
}

#[test]
fn consumer_edges() {
    let (x, a, c) = diamond();
    let counts = Consumers::count([&c]).unwrap();
    assert_eq!(counts[&x], 3);
    assert_eq!(counts[&a], 2);
    assert!(!counts.contains_key(&c));
}

fn eval_inputs() -> BTreeMap<String, ndarray::ArrayD<f64>> {
    let mut m = BTreeMap::new();
    m.insert("x".to_owned(), arr1(&[1.0, 2.0, 3.0, 4.0]).into_dyn());
    m
}

#[test]
fn gc_keeps_only_roots() {
    let (_, _, c) = diamond();
    let inputs = eval_inputs();
    let t = traverse_gc(Evaluate::new(&inputs), &[c.clone()]).unwrap();
    assert_eq!(t.len(), 1);
    assert_eq!(t.visitor().inner().evaluations(), 4);
    // a = 2x, b = 2x^2, c = 2x + 2x^2
    let expect = arr1(&[4.0, 12.0, 24.0, 40.0]).into_dyn();
    assert_eq!(**t.value(&c).unwrap(), expect);
}

#[test]
fn gc_and_cached_agree() {
    let (_, a, c) = diamond();
    let inputs = eval_inputs();
    let roots = [c.clone(), a.clone()];
    let gc = traverse_gc(Evaluate::new(&inputs), &roots).unwrap();
    let cached = OpTraversal::new(Evaluate::new(&inputs))
        .traverse(&roots)
        .unwrap();
    assert_eq!(cached.len(), 4);
    for r in &roots {
        assert_eq!(gc.value(r).unwrap(), cached.value(r).unwrap());
    }
}

#[test]
fn missing_input() {
    let (_, _, c) = diamond();
    let inputs = BTreeMap::new();
    let r = OpTraversal::new(Evaluate::new(&inputs)).traverse([&c]);
    assert!(matches!(r, Err(crate::Error::MissingInput(n)) if n == "x"));
}

#[test]
#[should_panic]
fn wrong_input_shape_panics() {
    let (_, _, c) = diamond();
    let mut inputs = BTreeMap::new();
    inputs.insert("x".to_owned(), ArrayD::zeros(IxDyn(&[3])));
    let _ = OpTraversal::new(Evaluate::new(&inputs)).traverse([&c]);
}

#[test]
fn post_order_iter() {
    let (x, a, c) = diamond();
    let v: Vec<Op> = PostOrderIter::new(c.clone()).collect();
    assert_eq!(v.len(), 4);
    assert_eq!(v[0], x);
    assert_eq!(v[1], a);
    assert_eq!(v[3], c);
}
