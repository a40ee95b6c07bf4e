//! Concatenation

use crate::front::Tensor;
use crate::ir::error::Result;
use crate::ir::shape::normalize_dim;

/// `x` followed by `y` along `dim`; the other dimensions must agree.
pub fn concat<T: Tensor>(x: &T, y: &T, dim: isize) -> Result<T> {
    let d = normalize_dim(x.shape(), dim)?;
    let shift = x.shape()[d];
    let new_size = shift + y.shape()[normalize_dim(y.shape(), dim)?];

    let x = x.extend(dim, new_size)?;
    if new_size == shift {
        return Ok(x);
    }
    let y = y.extend(dim, new_size)?.shift(dim, shift as isize)?;
    x.add(&y)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::front::{as_input, tensor, Vector};
    use crate::ir::repack::with_manual_repack;
    use crate::target::df::Dataflow;

    use ndarray::{array, ArrayD, IxDyn};
    use std::collections::BTreeMap;

    #[test]
    fn host_values() {
        let a = as_input(array![[1.0, 2.0], [3.0, 4.0]].into_dyn());
        let b = as_input(array![[5.0], [6.0]].into_dyn());
        let c = concat(&a, &b, -1).unwrap();
        assert_eq!(
            **c.value(),
            array![[1.0, 2.0, 5.0], [3.0, 4.0, 6.0]].into_dyn()
        );
        let d = concat(&a, &a, 0).unwrap();
        assert_eq!(d.shape(), &vec![4, 2]);
    }

    #[test]
    fn empty() {
        let e = as_input(ArrayD::<f64>::zeros(IxDyn(&[0])));
        let c = concat(&e, &e, 0).unwrap();
        assert_eq!(c.shape(), &vec![0]);
        let x = as_input(array![1.0, 2.0].into_dyn());
        assert_eq!(concat(&x, &e, 0).unwrap().shape(), &vec![2]);
    }

    #[test]
    fn ciphertexts() {
        let x = tensor("x", &[2]).unwrap();
        let y = tensor("y", &[2]).unwrap();
        let z = with_manual_repack(|| concat(&x, &y, 0)).unwrap();
        assert_eq!(z.op().name(), "AddCC");
        let df = Dataflow::single(&z).unwrap();
        let mut ins = BTreeMap::new();
        ins.insert("x".to_owned(), array![1.0, 2.0].into_dyn());
        ins.insert("y".to_owned(), array![3.0, 4.0].into_dyn());
        // the shift leaves y's padding zero
        assert_eq!(
            df.outputs(&ins).unwrap()["result"],
            array![1.0, 2.0, 3.0, 4.0].into_dyn()
        );
    }
}
