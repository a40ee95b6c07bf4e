//! Tensor programs written against the public API, evaluated through a [Dataflow] and checked
//! against direct computations, for every mix of encrypted and plaintext operands.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use ndarray::{Array1, ArrayD, Axis, IxDyn, Zip};
use rand::distributions::{Distribution, Uniform};
use rand::SeedableRng;
use rand_chacha::ChaChaRng;

use tdf::front::{as_input, input, Input, OpTensor, Tensor, Vector};
use tdf::ir::repack::{manual_repack, result_repack};
use tdf::kernels::{concat, maximum, mul_mv};
use tdf::target::df::Dataflow;
use tdf::Result;

#[derive(Default)]
struct Case {
    inputs: BTreeMap<String, ArrayD<f64>>,
}

impl Case {
    fn input(&mut self, t: &ArrayD<f64>, secret: bool) -> OpTensor {
        let name = self.inputs.len().to_string();
        self.inputs.insert(name.clone(), t.clone());
        input(&name, t.shape(), secret).unwrap().enc().unwrap()
    }

    fn eval(&self, v: &impl Vector) -> ArrayD<f64> {
        Dataflow::single(v)
            .unwrap()
            .outputs(&self.inputs)
            .unwrap()
            .remove("result")
            .unwrap()
    }
}

/// Every assignment of secrecy to `n` operands with at least one secret.
fn secret_configs(n: usize) -> impl Iterator<Item = Vec<bool>> {
    (1..1usize << n).map(move |m| (0..n).map(|i| (m >> i) & 1 == 1).collect())
}

fn check(
    shapes: &[&[usize]],
    fhe: impl Fn(&[OpTensor]) -> Result<OpTensor>,
    clear: impl Fn(&[ArrayD<f64>]) -> ArrayD<f64>,
    epsilon: f64,
) {
    let _ = env_logger::builder().is_test(true).try_init();
    let rng = &mut ChaChaRng::seed_from_u64(0);
    let dist = Uniform::new(-1.0, 1.0);
    let tensors: Vec<ArrayD<f64>> = shapes
        .iter()
        .map(|s| ArrayD::from_shape_simple_fn(IxDyn(s), || dist.sample(rng)))
        .collect();
    let expected = clear(&tensors);
    for secret in secret_configs(shapes.len()) {
        let mut case = Case::default();
        let ins: Vec<OpTensor> = tensors
            .iter()
            .zip(&secret)
            .map(|(t, s)| case.input(t, *s))
            .collect();
        let actual = case.eval(&fhe(&ins).unwrap());
        assert_abs_diff_eq!(actual, expected, epsilon = epsilon);
    }
}

fn mul_tv<T: Tensor>(t: &T, v: &T) -> Result<T> {
    let (i, j) = (t.shape()[0], t.shape()[1]);
    result_repack(|| {
        let v_rep = v.replicate(0, j)?.replicate(0, i)?;
        t.mul(&v_rep)?.sum(2)
    })
}

fn mul_tm<T: Tensor>(t: &T, m: &T) -> Result<T> {
    let (i, j, k) = (t.shape()[0], t.shape()[1], m.shape()[0]);
    result_repack(|| {
        let t_rep = t.replicate(2, k)?;
        let m_rep = m.replicate(0, j)?.replicate(0, i)?;
        t_rep.mul(&m_rep)?.sum(3)
    })
}

fn mttkrp<T: Tensor>(b: &T, c: &T, d: &T) -> Result<T> {
    let (i, l, j) = (b.shape()[0], b.shape()[1], c.shape()[0]);
    let _manual = manual_repack();
    let b_rep = b.replicate(2, j)?;
    let c_rep = c.replicate(0, l)?.replicate(0, i)?;
    let bc = b_rep.mul(&c_rep)?.sum(3)?.repack()?;
    let d_rep = d.replicate(0, i)?;
    bc.mul(&d_rep)?.sum(1)?.repack()
}

fn inner_prod<T: Tensor>(a: &T, b: &T) -> Result<T> {
    result_repack(|| {
        let mut prod = a.mul(b)?;
        for _ in a.shape() {
            prod = prod.sum(0)?;
        }
        Ok(prod)
    })
}

/// `t[i, j, :] . v`
fn clear_tv(t: &ArrayD<f64>, v: &ArrayD<f64>) -> ArrayD<f64> {
    (t * v).sum_axis(Axis(2))
}

#[test]
fn tensor_times_vector() {
    for (i, j, k) in [(1, 1, 1), (3, 4, 2), (4, 5, 7)] {
        check(
            &[&[i, j, k], &[k]],
            |x| mul_tv(&x[0], &x[1]),
            |x| clear_tv(&x[0], &x[1]),
            1e-9,
        );
    }
}

#[test]
fn tensor_times_matrix() {
    for (i, j, k, l) in [(1, 1, 1, 1), (2, 3, 4, 5), (5, 7, 8, 6)] {
        check(
            &[&[i, j, l], &[k, l]],
            |x| mul_tm(&x[0], &x[1]),
            |x| {
                ArrayD::from_shape_fn(IxDyn(&[i, j, k]), |p| {
                    (0..l).map(|q| x[0][[p[0], p[1], q]] * x[1][[p[2], q]]).sum()
                })
            },
            1e-9,
        );
    }
}

#[test]
fn mttkrp_contraction() {
    for (i, j, k, l) in [(1, 1, 1, 1), (2, 5, 3, 4), (6, 2, 4, 3)] {
        check(
            &[&[i, l, k], &[j, k], &[l, j]],
            |x| mttkrp(&x[0], &x[1], &x[2]),
            |x| {
                ArrayD::from_shape_fn(IxDyn(&[i, j]), |p| {
                    let mut acc = 0.0;
                    for kk in 0..k {
                        for ll in 0..l {
                            acc += x[0][[p[0], ll, kk]] * x[1][[p[1], kk]] * x[2][[ll, p[1]]];
                        }
                    }
                    acc
                })
            },
            1e-9,
        );
    }
}

#[test]
fn inner_products() {
    let shapes: [&[usize]; 7] = [&[], &[1], &[1, 1], &[5], &[4, 6], &[3, 1, 4], &[1, 5, 9, 2]];
    for shape in shapes {
        check(
            &[shape, shape],
            |x| inner_prod(&x[0], &x[1]),
            |x| ndarray::arr0((&x[0] * &x[1]).sum()).into_dyn(),
            1e-9,
        );
    }
}

#[test]
fn matrix_vector() {
    for (n, m) in [(1, 1), (3, 5), (8, 8)] {
        check(
            &[&[n, m], &[m]],
            |x| mul_mv(&x[0], &x[1]),
            |x| (&x[0] * &x[1]).sum_axis(Axis(1)),
            1e-9,
        );
    }
}

#[test]
fn concatenation() {
    check(
        &[&[2, 3], &[2, 5]],
        |x| concat(&x[0], &x[1], 1),
        |x| ndarray::concatenate(Axis(1), &[x[0].view(), x[1].view()]).unwrap(),
        1e-12,
    );
    check(
        &[&[0], &[0]],
        |x| concat(&x[0], &x[1], 0),
        |_| ArrayD::zeros(IxDyn(&[0])),
        0.0,
    );
}

#[test]
fn maxima() {
    for (shape, n) in [(&[][..], 2), (&[5][..], 2), (&[4, 3, 8][..], 2), (&[1, 1][..], 3)] {
        let shapes = vec![shape; n];
        check(
            &shapes,
            |x| maximum(x),
            |x| {
                x.iter().skip(1).fold(x[0].clone(), |acc, t| {
                    Zip::from(&acc).and(t).map_collect(|a, b| a.max(*b))
                })
            },
            5e-3,
        );
    }
}

/// A complex vector as separate real and imaginary parts.
#[derive(Clone)]
struct Complex {
    r: OpTensor,
    i: OpTensor,
}

impl Complex {
    fn mul(&self, o: &Complex) -> Result<Complex> {
        Ok(Complex {
            r: self.r.mul(&o.r)?.add(&self.i.mul(-1.0)?.mul(&o.i)?)?,
            i: self.r.mul(&o.i)?.add(&self.i.mul(&o.r)?)?,
        })
    }
    fn mask(&self, m: &OpTensor) -> Result<Complex> {
        Ok(Complex {
            r: self.r.mul(m)?,
            i: self.i.mul(m)?,
        })
    }
    fn add(&self, o: &Complex) -> Result<Complex> {
        Ok(Complex {
            r: self.r.add(&o.r)?,
            i: self.i.add(&o.i)?,
        })
    }
    fn scale(&self, s: f64) -> Result<Complex> {
        Ok(Complex {
            r: self.r.mul(s)?,
            i: self.i.mul(s)?,
        })
    }
    fn rotate(&self, k: isize) -> Result<Complex> {
        Ok(Complex {
            r: self.r.rotate(k)?,
            i: self.i.rotate(k)?,
        })
    }
}

fn host(v: Array1<f64>) -> Result<OpTensor> {
    OpTensor::lift(&as_input(v.into_dyn()))
}

/// Decimation-in-frequency FFT; the output is in bit-reversed order.
fn fft_dif(x_real: &OpTensor) -> Result<Complex> {
    let n = x_real.shape()[0];
    let mut x = Complex {
        r: x_real.clone(),
        i: host(Array1::zeros(n))?,
    };
    let mut k = n;
    while k > 1 {
        let h = k / 2;
        let left = host(Array1::from_shape_fn(n, |p| if p % k < h { 1.0 } else { 0.0 }))?;
        let right = host(Array1::from_shape_fn(n, |p| if p % k < h { 0.0 } else { 1.0 }))?;

        let x_l = x.mask(&left)?;
        let x_r = x.mask(&right)?;
        let x_sum = x_l.add(&x_r.rotate(-(h as isize))?)?;
        let x_sub = x_l.rotate(h as isize)?.add(&x_r.scale(-1.0)?)?;
        x = x_sum.add(&x_sub)?;

        let angle = |p: usize| 2.0 * PI * (p % k - h) as f64 / k as f64;
        let twiddles = Complex {
            r: host(Array1::from_shape_fn(n, |p| if p % k < h { 1.0 } else { angle(p).cos() }))?,
            i: host(Array1::from_shape_fn(n, |p| if p % k < h { 0.0 } else { angle(p).sin() }))?,
        };
        x = x.mul(&twiddles)?;
        k = h;
    }
    Ok(x)
}

fn bit_reverse(mut i: usize, mut n: usize) -> usize {
    let mut j = 0;
    while n > 1 {
        j = j * 2 + i % 2;
        i /= 2;
        n /= 2;
    }
    j
}

/// Conjugated DFT, in bit-reversed order.
fn clear_fft(v: &ArrayD<f64>) -> (ArrayD<f64>, ArrayD<f64>) {
    let n = v.len();
    let coeff = |f: usize| -> (f64, f64) {
        (0..n).fold((0.0, 0.0), |(re, im), t| {
            let a = 2.0 * PI * (t * f) as f64 / n as f64;
            (re + v[[t]] * a.cos(), im + v[[t]] * a.sin())
        })
    };
    let out: Vec<(f64, f64)> = (0..n).map(|i| coeff(bit_reverse(i, n))).collect();
    (
        Array1::from_iter(out.iter().map(|c| c.0)).into_dyn(),
        Array1::from_iter(out.iter().map(|c| c.1)).into_dyn(),
    )
}

#[test]
fn fft() {
    for n in [2, 8, 64] {
        check(&[&[n]], |x| Ok(fft_dif(&x[0])?.r), |x| clear_fft(&x[0]).0, 1e-9);
        check(&[&[n]], |x| Ok(fft_dif(&x[0])?.i), |x| clear_fft(&x[0]).1, 1e-9);
    }
}

#[test]
fn fft_of_one_element() {
    let mut case = Case::default();
    let v = ndarray::arr1(&[0.25]).into_dyn();
    let x = case.input(&v, true);
    let y = fft_dif(&x).unwrap();
    assert_eq!(case.eval(&y.r), v);
    // the imaginary part never touches the input
    assert_eq!(**y.i.op().const_value().unwrap(), ArrayD::<f64>::zeros(IxDyn(&[1])));
}
