//! Polynomial approximations of sign, relu and maximum
//!
//! `sign` is a composition of odd minimax polynomials. Precision `alpha` bounds the error by
//! about `2^-alpha` for inputs in `[-1, 1]` away from 0. Inputs must lie in `[-1, 1]`.

use crate::cfg::cfg_or_default;
use crate::front::Vector;
use crate::ir::error::{Error, Result};
use crate::ir::repack::result_repack;

use super::poly::poly_eval;

/// The polynomials composed by [sign] at precision `alpha`, innermost first.
pub fn sign_coeffs(alpha: usize) -> Result<&'static [&'static [f64]]> {
    match alpha {
        8 => Ok(SIGN_8),
        12 => Ok(SIGN_12),
        13 => Ok(SIGN_13),
        14 => Ok(SIGN_14),
        _ => Err(Error::SignAlpha(alpha)),
    }
}

/// The precision used by [relu] and [maximum] when none is given.
pub fn default_alpha() -> usize {
    cfg_or_default().lib.sign_alpha
}

/// Approximate sign of each element.
pub fn sign<V: Vector>(x: &V, alpha: usize) -> Result<V> {
    sign_coeffs(alpha)?
        .iter()
        .try_fold(x.clone(), |x, coeffs| poly_eval(&x, coeffs))
}

/// `relu(x)`, given `s = sign(x)`.
pub fn relu_from_sign<V: Vector>(x: &V, s: &V) -> Result<V> {
    result_repack(|| x.add(&x.mul(s)?)?.mul(0.5))
}

/// Approximate `max(x, 0)`.
pub fn relu<V: Vector>(x: &V, alpha: usize) -> Result<V> {
    relu_from_sign(x, &sign(x, alpha)?)
}

/// Approximate elementwise maximum of values in `[-1, 1]`, by recursive halving.
pub fn maximum<V: Vector>(seq: &[V]) -> Result<V> {
    match seq {
        [] => Err(Error::EmptySequence("maximum")),
        [x] => Ok(x.clone()),
        _ => {
            let (l, r) = seq.split_at(seq.len() / 2);
            let (max_l, max_r) = (maximum(l)?, maximum(r)?);

            let diff = max_l.add(&max_r.mul(-1.0)?)?;
            // halved, so it stays in [-1, 1]
            let diff_sign = sign(&diff.mul(0.5)?, default_alpha())?;
            let diff_abs = diff_sign.mul(&diff)?;

            max_l.add(&max_r)?.add(&diff_abs)?.mul(0.5)
        }
    }
}

#[rustfmt::skip]
const SIGN_8: &[&[f64]] = &[
    &[
        0.0, 8.83133072022416,
        0.0, -46.4575039895512,
        0.0, 83.0282234720408,
        0.0, -44.992847782807,
    ],
    &[
        0.0, 3.94881885083263,
        0.0, -12.9103010992282,
        0.0, 28.0865362174658,
        0.0, -35.5969148965137,
        0.0, 26.5159370881337,
        0.0, -11.4184889368449,
        0.0, 2.62558443881334,
        0.0, -0.249172299998642,
    ],
];

#[rustfmt::skip]
const SIGN_12: &[&[f64]] = &[
    &[
        0.0, 11.5523042357223,
        0.0, -67.7794513440968,
        0.0, 125.283740404562,
        0.0, -69.0142908232934,
    ],
    &[
        0.0, 9.65167636181626,
        0.0, -61.6939174538469,
        0.0, 155.170351652298,
        0.0, -182.697582383214,
        0.0, 112.910726525406,
        0.0, -37.7752411770263,
        0.0, 6.47503909732344,
        0.0, -0.445613365723361,
    ],
    &[
        0.0, 5.25888355571745,
        0.0, -33.7233593794284,
        0.0, 164.983085013457,
        0.0, -541.408891406992,
        0.0, 1222.96207997963,
        0.0, -1952.01910566479,
        0.0, 2240.840213783,
        0.0, -1866.3491698317,
        0.0, 1127.22117843121,
        0.0, -488.07047463838,
        0.0, 147.49784630892,
        0.0, -29.5171048879526,
        0.0, 3.51269520930994,
        0.0, -0.188101836557879,
    ],
];

#[rustfmt::skip]
const SIGN_13: &[&[f64]] = &[
    &[
        0.0, 24.5589415425004,
        0.0, -669.660449716894,
        0.0, 6672.99848301339,
        0.0, -30603.6656163898,
        0.0, 73188.4032987787,
        0.0, -94443.3217050084,
        0.0, 62325.4094212546,
        0.0, -16494.6744117805,
    ],
    &[
        0.0, 9.35625636035439,
        0.0, -59.1638963933626,
        0.0, 148.860930626448,
        0.0, -175.812874878582,
        0.0, 109.111299685955,
        0.0, -36.6768839978755,
        0.0, 6.31846290311294,
        0.0, -0.437113415082177,
    ],
    &[
        0.0, 5.07813569758861,
        0.0, -30.7329918137186,
        0.0, 144.109746812809,
        0.0, -459.661688826142,
        0.0, 1021.52064470459,
        0.0, -1620.56256708877,
        0.0, 1864.6764641657,
        0.0, -1567.49300877143,
        0.0, 960.970309093422,
        0.0, -424.326161871646,
        0.0, 131.278509256003,
        0.0, -26.9812576626115,
        0.0, 3.30651387315565,
        0.0, -0.182742944627533,
    ],
];

#[rustfmt::skip]
const SIGN_14: &[&[f64]] = &[
    &[
        0.0, 24.9052143193754,
        0.0, -682.38305758243,
        0.0, 6809.42845390599,
        0.0, -31250.7100017105,
        0.0, 74765.9388363757,
        0.0, -96504.6838475839,
        0.0, 63697.7923778246,
        0.0, -16860.262134719,
    ],
    &[
        0.0, 16.8285511926011,
        0.0, -339.811750495659,
        0.0, 2790.69998793847,
        0.0, -11351.415157379,
        0.0, 26623.0010283745,
        0.0, -39384.0328661975,
        0.0, 38788.423034806,
        0.0, -26239.5303844988,
        0.0, 12365.6207016532,
        0.0, -4053.36460089999,
        0.0, 906.042880951087,
        0.0, -131.687649208288,
        0.0, 11.2176079033623,
        0.0, -0.424938020467471,
    ],
    &[
        0.0, 5.31755497689391,
        0.0, -35.4371531531577,
        0.0, 184.12244132914,
        0.0, -655.386830146253,
        0.0, 1638.7833542806,
        0.0, -2953.86237048226,
        0.0, 3908.06423362418,
        0.0, -3834.96739165131,
        0.0, 2799.60654766517,
        0.0, -1512.86231886692,
        0.0, 596.160139340009,
        0.0, -166.321739302958,
        0.0, 31.0988369739884,
        0.0, -3.4934937450619,
        0.0, 0.178142156956495,
    ],
];
