//! Polynomial evaluation

use crate::front::Vector;
use crate::ir::error::Result;
use crate::ir::repack::result_repack;

use super::sum_all;

/// `[x^0, x^1, ..., x^max_power]`, each power built from two lower ones of about half its
/// degree. `x^0` is a broadcast constant. At least `x^0` and `x^1` are returned.
pub fn powers<V: Vector>(x: &V, max_power: usize) -> Result<Vec<V>> {
    let mut powers = vec![V::from_const(1.0).broadcast_to(x.shape())?, x.clone()];
    for p in 2..=max_power {
        let next = powers[p / 2].mul(&powers[p - p / 2])?;
        powers.push(next);
    }
    Ok(powers)
}

/// `sum(coeffs[i] * x^i)`, skipping zero coefficients.
pub fn poly_eval<V: Vector>(x: &V, coeffs: &[f64]) -> Result<V> {
    result_repack(|| {
        let x_powers = powers(x, coeffs.len().saturating_sub(1))?;
        let terms = x_powers
            .iter()
            .zip(coeffs)
            .filter(|(_, c)| **c != 0.0)
            .map(|(p, c)| p.mul(*c))
            .collect::<Result<Vec<_>>>()?;
        if terms.is_empty() {
            V::from_const(0.0).broadcast_to(x.shape())
        } else {
            sum_all("poly_eval", terms)
        }
    })
}
