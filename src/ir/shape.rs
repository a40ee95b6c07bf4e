//! Shapes and the small numeric rules shared by operators

use super::error::{Error, Result};

/// Per-dimension sizes, outermost first.
pub type Shape = Vec<usize>;

/// Number of elements in an array of shape `shape`.
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Resolve a possibly-negative dimension index against `shape`.
pub fn normalize_dim(shape: &[usize], dim: isize) -> Result<usize> {
    let rank = shape.len() as isize;
    let out = if dim < 0 { dim + rank } else { dim };
    if out < 0 || out >= rank {
        Err(Error::InvalidDim {
            dim,
            shape: shape.to_vec(),
        })
    } else {
        Ok(out as usize)
    }
}

/// Like [normalize_dim], but `dim` may also name the position one past the last dimension.
pub fn normalize_insert_dim(shape: &[usize], dim: isize) -> Result<usize> {
    let rank = shape.len() as isize;
    let out = if dim < 0 { dim + rank + 1 } else { dim };
    if out < 0 || out > rank {
        Err(Error::InvalidDim {
            dim,
            shape: shape.to_vec(),
        })
    } else {
        Ok(out as usize)
    }
}

/// `shape` with dimension `dim` replaced by `size`.
pub fn shape_with_dim(shape: &[usize], dim: usize, size: usize) -> Shape {
    let mut out = shape.to_vec();
    out[dim] = size;
    out
}

/// The common shape all of `shapes` broadcast to, aligning trailing dimensions.
pub fn broadcast_shapes<S: AsRef<[usize]>>(shapes: &[S]) -> Result<Shape> {
    let rank = shapes.iter().map(|s| s.as_ref().len()).max().unwrap_or(0);
    let mut out = vec![1; rank];
    for s in shapes {
        let s = s.as_ref();
        let offset = rank - s.len();
        for (i, &d) in s.iter().enumerate() {
            let o = &mut out[offset + i];
            if *o == 1 {
                *o = d;
            } else if d != 1 && d != *o {
                return Err(Error::BroadcastShapes(
                    shapes.iter().map(|s| s.as_ref().to_vec()).collect(),
                ));
            }
        }
    }
    Ok(out)
}

/// Can `from` be broadcast to exactly `to`?
pub fn broadcasts_to(from: &[usize], to: &[usize]) -> bool {
    matches!(broadcast_shapes(&[from, to]), Ok(s) if s == to)
}

/// Is `x` a positive power of two?
pub fn is_pow_of_2(x: usize) -> bool {
    x.is_power_of_two()
}

/// Does `seq` contain every index below its length exactly once?
pub fn is_permutation(seq: &[usize]) -> bool {
    let mut seen = vec![false; seq.len()];
    for &i in seq {
        match seen.get_mut(i) {
            Some(s) if !*s => *s = true,
            _ => return false,
        }
    }
    true
}

/// Length of `0..n` stepped by `by`.
pub fn strided_size(n: usize, by: usize) -> usize {
    (n + by - 1) / by
}

/// Input and output names: non-empty, ASCII word characters, `.`, and `-`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b'-')
}
