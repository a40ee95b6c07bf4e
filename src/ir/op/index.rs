//! Basic indexing: integers, stepped ranges, and an ellipsis

use std::fmt::{self, Display, Formatter};

use ndarray::{ArrayViewD, ArrayViewMutD, Axis};

use crate::ir::error::{Error, Result};

/// A half-open range along one dimension, with optional bounds that count from the end when negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Slice {
    /// first element (default: 0)
    pub start: Option<isize>,
    /// one past the last element (default: the dimension size)
    pub stop: Option<isize>,
    /// distance between selected elements; must be positive
    pub step: usize,
}

impl Slice {
    /// The whole dimension.
    pub fn full() -> Self {
        Slice {
            start: None,
            stop: None,
            step: 1,
        }
    }
    /// Elements before `stop`.
    pub fn up_to(stop: isize) -> Self {
        Slice {
            stop: Some(stop),
            ..Slice::full()
        }
    }
    /// Elements from `start` on.
    pub fn starting_at(start: isize) -> Self {
        Slice {
            start: Some(start),
            ..Slice::full()
        }
    }
    /// Elements in `start..stop`.
    pub fn between(start: isize, stop: isize) -> Self {
        Slice {
            start: Some(start),
            stop: Some(stop),
            step: 1,
        }
    }
    /// Every `step`-th element.
    pub fn stepped(step: usize) -> Self {
        Slice {
            step,
            ..Slice::full()
        }
    }

    fn resolve(&self, len: usize) -> Option<(usize, usize, usize)> {
        if self.step == 0 {
            return None;
        }
        let clamp = |i: isize| -> usize {
            let i = if i < 0 { i + len as isize } else { i };
            i.clamp(0, len as isize) as usize
        };
        let start = self.start.map(clamp).unwrap_or(0);
        let stop = self.stop.map(clamp).unwrap_or(len).max(start);
        Some((start, stop, self.step))
    }
}

/// One element of an [Index].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IndexElem {
    /// Select one position, dropping the dimension
    At(isize),
    /// Select a range, keeping the dimension
    Range(Slice),
    /// Stands for as many full ranges as needed
    Ellipsis,
}

impl From<isize> for IndexElem {
    fn from(i: isize) -> Self {
        IndexElem::At(i)
    }
}

impl From<Slice> for IndexElem {
    fn from(s: Slice) -> Self {
        IndexElem::Range(s)
    }
}

/// A sequence of index elements; missing trailing elements select whole dimensions.
pub type Index = Vec<IndexElem>;

/// Select `sel` along `dim`, leaving earlier dimensions whole.
pub fn dim_selection(dim: usize, sel: IndexElem) -> Index {
    let mut index = vec![IndexElem::Range(Slice::full()); dim];
    index.push(sel);
    index
}

/// The region along `dim` that a shift by `shift` wraps around: the first `shift` positions
/// for a positive shift, the last `-shift` for a negative one.
pub fn shift_wrap_selection(dim: usize, shift: isize) -> Index {
    let sel = if shift >= 0 {
        Slice::up_to(shift)
    } else {
        Slice::starting_at(shift)
    };
    dim_selection(dim, IndexElem::Range(sel))
}

/// Display an index the way it would be written in a subscript.
pub struct IndexFmt<'a>(pub &'a [IndexElem]);

impl Display for IndexFmt<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match e {
                IndexElem::At(i) => write!(f, "{i}")?,
                IndexElem::Ellipsis => write!(f, "...")?,
                IndexElem::Range(s) => {
                    if let Some(a) = s.start {
                        write!(f, "{a}")?;
                    }
                    write!(f, ":")?;
                    if let Some(b) = s.stop {
                        write!(f, "{b}")?;
                    }
                    if s.step != 1 {
                        write!(f, ":{}", s.step)?;
                    }
                }
            }
        }
        write!(f, "]")
    }
}

/// An index element resolved against a concrete dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolved {
    /// A single in-bounds position
    At(usize),
    /// `start..stop` by `step`, clamped to the dimension
    Range {
        /// first
        start: usize,
        /// one past the last
        stop: usize,
        /// step
        step: usize,
    },
}

impl Resolved {
    fn len(&self) -> Option<usize> {
        match self {
            Resolved::At(_) => None,
            Resolved::Range { start, stop, step } => Some((stop - start + step - 1) / step),
        }
    }
}

/// Expand the ellipsis and resolve every element of `index` against `shape`.
pub fn resolve(shape: &[usize], index: &[IndexElem]) -> Result<Vec<Resolved>> {
    let err = || Error::InvalidIndex {
        shape: shape.to_vec(),
        index: IndexFmt(index).to_string(),
    };
    let mut elems = index.to_vec();
    match elems.iter().filter(|e| **e == IndexElem::Ellipsis).count() {
        0 => elems.push(IndexElem::Ellipsis),
        1 => {}
        _ => return Err(err()),
    }
    if elems.len() > shape.len() + 1 {
        return Err(err());
    }
    let pad = shape.len() + 1 - elems.len();
    let at = elems
        .iter()
        .position(|e| *e == IndexElem::Ellipsis)
        .ok_or_else(err)?;
    let mut expanded = elems[..at].to_vec();
    expanded.extend(std::iter::repeat(IndexElem::Range(Slice::full())).take(pad));
    expanded.extend_from_slice(&elems[at + 1..]);

    shape
        .iter()
        .zip(&expanded)
        .map(|(&len, e)| match e {
            IndexElem::At(i) => {
                let j = if *i < 0 { *i + len as isize } else { *i };
                if j < 0 || j >= len as isize {
                    Err(err())
                } else {
                    Ok(Resolved::At(j as usize))
                }
            }
            IndexElem::Range(s) => s
                .resolve(len)
                .map(|(start, stop, step)| Resolved::Range { start, stop, step })
                .ok_or_else(err),
            IndexElem::Ellipsis => Err(err()),
        })
        .collect()
}

/// The shape selected by `index` from an array of shape `shape`.
pub fn indexed_shape(shape: &[usize], index: &[IndexElem]) -> Result<Vec<usize>> {
    Ok(resolve(shape, index)?
        .iter()
        .filter_map(Resolved::len)
        .collect())
}

fn ranges_first(resolved: &[Resolved]) -> impl Iterator<Item = (usize, &Resolved)> {
    let ranges = resolved
        .iter()
        .enumerate()
        .filter(|(_, r)| matches!(r, Resolved::Range { .. }));
    // positions are dropped back to front so earlier axis numbers stay valid
    let ats = resolved
        .iter()
        .enumerate()
        .filter(|(_, r)| matches!(r, Resolved::At(_)))
        .collect::<Vec<_>>()
        .into_iter()
        .rev();
    ranges.chain(ats)
}

/// View the selection `resolved` of `view`.
pub fn select<'a>(mut view: ArrayViewD<'a, f64>, resolved: &[Resolved]) -> ArrayViewD<'a, f64> {
    for (axis, r) in ranges_first(resolved) {
        match *r {
            Resolved::Range { start, stop, step } => view.slice_axis_inplace(
                Axis(axis),
                ndarray::Slice::new(start as isize, Some(stop as isize), step as isize),
            ),
            Resolved::At(i) => view = view.index_axis_move(Axis(axis), i),
        }
    }
    view
}

/// Mutably view the selection `resolved` of `view`.
pub fn select_mut<'a>(
    mut view: ArrayViewMutD<'a, f64>,
    resolved: &[Resolved],
) -> ArrayViewMutD<'a, f64> {
    for (axis, r) in ranges_first(resolved) {
        match *r {
            Resolved::Range { start, stop, step } => view.slice_axis_inplace(
                Axis(axis),
                ndarray::Slice::new(start as isize, Some(stop as isize), step as isize),
            ),
            Resolved::At(i) => view = view.index_axis_move(Axis(axis), i),
        }
    }
    view
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    #[test]
    fn shapes() {
        let s = [4, 5, 6];
        assert_eq!(indexed_shape(&s, &[]).unwrap(), vec![4, 5, 6]);
        assert_eq!(indexed_shape(&s, &[1.into()]).unwrap(), vec![5, 6]);
        assert_eq!(
            indexed_shape(&s, &[IndexElem::Ellipsis, (-1).into()]).unwrap(),
            vec![4, 5]
        );
        assert_eq!(
            indexed_shape(&s, &[Slice::stepped(2).into(), Slice::between(1, -1).into()])
                .unwrap(),
            vec![2, 3, 6]
        );
        assert_eq!(
            indexed_shape(&s, &[Slice::between(3, 1).into()]).unwrap(),
            vec![0, 5, 6]
        );
        assert_eq!(indexed_shape(&s, &[Slice::up_to(100).into()]).unwrap(), s);
    }

    #[test]
    fn bad_indices() {
        let s = [4, 5];
        assert!(indexed_shape(&s, &[4.into()]).is_err());
        assert!(indexed_shape(&s, &[(-5).into()]).is_err());
        assert!(indexed_shape(&s, &[0.into(), 0.into(), 0.into()]).is_err());
        assert!(indexed_shape(&s, &[IndexElem::Ellipsis, IndexElem::Ellipsis]).is_err());
        assert!(indexed_shape(&s, &[Slice::stepped(0).into()]).is_err());
    }

    #[test]
    fn wrap_selection() {
        let s = [3, 8];
        assert_eq!(
            indexed_shape(&s, &shift_wrap_selection(1, 3)).unwrap(),
            vec![3, 3]
        );
        assert_eq!(
            indexed_shape(&s, &shift_wrap_selection(1, -2)).unwrap(),
            vec![3, 2]
        );
        assert_eq!(
            indexed_shape(&s, &shift_wrap_selection(0, 0)).unwrap(),
            vec![0, 8]
        );
    }

    #[test]
    fn select_values() {
        let a = ArrayD::from_shape_fn(IxDyn(&[3, 4]), |i| (i[0] * 10 + i[1]) as f64);
        let r = resolve(a.shape(), &[1.into(), Slice::stepped(2).into()]).unwrap();
        let v = select(a.view(), &r);
        assert_eq!(v.shape(), &[2]);
        assert_eq!(v.iter().copied().collect::<Vec<_>>(), vec![10.0, 12.0]);

        let r = resolve(a.shape(), &[IndexElem::Ellipsis, (-1).into()]).unwrap();
        let v = select(a.view(), &r);
        assert_eq!(v.iter().copied().collect::<Vec<_>>(), vec![3.0, 13.0, 23.0]);
    }
}
