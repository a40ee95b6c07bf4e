//! The backend's textual encoding of encrypted operators
//!
//! One row per encrypted node, in id order, with four whitespace-separated columns:
//! * the opcode
//! * the first parent's shape, length-prefixed
//! * the attributes, then the ids of plaintext parents, then markers: `~` if there are
//!   plaintext parents, `#` for a bootstrap
//! * the ids of ciphertext parents, length-prefixed
//!
//! Columns are left-aligned and separated by three spaces; the last column is not padded.

use std::fmt::Write;

use itertools::Itertools;
use log::trace;

use crate::ir::op::{encode_seq, Attr, Op, OpKind};

/// Join attributes with single spaces.
pub fn seq_str(seq: &[Attr]) -> String {
    seq.iter().join(" ")
}

/// The four columns of `op`'s row; `id` gives the identifier of each parent.
pub fn encode_op(op: &Op, id: impl Fn(&Op) -> (bool, usize)) -> [String; 4] {
    let parent_ids: Vec<(bool, usize)> = op.parents().iter().map(&id).collect();
    let pt_parents: Vec<usize> = parent_ids
        .iter()
        .filter(|(enc, _)| !enc)
        .map(|(_, i)| *i)
        .collect();
    let ct_parents: Vec<usize> = parent_ids
        .iter()
        .filter(|(enc, _)| *enc)
        .map(|(_, i)| *i)
        .collect();

    let mut attrs = op.attributes();
    attrs.extend(pt_parents.iter().map(|i| Attr::from(*i)));
    // scale hint for plaintext operands
    if !pt_parents.is_empty() {
        attrs.push("~".into());
    }
    // bootstrap target level
    if matches!(op.kind(), OpKind::Bootstrap) {
        attrs.push("#".into());
    }

    let parent_shape = op.parents().first().map_or(&[][..], |p| p.shape().as_slice());
    let row = [
        op.name(),
        seq_str(&encode_seq(parent_shape.iter().copied())),
        seq_str(&attrs),
        seq_str(&encode_seq(ct_parents)),
    ];
    trace!("encode {}: {:?}", op, row);
    row
}

/// Lay out rows in aligned columns.
pub fn format_rows(rows: &[[String; 4]]) -> String {
    let mut widths = [0usize; 4];
    for row in rows {
        for (w, entry) in widths.iter_mut().zip(row) {
            *w = (*w).max(entry.len());
        }
    }
    widths[3] = 0;

    let mut out = String::new();
    for row in rows {
        let line = row
            .iter()
            .zip(widths)
            .map(|(entry, w)| format!("{entry:<w$}"))
            .join("   ");
        writeln!(&mut out, "{line}").unwrap();
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn attrs_join() {
        assert_eq!(seq_str(&[]), "");
        assert_eq!(
            seq_str(&[Attr::Int(2), Attr::Int(-1), "o".into()]),
            "2 -1 o"
        );
        assert_eq!(seq_str(&encode_seq([4usize, 8])), "2 4 8");
    }

    #[test]
    fn aligned_columns() {
        let row = |a: &str, b: &str, c: &str, d: &str| {
            [a.to_owned(), b.to_owned(), c.to_owned(), d.to_owned()]
        };
        let rows = [
            row("InputC", "1 4", "0 ~", "0"),
            row("AddCC", "1 4", "", "2 0 0"),
        ];
        assert_eq!(
            format_rows(&rows),
            "InputC   1 4   0 ~   0\nAddCC    1 4         2 0 0\n"
        );
        assert_eq!(format_rows(&[]), "");
    }
}
