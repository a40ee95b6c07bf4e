//! The whitespace-separated tensor file format
//!
//! A tensor file holds, in order: the number of dimensions, each dimension, the element
//! count, and then the elements in row-major order. [write_tensor] puts the shape (with its
//! length) on the first line, the element count on the second, and the elements on the third.
//!
//! A dataset directory holds one such file per tensor, named by the tensor.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use itertools::Itertools;
use log::debug;
use logos::{self, Logos};

use crate::ir::error::{Error, Result};
use crate::ir::op::{encode_seq, TensorV};
use crate::ir::shape::{numel, Shape};
use crate::target::df::encode::seq_str;

#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
enum Token {
    #[regex(r"-?[0-9]+", priority = 3)]
    Int,
    #[regex(r"[-+]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][-+]?[0-9]+)?")]
    #[regex(r"[-+]?(inf|nan|NaN)")]
    Float,

    #[error]
    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    Error,
}

struct TensorLexer<'src> {
    lex: logos::Lexer<'src, Token>,
}

impl<'src> TensorLexer<'src> {
    fn new(src: &'src str) -> Self {
        TensorLexer {
            lex: Token::lexer(src),
        }
    }

    fn next_token(&mut self, what: &str) -> Result<(Token, &'src str)> {
        match self.lex.next() {
            None => Err(Error::TensorParse(format!("expected {what}, found end of file"))),
            Some(Token::Error) => Err(Error::TensorParse(format!(
                "unexpected '{}' at byte {}",
                self.lex.slice(),
                self.lex.span().start
            ))),
            Some(t) => Ok((t, self.lex.slice())),
        }
    }

    fn usize(&mut self, what: &str) -> Result<usize> {
        match self.next_token(what)? {
            (Token::Int, s) => s
                .parse()
                .map_err(|_| Error::TensorParse(format!("{what} '{s}' is not a count"))),
            (_, s) => Err(Error::TensorParse(format!("{what} '{s}' is not an integer"))),
        }
    }

    fn f64(&mut self) -> Result<f64> {
        let (_, s) = self.next_token("an element")?;
        s.parse()
            .map_err(|_| Error::TensorParse(format!("bad element '{s}'")))
    }

    fn at_end(&mut self) -> Result<()> {
        match self.lex.next() {
            None => Ok(()),
            Some(_) => Err(Error::TensorParse(format!(
                "trailing '{}' after the last element",
                self.lex.slice()
            ))),
        }
    }
}

/// Parse a tensor from its text form.
pub fn read_tensor(src: &str) -> Result<TensorV> {
    let mut l = TensorLexer::new(src);
    let rank = l.usize("a rank")?;
    let shape: Shape = (0..rank)
        .map(|_| l.usize("a dimension"))
        .collect::<Result<_>>()?;
    let declared = l.usize("an element count")?;
    let expected = numel(&shape);
    if declared != expected {
        return Err(Error::ElementCount {
            shape,
            expected,
            declared,
        });
    }
    let data = (0..declared).map(|_| l.f64()).collect::<Result<Vec<_>>>()?;
    l.at_end()?;
    Ok(TensorV::from_shape_vec(shape, data)?)
}

/// Render a tensor in its text form.
pub fn write_tensor(t: &TensorV) -> String {
    let mut out = seq_str(&encode_seq(t.shape().iter().copied()));
    out.push('\n');
    out.push_str(&t.len().to_string());
    out.push('\n');
    out.push_str(&t.iter().map(|x| format!("{x:?}")).join(" "));
    out.push('\n');
    out
}

/// Read every tensor file in `dir`, keyed by file name.
pub fn import_tensors(dir: impl AsRef<Path>) -> Result<BTreeMap<String, TensorV>> {
    let dir = dir.as_ref();
    let mut out = BTreeMap::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let t = read_tensor(&fs::read_to_string(entry.path())?)
            .map_err(|e| Error::TensorParse(format!("{}: {}", entry.path().display(), e)))?;
        out.insert(name, t);
    }
    debug!("Read {} tensors from {}", out.len(), dir.display());
    Ok(out)
}

/// Write each tensor to `dir/<name>`, creating `dir` if needed.
pub fn export_tensors(dir: impl AsRef<Path>, tensors: &BTreeMap<String, TensorV>) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    for (name, t) in tensors {
        fs::write(dir.join(name), write_tensor(t))?;
    }
    debug!("Wrote {} tensors to {}", tensors.len(), dir.display());
    Ok(())
}
