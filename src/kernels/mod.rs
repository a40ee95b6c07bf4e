//! Library functions built from the value operations
//!
//! Everything here is written against [Vector], [crate::front::Tensor] and [crate::front::Input],
//! so the same code builds
//! graphs (from [crate::front::OpTensor]) and computes on host data
//! (from [crate::front::HostInput]).
//!
//! Multi-step functions run under manual repack and repack their result once (see
//! [crate::ir::repack::result_repack]).

use crate::front::Vector;
use crate::ir::error::{Error, Result};

pub mod concat;
pub mod conv;
pub mod matmul;
pub mod pool;
pub mod poly;
pub mod sign;

pub use concat::concat;
pub use conv::{conv2d, conv2d_raw, conv2d_unpadded};
pub use matmul::mul_mv;
pub use pool::{avg_pool2d, conv_shifts, global_avg_pool2d};
pub use poly::{poly_eval, powers};
pub use sign::{maximum, relu, relu_from_sign, sign};

/// Left-to-right sum of a non-empty sequence of values.
pub fn sum_all<V: Vector>(what: &'static str, items: impl IntoIterator<Item = V>) -> Result<V> {
    let mut items = items.into_iter();
    let first = items.next().ok_or(Error::EmptySequence(what))?;
    items.try_fold(first, |acc, v| acc.add(&v))
}
