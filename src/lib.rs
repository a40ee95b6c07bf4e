//! # TDF
//!
//! A frontend that lowers tensor programs to a homomorphic-encryption dataflow

#![warn(missing_docs)]

#[macro_use]
pub mod ir;
pub mod cfg;
pub mod front;
pub mod kernels;
pub mod target;
pub mod util;

pub use ir::error::{Error, Result};
