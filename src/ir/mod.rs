//! The operator graph
//!
//! Nodes ([op::Op]) carry a static shape and a [secrecy::Secrecy]; [traversal] computes over
//! whole graphs; [repack] controls when tensor values normalize their packing.

pub mod error;
#[macro_use]
pub mod op;
pub mod repack;
pub mod secrecy;
pub mod shape;
pub mod traversal;
