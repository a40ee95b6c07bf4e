//! Options for the tensor dataflow frontend.
//!
//! ## Contents
//!
//! * A type for frontend options [TdfOpt] containing fields for module options:
//!    * `ir`: [IrOpt]
//!    * `eval`: [EvalOpt]
//!    * `lib`: [LibOpt]
//!    * all options types implement:
//!       * std's [Default]
//!       * clap's [Args]; all options are settable by
//!          * environmental variable (SHOUTY_SNEK_CASE), e.g., `"EVAL_SHIFT_GARBAGE"`
//!          * long option (kebab-case), e.g., `"--eval-shift-garbage"`
//!       * these a guaranteed to agree (and we test this)
//!
//! ## Constructing custom options in a driver
//!
//! We recommend that drivers construct custom options using [`clap`][clap].
//! Simply use our (rexported) version of clap in your driver ([crate::clap])
//! and include [TdfOpt] in your [clap::Parser].
//!
//! ```rust
//! use tdf_opt::{TdfOpt, clap::Parser};
//!
//! #[derive(Parser, Debug)]
//! struct BinaryOpt {
//!     #[command(flatten)]
//!     pub tdf: TdfOpt,
//! }
//!
//! fn main() {
//!     let opt = BinaryOpt::parse();
//! }
//! ```
//!
//! [clap]: https://crates.io/crates/clap

use clap::{ArgAction, Args, ValueEnum};

use std::default::Default;

/// Re-export our version of clap.
pub use clap;

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
/// Options that configure the frontend
pub struct TdfOpt {
    /// Options for graph construction
    #[command(flatten)]
    pub ir: IrOpt,
    /// Options for numeric evaluation
    #[command(flatten)]
    pub eval: EvalOpt,
    /// Options for the kernel library
    #[command(flatten)]
    pub lib: LibOpt,
}

/// Options for graph construction
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct IrOpt {
    /// Append a repack marker after each arithmetic node built outside a manual-repack scope
    #[arg(
        long = "ir-auto-repack",
        env = "IR_AUTO_REPACK",
        action = ArgAction::Set,
        default_value = "true"
    )]
    pub auto_repack: bool,
}

impl Default for IrOpt {
    fn default() -> Self {
        Self { auto_repack: true }
    }
}

/// Options for numeric evaluation of a dataflow
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct EvalOpt {
    /// How the evaluator retains intermediate values
    #[arg(
        long = "eval-traversal",
        env = "EVAL_TRAVERSAL",
        value_enum,
        default_value = "gc"
    )]
    pub traversal: EvalTraversal,

    /// The value written into the vacated region of a non-cyclic shift
    #[arg(
        long = "eval-shift-garbage",
        env = "EVAL_SHIFT_GARBAGE",
        default_value = "1000",
        allow_negative_numbers = true
    )]
    pub shift_garbage: i64,
}

impl Default for EvalOpt {
    fn default() -> Self {
        Self {
            traversal: EvalTraversal::Gc,
            shift_garbage: 1000,
        }
    }
}

#[derive(ValueEnum, Debug, PartialEq, Eq, Clone, Copy)]
/// How the evaluator retains intermediate values
pub enum EvalTraversal {
    /// Drop each value once its last consumer has read it
    Gc,
    /// Keep every value until evaluation finishes
    Cached,
}

impl Default for EvalTraversal {
    fn default() -> Self {
        EvalTraversal::Gc
    }
}

/// Options for the kernel library
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct LibOpt {
    /// Precision of the composite sign polynomial used by `sign`, `relu`, and `maximum`
    #[arg(
        long = "lib-sign-alpha",
        env = "LIB_SIGN_ALPHA",
        default_value = "14"
    )]
    pub sign_alpha: usize,
}

impl Default for LibOpt {
    fn default() -> Self {
        Self { sign_alpha: 14 }
    }
}
