//! Frontend Configuration
//!
//! This module contains two components:
//! * A type [TdfCfg] for configuration information.
//! * Static configuration storage
//!    * set with [set] and [set_cfg]
//!    * read with [cfg]
//!    * it can only be set once per process
//!       * if you want to unit-test your component, we recommend that it **should not** use [cfg].

use once_cell::sync::OnceCell;

use std::convert::From;
use std::default::Default;

/// Re-export our clap version
pub use tdf_opt::clap;
/// Re-export our clap [clap::Args]
pub use tdf_opt::TdfOpt;

/// A frontend configuration. Constructible [From::from] [TdfOpt].
#[derive(Clone, Debug)]
pub struct TdfCfg {
    opt: TdfOpt,
    shift_garbage: f64,
}

/// Set the frontend configuration from a [TdfOpt].
///
/// If you want to build the configuration [TdfCfg] object yourself,
/// you can set it with [set_cfg].
///
/// [TdfOpt] implements [clap::Args], so it can be build from your command line or envvars. See
/// its documentation.
pub fn set(o: &TdfOpt) {
    set_cfg(From::from(o.clone()))
}

/// Set the frontend configuration to its defaults.
/// See [set] to customize
pub fn set_default() {
    set_cfg(Default::default())
}

/// Set the frontend configuration from a [TdfCfg].
///
/// We recommends using [set], which takes a [TdfOpt] instead.
pub fn set_cfg(c: TdfCfg) {
    CFG.set(c).unwrap_or_else(|c| {
        panic!(
            "Tried to set the frontend configuration, but it had already been set.\nNew cfg:\n{:#?}",
            c
        )
    })
}

/// Get the configuration
pub fn cfg() -> &'static TdfCfg {
    CFG.get().expect("A component tried to read the frontend configuration, but it was not yet set. Did the top-level application call `tdf::cfg::set`?")
}

/// Get the configuration, setting the configuration to the default value if it is unset.
pub fn cfg_or_default() -> &'static TdfCfg {
    if !is_cfg_set() {
        let _ = CFG.set(Default::default());
    }
    cfg()
}

/// Has the configuration been set yet?
pub fn is_cfg_set() -> bool {
    CFG.get().is_some()
}

static CFG: OnceCell<TdfCfg> = OnceCell::new();

impl From<TdfOpt> for TdfCfg {
    fn from(opt: TdfOpt) -> Self {
        let shift_garbage = opt.eval.shift_garbage as f64;
        Self { opt, shift_garbage }
    }
}

impl Default for TdfCfg {
    fn default() -> Self {
        Self::from(TdfOpt::default())
    }
}

/// Used to expose all fields of [TdfOpt].
impl std::ops::Deref for TdfCfg {
    type Target = TdfOpt;

    fn deref(&self) -> &Self::Target {
        &self.opt
    }
}

/// Additional functionality
impl TdfCfg {
    /// The fill value for the vacated region of a non-cyclic shift
    pub fn shift_garbage(&self) -> f64 {
        self.shift_garbage
    }
    /// Whether evaluation drops intermediate values early
    pub fn gc_evaluation(&self) -> bool {
        self.opt.eval.traversal == tdf_opt::EvalTraversal::Gc
    }
}
