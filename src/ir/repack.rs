//! Repack control
//!
//! Tensor values normalize their packing (a `ChetRepack` node) after every operation, unless
//! automatic repacking is suppressed. Suppression nests: it lasts while any [ManualRepack]
//! guard on the current thread is alive.

use std::cell::Cell;

use crate::cfg::cfg_or_default;
use crate::front::Vector;
use crate::ir::error::Result;

thread_local! {
    static MANUAL_DEPTH: Cell<usize> = Cell::new(0);
}

/// Suppresses automatic repacking on this thread until dropped.
#[must_use = "repacking resumes as soon as the guard is dropped"]
pub struct ManualRepack {
    _private: (),
}

/// Enter a manual-repack region.
pub fn manual_repack() -> ManualRepack {
    MANUAL_DEPTH.with(|d| d.set(d.get() + 1));
    ManualRepack { _private: () }
}

impl Drop for ManualRepack {
    fn drop(&mut self) {
        MANUAL_DEPTH.with(|d| d.set(d.get() - 1));
    }
}

/// Should values repack after each operation right now?
pub fn auto_repack_enabled() -> bool {
    cfg_or_default().ir.auto_repack && MANUAL_DEPTH.with(|d| d.get()) == 0
}

/// Run `f` with automatic repacking suppressed.
pub fn with_manual_repack<T>(f: impl FnOnce() -> T) -> T {
    let _guard = manual_repack();
    f()
}

/// Run `f` with automatic repacking suppressed, then repack its result once.
pub fn result_repack<V: Vector>(f: impl FnOnce() -> Result<V>) -> Result<V> {
    with_manual_repack(f)?.repack()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn guards_nest() {
        assert!(auto_repack_enabled());
        {
            let _a = manual_repack();
            assert!(!auto_repack_enabled());
            {
                let _b = manual_repack();
                assert!(!auto_repack_enabled());
            }
            assert!(!auto_repack_enabled());
        }
        assert!(auto_repack_enabled());
    }

    #[test]
    fn closure_scope() {
        let inside = with_manual_repack(auto_repack_enabled);
        assert!(!inside);
        assert!(auto_repack_enabled());
    }

    #[test]
    fn guard_released_on_error() {
        let r: Result<()> = with_manual_repack(|| Err(crate::Error::NotSupported));
        assert!(r.is_err());
        assert!(auto_repack_enabled());
    }
}
