//! Various data structures, etc.

pub mod once;
