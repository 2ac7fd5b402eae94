//! Reconciliation primitives
//!
//! Each operation is blocking and runs on a pool worker. Copy and convert
//! are idempotent: they consult [`crate::staleness`] and do nothing when the
//! target is already current.

pub mod convert;
pub mod copy;
pub mod delete;

pub use convert::convert_file;
pub use copy::copy_file;
pub use delete::delete_entry;

// vim: ts=4
