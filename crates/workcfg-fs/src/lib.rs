//! Filesystem helpers for workcfg
//!
//! Whole-file reads and atomic, lock-guarded writes for configuration files.

pub mod error;
pub mod io;

pub use error::{Error, Result};
pub use io::{read_text, write_atomic, write_text};
