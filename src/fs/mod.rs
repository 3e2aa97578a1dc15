//! Filesystem utilities for stepwise.
//!
//! The plan store relies on [`atomic_write_file`] so that concurrent readers
//! of a plan file only ever see a complete previous or next version.

pub mod atomic;

pub use atomic::{atomic_write, atomic_write_file};
