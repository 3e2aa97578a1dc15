//! Configuration model for stepwise.
//!
//! This module defines the Config struct that represents `stepwise.yaml` at
//! the workspace root. It supports forward-compatible YAML parsing (unknown
//! fields are ignored), sensible defaults for optional fields, and validation
//! of config values. A missing file means all defaults.

mod model;
mod operations;
pub mod types;

#[cfg(test)]
mod tests;

pub use model::Config;
pub use types::DecomposerKind;
