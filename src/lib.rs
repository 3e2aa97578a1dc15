//! Stepwise: file-backed execution plan orchestrator.
//!
//! A natural-language request is decomposed into an ordered [`plan::Plan`]
//! of skill invocations. A dispatcher walks the plan step by step, running
//! each skill as an isolated child process and persisting every status
//! change to a plain-text plan file that any process can poll.

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod decompose;
pub mod dispatch;
pub mod error;
pub mod execution;
pub mod exit_codes;
pub mod fs;
pub mod locks;
pub mod orchestrator;
pub mod plan;
pub mod skills;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;
