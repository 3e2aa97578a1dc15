//! CLI argument parsing for stepwise.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Stepwise: file-backed execution plan orchestrator.
///
/// A request is decomposed into an ordered plan of skill invocations:
/// - Each step runs one skill as an isolated child process
/// - Plan state lives in a plain-text file that any process can read
/// - A failed step only skips the steps that depend on it
#[derive(Parser, Debug)]
#[command(name = "stepwise")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Workspace root (defaults to the current directory).
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Log at debug level unless STEPWISE_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands for stepwise.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decompose a query into a plan and run it.
    ///
    /// Waits for the plan to finish and prints its final state. Exits
    /// non-zero if the plan was aborted.
    Run(RunArgs),

    /// Show the current state of a plan.
    Show(ShowArgs),

    /// List persisted plans, optionally filtered by query text.
    List(ListArgs),

    /// Cancel a running plan.
    ///
    /// The in-flight skill is killed and every step that has not started
    /// is marked failed. Cancelling a finished plan does nothing.
    Cancel(CancelArgs),

    /// List registered skills.
    Skills,

    /// Run a single skill directly, outside any plan.
    Exec(ExecArgs),
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// The request to decompose.
    pub query: String,

    /// Cancel the plan if it has not finished after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Print the final plan as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `show` command.
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Plan ID to show.
    pub plan_id: String,

    /// Print the plan as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `list` command.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only plans whose query contains this text (case-insensitive).
    #[arg(short, long)]
    pub query: Option<String>,

    /// Require the whole query to match.
    #[arg(long, requires = "query")]
    pub exact: bool,

    /// Print summaries as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `cancel` command.
#[derive(Parser, Debug)]
pub struct CancelArgs {
    /// Plan ID to cancel.
    pub plan_id: String,

    /// Wait up to this many seconds for the owning process to stop the plan.
    #[arg(long, value_name = "SECS", default_value_t = 0)]
    pub wait: u64,
}

/// Arguments for the `exec` command.
#[derive(Parser, Debug)]
pub struct ExecArgs {
    /// Skill name from the registry.
    pub skill: String,

    /// Request command (defaults to the skill's configured command).
    #[arg(long)]
    pub command: Option<String>,

    /// Request parameters as a JSON object.
    #[arg(long, value_name = "JSON", default_value = "{}")]
    pub params: String,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
