//! Stepwise CLI entry point.
//!
//! Parses arguments, resolves the workspace, installs logging, dispatches to
//! the command handler and maps errors to exit codes.

use std::process::ExitCode;
use stepwise::cli::{Cli, GlobalArgs};
use stepwise::commands;
use stepwise::context::Workspace;
use stepwise::exit_codes;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "STEPWISE_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let result = Workspace::resolve(cli.global.root.as_deref()).and_then(|ws| {
        init_tracing(&cli.global, &ws.config.log_level);
        commands::dispatch(cli.command, &ws)
    });

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

/// Log to stderr so stdout carries only command output.
fn init_tracing(global: &GlobalArgs, config_level: &str) {
    let fallback = if global.verbose { "debug" } else { config_level };
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
