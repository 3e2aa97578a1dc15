//! Command implementations for stepwise.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the plan rendering shared by `run` and `show`.

mod cancel;
mod exec;
mod list;
mod run;
mod show;
mod skills;


use crate::cli::Command;
use crate::context::Workspace;
use crate::error::{Result, StepwiseError};
use crate::plan::{Plan, StepStatus};

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command, ws: &Workspace) -> Result<()> {
    match command {
        Command::Run(args) => run::cmd_run(args, ws),
        Command::Show(args) => show::cmd_show(args, ws),
        Command::List(args) => list::cmd_list(args, ws),
        Command::Cancel(args) => cancel::cmd_cancel(args, ws),
        Command::Skills => skills::cmd_skills(ws),
        Command::Exec(args) => exec::cmd_exec(args, ws),
    }
}

const RULE: &str =
    "================================================================================";

/// Human-readable rendering of a plan snapshot.
pub(crate) fn render_plan(plan: &Plan) -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("Plan {} [{}]\n", plan.id, plan.state));
    out.push_str(RULE);
    out.push_str("\n\n");

    out.push_str(&format!("Query:      {}\n", plan.query));
    out.push_str(&format!(
        "Created:    {}\n",
        plan.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    if plan.is_no_match() {
        out.push_str("Steps:      none (no skill matched the query)\n");
        return out;
    }

    out.push_str(&format!(
        "Steps:      {} ({} completed, {} failed, {} in progress, {} pending)\n",
        plan.steps.len(),
        plan.count(StepStatus::Completed),
        plan.count(StepStatus::Failed),
        plan.count(StepStatus::InProgress),
        plan.count(StepStatus::Pending),
    ));

    for step in &plan.steps {
        out.push('\n');
        out.push_str(&format!("Step {} [{}] {}", step.index, step.status, step.skill_name));
        if let Some(ms) = step.execution_time_ms {
            out.push_str(&format!(" ({}ms)", ms));
        }
        out.push('\n');
        out.push_str(&format!("  Sub-query:  {}\n", step.sub_query));
        if !step.depends_on.is_empty() {
            let deps: Vec<String> = step.depends_on.iter().map(|d| d.to_string()).collect();
            out.push_str(&format!("  Depends on: {}\n", deps.join(", ")));
        }
        if let Some(result) = &step.result {
            out.push_str(&format!("  Result:     {}\n", result));
        }
    }
    out
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| StepwiseError::UserError(format!("failed to serialize output: {}", e)))
}
