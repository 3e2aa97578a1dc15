//! Implementation of the `stepwise run` command.
//!
//! Submits the query, waits for the dispatcher and prints the final plan.
//! With `--timeout`, a plan still running at the deadline is cancelled.

use super::{render_plan, to_json};
use crate::cli::RunArgs;
use crate::context::Workspace;
use crate::error::{Result, StepwiseError};
use crate::orchestrator::Orchestrator;
use crate::plan::{Plan, PlanState};
use std::thread;
use std::time::{Duration, Instant};

pub fn cmd_run(args: RunArgs, ws: &Workspace) -> Result<()> {
    let plan = run_query(ws, &args.query, args.timeout.map(Duration::from_secs))?;

    if args.json {
        println!("{}", to_json(&plan)?);
    } else {
        print!("{}", render_plan(&plan));
    }

    if plan.state == PlanState::Aborted {
        return Err(StepwiseError::UserError(format!(
            "plan '{}' was aborted before every step ran",
            plan.id
        )));
    }
    Ok(())
}

/// Submit `query` and block until its plan finishes.
pub(crate) fn run_query(ws: &Workspace, query: &str, deadline: Option<Duration>) -> Result<Plan> {
    let orchestrator = Orchestrator::from_workspace(ws)?;
    let plan_id = orchestrator.submit(query)?;

    if let Some(limit) = deadline {
        let started = Instant::now();
        loop {
            if orchestrator.get_snapshot(&plan_id)?.state.is_finished() {
                break;
            }
            if started.elapsed() >= limit {
                tracing::warn!(plan_id = %plan_id, limit_secs = limit.as_secs(), "plan exceeded --timeout, cancelling");
                orchestrator.cancel(&plan_id)?;
                break;
            }
            thread::sleep(ws.config.poll_interval());
        }
    }

    orchestrator.wait(&plan_id)
}
