//! Implementation of the `stepwise cancel` command.
//!
//! The plan usually belongs to another `stepwise run` process, so this
//! only drops a cancellation request next to the plan file. With `--wait`,
//! it polls until the owning process has marked the plan finished.

use crate::cli::CancelArgs;
use crate::context::Workspace;
use crate::error::{Result, StepwiseError};
use crate::orchestrator::Orchestrator;
use crate::plan::Plan;
use std::thread;
use std::time::{Duration, Instant};

pub fn cmd_cancel(args: CancelArgs, ws: &Workspace) -> Result<()> {
    let orchestrator = Orchestrator::from_workspace(ws)?;
    let before = orchestrator.get_snapshot(&args.plan_id)?;
    if before.state.is_finished() {
        println!("Plan {} already {}", before.id, before.state);
        return Ok(());
    }

    orchestrator.cancel(&args.plan_id)?;
    if args.wait == 0 {
        println!("Cancellation requested for plan {}", args.plan_id);
        return Ok(());
    }

    let plan = wait_for_finish(
        &orchestrator,
        &args.plan_id,
        Duration::from_secs(args.wait),
        ws.config.poll_interval(),
    )?;
    println!("Plan {} {}", plan.id, plan.state);
    Ok(())
}

pub(crate) fn wait_for_finish(
    orchestrator: &Orchestrator,
    plan_id: &str,
    limit: Duration,
    poll: Duration,
) -> Result<Plan> {
    let started = Instant::now();
    loop {
        let plan = orchestrator.get_snapshot(plan_id)?;
        if plan.state.is_finished() {
            return Ok(plan);
        }
        if started.elapsed() >= limit {
            return Err(StepwiseError::UserError(format!(
                "plan '{}' is still {} after {}s; is its owning process alive?",
                plan_id,
                plan.state,
                limit.as_secs()
            )));
        }
        thread::sleep(poll);
    }
}
