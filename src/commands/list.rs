//! Implementation of the `stepwise list` command.

use super::to_json;
use crate::cli::ListArgs;
use crate::context::Workspace;
use crate::error::Result;
use crate::store::{PlanSummary, find_plans_by_query, list_plans};

pub fn cmd_list(args: ListArgs, ws: &Workspace) -> Result<()> {
    let plans = select(&args, ws)?;

    if args.json {
        println!("{}", to_json(&plans)?);
        return Ok(());
    }

    if plans.is_empty() {
        println!("No plans found in {}", ws.plans_dir.display());
        return Ok(());
    }

    println!(
        "{:<36}  {:<9}  {:>5}  {:>4}  {:>4}  QUERY",
        "ID", "STATE", "STEPS", "DONE", "FAIL"
    );
    for plan in &plans {
        println!(
            "{:<36}  {:<9}  {:>5}  {:>4}  {:>4}  {}",
            plan.id,
            plan.state.as_str(),
            plan.total_steps,
            plan.completed,
            plan.failed,
            crate::execution::preview_text(&plan.query, 60)
        );
    }
    Ok(())
}

pub(crate) fn select(args: &ListArgs, ws: &Workspace) -> Result<Vec<PlanSummary>> {
    match &args.query {
        Some(needle) => find_plans_by_query(&ws.plans_dir, needle, args.exact),
        None => list_plans(&ws.plans_dir),
    }
}
