//! Implementation of the `stepwise show` command.

use super::{render_plan, to_json};
use crate::cli::ShowArgs;
use crate::context::Workspace;
use crate::error::Result;
use crate::store::{read_snapshot, validate_plan_id};

pub fn cmd_show(args: ShowArgs, ws: &Workspace) -> Result<()> {
    validate_plan_id(&args.plan_id)?;
    let plan = read_snapshot(&ws.plans_dir, &args.plan_id)?;

    if args.json {
        println!("{}", to_json(&plan)?);
    } else {
        print!("{}", render_plan(&plan));
    }
    Ok(())
}
