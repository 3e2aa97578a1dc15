//! Implementation of the `stepwise exec` command.
//!
//! Runs one skill through the same execution unit the dispatcher uses,
//! without creating a plan. Useful for checking a skill's protocol handling.

use crate::cli::ExecArgs;
use crate::context::Workspace;
use crate::error::{Result, StepwiseError};
use crate::execution::{CancelToken, ExecutionResult, execute};
use crate::skills::SkillRegistry;
use serde_json::Value;

pub fn cmd_exec(args: ExecArgs, ws: &Workspace) -> Result<()> {
    let result = exec_skill(ws, &args)?;
    println!("{}", result.output);
    Ok(())
}

/// Run the skill and turn any failure into an error.
pub(crate) fn exec_skill(ws: &Workspace, args: &ExecArgs) -> Result<ExecutionResult> {
    let skills = ws.load_skills()?;
    let mut entry = skills
        .resolve(&args.skill)
        .ok_or_else(|| StepwiseError::UnknownSkill(args.skill.clone()))?;
    if let Some(command) = &args.command {
        entry.command = command.clone();
    }

    let parameters: Value = serde_json::from_str(&args.params)
        .map_err(|e| StepwiseError::UserError(format!("--params is not valid JSON: {}", e)))?;
    if !parameters.is_object() {
        return Err(StepwiseError::UserError(
            "--params must be a JSON object".to_string(),
        ));
    }

    let timeout = entry.timeout.unwrap_or(ws.config.step_timeout());
    let result = execute(
        &entry,
        &parameters,
        timeout,
        &CancelToken::new(),
        &ws.config.exec_limits(),
    )?;
    tracing::info!(skill = %entry.name, elapsed_ms = result.elapsed_ms(), success = result.success, "skill executed");

    if result.success {
        return Ok(result);
    }
    Err(result.to_error(timeout).unwrap_or_else(|| {
        StepwiseError::UserError(format!(
            "skill '{}' failed: {}",
            entry.name,
            result.condensed()
        ))
    }))
}
