//! Lock-free readers over the plans directory.

use super::{PLAN_EXTENSION, plan_path, validate_plan_id};
use crate::error::{Result, StepwiseError};
use crate::plan::{Plan, PlanState, StepStatus, format};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Read the latest persisted snapshot of a plan.
pub fn read_snapshot(plans_dir: &Path, plan_id: &str) -> Result<Plan> {
    validate_plan_id(plan_id)?;
    let path = plan_path(plans_dir, plan_id);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StepwiseError::NotFound(plan_id.to_string()));
        }
        Err(e) => {
            return Err(StepwiseError::StoreIo(format!(
                "failed to read '{}': {}",
                path.display(),
                e
            )));
        }
    };
    format::parse(&content)
}

/// One line of `stepwise list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub query: String,
    pub state: PlanState,
    pub total_steps: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
}

impl From<&Plan> for PlanSummary {
    fn from(plan: &Plan) -> Self {
        Self {
            id: plan.id.clone(),
            created_at: plan.created_at,
            query: plan.query.clone(),
            state: plan.state,
            total_steps: plan.steps.len(),
            pending: plan.count(StepStatus::Pending),
            in_progress: plan.count(StepStatus::InProgress),
            completed: plan.count(StepStatus::Completed),
            failed: plan.count(StepStatus::Failed),
        }
    }
}

/// Summaries of every readable plan, oldest first.
///
/// Files that fail to parse are skipped with a warning. A missing plans
/// directory means no plans.
pub fn list_plans(plans_dir: &Path) -> Result<Vec<PlanSummary>> {
    let entries = match fs::read_dir(plans_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(StepwiseError::StoreIo(format!(
                "failed to read plans directory '{}': {}",
                plans_dir.display(),
                e
            )));
        }
    };

    let mut summaries = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            StepwiseError::StoreIo(format!(
                "failed to read plans directory '{}': {}",
                plans_dir.display(),
                e
            ))
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(PLAN_EXTENSION) {
            continue;
        }

        let parsed = fs::read_to_string(&path)
            .map_err(|e| StepwiseError::StoreIo(e.to_string()))
            .and_then(|content| format::parse(&content));
        match parsed {
            Ok(plan) => summaries.push(PlanSummary::from(&plan)),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable plan"),
        }
    }

    summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    Ok(summaries)
}

/// Plans whose query matches `needle`, case-insensitively.
///
/// With `exact`, the whole (trimmed) query must match; otherwise `needle`
/// only has to occur in it.
pub fn find_plans_by_query(plans_dir: &Path, needle: &str, exact: bool) -> Result<Vec<PlanSummary>> {
    let needle = needle.trim().to_lowercase();
    Ok(list_plans(plans_dir)?
        .into_iter()
        .filter(|summary| {
            let query = summary.query.trim().to_lowercase();
            if exact {
                query == needle
            } else {
                query.contains(&needle)
            }
        })
        .collect())
}
