//! The single-writer side of the plan store.

use super::{plan_path, validate_plan_id};
use crate::error::{Result, StepwiseError};
use crate::fs::atomic_write_file;
use crate::locks::{LockGuard, acquire_plan_lock};
use crate::plan::{Plan, PlanState, StepStatus, format};
use std::path::{Path, PathBuf};

/// Appended to a result that was cut to fit the configured bound.
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Bound `result` to at most `max_chars` characters.
///
/// A truncated result keeps as much of its head as fits and ends with
/// [`TRUNCATION_MARKER`].
pub fn condense(result: &str, max_chars: usize) -> String {
    if result.chars().count() <= max_chars {
        return result.to_string();
    }
    let marker_len = TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_len {
        return TRUNCATION_MARKER.chars().take(max_chars).collect();
    }
    let mut out: String = result.chars().take(max_chars - marker_len).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Exclusive writer for one persisted plan.
///
/// The in-memory plan only changes after the matching file write succeeded,
/// so [`PlanStore::snapshot`] and the file on disk never disagree.
#[derive(Debug)]
pub struct PlanStore {
    path: PathBuf,
    plan: Plan,
    result_max_chars: usize,
    /// Index whose terminal transition has not had its result recorded yet.
    awaiting_result: Option<usize>,
    _lock: LockGuard,
}

impl PlanStore {
    /// Persist a fresh plan with every step `pending` and take ownership of it.
    ///
    /// Fails if a plan with the same id already exists, or if another writer
    /// holds its lock.
    pub fn initialize(plans_dir: &Path, plan: Plan, result_max_chars: usize) -> Result<Self> {
        validate_plan_id(&plan.id)?;
        validate_new_plan(&plan)?;

        let lock = acquire_plan_lock(plans_dir, &plan.id, "dispatch")?;
        let path = plan_path(plans_dir, &plan.id);
        if path.exists() {
            return Err(StepwiseError::StoreIo(format!(
                "plan '{}' is already initialized at '{}'",
                plan.id,
                path.display()
            )));
        }

        atomic_write_file(&path, &format::render(&plan))?;
        tracing::debug!(plan_id = %plan.id, steps = plan.steps.len(), path = %path.display(), "plan initialized");

        Ok(Self {
            path,
            plan,
            result_max_chars,
            awaiting_result: None,
            _lock: lock,
        })
    }

    pub fn plan_id(&self) -> &str {
        &self.plan.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current plan, reflecting every successful write so far.
    pub fn snapshot(&self) -> Plan {
        self.plan.clone()
    }

    /// Move a step to `new_status` if that is its single legal successor.
    pub fn transition_status(&mut self, index: usize, new_status: StepStatus) -> Result<()> {
        let from = self
            .plan
            .step(index)
            .map(|s| s.status)
            .ok_or_else(|| self.no_such_step(index))?;

        if !from.can_transition_to(new_status) {
            return Err(StepwiseError::InvalidTransition {
                index,
                from,
                to: new_status,
            });
        }
        if let Some(pending) = self.awaiting_result {
            return Err(StepwiseError::InvariantViolation(format!(
                "step {} changed status before the result of step {} was recorded",
                index, pending
            )));
        }

        let mut next = self.plan.clone();
        if let Some(step) = next.step_mut(index) {
            step.status = new_status;
        }
        self.commit(next)?;

        if new_status.is_terminal() {
            self.awaiting_result = Some(index);
        }
        tracing::debug!(plan_id = %self.plan.id, step = index, %from, to = %new_status, "step transition");
        Ok(())
    }

    /// Attach the condensed result and elapsed time to a step that just
    /// reached a terminal status.
    pub fn record_result(&mut self, index: usize, result: &str, elapsed_ms: u64) -> Result<()> {
        if self.plan.step(index).is_none() {
            return Err(self.no_such_step(index));
        }
        if self.awaiting_result != Some(index) {
            return Err(StepwiseError::InvariantViolation(format!(
                "result for step {} recorded without a preceding terminal transition",
                index
            )));
        }

        let mut next = self.plan.clone();
        if let Some(step) = next.step_mut(index) {
            step.result = Some(condense(result, self.result_max_chars));
            step.execution_time_ms = Some(elapsed_ms);
        }
        self.commit(next)?;
        self.awaiting_result = None;
        Ok(())
    }

    /// Set the dispatcher-level state. A finished plan stays finished.
    pub fn set_state(&mut self, state: PlanState) -> Result<()> {
        if self.plan.state == state {
            return Ok(());
        }
        if self.plan.state.is_finished() {
            return Err(StepwiseError::InvariantViolation(format!(
                "plan '{}' is already {} and cannot become {}",
                self.plan.id, self.plan.state, state
            )));
        }

        let mut next = self.plan.clone();
        next.state = state;
        self.commit(next)?;
        tracing::debug!(plan_id = %self.plan.id, %state, "plan state");
        Ok(())
    }

    fn commit(&mut self, next: Plan) -> Result<()> {
        atomic_write_file(&self.path, &format::render(&next))?;
        self.plan = next;
        Ok(())
    }

    fn no_such_step(&self, index: usize) -> StepwiseError {
        StepwiseError::InvariantViolation(format!(
            "plan '{}' has no step {} (total {})",
            self.plan.id,
            index,
            self.plan.steps.len()
        ))
    }
}

/// A new plan must be untouched: contiguous 1-based indices, every step
/// pending with no result, dependencies pointing backwards only.
fn validate_new_plan(plan: &Plan) -> Result<()> {
    if plan.state != PlanState::Running {
        return Err(StepwiseError::UserError(format!(
            "plan '{}' must start in state running, found {}",
            plan.id, plan.state
        )));
    }

    for (pos, step) in plan.steps.iter().enumerate() {
        let expected = pos + 1;
        if step.index != expected {
            return Err(StepwiseError::UserError(format!(
                "plan '{}' step at position {} has index {}",
                plan.id, expected, step.index
            )));
        }
        if step.status != StepStatus::Pending
            || step.result.is_some()
            || step.execution_time_ms.is_some()
        {
            return Err(StepwiseError::UserError(format!(
                "plan '{}' step {} must start pending with no result",
                plan.id, step.index
            )));
        }
        if let Some(dep) = step.depends_on.iter().find(|d| **d == 0 || **d >= step.index) {
            return Err(StepwiseError::UserError(format!(
                "plan '{}' step {} depends on step {}, which does not precede it",
                plan.id, step.index, dep
            )));
        }
    }

    Ok(())
}
