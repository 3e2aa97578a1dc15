//! The dispatcher state machine.

use super::executor::StepExecutor;
use crate::error::{Result, StepwiseError};
use crate::execution::{CancelToken, FailureKind};
use crate::plan::{Plan, PlanState, Step, StepStatus};
use crate::skills::SkillRegistry;
use crate::store::PlanStore;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of a step whose dependency failed.
pub const SKIPPED_RESULT: &str = "skipped: dependency failed";
/// Result of the step that was running when the plan was cancelled.
pub const CANCELLED_RESULT: &str = "cancelled";
/// Result of every step that had not started when the plan was cancelled.
pub const PLAN_ABORTED_RESULT: &str = "cancelled: plan aborted";

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub plans_dir: PathBuf,
    /// Applies to skills without their own timeout.
    pub step_timeout: Duration,
    pub result_max_chars: usize,
}

/// How one invoked step ended.
enum StepOutcome {
    Completed(String),
    Failed(String),
    Cancelled,
}

/// Drives plans through their steps.
pub struct Dispatcher {
    registry: Arc<dyn SkillRegistry>,
    executor: Arc<dyn StepExecutor>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<dyn SkillRegistry>,
        executor: Arc<dyn StepExecutor>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            registry,
            executor,
            settings,
        }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Persist `plan` with every step pending and take its writer lock.
    pub fn initialize(&self, plan: Plan) -> Result<PlanStore> {
        PlanStore::initialize(
            &self.settings.plans_dir,
            plan,
            self.settings.result_max_chars,
        )
    }

    /// Walk every step of the store's plan and return the final snapshot.
    ///
    /// Returns `Err` only for fatal store or invariant errors, after marking
    /// the plan `aborted` when the store still accepts writes.
    pub fn run(&self, store: &mut PlanStore, cancel: &CancelToken) -> Result<Plan> {
        let plan_id = store.plan_id().to_string();
        let started = Instant::now();

        let outcome = self.walk(store, cancel);

        if let Some(path) = cancel.request_file() {
            let _ = std::fs::remove_file(path);
        }

        match outcome {
            Ok(state) => {
                let plan = store.snapshot();
                tracing::info!(
                    plan_id = %plan_id,
                    %state,
                    completed = plan.count(StepStatus::Completed),
                    failed = plan.count(StepStatus::Failed),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "plan finished"
                );
                Ok(plan)
            }
            Err(e) => {
                tracing::error!(plan_id = %plan_id, error = %e, "dispatcher halted");
                if let Err(mark) = store.set_state(PlanState::Aborted) {
                    tracing::error!(plan_id = %plan_id, error = %mark, "could not mark plan aborted");
                }
                Err(e)
            }
        }
    }

    fn walk(&self, store: &mut PlanStore, cancel: &CancelToken) -> Result<PlanState> {
        let steps = store.snapshot().steps;
        let mut failed: HashSet<usize> = HashSet::new();

        for (pos, step) in steps.iter().enumerate() {
            if cancel.is_cancelled() {
                self.abort_remaining(store, &steps[pos..])?;
                store.set_state(PlanState::Aborted)?;
                return Ok(PlanState::Aborted);
            }

            if let Some(dep) = step.depends_on.iter().find(|d| failed.contains(d)) {
                tracing::warn!(plan_id = %store.plan_id(), step = step.index, dependency = dep, "skipping step");
                fail_without_running(store, step.index, SKIPPED_RESULT)?;
                failed.insert(step.index);
                continue;
            }

            store.transition_status(step.index, StepStatus::InProgress)?;
            tracing::info!(plan_id = %store.plan_id(), step = step.index, skill = %step.skill_name, "step started");

            let started = Instant::now();
            let parameters = step_parameters(&store.snapshot(), step);
            let outcome = self.invoke(step, &parameters, cancel);
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match outcome {
                StepOutcome::Completed(result) => {
                    store.transition_status(step.index, StepStatus::Completed)?;
                    store.record_result(step.index, &result, elapsed_ms)?;
                    tracing::info!(plan_id = %store.plan_id(), step = step.index, elapsed_ms, "step completed");
                }
                StepOutcome::Failed(error) => {
                    store.transition_status(step.index, StepStatus::Failed)?;
                    store.record_result(step.index, &error, elapsed_ms)?;
                    failed.insert(step.index);
                    tracing::warn!(plan_id = %store.plan_id(), step = step.index, elapsed_ms, %error, "step failed");
                }
                StepOutcome::Cancelled => {
                    store.transition_status(step.index, StepStatus::Failed)?;
                    store.record_result(step.index, CANCELLED_RESULT, elapsed_ms)?;
                    self.abort_remaining(store, &steps[pos + 1..])?;
                    store.set_state(PlanState::Aborted)?;
                    return Ok(PlanState::Aborted);
                }
            }
        }

        store.set_state(PlanState::Completed)?;
        Ok(PlanState::Completed)
    }

    fn invoke(&self, step: &Step, parameters: &Value, cancel: &CancelToken) -> StepOutcome {
        let Some(entry) = self.registry.resolve(&step.skill_name) else {
            return StepOutcome::Failed(
                StepwiseError::UnknownSkill(step.skill_name.clone()).to_string(),
            );
        };
        let timeout = entry.timeout.unwrap_or(self.settings.step_timeout);

        match self.executor.execute(&entry, parameters, timeout, cancel) {
            Ok(result) if result.success => StepOutcome::Completed(result.output),
            Ok(result) if result.failure == Some(FailureKind::Cancelled) => StepOutcome::Cancelled,
            Ok(result) => StepOutcome::Failed(result.condensed()),
            Err(e) => StepOutcome::Failed(e.to_string()),
        }
    }

    fn abort_remaining(&self, store: &mut PlanStore, remaining: &[Step]) -> Result<()> {
        tracing::info!(plan_id = %store.plan_id(), remaining = remaining.len(), "plan cancelled");
        for step in remaining {
            fail_without_running(store, step.index, PLAN_ABORTED_RESULT)?;
        }
        Ok(())
    }
}

/// Walk a pending step straight to `failed` without invoking its skill.
fn fail_without_running(store: &mut PlanStore, index: usize, result: &str) -> Result<()> {
    store.transition_status(index, StepStatus::InProgress)?;
    store.transition_status(index, StepStatus::Failed)?;
    store.record_result(index, result, 0)
}

/// Parameters handed to a step's skill, including the condensed results of
/// the steps it depends on.
fn step_parameters(plan: &Plan, step: &Step) -> Value {
    let context: Vec<Value> = step
        .depends_on
        .iter()
        .filter_map(|dep| plan.step(*dep))
        .map(|dep| {
            json!({
                "step": dep.index,
                "skill": dep.skill_name,
                "result": dep.result,
            })
        })
        .collect();

    json!({
        "query": step.sub_query,
        "plan_id": plan.id,
        "step": step.index,
        "context": context,
    })
}
