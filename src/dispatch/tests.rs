//! Tests for the dispatcher, driven through a spy executor.

use super::*;
use crate::error::{Result, StepwiseError};
use crate::execution::{CancelToken, ExecutionResult, FailureKind};
use crate::plan::{Plan, PlanState, Step, StepStatus};
use crate::skills::{SkillDescriptor, SkillEntry, SkillRegistry};
use crate::store::{PlanStore, read_snapshot};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Registry whose entries are never spawned.
struct StaticRegistry {
    names: Vec<&'static str>,
    timeouts: HashMap<&'static str, Duration>,
}

impl StaticRegistry {
    fn new(names: &[&'static str]) -> Self {
        Self {
            names: names.to_vec(),
            timeouts: HashMap::new(),
        }
    }
}

impl SkillRegistry for StaticRegistry {
    fn resolve(&self, name: &str) -> Option<SkillEntry> {
        let name = *self.names.iter().find(|n| **n == name)?;
        Some(SkillEntry {
            name: name.to_string(),
            entry_point: format!("/bin/{}", name),
            command: "run".to_string(),
            timeout: self.timeouts.get(name).copied(),
            environment: HashMap::new(),
            working_dir: None,
        })
    }

    fn descriptors(&self) -> Vec<SkillDescriptor> {
        self.names
            .iter()
            .map(|n| SkillDescriptor {
                name: n.to_string(),
                description: String::new(),
                trigger_description: n.to_string(),
            })
            .collect()
    }
}

#[derive(Clone)]
enum Reply {
    Ok(&'static str),
    Fail(&'static str),
    Timeout,
    SpawnError,
    /// Fires the plan's cancel token, then reports the kill.
    CancelPlan(CancelToken),
    /// Breaks the plans directory so the next store write fails.
    BreakStore(PathBuf),
}

struct Call {
    skill: String,
    parameters: Value,
    timeout: Duration,
}

/// Records every invocation and answers from a per-skill script.
struct SpyExecutor {
    replies: HashMap<&'static str, Reply>,
    calls: Mutex<Vec<Call>>,
    /// When set, each call snapshots the persisted plan.
    observe: Option<(PathBuf, String)>,
    observed: Mutex<Vec<Plan>>,
}

impl SpyExecutor {
    fn new(replies: &[(&'static str, Reply)]) -> Self {
        Self {
            replies: replies.iter().cloned().collect(),
            calls: Mutex::new(Vec::new()),
            observe: None,
            observed: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn called_skills(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|c| c.skill.clone()).collect()
    }
}

impl StepExecutor for SpyExecutor {
    fn execute(
        &self,
        entry: &SkillEntry,
        parameters: &Value,
        timeout: Duration,
        _cancel: &CancelToken,
    ) -> Result<ExecutionResult> {
        self.calls.lock().unwrap().push(Call {
            skill: entry.name.clone(),
            parameters: parameters.clone(),
            timeout,
        });
        if let Some((dir, id)) = &self.observe {
            self.observed.lock().unwrap().push(read_snapshot(dir, id).unwrap());
        }

        let reply = self
            .replies
            .get(entry.name.as_str())
            .cloned()
            .unwrap_or(Reply::Ok("done"));
        let result = |success: bool, output: &str, error: Option<&str>, failure| ExecutionResult {
            success,
            output: output.to_string(),
            error: error.map(str::to_string),
            failure,
            exit_code: Some(if success { 0 } else { 1 }),
            elapsed: Duration::from_millis(1),
        };
        match reply {
            Reply::Ok(out) => Ok(result(true, out, None, None)),
            Reply::Fail(err) => Ok(result(false, "", Some(err), Some(FailureKind::Reported))),
            Reply::Timeout => Ok(result(false, "", Some("timeout"), Some(FailureKind::Timeout))),
            Reply::SpawnError => Err(StepwiseError::UserError(format!(
                "failed to execute skill '{}'",
                entry.name
            ))),
            Reply::CancelPlan(token) => {
                token.cancel();
                Ok(result(false, "", Some("cancelled"), Some(FailureKind::Cancelled)))
            }
            Reply::BreakStore(dir) => {
                std::fs::remove_dir_all(&dir).unwrap();
                std::fs::write(&dir, "not a directory").unwrap();
                Ok(result(true, "ok", None, None))
            }
        }
    }
}

fn settings(dir: &Path) -> DispatchSettings {
    DispatchSettings {
        plans_dir: dir.to_path_buf(),
        step_timeout: Duration::from_secs(60),
        result_max_chars: 512,
    }
}

fn dispatcher(dir: &Path, registry: StaticRegistry, spy: Arc<SpyExecutor>) -> Dispatcher {
    Dispatcher::new(Arc::new(registry), spy, settings(dir))
}

fn step(index: usize, skill: &str, deps: &[usize]) -> Step {
    Step::new(index, skill, "because", format!("do {}", skill)).with_depends_on(deps.to_vec())
}

fn result_of(plan: &Plan, index: usize) -> &str {
    plan.step(index).unwrap().result.as_deref().unwrap()
}

#[test]
fn test_all_steps_complete() {
    let temp = TempDir::new().unwrap();
    let spy = Arc::new(SpyExecutor::new(&[
        ("calendar", Reply::Ok("Meeting booked")),
        ("ideagen", Reply::Ok("5 ideas")),
    ]));
    let d = dispatcher(temp.path(), StaticRegistry::new(&["calendar", "ideagen"]), spy.clone());
    let plan = Plan::new("q", vec![step(1, "calendar", &[]), step(2, "ideagen", &[1])]);
    let id = plan.id.clone();

    let mut store = d.initialize(plan).unwrap();
    let done = d.run(&mut store, &CancelToken::new()).unwrap();

    assert_eq!(done.state, PlanState::Completed);
    assert_eq!(done.count(StepStatus::Completed), 2);
    assert_eq!(done.count(StepStatus::Pending), 0);
    assert_eq!(done.count(StepStatus::InProgress), 0);
    assert_eq!(result_of(&done, 1), "Meeting booked");
    assert!(done.steps.iter().all(|s| s.execution_time_ms.is_some()));
    assert_eq!(read_snapshot(temp.path(), &id).unwrap(), done);
    assert_eq!(spy.called_skills(), vec!["calendar", "ideagen"]);
}

#[test]
fn test_unknown_skill_fails_only_that_step() {
    let temp = TempDir::new().unwrap();
    let spy = Arc::new(SpyExecutor::new(&[]));
    let d = dispatcher(temp.path(), StaticRegistry::new(&["calendar"]), spy.clone());
    let plan = Plan::new("q", vec![step(1, "nonexistent", &[]), step(2, "calendar", &[])]);

    let mut store = d.initialize(plan).unwrap();
    let done = d.run(&mut store, &CancelToken::new()).unwrap();

    assert_eq!(done.state, PlanState::Completed);
    assert_eq!(done.steps[0].status, StepStatus::Failed);
    assert!(result_of(&done, 1).contains("unknown skill"));
    assert_eq!(done.steps[1].status, StepStatus::Completed);
    assert_eq!(spy.call_count(), 1);
}

#[test]
fn test_dependency_failure_skips_dependents_without_invoking() {
    let temp = TempDir::new().unwrap();
    let spy = Arc::new(SpyExecutor::new(&[("a", Reply::Fail("bad input"))]));
    let d = dispatcher(temp.path(), StaticRegistry::new(&["a", "b", "c"]), spy.clone());
    let plan = Plan::new(
        "q",
        vec![step(1, "a", &[]), step(2, "b", &[1]), step(3, "c", &[2])],
    );

    let mut store = d.initialize(plan).unwrap();
    let done = d.run(&mut store, &CancelToken::new()).unwrap();

    assert_eq!(spy.call_count(), 1);
    assert_eq!(result_of(&done, 1), "bad input");
    for index in [2, 3] {
        let s = done.step(index).unwrap();
        assert_eq!(s.status, StepStatus::Failed);
        assert_eq!(s.result.as_deref(), Some(SKIPPED_RESULT));
        assert_eq!(s.execution_time_ms, Some(0));
    }
    assert_eq!(done.state, PlanState::Completed);
}

#[test]
fn test_independent_steps_run_after_failure() {
    let temp = TempDir::new().unwrap();
    let spy = Arc::new(SpyExecutor::new(&[("a", Reply::Timeout)]));
    let d = dispatcher(temp.path(), StaticRegistry::new(&["a", "b", "c"]), spy.clone());
    let plan = Plan::new(
        "q",
        vec![step(1, "a", &[]), step(2, "b", &[1]), step(3, "c", &[])],
    );

    let mut store = d.initialize(plan).unwrap();
    let done = d.run(&mut store, &CancelToken::new()).unwrap();

    assert_eq!(result_of(&done, 1), "timeout");
    assert_eq!(result_of(&done, 2), SKIPPED_RESULT);
    assert_eq!(done.steps[2].status, StepStatus::Completed);
    assert_eq!(spy.called_skills(), vec!["a", "c"]);
}

#[test]
fn test_spawn_error_is_a_failed_step() {
    let temp = TempDir::new().unwrap();
    let spy = Arc::new(SpyExecutor::new(&[("a", Reply::SpawnError)]));
    let d = dispatcher(temp.path(), StaticRegistry::new(&["a", "b"]), spy.clone());
    let plan = Plan::new("q", vec![step(1, "a", &[]), step(2, "b", &[])]);

    let mut store = d.initialize(plan).unwrap();
    let done = d.run(&mut store, &CancelToken::new()).unwrap();

    assert!(result_of(&done, 1).contains("failed to execute skill 'a'"));
    assert_eq!(done.steps[1].status, StepStatus::Completed);
}

#[test]
fn test_parameters_carry_dependency_context() {
    let temp = TempDir::new().unwrap();
    let spy = Arc::new(SpyExecutor::new(&[("calendar", Reply::Ok("Booked 09:00"))]));
    let d = dispatcher(temp.path(), StaticRegistry::new(&["calendar", "ideagen"]), spy.clone());
    let plan = Plan::new("q", vec![step(1, "calendar", &[]), step(2, "ideagen", &[1])]);
    let id = plan.id.clone();

    let mut store = d.initialize(plan).unwrap();
    d.run(&mut store, &CancelToken::new()).unwrap();

    let calls = spy.calls.lock().unwrap();
    let first = &calls[0].parameters;
    assert_eq!(first["query"], "do calendar");
    assert_eq!(first["plan_id"], id.as_str());
    assert_eq!(first["step"], 1);
    assert_eq!(first["context"].as_array().unwrap().len(), 0);

    let second = &calls[1].parameters;
    assert_eq!(second["context"][0]["step"], 1);
    assert_eq!(second["context"][0]["skill"], "calendar");
    assert_eq!(second["context"][0]["result"], "Booked 09:00");
}

#[test]
fn test_skill_timeout_overrides_default() {
    let temp = TempDir::new().unwrap();
    let spy = Arc::new(SpyExecutor::new(&[]));
    let mut registry = StaticRegistry::new(&["fast", "slow"]);
    registry.timeouts.insert("fast", Duration::from_secs(2));
    let d = dispatcher(temp.path(), registry, spy.clone());
    let plan = Plan::new("q", vec![step(1, "fast", &[]), step(2, "slow", &[])]);

    let mut store = d.initialize(plan).unwrap();
    d.run(&mut store, &CancelToken::new()).unwrap();

    let calls = spy.calls.lock().unwrap();
    assert_eq!(calls[0].timeout, Duration::from_secs(2));
    assert_eq!(calls[1].timeout, Duration::from_secs(60));
}

#[test]
fn test_progress_is_visible_while_step_runs() {
    let temp = TempDir::new().unwrap();
    let plan = Plan::new("q", vec![step(1, "a", &[]), step(2, "b", &[])]);
    let mut spy = SpyExecutor::new(&[]);
    spy.observe = Some((temp.path().to_path_buf(), plan.id.clone()));
    let spy = Arc::new(spy);
    let d = dispatcher(temp.path(), StaticRegistry::new(&["a", "b"]), spy.clone());

    let mut store = d.initialize(plan).unwrap();
    d.run(&mut store, &CancelToken::new()).unwrap();

    let observed = spy.observed.lock().unwrap();
    assert_eq!(observed[0].steps[0].status, StepStatus::InProgress);
    assert_eq!(observed[0].steps[1].status, StepStatus::Pending);
    assert_eq!(observed[1].steps[0].status, StepStatus::Completed);
    assert_eq!(observed[1].steps[1].status, StepStatus::InProgress);
    assert!(observed.iter().all(|p| p.state == PlanState::Running));
}

#[test]
fn test_cancel_before_start_aborts_everything() {
    let temp = TempDir::new().unwrap();
    let spy = Arc::new(SpyExecutor::new(&[]));
    let d = dispatcher(temp.path(), StaticRegistry::new(&["a", "b"]), spy.clone());
    let plan = Plan::new("q", vec![step(1, "a", &[]), step(2, "b", &[])]);
    let cancel = CancelToken::new();
    cancel.cancel();

    let mut store = d.initialize(plan).unwrap();
    let done = d.run(&mut store, &cancel).unwrap();

    assert_eq!(spy.call_count(), 0);
    assert_eq!(done.state, PlanState::Aborted);
    for s in &done.steps {
        assert_eq!(s.status, StepStatus::Failed);
        assert_eq!(s.result.as_deref(), Some(PLAN_ABORTED_RESULT));
    }
}

#[test]
fn test_cancel_in_flight_step() {
    let temp = TempDir::new().unwrap();
    let cancel = CancelToken::new();
    let spy = Arc::new(SpyExecutor::new(&[("b", Reply::CancelPlan(cancel.clone()))]));
    let d = dispatcher(temp.path(), StaticRegistry::new(&["a", "b", "c"]), spy.clone());
    let plan = Plan::new(
        "q",
        vec![step(1, "a", &[]), step(2, "b", &[]), step(3, "c", &[])],
    );

    let mut store = d.initialize(plan).unwrap();
    let done = d.run(&mut store, &cancel).unwrap();

    assert_eq!(done.state, PlanState::Aborted);
    assert_eq!(done.steps[0].status, StepStatus::Completed);
    assert_eq!(result_of(&done, 2), CANCELLED_RESULT);
    assert_eq!(result_of(&done, 3), PLAN_ABORTED_RESULT);
    assert_eq!(spy.called_skills(), vec!["a", "b"]);
}

#[test]
fn test_cancel_request_file_is_cleared() {
    let temp = TempDir::new().unwrap();
    let spy = Arc::new(SpyExecutor::new(&[]));
    let d = dispatcher(temp.path(), StaticRegistry::new(&["a"]), spy);
    let plan = Plan::new("q", vec![step(1, "a", &[])]);
    let request = crate::store::cancel_request_path(temp.path(), &plan.id);
    std::fs::write(&request, "").unwrap();

    let mut store = d.initialize(plan).unwrap();
    let done = d.run(&mut store, &CancelToken::with_request_file(request.clone())).unwrap();

    assert_eq!(done.state, PlanState::Aborted);
    assert!(!request.exists());
}

#[test]
fn test_zero_step_plan_completes_immediately() {
    let temp = TempDir::new().unwrap();
    let spy = Arc::new(SpyExecutor::new(&[]));
    let d = dispatcher(temp.path(), StaticRegistry::new(&["a"]), spy.clone());
    let plan = Plan::new("order a pizza", Vec::new());
    let id = plan.id.clone();

    let mut store = d.initialize(plan).unwrap();
    let done = d.run(&mut store, &CancelToken::new()).unwrap();

    assert_eq!(done.state, PlanState::Completed);
    assert!(done.is_no_match());
    assert_eq!(spy.call_count(), 0);
    assert_eq!(read_snapshot(temp.path(), &id).unwrap().state, PlanState::Completed);
}

#[test]
fn test_store_failure_is_fatal() {
    let temp = TempDir::new().unwrap();
    let plans_dir = temp.path().join("plans");
    let spy = Arc::new(SpyExecutor::new(&[("a", Reply::BreakStore(plans_dir.clone()))]));
    let d = Dispatcher::new(
        Arc::new(StaticRegistry::new(&["a", "b"])),
        spy.clone(),
        settings(&plans_dir),
    );
    let plan = Plan::new("q", vec![step(1, "a", &[]), step(2, "b", &[])]);

    let mut store: PlanStore = d.initialize(plan).unwrap();
    let err = d.run(&mut store, &CancelToken::new()).unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(err, StepwiseError::StoreIo(_)));
    assert_eq!(spy.call_count(), 1);
    // The in-memory plan never ran ahead of what was persisted.
    assert_eq!(store.snapshot().steps[0].status, StepStatus::InProgress);
}
