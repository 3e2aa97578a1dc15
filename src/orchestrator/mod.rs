//! Caller-facing entry point: submit a query, poll its plan, cancel it.
//!
//! Each submitted plan gets its own dispatcher thread. The plan file is the
//! only channel back to callers; [`Orchestrator::get_snapshot`] reads it
//! from disk, so a snapshot taken from another process sees the same state.


use crate::context::Workspace;
use crate::decompose::{CommandBackend, Decomposer, DecompositionBackend, KeywordBackend};
use crate::config::DecomposerKind;
use crate::dispatch::{DispatchSettings, Dispatcher, ProcessExecutor, StepExecutor};
use crate::error::{Result, StepwiseError};
use crate::execution::CancelToken;
use crate::fs::atomic_write_file;
use crate::locks::{LockMetadata, read_plan_lock};
use crate::plan::Plan;
use crate::skills::SkillRegistry;
use crate::store::{cancel_request_path, read_snapshot, validate_plan_id};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A plan dispatched by this process.
struct Session {
    cancel: CancelToken,
    handle: Option<JoinHandle<Result<Plan>>>,
}

pub struct Orchestrator {
    decomposer: Decomposer,
    registry: Arc<dyn SkillRegistry>,
    dispatcher: Arc<Dispatcher>,
    sessions: Mutex<HashMap<String, Session>>,
}

impl Orchestrator {
    pub fn new(
        decomposer: Decomposer,
        registry: Arc<dyn SkillRegistry>,
        executor: Arc<dyn StepExecutor>,
        settings: DispatchSettings,
    ) -> Self {
        let dispatcher = Dispatcher::new(Arc::clone(&registry), executor, settings);
        Self {
            decomposer,
            registry,
            dispatcher: Arc::new(dispatcher),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Build an orchestrator from a workspace's config and skill registry.
    pub fn from_workspace(ws: &Workspace) -> Result<Self> {
        let config = &ws.config;
        let limits = config.exec_limits();

        let backend: Box<dyn DecompositionBackend> = match config.decomposer {
            DecomposerKind::Keyword => Box::new(KeywordBackend::new()),
            DecomposerKind::Command => {
                let command = config.decomposer_command.clone().ok_or_else(|| {
                    StepwiseError::UserError(
                        "decomposer: command requires decomposer_command".to_string(),
                    )
                })?;
                Box::new(CommandBackend::new(
                    command,
                    Some(ws.root.clone()),
                    config.decomposer_timeout(),
                    limits,
                ))
            }
        };

        let registry: Arc<dyn SkillRegistry> = Arc::new(ws.load_skills()?);
        let settings = DispatchSettings {
            plans_dir: ws.plans_dir.clone(),
            step_timeout: config.step_timeout(),
            result_max_chars: config.result_max_chars,
        };

        Ok(Self::new(
            Decomposer::new(backend, config.decomposition_retries),
            registry,
            Arc::new(ProcessExecutor::new(limits)),
            settings,
        ))
    }

    pub fn plans_dir(&self) -> &Path {
        &self.dispatcher.settings().plans_dir
    }

    /// Decompose `query`, persist the plan and start dispatching it.
    ///
    /// Decomposition errors are returned before anything is persisted. A
    /// query no skill matches still yields a plan id; that plan has no steps
    /// and completes immediately.
    pub fn submit(&self, query: &str) -> Result<String> {
        let candidates = self.registry.descriptors();
        let plan = self.decomposer.decompose(query, &candidates)?;
        let plan_id = plan.id.clone();

        let mut store = self.dispatcher.initialize(plan)?;
        let cancel = CancelToken::with_request_file(cancel_request_path(self.plans_dir(), &plan_id));

        let dispatcher = Arc::clone(&self.dispatcher);
        let token = cancel.clone();
        let handle = thread::Builder::new()
            .name(format!("dispatch-{}", plan_id))
            .spawn(move || dispatcher.run(&mut store, &token))
            .map_err(|e| {
                StepwiseError::UserError(format!("failed to start dispatcher thread: {}", e))
            })?;

        tracing::info!(plan_id = %plan_id, "plan submitted");
        self.sessions().insert(
            plan_id.clone(),
            Session {
                cancel,
                handle: Some(handle),
            },
        );
        Ok(plan_id)
    }

    /// Current persisted state of a plan.
    pub fn get_snapshot(&self, plan_id: &str) -> Result<Plan> {
        validate_plan_id(plan_id)?;
        read_snapshot(self.plans_dir(), plan_id)
    }

    /// Cancel a plan.
    ///
    /// For plans dispatched by this orchestrator, this returns once the
    /// dispatcher has stopped, including when another caller is already
    /// joining it. Plans owned by another process are signalled through a
    /// request file. Cancelling a finished plan does nothing.
    pub fn cancel(&self, plan_id: &str) -> Result<()> {
        let snapshot = self.get_snapshot(plan_id)?;
        if snapshot.state.is_finished() {
            tracing::debug!(plan_id = %plan_id, state = %snapshot.state, "plan already finished");
            if let Some(handle) = self.take_handle(plan_id)
                && let Err(e) = self.join_session(plan_id, handle)
            {
                tracing::warn!(plan_id = %plan_id, error = %e, "finished dispatcher reported an error");
            }
            return Ok(());
        }

        let (handle, tracked) = {
            let mut sessions = self.sessions();
            match sessions.get_mut(plan_id) {
                Some(session) => {
                    if session.cancel.cancel() {
                        tracing::info!(plan_id = %plan_id, "cancellation requested");
                    }
                    (session.handle.take(), true)
                }
                None => (None, false),
            }
        };

        match (handle, tracked) {
            (Some(handle), _) => self.join_session(plan_id, handle).map(|_| ()),
            (None, true) => {
                self.await_joiner(plan_id);
                Ok(())
            }
            (None, false) => self.request_remote_cancel(plan_id),
        }
    }

    /// Block until a plan dispatched by this orchestrator finishes and return
    /// its final snapshot. Other plans are read from disk as they are.
    pub fn wait(&self, plan_id: &str) -> Result<Plan> {
        if let Some(handle) = self.take_handle(plan_id) {
            return self.join_session(plan_id, handle);
        }
        self.await_joiner(plan_id);
        self.get_snapshot(plan_id)
    }

    fn take_handle(&self, plan_id: &str) -> Option<JoinHandle<Result<Plan>>> {
        self.sessions()
            .get_mut(plan_id)
            .and_then(|s| s.handle.take())
    }

    /// Join a dispatcher thread and forget its session.
    fn join_session(&self, plan_id: &str, handle: JoinHandle<Result<Plan>>) -> Result<Plan> {
        let outcome = join(plan_id, handle);
        self.sessions().remove(plan_id);
        outcome
    }

    /// Wait for the caller that took a session's handle to finish joining it.
    fn await_joiner(&self, plan_id: &str) {
        while self.sessions().contains_key(plan_id) {
            thread::sleep(JOIN_POLL_INTERVAL);
        }
    }

    fn request_remote_cancel(&self, plan_id: &str) -> Result<()> {
        if read_plan_lock(self.plans_dir(), plan_id).is_none() {
            tracing::warn!(plan_id = %plan_id, "plan has no active writer; cancellation will apply if it resumes");
        }
        let path = cancel_request_path(self.plans_dir(), plan_id);
        atomic_write_file(&path, &LockMetadata::new("cancel").to_json()?)?;
        tracing::info!(plan_id = %plan_id, path = %path.display(), "cancellation request written");
        Ok(())
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

fn join(plan_id: &str, handle: JoinHandle<Result<Plan>>) -> Result<Plan> {
    handle.join().map_err(|_| {
        StepwiseError::StoreIo(format!("dispatcher for plan '{}' panicked", plan_id))
    })?
}
