//! The seam between the dispatcher and the execution unit.

use crate::error::Result;
use crate::execution::{CancelToken, ExecLimits, ExecutionResult, execute};
use crate::skills::SkillEntry;
use serde_json::Value;
use std::time::Duration;

/// Runs one resolved skill invocation.
pub trait StepExecutor: Send + Sync {
    fn execute(
        &self,
        entry: &SkillEntry,
        parameters: &Value,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<ExecutionResult>;
}

/// Runs each step as an isolated child process.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    limits: ExecLimits,
}

impl ProcessExecutor {
    pub fn new(limits: ExecLimits) -> Self {
        Self { limits }
    }
}

impl StepExecutor for ProcessExecutor {
    fn execute(
        &self,
        entry: &SkillEntry,
        parameters: &Value,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<ExecutionResult> {
        execute(entry, parameters, timeout, cancel, &self.limits)
    }
}
