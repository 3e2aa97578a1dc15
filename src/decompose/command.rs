//! Decomposition delegated to an external program.
//!
//! The program speaks the same protocol as a skill. It receives
//!
//! ```json
//! {"command": "decompose", "parameters": {"query": "...", "skills": [{"name": "...", "description": "...", "triggers": "..."}]}}
//! ```
//!
//! and its `output` must carry the decomposition JSON.

use super::DecompositionBackend;
use super::model::Decomposition;
use crate::error::{Result, StepwiseError};
use crate::execution::{CancelToken, ExecLimits, execute};
use crate::skills::{SkillDescriptor, SkillEntry};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Request `command` sent to a decomposer program.
pub const DECOMPOSE_COMMAND: &str = "decompose";

/// Runs an external decomposer through the execution unit.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    entry: SkillEntry,
    timeout: Duration,
    limits: ExecLimits,
}

impl CommandBackend {
    pub fn new(
        entry_point: impl Into<String>,
        working_dir: Option<PathBuf>,
        timeout: Duration,
        limits: ExecLimits,
    ) -> Self {
        Self {
            entry: SkillEntry {
                name: "decomposer".to_string(),
                entry_point: entry_point.into(),
                command: DECOMPOSE_COMMAND.to_string(),
                timeout: Some(timeout),
                environment: HashMap::new(),
                working_dir,
            },
            timeout,
            limits,
        }
    }
}

impl DecompositionBackend for CommandBackend {
    fn name(&self) -> &str {
        "command"
    }

    fn decompose(&self, query: &str, candidates: &[SkillDescriptor]) -> Result<Decomposition> {
        let skills: Vec<_> = candidates
            .iter()
            .map(|c| {
                json!({
                    "name": c.name,
                    "description": c.description,
                    "triggers": c.trigger_description,
                })
            })
            .collect();
        let parameters = json!({ "query": query, "skills": skills });

        let result = execute(
            &self.entry,
            &parameters,
            self.timeout,
            &CancelToken::new(),
            &self.limits,
        )
        .map_err(|e| StepwiseError::Decomposition(format!("decomposer unreachable: {}", e)))?;

        if !result.success {
            return Err(StepwiseError::Decomposition(format!(
                "decomposer failed: {}",
                result.condensed()
            )));
        }
        Decomposition::from_text(&result.output)
    }
}
