//! Enum types and default value functions for config.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which decomposition backend turns a query into steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DecomposerKind {
    /// Built-in trigger-phrase matching against the skill registry.
    #[default]
    Keyword,
    /// An external program speaking the skill protocol.
    Command,
}

impl DecomposerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecomposerKind::Keyword => "keyword",
            DecomposerKind::Command => "command",
        }
    }
}

impl fmt::Display for DecomposerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn default_plans_dir() -> String {
    ".stepwise/plans".to_string()
}

pub(crate) fn default_skills_file() -> String {
    "skills.yaml".to_string()
}

pub(crate) fn default_step_timeout_seconds() -> u64 {
    60
}

pub(crate) fn default_result_max_chars() -> usize {
    512
}

pub(crate) fn default_max_response_bytes() -> usize {
    64 * 1024
}

pub(crate) fn default_poll_interval_ms() -> u64 {
    25
}

pub(crate) fn default_decomposition_retries() -> u32 {
    1
}

pub(crate) fn default_decomposer_timeout_seconds() -> u64 {
    60
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
