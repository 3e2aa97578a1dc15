//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for stepwise.
///
/// This struct represents the contents of `stepwise.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Storage
    // =========================================================================
    /// Directory holding persisted plans, relative to the workspace root.
    #[serde(default = "default_plans_dir")]
    pub plans_dir: String,

    /// Skill registry file, relative to the workspace root.
    #[serde(default = "default_skills_file")]
    pub skills_file: String,

    /// Maximum characters kept for a step result.
    #[serde(default = "default_result_max_chars")]
    pub result_max_chars: usize,

    // =========================================================================
    // Execution
    // =========================================================================
    /// Per-step timeout unless a skill overrides it.
    #[serde(default = "default_step_timeout_seconds")]
    pub step_timeout_seconds: u64,

    /// Largest skill response accepted on stdout before it counts as malformed.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,

    /// How often a running skill is checked for exit, timeout and cancellation.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    // =========================================================================
    // Decomposition
    // =========================================================================
    #[serde(default)]
    pub decomposer: DecomposerKind,

    /// Entry point of the external decomposer (used with `decomposer: command`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decomposer_command: Option<String>,

    #[serde(default = "default_decomposer_timeout_seconds")]
    pub decomposer_timeout_seconds: u64,

    /// Extra attempts after a failed decomposition call (0 or 1).
    #[serde(default = "default_decomposition_retries")]
    pub decomposition_retries: u32,

    // =========================================================================
    // Logging
    // =========================================================================
    /// Default log filter when `STEPWISE_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plans_dir: default_plans_dir(),
            skills_file: default_skills_file(),
            result_max_chars: default_result_max_chars(),
            step_timeout_seconds: default_step_timeout_seconds(),
            max_response_bytes: default_max_response_bytes(),
            poll_interval_ms: default_poll_interval_ms(),
            decomposer: DecomposerKind::default(),
            decomposer_command: None,
            decomposer_timeout_seconds: default_decomposer_timeout_seconds(),
            decomposition_retries: default_decomposition_retries(),
            log_level: default_log_level(),
        }
    }
}
