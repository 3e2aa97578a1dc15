//! The read-only registry seam used by decomposition and dispatch.

use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Reserved skill name meaning "no skill is relevant".
pub const NO_MATCH_SKILL: &str = "none";

/// What decomposition sees of a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillDescriptor {
    pub name: String,
    pub description: String,
    /// Comma-separated phrases that suggest this skill.
    pub trigger_description: String,
}

impl SkillDescriptor {
    /// The individual trigger phrases, lowercased and trimmed.
    pub fn trigger_phrases(&self) -> Vec<String> {
        self.trigger_description
            .split(',')
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

/// Everything needed to spawn one skill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillEntry {
    pub name: String,
    /// Command line of the skill program, split with shell quoting rules.
    pub entry_point: String,
    /// Value of `command` in the request object.
    pub command: String,
    /// Overrides the configured step timeout.
    pub timeout: Option<Duration>,
    pub environment: HashMap<String, String>,
    pub working_dir: Option<PathBuf>,
}

/// Lookup of available skills. Implementations are never mutated by the core.
pub trait SkillRegistry: Send + Sync {
    /// Resolve a skill name to its entry point, if registered.
    fn resolve(&self, name: &str) -> Option<SkillEntry>;

    /// Descriptors of every registered skill, in registry order.
    fn descriptors(&self) -> Vec<SkillDescriptor>;
}
