//! Skill registry file schema (`skills.yaml`).
//!
//! # File Format
//!
//! ```yaml
//! skills:
//!   calendar:
//!     description: "Create calendar events from natural language"
//!     entry_point: "python3 skills/calendar/main.py"
//!     command: create_event
//!     triggers: [meeting, calendar, schedule, appointment]
//!     timeout_seconds: 30
//!
//!   ideagen:
//!     description: "Brainstorm ideas"
//!     entry_point: "./skills/ideagen.sh"
//!     triggers: [ideas, brainstorm]
//!     environment:
//!       IDEAGEN_MODEL: small
//!     working_dir: skills
//!
//! defaults:
//!   command: run
//!
//! exclude: [ideagen]
//! ```
//!
//! Skills keep their file order; decomposition breaks ties by it. Relative
//! `working_dir` values resolve against the directory holding the file, and
//! a skill without one runs in that directory, so relative entry points work
//! whatever the caller's current directory is. Skills listed under `exclude`
//! are left out of decomposition but stay runnable by name.

use super::registry::{NO_MATCH_SKILL, SkillDescriptor, SkillEntry, SkillRegistry};
use crate::error::{Result, StepwiseError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_COMMAND: &str = "run";

/// Settings applied to every skill that does not override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillDefaults {
    #[serde(default = "default_command")]
    pub command: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl Default for SkillDefaults {
    fn default() -> Self {
        Self {
            command: default_command(),
            timeout_seconds: None,
        }
    }
}

fn default_command() -> String {
    DEFAULT_COMMAND.to_string()
}

/// One registered skill.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillProfile {
    #[serde(default)]
    pub description: String,

    /// Program and arguments, e.g. `python3 skills/calendar/main.py`.
    pub entry_point: String,

    /// Request `command` (falls back to `defaults.command`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Phrases that route a query clause to this skill.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

/// Raw file shape; `skills` stays a YAML mapping so file order survives.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SkillsFile {
    skills: serde_yaml::Mapping,
    defaults: SkillDefaults,
    exclude: Vec<String>,
}

/// The file-backed skill registry.
#[derive(Debug, Clone, Default)]
pub struct SkillsConfig {
    skills: Vec<(String, SkillProfile)>,
    pub defaults: SkillDefaults,
    /// Skills never offered to decomposition. They can still be run by name.
    pub exclude: HashSet<String>,
    base_dir: Option<PathBuf>,
}

impl SkillsConfig {
    /// Load the registry from a YAML file.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            StepwiseError::UserError(format!(
                "failed to read skills file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let mut config = Self::from_yaml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(Some(config))
    }

    /// Parse the registry from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: SkillsFile = serde_yaml::from_str(yaml)
            .map_err(|e| StepwiseError::UserError(format!("failed to parse skills.yaml: {}", e)))?;

        let mut config = Self {
            defaults: raw.defaults,
            exclude: raw.exclude.into_iter().collect(),
            ..Self::default()
        };
        for (key, value) in raw.skills {
            let name = key.as_str().map(str::to_string).ok_or_else(|| {
                StepwiseError::UserError(
                    "skills.yaml validation failed: skill names must be strings".to_string(),
                )
            })?;
            let profile: SkillProfile = serde_yaml::from_value(value).map_err(|e| {
                StepwiseError::UserError(format!(
                    "failed to parse skills.yaml: skill '{}': {}",
                    name, e
                ))
            })?;
            config.skills.push((name, profile));
        }

        config.validate()?;
        Ok(config)
    }

    /// Register a skill programmatically, replacing any with the same name.
    pub fn insert(&mut self, name: impl Into<String>, profile: SkillProfile) {
        let name = name.into();
        match self.skills.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = profile,
            None => self.skills.push((name, profile)),
        }
    }

    /// Validate the registry.
    ///
    /// Validation rules:
    /// - Skill names must be non-empty and not the reserved `none`
    /// - Entry points must be non-empty and split into at least one word
    /// - Timeouts, when set, must be positive
    pub fn validate(&self) -> Result<()> {
        if self.defaults.timeout_seconds == Some(0) {
            return Err(StepwiseError::UserError(
                "skills.yaml validation failed: defaults.timeout_seconds must be greater than 0"
                    .to_string(),
            ));
        }

        for (name, skill) in &self.skills {
            if name.trim().is_empty() {
                return Err(StepwiseError::UserError(
                    "skills.yaml validation failed: skill name cannot be empty".to_string(),
                ));
            }
            if name.eq_ignore_ascii_case(NO_MATCH_SKILL) {
                return Err(StepwiseError::UserError(format!(
                    "skills.yaml validation failed: '{}' is reserved and cannot name a skill",
                    NO_MATCH_SKILL
                )));
            }

            let words = shell_words::split(&skill.entry_point).map_err(|e| {
                StepwiseError::UserError(format!(
                    "skills.yaml validation failed: skill '{}' has an unparseable entry_point: {}",
                    name, e
                ))
            })?;
            if words.is_empty() {
                return Err(StepwiseError::UserError(format!(
                    "skills.yaml validation failed: skill '{}' has empty entry_point",
                    name
                )));
            }

            if skill.timeout_seconds == Some(0) {
                return Err(StepwiseError::UserError(format!(
                    "skills.yaml validation failed: skill '{}' has timeout_seconds of 0",
                    name
                )));
            }
        }

        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&SkillProfile> {
        self.skills.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Iterate over skills in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SkillProfile)> {
        self.skills.iter().map(|(n, s)| (n.as_str(), s))
    }

    fn resolve_dir(&self, dir: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if dir.is_relative() => base.join(dir),
            _ => dir.to_path_buf(),
        }
    }
}

impl SkillRegistry for SkillsConfig {
    fn resolve(&self, name: &str) -> Option<SkillEntry> {
        let skill = self.get(name)?;
        Some(SkillEntry {
            name: name.to_string(),
            entry_point: skill.entry_point.clone(),
            command: skill
                .command
                .clone()
                .unwrap_or_else(|| self.defaults.command.clone()),
            timeout: skill
                .timeout_seconds
                .or(self.defaults.timeout_seconds)
                .map(Duration::from_secs),
            environment: skill.environment.clone(),
            working_dir: skill
                .working_dir
                .as_deref()
                .map(|d| self.resolve_dir(d))
                .or_else(|| self.base_dir.clone()),
        })
    }

    fn descriptors(&self) -> Vec<SkillDescriptor> {
        self.iter()
            .filter(|(name, _)| !self.exclude.contains(*name))
            .map(|(name, skill)| SkillDescriptor {
                name: name.to_string(),
                description: skill.description.clone(),
                trigger_description: if skill.triggers.is_empty() {
                    name.to_string()
                } else {
                    skill.triggers.join(", ")
                },
            })
            .collect()
    }
}
