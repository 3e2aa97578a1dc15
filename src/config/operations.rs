//! Config loading, validation, and utility operations.

use super::model::Config;
use super::types::DecomposerKind;
use crate::error::{Result, StepwiseError};
use crate::execution::ExecLimits;
use crate::store::TRUNCATION_MARKER;
use std::path::Path;
use std::time::Duration;

/// Polling slower than this would make cancellation feel unresponsive.
const MAX_POLL_INTERVAL_MS: u64 = 1000;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(StepwiseError::UserError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            StepwiseError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from a YAML file, falling back to defaults if it does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml).map_err(|e| {
            StepwiseError::UserError(format!("failed to parse stepwise.yaml: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            StepwiseError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - timeouts, `max_response_bytes` and `poll_interval_ms` must be positive
    /// - `poll_interval_ms` must not exceed one second
    /// - `result_max_chars` must leave room for the truncation marker
    /// - `decomposition_retries` is at most 1
    /// - `decomposer: command` needs a non-empty `decomposer_command`
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: String) -> StepwiseError {
            StepwiseError::UserError(format!("config validation failed: {}", msg))
        }

        if self.step_timeout_seconds == 0 {
            return Err(invalid(
                "step_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.decomposer_timeout_seconds == 0 {
            return Err(invalid(
                "decomposer_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.max_response_bytes == 0 {
            return Err(invalid("max_response_bytes must be greater than 0".to_string()));
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(invalid(format!(
                "poll_interval_ms must be between 1 and {} (found {})",
                MAX_POLL_INTERVAL_MS, self.poll_interval_ms
            )));
        }

        let min_chars = TRUNCATION_MARKER.chars().count() + 1;
        if self.result_max_chars < min_chars {
            return Err(invalid(format!(
                "result_max_chars must be at least {} (found {})",
                min_chars, self.result_max_chars
            )));
        }

        if self.decomposition_retries > 1 {
            return Err(invalid(format!(
                "decomposition_retries must be 0 or 1 (found {})",
                self.decomposition_retries
            )));
        }

        if self.decomposer == DecomposerKind::Command
            && self
                .decomposer_command
                .as_deref()
                .is_none_or(|c| c.trim().is_empty())
        {
            return Err(invalid(
                "decomposer: command requires a non-empty decomposer_command".to_string(),
            ));
        }

        if self.plans_dir.trim().is_empty() {
            return Err(invalid("plans_dir must be non-empty".to_string()));
        }

        Ok(())
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_seconds)
    }

    pub fn decomposer_timeout(&self) -> Duration {
        Duration::from_secs(self.decomposer_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Bounds for every skill (and decomposer) invocation.
    pub fn exec_limits(&self) -> ExecLimits {
        ExecLimits {
            max_response_bytes: self.max_response_bytes,
            poll_interval: self.poll_interval(),
        }
    }
}
