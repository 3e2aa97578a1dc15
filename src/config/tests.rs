//! Tests for config functionality.

use crate::config::{Config, DecomposerKind};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.plans_dir, ".stepwise/plans");
    assert_eq!(config.skills_file, "skills.yaml");
    assert_eq!(config.step_timeout_seconds, 60);
    assert_eq!(config.result_max_chars, 512);
    assert_eq!(config.max_response_bytes, 64 * 1024);
    assert_eq!(config.poll_interval_ms, 25);
    assert_eq!(config.decomposition_retries, 1);
    assert_eq!(config.decomposer, DecomposerKind::Keyword);
    assert!(config.decomposer_command.is_none());
    assert_eq!(config.log_level, "info");
    config.validate().unwrap();
}

#[test]
fn test_parse_empty_yaml() {
    let config = Config::from_yaml("").unwrap();
    assert_eq!(config.step_timeout_seconds, 60);
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
step_timeout_seconds: 5
plans_dir: state/plans
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.step_timeout(), Duration::from_secs(5));
    assert_eq!(config.plans_dir, "state/plans");

    // Unspecified values should use defaults
    assert_eq!(config.result_max_chars, 512);
    assert_eq!(config.decomposer, DecomposerKind::Keyword);
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
plans_dir: plans
skills_file: registry.yaml
result_max_chars: 256
step_timeout_seconds: 30
max_response_bytes: 4096
poll_interval_ms: 10
decomposer: command
decomposer_command: "python3 decompose.py"
decomposer_timeout_seconds: 20
decomposition_retries: 0
log_level: debug
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.skills_file, "registry.yaml");
    assert_eq!(config.result_max_chars, 256);
    assert_eq!(config.max_response_bytes, 4096);
    assert_eq!(config.poll_interval(), Duration::from_millis(10));
    assert_eq!(config.decomposer, DecomposerKind::Command);
    assert_eq!(config.decomposer_command.as_deref(), Some("python3 decompose.py"));
    assert_eq!(config.decomposer_timeout(), Duration::from_secs(20));
    assert_eq!(config.decomposition_retries, 0);
    assert_eq!(config.log_level, "debug");
}

#[test]
fn test_unknown_fields_ignored() {
    let yaml = r#"
step_timeout_seconds: 9
future_setting: true
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.step_timeout_seconds, 9);
}

#[test]
fn test_validation_rejects_zero_timeout() {
    let err = Config::from_yaml("step_timeout_seconds: 0").unwrap_err();
    assert!(err.to_string().contains("step_timeout_seconds"));
}

#[test]
fn test_validation_rejects_second_retry() {
    let err = Config::from_yaml("decomposition_retries: 2").unwrap_err();
    assert!(err.to_string().contains("decomposition_retries"));
}

#[test]
fn test_validation_rejects_tiny_result_bound() {
    assert!(Config::from_yaml("result_max_chars: 4").is_err());
}

#[test]
fn test_validation_rejects_bad_poll_interval() {
    assert!(Config::from_yaml("poll_interval_ms: 0").is_err());
    assert!(Config::from_yaml("poll_interval_ms: 5000").is_err());
}

#[test]
fn test_command_decomposer_needs_command() {
    let err = Config::from_yaml("decomposer: command").unwrap_err();
    assert!(err.to_string().contains("decomposer_command"));

    assert!(Config::from_yaml("decomposer: command\ndecomposer_command: \"  \"").is_err());
}

#[test]
fn test_invalid_enum_value() {
    assert!(Config::from_yaml("decomposer: llm").is_err());
}

#[test]
fn test_yaml_round_trip() {
    let config = Config::default();
    let yaml = config.to_yaml().unwrap();
    let parsed = Config::from_yaml(&yaml).unwrap();
    assert_eq!(parsed.plans_dir, config.plans_dir);
    assert_eq!(parsed.step_timeout_seconds, config.step_timeout_seconds);
}

#[test]
fn test_load_or_default_missing_file() {
    let temp = TempDir::new().unwrap();
    let config = Config::load_or_default(temp.path().join("stepwise.yaml")).unwrap();
    assert_eq!(config.step_timeout_seconds, 60);
}

#[test]
fn test_load_from_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("stepwise.yaml");
    std::fs::write(&path, "result_max_chars: 100\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.result_max_chars, 100);
}

#[test]
fn test_exec_limits_follow_config() {
    let config = Config::from_yaml("max_response_bytes: 1024\npoll_interval_ms: 10\n").unwrap();
    let limits = config.exec_limits();
    assert_eq!(limits.max_response_bytes, 1024);
    assert_eq!(limits.poll_interval, std::time::Duration::from_millis(10));
}
