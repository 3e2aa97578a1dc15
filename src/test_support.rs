//! Shared fixtures for unit tests: fake skill scripts and workspaces.

use crate::skills::{SkillEntry, SkillProfile, SkillsConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// Write an executable `sh` script named `name` into `dir`.
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}

/// A skill that consumes its request and answers with `output`.
pub(crate) fn ok_skill(dir: &Path, name: &str, output: &str) -> PathBuf {
    write_script(
        dir,
        &format!("{}.sh", name),
        &format!(
            "cat >/dev/null\nprintf '%s' '{{\"success\":true,\"output\":\"{}\",\"error\":null}}'",
            output
        ),
    )
}

/// A skill that consumes its request and reports a failure.
pub(crate) fn failing_skill(dir: &Path, name: &str, error: &str) -> PathBuf {
    write_script(
        dir,
        &format!("{}.sh", name),
        &format!(
            "cat >/dev/null\nprintf '%s' '{{\"success\":false,\"output\":\"\",\"error\":\"{}\"}}'",
            error
        ),
    )
}

/// A skill that replies with its own request, so tests can inspect parameters.
pub(crate) fn echo_request_skill(dir: &Path, name: &str) -> PathBuf {
    write_script(
        dir,
        &format!("{}.sh", name),
        "req=$(cat | tr -d '\\n' | sed 's/\\\\/\\\\\\\\/g; s/\"/\\\\\"/g')\nprintf '{\"success\":true,\"output\":\"%s\"}' \"$req\"",
    )
}

/// A skill that never answers in time.
pub(crate) fn sleeping_skill(dir: &Path, name: &str, seconds: u32) -> PathBuf {
    write_script(
        dir,
        &format!("{}.sh", name),
        &format!("exec sleep {}", seconds),
    )
}

pub(crate) fn entry_for(name: &str, script: &Path) -> SkillEntry {
    SkillEntry {
        name: name.to_string(),
        entry_point: shell_words::quote(&script.to_string_lossy()).into_owned(),
        command: "run".to_string(),
        timeout: None,
        environment: HashMap::new(),
        working_dir: None,
    }
}

pub(crate) fn profile_for(script: &Path, triggers: &[&str]) -> SkillProfile {
    SkillProfile {
        description: format!("test skill at {}", script.display()),
        entry_point: shell_words::quote(&script.to_string_lossy()).into_owned(),
        triggers: triggers.iter().map(|t| t.to_string()).collect(),
        ..Default::default()
    }
}

/// A registry with `calendar` and `ideagen` skills that both succeed.
pub(crate) fn calendar_and_ideagen(dir: &Path) -> SkillsConfig {
    let calendar = ok_skill(dir, "calendar", "Meeting booked: 09:00-11:00");
    let ideagen = ok_skill(dir, "ideagen", "5 ideas drafted");

    let mut skills = SkillsConfig::default();
    skills.insert(
        "calendar",
        profile_for(&calendar, &["meeting", "calendar", "schedule"]),
    );
    skills.insert("ideagen", profile_for(&ideagen, &["ideas", "brainstorm"]));
    skills
}
