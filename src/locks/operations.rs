//! Plan lock acquisition and inspection.

use super::guard::LockGuard;
use super::metadata::LockMetadata;
use crate::error::{Result, StepwiseError};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Path of the writer lock for `plan_id` inside `plans_dir`.
pub fn plan_lock_path(plans_dir: &Path, plan_id: &str) -> PathBuf {
    plans_dir.join(format!("{}.lock", plan_id))
}

/// Create a lock file exclusively; fails with `LockError` if it exists.
fn acquire_lock(lock_path: &Path, metadata: &LockMetadata) -> Result<LockGuard> {
    if let Some(parent) = lock_path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            StepwiseError::LockError(format!(
                "failed to create lock directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                let holder = match LockMetadata::from_file(lock_path) {
                    Ok(meta) => format!(
                        "\nLock: {} (created {} ago by {}, pid {:?})\nAction: {}",
                        lock_path.display(),
                        meta.age_string(),
                        meta.owner,
                        meta.pid,
                        meta.action
                    ),
                    Err(_) => format!("\nLock: {}", lock_path.display()),
                };
                StepwiseError::LockError(format!("plan is owned by another writer{}", holder))
            } else {
                StepwiseError::LockError(format!(
                    "failed to acquire lock '{}': {}",
                    lock_path.display(),
                    e
                ))
            }
        })?;

    let json = metadata.to_json()?;
    file.write_all(json.as_bytes()).map_err(|e| {
        let _ = fs::remove_file(lock_path);
        StepwiseError::LockError(format!("failed to write lock metadata: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(lock_path);
        StepwiseError::LockError(format!("failed to sync lock file: {}", e))
    })?;

    Ok(LockGuard::new(lock_path.to_path_buf()))
}

/// Claim exclusive write ownership of a plan.
pub fn acquire_plan_lock(plans_dir: &Path, plan_id: &str, action: &str) -> Result<LockGuard> {
    acquire_lock(
        &plan_lock_path(plans_dir, plan_id),
        &LockMetadata::new(action),
    )
}

/// Metadata of the current writer of a plan, if one holds the lock.
pub fn read_plan_lock(plans_dir: &Path, plan_id: &str) -> Option<LockMetadata> {
    let path = plan_lock_path(plans_dir, plan_id);
    if !path.exists() {
        return None;
    }
    LockMetadata::from_file(path).ok()
}
