//! RAII lock guard implementation.

use std::fs;
use std::path::{Path, PathBuf};

/// RAII guard for a lock file.
///
/// When dropped, the lock file is deleted. A failed deletion is logged but
/// never panics.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    pub(super) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release lock");
        }
    }
}
