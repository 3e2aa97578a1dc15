//! Atomic file replacement.
//!
//! Every write follows the same pattern:
//! 1. Write content to a temporary file in the same directory
//! 2. Sync the file to disk (fsync)
//! 3. Rename it over the target
//!
//! `rename()` replaces the destination atomically when source and target are
//! on the same filesystem, which is why the temp file is a sibling of the
//! target (`.{filename}.tmp`). On crash, that temp file may remain behind and
//! is overwritten by the next write.

use crate::error::{Result, StepwiseError};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file.
///
/// The target is never observable in a partial state: readers see either the
/// old content or the new content. The data is synced before this returns.
///
/// # Example
///
/// ```no_run
/// use stepwise::fs::atomic_write;
/// use std::path::Path;
///
/// atomic_write(Path::new(".stepwise/plans/abc.plan"), b"=== STEPWISE PLAN ===\n")?;
/// # Ok::<(), stepwise::error::StepwiseError>(())
/// ```
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            StepwiseError::StoreIo(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content)?;
    atomic_replace(&temp_path, path)?;

    Ok(())
}

/// Atomically write a string to a file.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

fn generate_temp_path(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            StepwiseError::StoreIo(format!("invalid file path '{}'", target.display()))
        })?;

    Ok(parent.join(format!(".{}.tmp", filename)))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        StepwiseError::StoreIo(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        StepwiseError::StoreIo(format!("failed to write temporary file: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        StepwiseError::StoreIo(format!("failed to sync temporary file to disk: {}", e))
    })?;

    Ok(())
}

fn atomic_replace(source: &Path, target: &Path) -> Result<()> {
    fs::rename(source, target).map_err(|e| {
        let _ = fs::remove_file(source);
        StepwiseError::StoreIo(format!(
            "failed to atomically replace '{}': {}",
            target.display(),
            e
        ))
    })?;

    // Persist the directory entry as well; best effort on platforms that
    // cannot open directories.
    #[cfg(unix)]
    {
        if let Some(parent) = target.parent()
            && let Ok(dir) = File::open(parent)
        {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}
