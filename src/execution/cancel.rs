//! Plan-level cancellation signal.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag, optionally backed by a request file so another
/// process can cancel too.
///
/// Once observed, cancellation latches: it never turns back off.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    request_file: Option<PathBuf>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also fires when `path` appears on disk.
    pub fn with_request_file(path: impl Into<PathBuf>) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            request_file: Some(path.into()),
        }
    }

    /// Request cancellation. Returns `true` only for the first request.
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        if let Some(path) = &self.request_file
            && path.exists()
        {
            self.flag.store(true, Ordering::SeqCst);
            return true;
        }
        false
    }

    pub fn request_file(&self) -> Option<&Path> {
        self.request_file.as_deref()
    }
}
