//! Single-writer locking for plans.
//!
//! Each plan has at most one writer (the dispatcher that owns it). Ownership
//! is claimed by creating `<plan_id>.lock` next to the plan file with
//! **create_new** semantics, so a second writer for the same id fails
//! instead of interleaving updates.
//!
//! The lock file holds JSON metadata:
//! - `owner`: who holds the lock (e.g., `user@HOST`)
//! - `pid`: the process ID (optional)
//! - `created_at`: RFC3339 timestamp
//! - `action`: what the holder is doing (e.g., `dispatch`)
//!
//! Locks are released by an RAII [`LockGuard`] when it is dropped.

mod guard;
mod metadata;
mod operations;


pub use guard::LockGuard;
pub use metadata::LockMetadata;
pub use operations::{acquire_plan_lock, plan_lock_path, read_plan_lock};
