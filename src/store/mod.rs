//! Durable plan storage.
//!
//! Each plan lives in `<plans_dir>/<plan_id>.plan` using the text form in
//! [`crate::plan::format`]. A [`PlanStore`] is the single writer for one
//! plan id; it holds `<plan_id>.lock` for its whole lifetime and rewrites the
//! plan file atomically on every change. Readers ([`read_snapshot`],
//! [`list_plans`]) never take the lock and always see a complete file.

mod reader;
mod writer;


pub use reader::{PlanSummary, find_plans_by_query, list_plans, read_snapshot};
pub use writer::{PlanStore, TRUNCATION_MARKER, condense};

use crate::error::{Result, StepwiseError};
use std::path::{Path, PathBuf};

/// File extension of persisted plans.
pub const PLAN_EXTENSION: &str = "plan";

/// Path of the persisted plan file for `plan_id`.
pub fn plan_path(plans_dir: &Path, plan_id: &str) -> PathBuf {
    plans_dir.join(format!("{}.{}", plan_id, PLAN_EXTENSION))
}

/// Path of the cancellation request file for `plan_id`.
pub fn cancel_request_path(plans_dir: &Path, plan_id: &str) -> PathBuf {
    plans_dir.join(format!("{}.cancel", plan_id))
}

/// Plan ids become file names, so they must not contain path syntax.
pub fn validate_plan_id(plan_id: &str) -> Result<()> {
    let ok = !plan_id.is_empty()
        && plan_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StepwiseError::UserError(format!(
            "invalid plan id '{}': expected letters, digits, '-' or '_'",
            plan_id
        )))
    }
}
