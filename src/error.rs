//! Error types for stepwise.
//!
//! Uses thiserror for derive macros. Per-step failures (unknown skill,
//! timeout, malformed response) are normally recovered by the dispatcher and
//! recorded as a `failed` step; only store and invariant errors are fatal.

use crate::exit_codes;
use crate::plan::StepStatus;
use thiserror::Error;

/// Main error type for stepwise operations.
#[derive(Error, Debug)]
pub enum StepwiseError {
    /// The decomposition backend was unreachable or returned an unparseable result.
    #[error("decomposition failed: {0}")]
    Decomposition(String),

    /// The skill registry has no entry for the requested skill.
    #[error("unknown skill '{0}'")]
    UnknownSkill(String),

    /// A skill process exceeded its time bound and was killed.
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// A skill process produced non-conforming or oversized output.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A status change that is not the single legal next state.
    #[error("invalid transition for step {index}: {from} -> {to}")]
    InvalidTransition {
        index: usize,
        from: StepStatus,
        to: StepStatus,
    },

    /// The plan store was asked for an update that breaks its bookkeeping,
    /// such as a result with no terminal transition before it.
    #[error("plan store invariant violated: {0}")]
    InvariantViolation(String),

    /// A durable plan write or read failed.
    #[error("plan store I/O failed: {0}")]
    StoreIo(String),

    /// Invalid arguments, configuration or state supplied by the user.
    #[error("{0}")]
    UserError(String),

    /// A plan id that does not exist in the plans directory.
    #[error("plan '{0}' not found")]
    NotFound(String),

    /// The plan writer lock could not be acquired.
    #[error("lock acquisition failed: {0}")]
    LockError(String),
}

impl StepwiseError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            StepwiseError::Decomposition(_) => exit_codes::DECOMPOSITION_FAILURE,
            StepwiseError::InvalidTransition { .. }
            | StepwiseError::InvariantViolation(_)
            | StepwiseError::StoreIo(_) => exit_codes::STORE_FAILURE,
            StepwiseError::LockError(_) => exit_codes::LOCK_FAILURE,
            StepwiseError::UnknownSkill(_)
            | StepwiseError::Timeout(_)
            | StepwiseError::MalformedResponse(_)
            | StepwiseError::UserError(_)
            | StepwiseError::NotFound(_) => exit_codes::USER_ERROR,
        }
    }

    /// Whether this error must halt the dispatcher rather than fail a single step.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StepwiseError::InvalidTransition { .. }
                | StepwiseError::InvariantViolation(_)
                | StepwiseError::StoreIo(_)
        )
    }
}

/// Result type alias for stepwise operations.
pub type Result<T> = std::result::Result<T, StepwiseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposition_error_has_correct_exit_code() {
        let err = StepwiseError::Decomposition("backend unreachable".to_string());
        assert_eq!(err.exit_code(), exit_codes::DECOMPOSITION_FAILURE);
    }

    #[test]
    fn store_errors_are_fatal() {
        let err = StepwiseError::StoreIo("disk full".to_string());
        assert!(err.is_fatal());
        assert_eq!(err.exit_code(), exit_codes::STORE_FAILURE);

        let err = StepwiseError::InvalidTransition {
            index: 2,
            from: StepStatus::Completed,
            to: StepStatus::InProgress,
        };
        assert!(err.is_fatal());
        assert_eq!(err.exit_code(), exit_codes::STORE_FAILURE);

        let err = StepwiseError::InvariantViolation("result without transition".to_string());
        assert!(err.is_fatal());
        assert_eq!(err.exit_code(), exit_codes::STORE_FAILURE);
        assert_eq!(
            err.to_string(),
            "plan store invariant violated: result without transition"
        );
    }

    #[test]
    fn step_errors_are_not_fatal() {
        assert!(!StepwiseError::UnknownSkill("x".to_string()).is_fatal());
        assert!(!StepwiseError::Timeout(10).is_fatal());
        assert!(!StepwiseError::MalformedResponse("bad".to_string()).is_fatal());
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = StepwiseError::UnknownSkill("nonexistent".to_string());
        assert_eq!(err.to_string(), "unknown skill 'nonexistent'");

        let err = StepwiseError::InvalidTransition {
            index: 1,
            from: StepStatus::Pending,
            to: StepStatus::Completed,
        };
        assert_eq!(
            err.to_string(),
            "invalid transition for step 1: pending -> completed"
        );

        let err = StepwiseError::LockError("held".to_string());
        assert_eq!(err.exit_code(), exit_codes::LOCK_FAILURE);
    }
}
