//! Isolated skill execution.
//!
//! Every step runs in its own child process. The orchestrator writes one
//! JSON request to the child's stdin and reads one JSON response from its
//! stdout:
//!
//! ```text
//! -> {"command": "run", "parameters": {"query": "...", ...}}
//! <- {"success": true, "output": "Meeting booked", "error": null}
//! ```
//!
//! A crash, non-zero exit, oversized or malformed response, timeout or
//! cancellation all come back as a failed [`ExecutionResult`]; none of them
//! propagate as an error. Only a child that cannot be spawned at all is an
//! `Err`.

mod cancel;
mod protocol;
mod unit;


pub use cancel::CancelToken;
pub use protocol::{SkillRequest, SkillResponse, preview_text};
pub use unit::{ExecLimits, ExecutionResult, FailureKind, execute};
