//! Exit code constants for the stepwise CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, unknown plan, invalid configuration)
//! - 2: Decomposition failure (backend unreachable or unparseable)
//! - 3: Plan store failure (durable write failed or state invariant violated)
//! - 4: Lock acquisition failure (plan already owned by another writer)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, unknown plan id, or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// The request could not be decomposed into a plan.
pub const DECOMPOSITION_FAILURE: i32 = 2;

/// The plan store could not be written, or a status transition was illegal.
pub const STORE_FAILURE: i32 = 3;

/// The plan writer lock is held by another dispatcher.
pub const LOCK_FAILURE: i32 = 4;
