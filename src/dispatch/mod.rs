//! Sequential step dispatch.
//!
//! The [`Dispatcher`] walks a plan's steps in order and drives each through
//! `pending -> in_progress -> completed|failed`, writing every transition to
//! the [`PlanStore`](crate::store::PlanStore) before moving on. Per-step
//! failures are recorded and never stop the walk; only store and invariant
//! errors do.
//!
//! Halt policy: a step that depends on a failed step is failed with
//! `skipped: dependency failed` without being invoked. Independent steps
//! still run.
//!
//! Cancellation: the in-flight step is killed and failed with `cancelled`,
//! every remaining step is failed with `cancelled: plan aborted`, and the
//! plan ends `aborted`.

mod executor;
mod runner;

#[cfg(test)]
mod tests;

pub use executor::{ProcessExecutor, StepExecutor};
pub use runner::{
    CANCELLED_RESULT, DispatchSettings, Dispatcher, PLAN_ABORTED_RESULT, SKIPPED_RESULT,
};
