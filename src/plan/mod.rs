//! Plan and step model for stepwise.
//!
//! A [`Plan`] is the ordered record of one decomposed request. Its step
//! sequence is fixed at creation; only each step's status, result and
//! elapsed time change afterwards, and only forward:
//!
//! ```text
//! pending -> in_progress -> completed
//!                        \-> failed
//! ```
//!
//! The persisted text form lives in [`format`].

pub mod format;


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StepStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [StepStatus; 4] = [
        StepStatus::Pending,
        StepStatus::InProgress,
        StepStatus::Completed,
        StepStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }

    /// Whether the step has finished (successfully or not).
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }

    /// Whether `next` is the legal successor of this status.
    pub fn can_transition_to(&self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::InProgress)
                | (StepStatus::InProgress, StepStatus::Completed)
                | (StepStatus::InProgress, StepStatus::Failed)
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StepStatus::Pending),
            "in_progress" => Ok(StepStatus::InProgress),
            "completed" => Ok(StepStatus::Completed),
            "failed" => Ok(StepStatus::Failed),
            _ => Err(format!("invalid step status: {s}")),
        }
    }
}

/// Dispatcher-level state of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanState {
    /// Steps are still being dispatched (or have not started).
    Running,
    /// Every step reached a terminal status.
    Completed,
    /// The dispatcher was cancelled or halted on a fatal error.
    Aborted,
}

impl PlanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanState::Running => "running",
            PlanState::Completed => "completed",
            PlanState::Aborted => "aborted",
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self, PlanState::Running)
    }
}

impl fmt::Display for PlanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(PlanState::Running),
            "completed" => Ok(PlanState::Completed),
            "aborted" => Ok(PlanState::Aborted),
            _ => Err(format!("invalid plan state: {s}")),
        }
    }
}

/// One unit of work within a plan, bound to exactly one skill invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based position in the plan.
    pub index: usize,

    /// Registry lookup key of the skill that runs this step.
    pub skill_name: String,

    /// Short justification produced by decomposition.
    pub rationale: String,

    /// Parameter payload handed to the skill.
    pub sub_query: String,

    /// Earlier step indices whose results this step needs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<usize>,

    pub status: StepStatus,

    /// Condensed outcome, set once the step is terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    /// Wall time of the step, set once the step is terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

impl Step {
    /// Create a pending step.
    pub fn new(
        index: usize,
        skill_name: impl Into<String>,
        rationale: impl Into<String>,
        sub_query: impl Into<String>,
    ) -> Self {
        Self {
            index,
            skill_name: skill_name.into(),
            rationale: rationale.into(),
            sub_query: sub_query.into(),
            depends_on: Vec::new(),
            status: StepStatus::Pending,
            result: None,
            execution_time_ms: None,
        }
    }

    /// Declare the earlier steps this step depends on.
    pub fn with_depends_on(mut self, depends_on: Vec<usize>) -> Self {
        self.depends_on = depends_on;
        self
    }
}

/// The ordered, persisted record of one decomposed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub query: String,
    pub created_at: DateTime<Utc>,
    pub state: PlanState,
    pub steps: Vec<Step>,
}

impl Plan {
    /// Create a plan with a fresh id and the current timestamp.
    pub fn new(query: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            query: query.into(),
            created_at: Utc::now(),
            state: PlanState::Running,
            steps,
        }
    }

    /// Look up a step by its 1-based index.
    pub fn step(&self, index: usize) -> Option<&Step> {
        index.checked_sub(1).and_then(|i| self.steps.get(i))
    }

    pub(crate) fn step_mut(&mut self, index: usize) -> Option<&mut Step> {
        index.checked_sub(1).and_then(|i| self.steps.get_mut(i))
    }

    /// Number of steps currently in `status`.
    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    /// Whether every step has reached a terminal status.
    pub fn all_terminal(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_terminal())
    }

    /// A decomposition that matched no skill produces a plan with no steps.
    pub fn is_no_match(&self) -> bool {
        self.steps.is_empty()
    }
}
