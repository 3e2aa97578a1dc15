//! Query decomposition.
//!
//! The [`Decomposer`] turns a query plus the candidate skill descriptors into
//! a [`Plan`]. The actual mapping is delegated to a
//! [`DecompositionBackend`]; the decomposer validates inputs, applies the
//! bounded retry and turns the backend's [`Decomposition`] into steps.
//!
//! Backends:
//! - [`KeywordBackend`]: deterministic trigger-phrase matching
//! - [`CommandBackend`]: an external program speaking the skill protocol

mod command;
mod keyword;
mod model;


pub use command::{CommandBackend, DECOMPOSE_COMMAND};
pub use keyword::KeywordBackend;
pub use model::{Decomposition, ProposedStep};

use crate::error::{Result, StepwiseError};
use crate::plan::Plan;
use crate::skills::SkillDescriptor;
use std::collections::HashSet;

/// The generative (or heuristic) mapping from a query to proposed steps.
pub trait DecompositionBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Propose steps for `query`. Unreachable backends and unparseable
    /// replies are `StepwiseError::Decomposition`.
    fn decompose(&self, query: &str, candidates: &[SkillDescriptor]) -> Result<Decomposition>;
}

/// Validating front end over a [`DecompositionBackend`].
pub struct Decomposer {
    backend: Box<dyn DecompositionBackend>,
    retries: u32,
}

impl Decomposer {
    /// `retries` is capped at 1.
    pub fn new(backend: Box<dyn DecompositionBackend>, retries: u32) -> Self {
        Self {
            backend,
            retries: retries.min(1),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Decompose `query` into a fresh plan.
    ///
    /// A plan with zero steps is the no-match outcome: no candidate skill is
    /// relevant and the caller should fall back to a non-orchestrated path.
    pub fn decompose(&self, query: &str, candidates: &[SkillDescriptor]) -> Result<Plan> {
        if query.trim().is_empty() {
            return Err(StepwiseError::UserError("query must not be empty".to_string()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = candidates.iter().find(|c| !seen.insert(c.name.as_str())) {
            return Err(StepwiseError::UserError(format!(
                "duplicate skill descriptor '{}'",
                dup.name
            )));
        }

        let mut attempt = 0;
        loop {
            let outcome = self
                .backend
                .decompose(query, candidates)
                .and_then(|d| d.into_steps(query));
            match outcome {
                Ok(steps) => {
                    let plan = Plan::new(query, steps);
                    tracing::info!(
                        plan_id = %plan.id,
                        backend = self.backend.name(),
                        steps = plan.steps.len(),
                        "query decomposed"
                    );
                    return Ok(plan);
                }
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(backend = self.backend.name(), error = %e, "decomposition failed, retrying once");
                }
                Err(e) => {
                    return Err(match e {
                        StepwiseError::Decomposition(_) => e,
                        other => StepwiseError::Decomposition(other.to_string()),
                    });
                }
            }
        }
    }
}
