//! The decomposition result exchanged with backends.
//!
//! ```json
//! {
//!   "multi_steps": true,
//!   "output_steps": [
//!     {"step_nr": 1, "skill_name": "calendar", "rationale": "...", "sub_query": "..."},
//!     {"step_nr": 2, "skill_name": "ideagen", "rationale": "...", "sub_query": "...", "depends_on": [1]}
//!   ]
//! }
//! ```

use crate::error::{Result, StepwiseError};
use crate::plan::Step;
use crate::skills::NO_MATCH_SKILL;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Decomposition {
    #[serde(default)]
    pub multi_steps: bool,
    #[serde(default)]
    pub output_steps: Vec<ProposedStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedStep {
    /// Backend-assigned number; `depends_on` refers to these.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_nr: Option<usize>,
    pub skill_name: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub sub_query: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<usize>,
}

impl Decomposition {
    /// The no-match outcome.
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse a backend reply. Text around the outermost `{...}` (prose, code
    /// fences) is ignored.
    pub fn from_text(text: &str) -> Result<Self> {
        let start = text.find('{');
        let end = text.rfind('}');
        let json = match (start, end) {
            (Some(s), Some(e)) if s < e => &text[s..=e],
            _ => {
                return Err(StepwiseError::Decomposition(format!(
                    "no JSON object in backend reply: {}",
                    crate::execution::preview_text(text.trim(), 200)
                )));
            }
        };
        serde_json::from_str(json)
            .map_err(|e| StepwiseError::Decomposition(format!("unparseable backend reply: {}", e)))
    }

    /// Whether this decomposition means "no skill is relevant".
    pub fn is_no_match(&self) -> bool {
        self.output_steps.is_empty()
            || self
                .output_steps
                .iter()
                .any(|s| s.skill_name.trim().eq_ignore_ascii_case(NO_MATCH_SKILL))
    }

    /// Renumber the proposed steps 1..n and resolve their dependencies.
    pub fn into_steps(self, query: &str) -> Result<Vec<Step>> {
        if self.is_no_match() {
            return Ok(Vec::new());
        }

        let mut numbering: HashMap<usize, usize> = HashMap::new();
        for (pos, proposed) in self.output_steps.iter().enumerate() {
            let nr = proposed.step_nr.unwrap_or(pos + 1);
            if numbering.insert(nr, pos + 1).is_some() {
                return Err(StepwiseError::Decomposition(format!(
                    "step_nr {} appears more than once",
                    nr
                )));
            }
        }

        let mut steps = Vec::with_capacity(self.output_steps.len());
        for (pos, proposed) in self.output_steps.into_iter().enumerate() {
            let index = pos + 1;
            let skill_name = proposed.skill_name.trim().to_string();
            if skill_name.is_empty() {
                return Err(StepwiseError::Decomposition(format!(
                    "step {} has no skill_name",
                    index
                )));
            }

            let mut depends_on = Vec::with_capacity(proposed.depends_on.len());
            for nr in &proposed.depends_on {
                match numbering.get(nr) {
                    Some(&dep) if dep < index => {
                        if !depends_on.contains(&dep) {
                            depends_on.push(dep);
                        }
                    }
                    _ => {
                        return Err(StepwiseError::Decomposition(format!(
                            "step {} depends on step {}, which does not precede it",
                            index, nr
                        )));
                    }
                }
            }
            depends_on.sort_unstable();

            let sub_query = if proposed.sub_query.trim().is_empty() {
                query.trim().to_string()
            } else {
                proposed.sub_query.trim().to_string()
            };

            steps.push(
                Step::new(index, skill_name, proposed.rationale.trim(), sub_query)
                    .with_depends_on(depends_on),
            );
        }

        Ok(steps)
    }
}
