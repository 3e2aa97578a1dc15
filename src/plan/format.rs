//! Line-oriented text representation of a plan.
//!
//! ```text
//! === STEPWISE PLAN ===
//! @PLAN_ID:3f2c...@
//! @CREATED_AT:2026-10-19T09:00:00.123456Z@
//! @STATE:running@
//! @TOTAL_STEPS:2@
//! @QUERY:Book a meeting and then draft ideas@
//!
//! ---STEP:001---
//! @SKILL_NAME:calendar@
//! @RATIONALE:book the slot@
//! @SUB_QUERY:book a meeting@
//! Step 1 [completed]
//! @ELAPSED_MS:42@
//! @RESULT:Meeting booked@
//! ---END_STEP:001---
//! ```
//!
//! Every value sits on exactly one line; `\`, newlines, carriage returns and
//! `@` are escaped so the anchors stay greppable and parsing is exact.
//! Parsing only considers newline-terminated lines, so a file cut short
//! mid-write yields the plan as of the last complete line.

use super::{Plan, PlanState, Step, StepStatus};
use crate::error::{Result, StepwiseError};
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use std::sync::LazyLock;

const BANNER: &str = "=== STEPWISE PLAN ===";

static FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@([A-Z_]+):(.*)@$").expect("invalid field regex"));

static STEP_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^---STEP:(\d{3,})---$").expect("invalid step regex"));

static STEP_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^---END_STEP:(\d{3,})---$").expect("invalid step end regex"));

static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Step (\d+) \[(pending|in_progress|completed|failed)\]$")
        .expect("invalid status regex")
});

/// Serialize a plan to its persisted text form.
pub fn render(plan: &Plan) -> String {
    let mut out = String::new();
    out.push_str(BANNER);
    out.push('\n');
    push_field(&mut out, "PLAN_ID", &plan.id);
    push_field(
        &mut out,
        "CREATED_AT",
        &plan.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
    );
    push_field(&mut out, "STATE", plan.state.as_str());
    push_field(&mut out, "TOTAL_STEPS", &plan.steps.len().to_string());
    push_field(&mut out, "QUERY", &plan.query);

    for step in &plan.steps {
        out.push('\n');
        out.push_str(&format!("---STEP:{:03}---\n", step.index));
        push_field(&mut out, "SKILL_NAME", &step.skill_name);
        push_field(&mut out, "RATIONALE", &step.rationale);
        push_field(&mut out, "SUB_QUERY", &step.sub_query);
        if !step.depends_on.is_empty() {
            let deps: Vec<String> = step.depends_on.iter().map(|d| d.to_string()).collect();
            push_field(&mut out, "DEPENDS_ON", &deps.join(","));
        }
        out.push_str(&status_line(step.index, step.status));
        out.push('\n');
        if let Some(ms) = step.execution_time_ms {
            push_field(&mut out, "ELAPSED_MS", &ms.to_string());
        }
        if let Some(result) = &step.result {
            push_field(&mut out, "RESULT", result);
        }
        out.push_str(&format!("---END_STEP:{:03}---\n", step.index));
    }

    out
}

/// The human-readable status tag line for a step, e.g. `Step 1 [completed]`.
pub fn status_line(index: usize, status: StepStatus) -> String {
    format!("Step {} [{}]", index, status)
}

fn push_field(out: &mut String, key: &str, value: &str) {
    out.push('@');
    out.push_str(key);
    out.push(':');
    out.push_str(&escape(value));
    out.push_str("@\n");
}

/// Escape a value so it fits on one line without a bare `@`.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '@' => out.push_str("\\x40"),
            other => out.push(other),
        }
    }
    out
}

/// Reverse [`escape`]. Unknown escape sequences are kept verbatim.
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("\\\\") {
            out.push('\\');
            rest = &tail[2..];
        } else if tail.starts_with("\\n") {
            out.push('\n');
            rest = &tail[2..];
        } else if tail.starts_with("\\r") {
            out.push('\r');
            rest = &tail[2..];
        } else if tail.starts_with("\\x40") {
            out.push('@');
            rest = &tail[4..];
        } else {
            out.push('\\');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Step block being assembled while parsing.
#[derive(Default)]
struct PartialStep {
    index: usize,
    skill_name: Option<String>,
    rationale: String,
    sub_query: String,
    depends_on: Vec<usize>,
    status: Option<StepStatus>,
    result: Option<String>,
    execution_time_ms: Option<u64>,
}

impl PartialStep {
    /// A block is usable once its skill and status lines have been read.
    fn finish(self) -> Option<Step> {
        Some(Step {
            index: self.index,
            skill_name: self.skill_name?,
            rationale: self.rationale,
            sub_query: self.sub_query,
            depends_on: self.depends_on,
            status: self.status?,
            result: self.result,
            execution_time_ms: self.execution_time_ms,
        })
    }
}

/// Parse a plan from its persisted text form.
pub fn parse(content: &str) -> Result<Plan> {
    let complete = match content.rfind('\n') {
        Some(pos) => &content[..=pos],
        None => "",
    };

    let mut id = None;
    let mut created_at = None;
    let mut state = PlanState::Running;
    let mut query = None;
    let mut steps: Vec<Step> = Vec::new();
    let mut current: Option<PartialStep> = None;

    for (line_no, raw) in complete.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.is_empty() || line == BANNER {
            continue;
        }

        if let Some(caps) = STEP_START_RE.captures(line) {
            if let Some(step) = current.take().and_then(PartialStep::finish) {
                steps.push(step);
            }
            current = Some(PartialStep {
                index: parse_number(&caps[1], line_no)?,
                ..Default::default()
            });
            continue;
        }

        if STEP_END_RE.is_match(line) {
            let block = current.take().ok_or_else(|| malformed(line_no, "END_STEP without STEP"))?;
            let step = block
                .finish()
                .ok_or_else(|| malformed(line_no, "step block missing skill or status"))?;
            steps.push(step);
            continue;
        }

        if let Some(caps) = STATUS_RE.captures(line) {
            let block = current
                .as_mut()
                .ok_or_else(|| malformed(line_no, "status line outside a step block"))?;
            block.status = Some(caps[2].parse().map_err(|e: String| malformed(line_no, &e))?);
            continue;
        }

        let caps = FIELD_RE
            .captures(line)
            .ok_or_else(|| malformed(line_no, "unrecognized line"))?;
        let key = &caps[1];
        let value = unescape(&caps[2]);

        match current.as_mut() {
            Some(block) => match key {
                "SKILL_NAME" => block.skill_name = Some(value),
                "RATIONALE" => block.rationale = value,
                "SUB_QUERY" => block.sub_query = value,
                "DEPENDS_ON" => {
                    block.depends_on = value
                        .split(',')
                        .filter(|s| !s.trim().is_empty())
                        .map(|s| parse_number(s.trim(), line_no))
                        .collect::<Result<Vec<_>>>()?;
                }
                "ELAPSED_MS" => block.execution_time_ms = Some(parse_number(&value, line_no)? as u64),
                "RESULT" => block.result = Some(value),
                _ => {}
            },
            None => match key {
                "PLAN_ID" => id = Some(value),
                "CREATED_AT" => {
                    let ts = DateTime::parse_from_rfc3339(&value)
                        .map_err(|e| malformed(line_no, &format!("bad CREATED_AT: {e}")))?;
                    created_at = Some(ts.with_timezone(&Utc));
                }
                "STATE" => state = value.parse().map_err(|e: String| malformed(line_no, &e))?,
                "QUERY" => query = Some(value),
                _ => {}
            },
        }
    }

    if let Some(step) = current.take().and_then(PartialStep::finish) {
        steps.push(step);
    }

    Ok(Plan {
        id: id.ok_or_else(|| missing_header("PLAN_ID"))?,
        query: query.ok_or_else(|| missing_header("QUERY"))?,
        created_at: created_at.ok_or_else(|| missing_header("CREATED_AT"))?,
        state,
        steps,
    })
}

fn parse_number(s: &str, line_no: usize) -> Result<usize> {
    s.parse::<usize>()
        .map_err(|e| malformed(line_no, &format!("bad number '{s}': {e}")))
}

fn malformed(line_no: usize, reason: &str) -> StepwiseError {
    StepwiseError::StoreIo(format!(
        "malformed plan file at line {}: {}",
        line_no + 1,
        reason
    ))
}

fn missing_header(field: &str) -> StepwiseError {
    StepwiseError::StoreIo(format!("malformed plan file: missing @{field}@ header"))
}
