//! Deterministic trigger-phrase decomposition.
//!
//! The query is split into clauses on connectors (`and then`, `then`,
//! `after that`, `and`, `;`, sentence ends). Each clause goes to the skill
//! whose trigger phrases it contains most often; ties go to the skill listed
//! first. Clauses that match nothing are dropped. A clause introduced by
//! `then` or `after that` depends on the step before it.

use super::model::{Decomposition, ProposedStep};
use super::DecompositionBackend;
use crate::error::Result;
use crate::skills::SkillDescriptor;
use regex::Regex;
use std::sync::LazyLock;

static CONNECTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[\s,]*(?:\band\s+then\b|\bafter\s+that\b|\bthen\b|\band\b|;|[.!?]+(?:\s+|$))[\s,]*")
        .expect("invalid connector regex")
});

static SEQUENTIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bthen\b|\bafter\s+that\b").expect("invalid sequence regex"));

/// A piece of the query and whether it was introduced as "do this next".
#[derive(Debug, PartialEq, Eq)]
struct Clause<'a> {
    text: &'a str,
    sequential: bool,
}

/// Trigger-phrase matching against the skill descriptors.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordBackend;

impl KeywordBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DecompositionBackend for KeywordBackend {
    fn name(&self) -> &str {
        "keyword"
    }

    fn decompose(&self, query: &str, candidates: &[SkillDescriptor]) -> Result<Decomposition> {
        let phrases: Vec<Vec<Vec<String>>> = candidates
            .iter()
            .map(|c| c.trigger_phrases().iter().map(|p| words(p)).collect())
            .collect();

        let mut output_steps: Vec<ProposedStep> = Vec::new();
        for clause in split_clauses(query) {
            let clause_words = words(clause.text);
            let Some((best, matched)) = best_match(&clause_words, &phrases) else {
                tracing::debug!(clause = clause.text, "no skill matched clause");
                continue;
            };

            let step_nr = output_steps.len() + 1;
            let depends_on = if clause.sequential && step_nr > 1 {
                vec![step_nr - 1]
            } else {
                Vec::new()
            };
            output_steps.push(ProposedStep {
                step_nr: Some(step_nr),
                skill_name: candidates[best].name.clone(),
                rationale: format!("matched trigger(s): {}", matched.join(", ")),
                sub_query: clause.text.to_string(),
                depends_on,
            });
        }

        Ok(Decomposition {
            multi_steps: output_steps.len() > 1,
            output_steps,
        })
    }
}

fn split_clauses(query: &str) -> Vec<Clause<'_>> {
    let mut clauses = Vec::new();
    let mut start = 0;
    let mut sequential = false;

    for m in CONNECTOR_RE.find_iter(query) {
        push_clause(&mut clauses, &query[start..m.start()], sequential);
        sequential = SEQUENTIAL_RE.is_match(m.as_str());
        start = m.end();
    }
    push_clause(&mut clauses, &query[start..], sequential);
    clauses
}

fn push_clause<'a>(clauses: &mut Vec<Clause<'a>>, text: &'a str, sequential: bool) {
    let text = text.trim();
    if !text.is_empty() {
        clauses.push(Clause { text, sequential });
    }
}

/// Lowercased alphanumeric words of `text`.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_phrase(haystack: &[String], phrase: &[String]) -> bool {
    !phrase.is_empty() && haystack.windows(phrase.len()).any(|w| w == phrase)
}

/// Index of the highest-scoring candidate and the phrases it matched.
/// The first candidate wins a tie; zero matches is no match.
fn best_match(clause: &[String], phrases: &[Vec<Vec<String>>]) -> Option<(usize, Vec<String>)> {
    let mut best: Option<(usize, Vec<String>)> = None;
    for (idx, candidate) in phrases.iter().enumerate() {
        let matched: Vec<String> = candidate
            .iter()
            .filter(|p| contains_phrase(clause, p))
            .map(|p| p.join(" "))
            .collect();
        let better = match &best {
            Some((_, current)) => matched.len() > current.len(),
            None => !matched.is_empty(),
        };
        if better {
            best = Some((idx, matched));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_connectors() {
        let clauses = split_clauses("Book a meeting and then draft ideas; email Bob. Call Alice");
        let texts: Vec<&str> = clauses.iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["Book a meeting", "draft ideas", "email Bob", "Call Alice"]);
        assert!(!clauses[0].sequential);
        assert!(clauses[1].sequential);
        assert!(!clauses[2].sequential);
    }

    #[test]
    fn test_after_that_is_sequential() {
        let clauses = split_clauses("schedule a call, after that brainstorm");
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].text, "schedule a call");
        assert_eq!(clauses[1].text, "brainstorm");
        assert!(clauses[1].sequential);
    }

    #[test]
    fn test_words_inside_other_words_are_not_connectors() {
        let clauses = split_clauses("understand the brand strategy");
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].text, "understand the brand strategy");
    }

    #[test]
    fn test_decimal_point_does_not_split() {
        let clauses = split_clauses("book 2.5 hours");
        assert_eq!(clauses.len(), 1);
    }

    #[test]
    fn test_phrase_matching_is_word_based() {
        let clause = words("Book a 2-hour meeting tomorrow");
        assert!(contains_phrase(&clause, &words("meeting")));
        assert!(contains_phrase(&clause, &words("2 hour")));
        assert!(!contains_phrase(&clause, &words("meet")));
        assert!(!contains_phrase(&clause, &[]));
    }
}
