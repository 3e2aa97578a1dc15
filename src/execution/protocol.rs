//! Request/response objects exchanged with a skill process.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Written to the child's stdin as a single JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRequest {
    pub command: String,
    pub parameters: Value,
}

/// Read from the child's stdout as a single JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillResponse {
    pub success: bool,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl SkillResponse {
    /// Parse the whole of `stdout` as exactly one response object.
    pub fn parse(stdout: &str) -> Result<Self, String> {
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Err("empty response".to_string());
        }
        serde_json::from_str(trimmed).map_err(|e| format!("response is not valid JSON: {}", e))
    }
}

/// First `max_chars` characters of `input`, noting the original size when cut.
pub fn preview_text(input: &str, max_chars: usize) -> String {
    let char_count = input.chars().count();
    if char_count <= max_chars {
        return input.to_string();
    }
    let mut preview: String = input.chars().take(max_chars).collect();
    preview.push_str(&format!("... [truncated, total_chars={}]", char_count));
    preview
}
