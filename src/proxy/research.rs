//! Research request shaping and response parsing
//!
//! The model is asked for a JSON array of findings, but its output format
//! is not a contract. Parsing must never fail: anything that isn't the
//! expected JSON degrades to the blank-line splitter below.

use crate::gateway::ChatMessage;
use serde::{Deserialize, Serialize};

/// Sampling temperature for research calls
pub const TEMPERATURE: f32 = 0.7;

/// Cap on findings returned to the caller
pub const MAX_FINDINGS: usize = 5;

const SYSTEM_PROMPT: &str = "You are a research assistant. Provide comprehensive, \
well-structured information about the topic. Format your response as a JSON array of \
results with 'title', 'snippet' fields. Each result should be a different aspect or \
key finding about the topic.";

/// One research result record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    pub snippet: String,
}

/// Conversation sent to the gateway for a research query
pub fn request_messages(query: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Research this topic and provide 3-5 key findings or aspects: {}",
            query
        )),
    ]
}

/// Shape the model's raw text into findings.
///
/// JSON array first; on any parse failure, split on blank lines and take
/// at most the first [`MAX_FINDINGS`] non-empty segments as synthesized
/// findings. The heuristic path is the floor, not an error.
pub fn parse_findings(raw: &str) -> Vec<Finding> {
    if let Ok(findings) = serde_json::from_str::<Vec<Finding>>(raw) {
        return findings;
    }

    raw.split("\n\n")
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .take(MAX_FINDINGS)
        .enumerate()
        .map(|(index, segment)| Finding {
            title: format!("Finding {}", index + 1),
            snippet: segment.to_string(),
        })
        .collect()
}
