//! Generation collaborator boundary.
//!
//! The service either answers with the structured shape below or with text
//! that does not parse. Both are successful calls; only an `Err` counts as a
//! failed attempt.

mod http;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::memory::{MemoryPatch, ProjectMemory};
use crate::types::Run;

pub use http::{HttpGenerator, HttpGeneratorConfig};

/// Structured answer of the generation service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredResult {
    pub summary: String,
    #[serde(default, alias = "logLines")]
    pub log_lines: Vec<String>,
    #[serde(default, alias = "nextActions")]
    pub next_actions: Vec<String>,
    #[serde(default, alias = "memoryPatch")]
    pub memory_patch: Option<MemoryPatch>,
}

/// What a generation call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Parsed(StructuredResult),
    Unparsed { raw_text: String },
}

impl Generation {
    /// Interpret a model reply, tolerating a surrounding markdown code fence.
    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str::<StructuredResult>(strip_code_fence(text)) {
            Ok(result) => Generation::Parsed(result),
            Err(_) => Generation::Unparsed {
                raw_text: text.to_string(),
            },
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string ("json") on the opening line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation request failed: {0}")]
    Http(String),

    #[error("generation service error: {0}")]
    Service(String),
}

/// Text-generation service.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        run: &Run,
        memory: &ProjectMemory,
    ) -> Result<Generation, GenerationError>;
}

#[async_trait]
impl<T: Generator + ?Sized> Generator for Arc<T> {
    async fn generate(
        &self,
        run: &Run,
        memory: &ProjectMemory,
    ) -> Result<Generation, GenerationError> {
        (**self).generate(run, memory).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_structured_reply() {
        let text = r#"{"summary":"ok","logLines":["a","b"],"nextActions":["ship"],
            "memoryPatch":{"notesToAdd":["n"],"set":{"k":1}}}"#;
        let Generation::Parsed(result) = Generation::from_text(text) else {
            panic!("expected parsed result");
        };
        assert_eq!(result.summary, "ok");
        assert_eq!(result.log_lines, vec!["a", "b"]);
        assert_eq!(result.next_actions, vec!["ship"]);
        assert_eq!(result.memory_patch.unwrap().notes_to_add, vec!["n"]);
    }

    #[test]
    fn parses_fenced_reply() {
        let text = "```json\n{\"summary\":\"fenced\"}\n```";
        assert!(matches!(
            Generation::from_text(text),
            Generation::Parsed(StructuredResult { ref summary, .. }) if summary == "fenced"
        ));
    }

    #[test]
    fn prose_is_unparsed_not_an_error() {
        let text = "Sure! Here is what I did today.";
        assert_eq!(
            Generation::from_text(text),
            Generation::Unparsed {
                raw_text: text.to_string()
            }
        );
    }

    #[test]
    fn json_without_summary_is_unparsed() {
        assert!(matches!(
            Generation::from_text(r#"{"files": []}"#),
            Generation::Unparsed { .. }
        ));
    }
}
