//! Remote step collaborator boundary.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable failure reason reported by a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepErrorCode {
    /// The step needs another step's output that does not exist yet.
    MissingPrerequisite,
    Other(String),
}

impl StepErrorCode {
    pub fn parse(code: &str) -> Self {
        match code.trim() {
            "missing_prerequisite" => StepErrorCode::MissingPrerequisite,
            other => StepErrorCode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StepErrorCode::MissingPrerequisite => "missing_prerequisite",
            StepErrorCode::Other(code) => code,
        }
    }
}

/// What a step answered. Any status is a response; only transport
/// problems are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResponse {
    pub status: u16,
    pub body: String,
    pub code: Option<StepErrorCode>,
}

impl StepResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            code: None,
        }
    }

    pub fn failed(status: u16, code: Option<StepErrorCode>, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            code,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Error)]
pub enum StepCallError {
    #[error("step timed out after {0:?}")]
    Timeout(Duration),

    #[error("step request failed: {0}")]
    Transport(String),
}

/// Calls one named step for a subject.
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn call(&self, subject: &str, step: &str) -> Result<StepResponse, StepCallError>;
}

#[async_trait]
impl<T: StepRunner + ?Sized> StepRunner for Arc<T> {
    async fn call(&self, subject: &str, step: &str) -> Result<StepResponse, StepCallError> {
        (**self).call(subject, step).await
    }
}
