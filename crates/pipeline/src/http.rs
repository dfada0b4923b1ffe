//! HTTP step runner: `POST {base}/api/projects/{subject}/{step}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::runner::{StepCallError, StepErrorCode, StepResponse, StepRunner};

#[derive(Debug, Clone)]
pub struct HttpStepRunner {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpStepRunner {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StepCallError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StepCallError::Transport(format!("invalid base url {base_url:?}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StepCallError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    fn step_url(&self, subject: &str, step: &str) -> Result<Url, StepCallError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                StepCallError::Transport(format!("base url cannot hold a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["api", "projects", subject, step]);
        Ok(url)
    }
}

/// The `code` field of a JSON error body, if any.
fn error_code(body: &str) -> Option<StepErrorCode> {
    let value: JsonValue = serde_json::from_str(body).ok()?;
    value.get("code")?.as_str().map(StepErrorCode::parse)
}

#[async_trait]
impl StepRunner for HttpStepRunner {
    async fn call(&self, subject: &str, step: &str) -> Result<StepResponse, StepCallError> {
        let url = self.step_url(subject, step)?;
        debug!(%url, step, "calling step");

        let resp = self
            .client
            .post(url)
            .header("x-internal-trigger", "pipeline")
            .header("x-internal-step", step)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StepCallError::Timeout(self.timeout)
                } else {
                    StepCallError::Transport(e.to_string())
                }
            })?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| StepCallError::Transport(e.to_string()))?;
        let code = if (200..300).contains(&status) {
            None
        } else {
            error_code(&body)
        };

        Ok(StepResponse { status, body, code })
    }
}
