use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use tracing::debug;

use super::{Generation, GenerationError, Generator};
use crate::memory::ProjectMemory;
use crate::types::Run;

/// Memory notes included in a prompt (most recent).
const PROMPT_NOTES: usize = 20;

const SYSTEM_PROMPT: &str = "You execute one queued agent run. Reply with ONLY a JSON object: \
{\"summary\": string, \"logLines\": string[], \"nextActions\": string[], \
\"memoryPatch\": {\"notesToAdd\": string[], \"set\": object} (optional)}.";

#[derive(Debug, Clone)]
pub struct HttpGeneratorConfig {
    /// Base URL of an OpenAI-compatible API, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for HttpGeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Generator backed by a chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    client: reqwest::Client,
    config: HttpGeneratorConfig,
}

impl HttpGenerator {
    pub fn new(config: HttpGeneratorConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn user_prompt(run: &Run, memory: &ProjectMemory) -> String {
        let skip = memory.notes.len().saturating_sub(PROMPT_NOTES);
        json!({
            "run": {
                "kind": run.kind,
                "title": run.title,
                "input": run.input,
                "attempt": run.retry.attempt,
                "maxAttempts": run.retry.max_attempts,
            },
            "memory": {
                "projectId": memory.project_id,
                "notes": &memory.notes[skip..],
                "state": memory.state,
            },
        })
        .to_string()
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(
        &self,
        run: &Run,
        memory: &ProjectMemory,
    ) -> Result<Generation, GenerationError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": Self::user_prompt(run, memory)},
            ],
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(self.config.timeout)
                } else {
                    GenerationError::Http(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Service(format!(
                "{status}: {}",
                cadence_core::truncate_chars(&text, 300)
            )));
        }

        let payload: JsonValue = resp
            .json()
            .await
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .unwrap_or_default();
        if content.is_empty() {
            return Err(GenerationError::Service("empty completion".to_string()));
        }

        debug!(run_id = %run.id, chars = content.len(), "generation reply received");
        Ok(Generation::from_text(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunKind;
    use cadence_core::ProjectId;
    use serde_json::Map;

    #[test]
    fn prompt_carries_run_and_recent_notes() {
        let run = Run::new(RunKind::new("agent.seo"), "SEO", Map::new());
        let mut memory = ProjectMemory::empty(ProjectId::new("p"));
        memory.notes = (0..30).map(|i| format!("n{i}")).collect();

        let prompt: JsonValue = serde_json::from_str(&HttpGenerator::user_prompt(&run, &memory)).unwrap();
        assert_eq!(prompt["run"]["kind"], "agent.seo");
        assert_eq!(prompt["run"]["attempt"], 1);
        let notes = prompt["memory"]["notes"].as_array().unwrap();
        assert_eq!(notes.len(), PROMPT_NOTES);
        assert_eq!(notes[0], "n10");
    }
}
