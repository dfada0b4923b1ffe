//! Run records and the retry policy applied to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use cadence_core::{ProjectId, RunId};

/// Attempts a run gets before it is terminally failed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// What a run should do (routing tag, e.g. `agent.seo`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunKind(String);

impl RunKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RunKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Waiting in the queue
    Queued,
    /// Dequeued by a tick and executing
    Running,
    /// Finished with output
    Succeeded,
    /// Exhausted its attempts
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }
}

/// Attempt counter kept beside (not inside) the free-form input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryState {
    /// Current attempt, 1-based.
    pub attempt: u32,
    pub max_attempts: u32,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 1,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Whether another attempt is allowed after the current one fails.
    pub fn can_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// Outcome of recording a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Back to `queued` with the bumped attempt; caller re-enqueues.
    Requeue { next_attempt: u32 },
    /// Terminally failed.
    GiveUp,
}

/// Output persisted on a succeeded run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub summary: String,
    pub next_actions: Vec<String>,
    pub project_id: ProjectId,
    pub finished_at: DateTime<Utc>,
}

/// One unit of queued agent work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub kind: RunKind,
    pub title: String,
    /// Free-form input handed to the generation service.
    pub input: Map<String, JsonValue>,
    pub status: RunStatus,
    pub retry: RetryState,
    /// Present only when succeeded.
    pub output: Option<RunOutput>,
    /// Last error; present after a failed attempt.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Run {
    /// Create a new queued run on its first attempt.
    pub fn new(kind: RunKind, title: impl Into<String>, input: Map<String, JsonValue>) -> Self {
        let now = Utc::now();
        Self {
            id: RunId::new(),
            kind,
            title: title.into(),
            input,
            status: RunStatus::Queued,
            retry: RetryState::default(),
            output: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry = RetryState::new(max_attempts);
        self
    }

    /// Project whose memory this run reads and patches.
    ///
    /// Falls back from an explicit project id to a repository name to
    /// [`ProjectId::DEFAULT`]. Blank strings are ignored.
    pub fn project_id(&self) -> ProjectId {
        ["projectId", "project_id", "repo", "repository"]
            .iter()
            .filter_map(|k| self.input.get(*k).and_then(JsonValue::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(ProjectId::new)
            .unwrap_or_else(ProjectId::default_project)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Mark run as running.
    pub fn mark_running(&mut self, now: DateTime<Utc>) {
        self.status = RunStatus::Running;
        self.started_at = Some(now);
        self.updated_at = now;
    }

    /// Mark run as succeeded.
    pub fn mark_succeeded(&mut self, output: RunOutput, now: DateTime<Utc>) {
        self.status = RunStatus::Succeeded;
        self.finished_at = Some(output.finished_at);
        self.output = Some(output);
        self.error = None;
        self.updated_at = now;
    }

    /// Record a failed attempt and decide between requeue and giving up.
    pub fn record_failure(&mut self, error: String, now: DateTime<Utc>) -> RetryDecision {
        self.output = None;
        self.error = Some(error);
        self.updated_at = now;

        if self.retry.can_retry() {
            self.retry.attempt += 1;
            self.status = RunStatus::Queued;
            RetryDecision::Requeue {
                next_attempt: self.retry.attempt,
            }
        } else {
            self.status = RunStatus::Failed;
            self.finished_at = Some(now);
            RetryDecision::GiveUp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn output() -> RunOutput {
        RunOutput {
            summary: "done".into(),
            next_actions: vec![],
            project_id: ProjectId::default_project(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn new_run_is_queued_on_first_attempt() {
        let run = Run::new(RunKind::new("agent.seo"), "SEO pass", Map::new());
        assert_eq!(run.status, RunStatus::Queued);
        assert_eq!(run.retry.attempt, 1);
        assert_eq!(run.retry.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert!(run.output.is_none());
    }

    #[test]
    fn project_id_fallback_chain() {
        let kind = RunKind::new("k");

        let run = Run::new(kind.clone(), "t", input(json!({"projectId": "p1", "repo": "r"})));
        assert_eq!(run.project_id().as_str(), "p1");

        let run = Run::new(kind.clone(), "t", input(json!({"projectId": "  ", "repo": "acme/site"})));
        assert_eq!(run.project_id().as_str(), "acme/site");

        let run = Run::new(kind.clone(), "t", input(json!({"repository": "mono"})));
        assert_eq!(run.project_id().as_str(), "mono");

        let run = Run::new(kind, "t", input(json!({"projectId": 7})));
        assert_eq!(run.project_id().as_str(), ProjectId::DEFAULT);
    }

    #[test]
    fn failure_requeues_then_gives_up() {
        let mut run = Run::new(RunKind::new("k"), "t", Map::new());
        let now = Utc::now();

        run.mark_running(now);
        assert_eq!(
            run.record_failure("boom".into(), now),
            RetryDecision::Requeue { next_attempt: 2 }
        );
        assert_eq!(run.status, RunStatus::Queued);
        assert_eq!(run.error.as_deref(), Some("boom"));

        run.mark_running(now);
        assert_eq!(run.record_failure("boom again".into(), now), RetryDecision::GiveUp);
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.retry.attempt, run.retry.max_attempts);
        assert!(run.is_terminal());
    }

    #[test]
    fn success_clears_previous_error() {
        let mut run = Run::new(RunKind::new("k"), "t", Map::new());
        let now = Utc::now();
        run.mark_running(now);
        run.record_failure("transient".into(), now);

        run.mark_running(now);
        run.mark_succeeded(output(), now);
        assert_eq!(run.status, RunStatus::Succeeded);
        assert!(run.error.is_none());
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn max_attempts_is_at_least_one() {
        let mut run = Run::new(RunKind::new("k"), "t", Map::new()).with_max_attempts(0);
        assert_eq!(run.retry.max_attempts, 1);
        assert_eq!(run.record_failure("x".into(), Utc::now()), RetryDecision::GiveUp);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: whatever the outcome sequence, attempts stay bounded and
            /// a failed run always used every attempt.
            #[test]
            fn attempt_bound_holds(
                max_attempts in 1u32..6,
                outcomes in proptest::collection::vec(any::<bool>(), 0..12)
            ) {
                let mut run = Run::new(RunKind::new("k"), "t", Map::new())
                    .with_max_attempts(max_attempts);
                let mut last_attempt = run.retry.attempt;

                for succeeded in outcomes {
                    if run.is_terminal() {
                        break;
                    }
                    let now = Utc::now();
                    run.mark_running(now);
                    if succeeded {
                        run.mark_succeeded(output(), now);
                    } else {
                        run.record_failure("err".into(), now);
                    }

                    prop_assert!(run.retry.attempt >= last_attempt);
                    prop_assert!(run.retry.attempt <= run.retry.max_attempts);
                    last_attempt = run.retry.attempt;
                }

                if run.status == RunStatus::Failed {
                    prop_assert_eq!(run.retry.attempt, run.retry.max_attempts);
                }
            }
        }
    }
}
