//! Sequential step execution with a one-shot self-heal.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cadence_core::{PipelineJobId, truncate_chars};
use cadence_store::RecordStore;

use crate::error::PipelineError;
use crate::job::JobStore;
use crate::runner::{StepErrorCode, StepRunner};
use crate::step::{Pipeline, StepKind, StepSpec};

pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(20);

/// Pipeline executor configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on one step call
    pub step_timeout: Duration,
    /// Skip publish steps
    pub dry_run: bool,
    /// Run optional steps
    pub optional_enabled: bool,
    /// Characters of each step body kept in the log
    pub body_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            step_timeout: DEFAULT_STEP_TIMEOUT,
            dry_run: false,
            optional_enabled: true,
            body_limit: 500,
        }
    }
}

impl PipelineConfig {
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_optional_enabled(mut self, enabled: bool) -> Self {
        self.optional_enabled = enabled;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Ok,
    Failed,
    Skipped,
}

/// One entry of the step log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLog {
    pub step: String,
    /// 1-based; 2 for a retry after remediation.
    pub attempt: u32,
    pub outcome: StepOutcome,
    pub duration_ms: u64,
    /// HTTP-style status; absent when the call never got an answer.
    pub status: Option<u16>,
    pub body: String,
    pub code: Option<String>,
}

impl StepLog {
    fn skipped(step: &str, reason: &str) -> Self {
        Self {
            step: step.to_string(),
            attempt: 1,
            outcome: StepOutcome::Skipped,
            duration_ms: 0,
            status: None,
            body: reason.to_string(),
            code: None,
        }
    }

    fn is_ok(&self) -> bool {
        self.outcome == StepOutcome::Ok
    }

    fn missing_prerequisite(&self) -> bool {
        self.code.as_deref() == Some(StepErrorCode::MissingPrerequisite.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Succeeded,
    Failed,
}

/// Result of one pipeline invocation, also stored as its job record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub job_id: PipelineJobId,
    pub subject: String,
    pub state: JobState,
    pub ok: bool,
    pub dry_run: bool,
    /// Every call made, in order
    pub steps: Vec<StepLog>,
    pub failed_step: Option<String>,
    /// Whether a remediation ran
    pub healed: bool,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct PipelineExecutor<R, S> {
    runner: R,
    jobs: JobStore<S>,
    pipeline: Pipeline,
    config: PipelineConfig,
}

impl<R, S> PipelineExecutor<R, S>
where
    R: StepRunner,
    S: RecordStore,
{
    pub fn new(runner: R, jobs: JobStore<S>, pipeline: Pipeline, config: PipelineConfig) -> Self {
        Self {
            runner,
            jobs,
            pipeline,
            config,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn jobs(&self) -> &JobStore<S> {
        &self.jobs
    }

    /// Run every step for `subject`, stopping at the first failure.
    pub async fn run(&self, subject: &str) -> Result<PipelineReport, PipelineError> {
        let subject = subject.trim();
        if subject.is_empty() || subject.contains('/') {
            return Err(PipelineError::InvalidSubject(subject.to_string()));
        }

        let now = Utc::now();
        let mut report = PipelineReport {
            job_id: PipelineJobId::new(),
            subject: subject.to_string(),
            state: JobState::Running,
            ok: false,
            dry_run: self.config.dry_run,
            steps: Vec::new(),
            failed_step: None,
            healed: false,
            started_at: now,
            updated_at: now,
        };
        self.jobs.start(&report)?;

        for spec in self.pipeline.steps() {
            if spec.kind == StepKind::Optional && !self.config.optional_enabled {
                self.record(&mut report, StepLog::skipped(&spec.name, "optional steps disabled"));
                continue;
            }
            if spec.kind == StepKind::Publish && self.config.dry_run {
                self.record(&mut report, StepLog::skipped(&spec.name, "dry run"));
                continue;
            }

            if !self.run_step(subject, spec, &mut report).await {
                report.failed_step = Some(spec.name.clone());
                self.finish(&mut report, JobState::Failed);
                warn!(subject, job_id = %report.job_id, step = %spec.name, "pipeline aborted");
                return Ok(report);
            }
        }

        self.finish(&mut report, JobState::Succeeded);
        info!(
            subject,
            job_id = %report.job_id,
            healed = report.healed,
            steps = report.steps.len(),
            "pipeline finished"
        );
        Ok(report)
    }

    /// Append a step log and write the job snapshot.
    fn record(&self, report: &mut PipelineReport, log: StepLog) {
        report.steps.push(log);
        self.checkpoint(report);
    }

    fn finish(&self, report: &mut PipelineReport, state: JobState) {
        report.state = state;
        report.ok = state == JobState::Succeeded;
        self.checkpoint(report);
    }

    /// A failed write is logged; the invocation carries on.
    fn checkpoint(&self, report: &mut PipelineReport) {
        report.updated_at = Utc::now();
        if let Err(e) = self.jobs.save(report) {
            warn!(job_id = %report.job_id, error = %e, "could not store pipeline job");
        }
    }

    /// Call one step, healing it at most once per invocation. Returns whether
    /// the step ended up succeeding.
    async fn run_step(&self, subject: &str, spec: &StepSpec, report: &mut PipelineReport) -> bool {
        let first = self.call(subject, &spec.name, 1).await;
        let heal_with = match &spec.remediation {
            Some(remediation) if !first.is_ok() && first.missing_prerequisite() && !report.healed => {
                Some(remediation.clone())
            }
            _ => None,
        };
        let ok = first.is_ok();
        self.record(report, first);

        let Some(remediation) = heal_with else {
            return ok;
        };

        info!(subject, step = %spec.name, %remediation, "missing prerequisite, running remediation");
        report.healed = true;
        let fix = self.call(subject, &remediation, 1).await;
        let fixed = fix.is_ok();
        self.record(report, fix);
        if !fixed {
            warn!(subject, %remediation, "remediation failed");
            return false;
        }

        let retry = self.call(subject, &spec.name, 2).await;
        let ok = retry.is_ok();
        self.record(report, retry);
        ok
    }

    async fn call(&self, subject: &str, step: &str, attempt: u32) -> StepLog {
        let started = Instant::now();
        let result =
            tokio::time::timeout(self.config.step_timeout, self.runner.call(subject, step)).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let (outcome, status, body, code) = match result {
            Err(_) => (
                StepOutcome::Failed,
                None,
                format!("timed out after {:?}", self.config.step_timeout),
                None,
            ),
            Ok(Err(e)) => (StepOutcome::Failed, None, e.to_string(), None),
            Ok(Ok(resp)) => {
                let outcome = if resp.is_success() {
                    StepOutcome::Ok
                } else {
                    StepOutcome::Failed
                };
                (
                    outcome,
                    Some(resp.status),
                    resp.body,
                    resp.code.map(|c| c.as_str().to_string()),
                )
            }
        };

        if outcome == StepOutcome::Failed {
            warn!(subject, step, attempt, ?status, "step failed");
        }

        StepLog {
            step: step.to_string(),
            attempt,
            outcome,
            duration_ms,
            status,
            body: truncate_chars(&body, self.config.body_limit),
            code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use cadence_store::InMemoryRecordStore;

    use crate::runner::{StepCallError, StepResponse};

    type Reply = Result<StepResponse, StepCallError>;

    /// Per-step scripted answers; unscripted calls succeed.
    #[derive(Default)]
    struct ScriptedRunner {
        replies: Mutex<HashMap<String, VecDeque<Reply>>>,
        slow: Option<(String, Duration)>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        fn script(self, step: &str, reply: Reply) -> Self {
            self.replies
                .lock()
                .unwrap()
                .entry(step.to_string())
                .or_default()
                .push_back(reply);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StepRunner for ScriptedRunner {
        async fn call(&self, _subject: &str, step: &str) -> Reply {
            self.calls.lock().unwrap().push(step.to_string());
            if let Some((slow_step, delay)) = &self.slow {
                if slow_step == step {
                    tokio::time::sleep(*delay).await;
                }
            }
            let scripted = self
                .replies
                .lock()
                .unwrap()
                .get_mut(step)
                .and_then(VecDeque::pop_front);
            scripted.unwrap_or_else(|| Ok(StepResponse::ok(format!("{step} ok"))))
        }
    }

    fn missing_prerequisite() -> Reply {
        Ok(StepResponse::failed(
            404,
            Some(StepErrorCode::MissingPrerequisite),
            r#"{"code":"missing_prerequisite","error":"No draft spec found"}"#,
        ))
    }

    fn two_steps() -> Pipeline {
        Pipeline::new(vec![
            StepSpec::required("a"),
            StepSpec::publish("b").with_remediation("r"),
        ])
        .unwrap()
    }

    fn executor(
        runner: ScriptedRunner,
        pipeline: Pipeline,
        config: PipelineConfig,
    ) -> (
        PipelineExecutor<Arc<ScriptedRunner>, Arc<InMemoryRecordStore>>,
        Arc<ScriptedRunner>,
    ) {
        let runner = Arc::new(runner);
        let jobs = JobStore::new(InMemoryRecordStore::arc());
        (PipelineExecutor::new(runner.clone(), jobs, pipeline, config), runner)
    }

    fn trace(report: &PipelineReport) -> Vec<(String, u32, StepOutcome)> {
        report
            .steps
            .iter()
            .map(|s| (s.step.clone(), s.attempt, s.outcome))
            .collect()
    }

    #[tokio::test]
    async fn all_steps_pass_in_order() {
        let (exec, runner) = executor(
            ScriptedRunner::default(),
            Pipeline::site_launch(),
            PipelineConfig::default(),
        );

        let report = exec.run("acme").await.unwrap();
        assert!(report.ok);
        assert!(!report.healed);
        assert_eq!(runner.calls(), vec!["audit", "seo", "conversion", "finish", "publish"]);
    }

    #[tokio::test]
    async fn missing_prerequisite_heals_once() {
        let (exec, runner) = executor(
            ScriptedRunner::default().script("b", missing_prerequisite()),
            two_steps(),
            PipelineConfig::default(),
        );

        let report = exec.run("acme").await.unwrap();
        assert!(report.ok);
        assert!(report.healed);
        assert_eq!(
            trace(&report),
            vec![
                ("a".into(), 1, StepOutcome::Ok),
                ("b".into(), 1, StepOutcome::Failed),
                ("r".into(), 1, StepOutcome::Ok),
                ("b".into(), 2, StepOutcome::Ok),
            ]
        );
        assert_eq!(report.steps[1].code.as_deref(), Some("missing_prerequisite"));
        assert_eq!(runner.calls(), vec!["a", "b", "r", "b"]);
    }

    #[tokio::test]
    async fn retry_failure_is_terminal() {
        let (exec, runner) = executor(
            ScriptedRunner::default()
                .script("b", missing_prerequisite())
                .script("b", missing_prerequisite()),
            two_steps(),
            PipelineConfig::default(),
        );

        let report = exec.run("acme").await.unwrap();
        assert!(!report.ok);
        assert_eq!(report.failed_step.as_deref(), Some("b"));
        // no second remediation
        assert_eq!(runner.calls(), vec!["a", "b", "r", "b"]);
    }

    #[tokio::test]
    async fn other_failures_do_not_heal() {
        let (exec, runner) = executor(
            ScriptedRunner::default().script(
                "b",
                Ok(StepResponse::failed(500, None, "boom")),
            ),
            two_steps(),
            PipelineConfig::default(),
        );

        let report = exec.run("acme").await.unwrap();
        assert!(!report.ok);
        assert!(!report.healed);
        assert_eq!(runner.calls(), vec!["a", "b"]);
        assert_eq!(report.steps[1].status, Some(500));
    }

    #[tokio::test]
    async fn failing_remediation_aborts() {
        let (exec, runner) = executor(
            ScriptedRunner::default()
                .script("b", missing_prerequisite())
                .script("r", Ok(StepResponse::failed(502, None, "bad gateway"))),
            two_steps(),
            PipelineConfig::default(),
        );

        let report = exec.run("acme").await.unwrap();
        assert!(!report.ok);
        assert_eq!(report.failed_step.as_deref(), Some("b"));
        assert_eq!(runner.calls(), vec!["a", "b", "r"]);
    }

    #[tokio::test]
    async fn early_failure_returns_partial_log() {
        let (exec, runner) = executor(
            ScriptedRunner::default().script("seo", Err(StepCallError::Transport("refused".into()))),
            Pipeline::site_launch(),
            PipelineConfig::default(),
        );

        let report = exec.run("acme").await.unwrap();
        assert!(!report.ok);
        assert_eq!(report.failed_step.as_deref(), Some("seo"));
        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.steps[1].status, None);
        assert!(report.steps[1].body.contains("refused"));
        assert_eq!(runner.calls(), vec!["audit", "seo"]);
    }

    #[tokio::test]
    async fn dry_run_skips_publish_and_disabled_optional_is_skipped() {
        let (exec, runner) = executor(
            ScriptedRunner::default(),
            Pipeline::site_launch(),
            PipelineConfig::default()
                .with_dry_run(true)
                .with_optional_enabled(false),
        );

        let report = exec.run("acme").await.unwrap();
        assert!(report.ok);
        assert!(report.dry_run);
        assert_eq!(runner.calls(), vec!["audit", "seo", "conversion"]);
        assert_eq!(report.steps[3].outcome, StepOutcome::Skipped);
        assert_eq!(report.steps[4].outcome, StepOutcome::Skipped);
    }

    #[tokio::test]
    async fn step_timeout_aborts() {
        let runner = ScriptedRunner {
            slow: Some(("seo".into(), Duration::from_millis(200))),
            ..Default::default()
        };
        let (exec, _) = executor(
            runner,
            Pipeline::site_launch(),
            PipelineConfig::default().with_step_timeout(Duration::from_millis(20)),
        );

        let report = exec.run("acme").await.unwrap();
        assert!(!report.ok);
        assert_eq!(report.failed_step.as_deref(), Some("seo"));
        assert!(report.steps[1].body.starts_with("timed out"));
    }

    #[tokio::test]
    async fn bodies_are_truncated() {
        let (exec, _) = executor(
            ScriptedRunner::default().script("a", Ok(StepResponse::ok("y".repeat(2000)))),
            two_steps(),
            PipelineConfig::default(),
        );

        let report = exec.run("acme").await.unwrap();
        assert_eq!(report.steps[0].body.chars().count(), 500);
    }

    #[tokio::test]
    async fn rejects_blank_subject() {
        let (exec, runner) = executor(
            ScriptedRunner::default(),
            two_steps(),
            PipelineConfig::default(),
        );
        assert!(matches!(
            exec.run("  ").await,
            Err(PipelineError::InvalidSubject(_))
        ));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn finished_job_is_stored_as_the_subject_last_job() {
        let (exec, _) = executor(
            ScriptedRunner::default().script("b", missing_prerequisite()),
            two_steps(),
            PipelineConfig::default(),
        );

        let first = exec.run("acme").await.unwrap();
        assert_eq!(first.state, JobState::Succeeded);
        assert_eq!(exec.jobs().get(first.job_id).unwrap(), Some(first.clone()));

        let second = exec.run("acme").await.unwrap();
        assert_ne!(second.job_id, first.job_id);
        let last = exec.jobs().last_for("acme").unwrap().unwrap();
        assert_eq!(last.job_id, second.job_id);
        assert!(exec.jobs().last_for("other").unwrap().is_none());

        // the earlier job is still readable by id
        let stored = exec.jobs().get(first.job_id).unwrap().unwrap();
        assert_eq!(stored.steps.len(), 4);
        assert!(stored.healed);
    }

    #[tokio::test]
    async fn failed_job_is_stored_as_failed() {
        let (exec, _) = executor(
            ScriptedRunner::default().script("a", Ok(StepResponse::failed(500, None, "boom"))),
            two_steps(),
            PipelineConfig::default(),
        );

        let report = exec.run("acme").await.unwrap();
        let stored = exec.jobs().last_for("acme").unwrap().unwrap();
        assert_eq!(stored.state, JobState::Failed);
        assert!(!stored.ok);
        assert_eq!(stored.failed_step.as_deref(), Some("a"));
        assert_eq!(stored, report);
    }

    /// Reads the stored job while the second step is in flight.
    struct PeekingRunner {
        jobs: JobStore<Arc<InMemoryRecordStore>>,
        seen: Mutex<Option<PipelineReport>>,
    }

    #[async_trait]
    impl StepRunner for PeekingRunner {
        async fn call(&self, subject: &str, step: &str) -> Reply {
            if step == "b" {
                *self.seen.lock().unwrap() = self.jobs.last_for(subject).unwrap();
            }
            Ok(StepResponse::ok(format!("{step} ok")))
        }
    }

    #[tokio::test]
    async fn running_job_shows_steps_so_far() {
        let backend = InMemoryRecordStore::arc();
        let runner = Arc::new(PeekingRunner {
            jobs: JobStore::new(backend.clone()),
            seen: Mutex::new(None),
        });
        let exec = PipelineExecutor::new(
            runner.clone(),
            JobStore::new(backend),
            two_steps(),
            PipelineConfig::default(),
        );

        exec.run("acme").await.unwrap();

        let seen = runner.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.state, JobState::Running);
        assert_eq!(seen.steps.len(), 1);
        assert_eq!(seen.steps[0].step, "a");
    }
}
