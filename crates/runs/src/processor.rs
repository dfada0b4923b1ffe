//! Tick handler that drains a bounded batch of queued runs.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, error, info, warn};

use cadence_core::{RunId, truncate_chars};
use cadence_store::RecordStore;

use crate::error::RunError;
use crate::generation::{Generation, GenerationError, Generator};
use crate::memory::ProjectMemoryStore;
use crate::queue::RunQueue;
use crate::store::RunStore;
use crate::types::{DEFAULT_MAX_ATTEMPTS, RetryDecision, Run, RunKind, RunOutput};

/// Generation log lines copied into the run log.
const MAX_LOG_LINES: usize = 30;

/// Characters of unstructured output kept in the run log.
const RAW_TEXT_LIMIT: usize = 1500;

/// Run processor configuration.
#[derive(Debug, Clone)]
pub struct RunProcessorConfig {
    /// Runs dequeued per tick
    pub max_per_tick: usize,
    /// Attempts given to newly submitted runs
    pub max_attempts: u32,
    /// Upper bound on one generation call
    pub generation_timeout: Duration,
    /// Name for logging
    pub name: String,
}

impl Default for RunProcessorConfig {
    fn default() -> Self {
        Self {
            max_per_tick: 2,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            generation_timeout: Duration::from_secs(60),
            name: "run-processor".to_string(),
        }
    }
}

impl RunProcessorConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_max_per_tick(mut self, max: usize) -> Self {
        self.max_per_tick = max;
        self
    }

    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }
}

/// Counters for one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub dequeued: usize,
    pub succeeded: usize,
    pub requeued: usize,
    pub failed: usize,
    /// Missing or already-terminal runs
    pub skipped: usize,
    /// Runs whose bookkeeping hit a store error; their ids are re-enqueued
    pub store_errors: usize,
}

enum Outcome {
    Succeeded,
    Requeued,
    Failed,
    Skipped,
    StoreError,
}

/// Executes queued runs against a [`Generator`].
///
/// There is no background loop: each [`tick`](Self::tick) processes at most
/// `max_per_tick` runs and returns.
pub struct RunProcessor<S, G> {
    runs: RunStore<S>,
    queue: RunQueue<S>,
    memory: ProjectMemoryStore<S>,
    generator: G,
    config: RunProcessorConfig,
}

impl<S, G> RunProcessor<S, G>
where
    S: RecordStore + Clone,
    G: Generator,
{
    pub fn new(store: S, generator: G, config: RunProcessorConfig) -> Self {
        Self {
            runs: RunStore::new(store.clone()),
            queue: RunQueue::new(store.clone()),
            memory: ProjectMemoryStore::new(store),
            generator,
            config,
        }
    }

    pub fn runs(&self) -> &RunStore<S> {
        &self.runs
    }

    pub fn queue(&self) -> &RunQueue<S> {
        &self.queue
    }

    pub fn memory(&self) -> &ProjectMemoryStore<S> {
        &self.memory
    }

    /// Create a queued run and put it on the queue.
    pub fn submit(
        &self,
        kind: RunKind,
        title: impl Into<String>,
        input: Map<String, JsonValue>,
    ) -> Result<Run, RunError> {
        let run = Run::new(kind, title, input).with_max_attempts(self.config.max_attempts);
        self.runs.save(&run)?;
        self.runs.append_log(run.id, run.created_at, "queued")?;
        self.queue.enqueue(run.id)?;

        info!(processor = %self.config.name, run_id = %run.id, kind = %run.kind, "run submitted");
        Ok(run)
    }

    /// Process up to `max_per_tick` queued runs.
    ///
    /// A store error while working on one run is recorded against that run
    /// and the tick moves on; only a failing dequeue ends the tick early.
    pub async fn tick(&self) -> Result<TickReport, RunError> {
        let mut report = TickReport::default();

        for _ in 0..self.config.max_per_tick {
            let Some(id) = self.queue.dequeue()? else {
                break;
            };
            report.dequeued += 1;

            match self.process(id).await {
                Outcome::Succeeded => report.succeeded += 1,
                Outcome::Requeued => report.requeued += 1,
                Outcome::Failed => report.failed += 1,
                Outcome::Skipped => report.skipped += 1,
                Outcome::StoreError => report.store_errors += 1,
            }
        }

        if report.store_errors > 0 {
            warn!(processor = %self.config.name, ?report, "tick finished with store errors");
        } else {
            debug!(processor = %self.config.name, ?report, "tick finished");
        }
        Ok(report)
    }

    async fn process(&self, id: RunId) -> Outcome {
        let mut run = match self.runs.get(id) {
            Ok(Some(run)) => run,
            Ok(None) => {
                warn!(processor = %self.config.name, run_id = %id, "dequeued run not found");
                return Outcome::Skipped;
            }
            Err(e) => {
                warn!(processor = %self.config.name, run_id = %id, error = %e, "could not load run");
                self.requeue(id);
                return Outcome::StoreError;
            }
        };
        if run.is_terminal() {
            warn!(run_id = %id, status = ?run.status, "skipping terminal run");
            return Outcome::Skipped;
        }

        match self.attempt(&mut run).await {
            Ok(()) => {
                info!(run_id = %id, "run succeeded");
                Outcome::Succeeded
            }
            Err(e) => self.fail(&mut run, e),
        }
    }

    /// Claim, execute and store the successful result.
    ///
    /// `run` only takes the succeeded state once it has been written.
    async fn attempt(&self, run: &mut Run) -> Result<(), RunError> {
        let id = run.id;
        let now = Utc::now();
        run.mark_running(now);
        self.runs.save(run)?;
        self.runs.append_log(
            id,
            now,
            &format!("claimed (attempt {}/{})", run.retry.attempt, run.retry.max_attempts),
        )?;
        debug!(
            processor = %self.config.name,
            run_id = %id,
            kind = %run.kind,
            attempt = run.retry.attempt,
            "claimed run"
        );

        let output = self.execute(run).await?;

        let now = Utc::now();
        let mut done = run.clone();
        done.mark_succeeded(output, now);
        self.runs.save(&done)?;
        *run = done;

        if let Err(e) = self.runs.append_log(id, now, "succeeded") {
            warn!(run_id = %id, error = %e, "could not log run success");
        }
        Ok(())
    }

    fn fail(&self, run: &mut Run, error: RunError) -> Outcome {
        let id = run.id;
        let now = Utc::now();
        let decision = run.record_failure(error.to_string(), now);

        let recorded = self
            .runs
            .save(run)
            .and_then(|()| self.runs.append_log(id, now, &format!("error: {error}")));
        if let Err(store_err) = recorded {
            // The stored record may still say `running`; keep the id queued
            // so a later tick picks it up again.
            warn!(run_id = %id, error = %error, store_error = %store_err, "could not record run failure");
            self.requeue(id);
            return Outcome::StoreError;
        }

        match decision {
            RetryDecision::Requeue { next_attempt } => {
                if !self.requeue(id) {
                    return Outcome::StoreError;
                }
                warn!(run_id = %id, next_attempt, error = %error, "run failed, requeued");
                Outcome::Requeued
            }
            RetryDecision::GiveUp => {
                warn!(run_id = %id, error = %error, "run failed permanently");
                Outcome::Failed
            }
        }
    }

    fn requeue(&self, id: RunId) -> bool {
        match self.queue.enqueue(id) {
            Ok(()) => true,
            Err(e) => {
                error!(run_id = %id, error = %e, "could not re-enqueue run");
                false
            }
        }
    }

    async fn execute(&self, run: &Run) -> Result<RunOutput, RunError> {
        let project_id = run.project_id();
        let mut memory = self.memory.load(&project_id)?;

        let timeout = self.config.generation_timeout;
        let generation = tokio::time::timeout(timeout, self.generator.generate(run, &memory))
            .await
            .map_err(|_| GenerationError::Timeout(timeout))??;

        let now = Utc::now();
        let (summary, next_actions) = match generation {
            Generation::Parsed(result) => {
                for line in result.log_lines.iter().take(MAX_LOG_LINES) {
                    self.runs.append_log(run.id, now, line)?;
                }
                if let Some(patch) = result.memory_patch.as_ref().filter(|p| !p.is_empty()) {
                    memory.apply(patch, now);
                    self.memory.save(&memory)?;
                }
                (result.summary, result.next_actions)
            }
            Generation::Unparsed { raw_text } => {
                let raw = truncate_chars(&raw_text, RAW_TEXT_LIMIT);
                self.runs.append_log(run.id, now, &raw)?;
                (raw, Vec::new())
            }
        };

        Ok(RunOutput {
            summary,
            next_actions,
            project_id,
            finished_at: now,
        })
    }
}
