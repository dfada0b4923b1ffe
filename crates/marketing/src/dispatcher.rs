//! Tick handler that publishes due schedule entries.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use cadence_core::DomainError;
use cadence_store::RecordStore;

use crate::error::{MarketingError, PublishError};
use crate::publisher::Publisher;
use crate::store::MarketingStore;
use crate::types::{ContentStatus, PostLog, PostStatus, ScheduleEntry};

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Entries handled per tick
    pub batch_size: usize,
    /// Upper bound on one publish call
    pub publish_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            publish_timeout: Duration::from_secs(30),
        }
    }
}

impl DispatcherConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    pub ran_at: DateTime<Utc>,
    pub attempted: usize,
    pub posted: usize,
    pub failed: usize,
    /// Entries whose failure could not be written; they stay due
    pub store_errors: usize,
    pub logs: Vec<PostLog>,
}

pub struct ScheduleDispatcher<S, P> {
    store: MarketingStore<S>,
    publisher: P,
    config: DispatcherConfig,
}

impl<S, P> ScheduleDispatcher<S, P>
where
    S: RecordStore,
    P: Publisher,
{
    pub fn new(store: MarketingStore<S>, publisher: P, config: DispatcherConfig) -> Self {
        Self {
            store,
            publisher,
            config,
        }
    }

    pub fn store(&self) -> &MarketingStore<S> {
        &self.store
    }

    /// Publish up to `batch_size` entries due at `now`, earliest first.
    ///
    /// One entry failing, store errors included, does not stop the rest.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<DispatchReport, MarketingError> {
        let due: Vec<ScheduleEntry> = self
            .store
            .list_schedules()?
            .into_iter()
            .filter(|e| e.is_due(now))
            .take(self.config.batch_size)
            .collect();

        let mut report = DispatchReport {
            ran_at: Utc::now(),
            attempted: 0,
            posted: 0,
            failed: 0,
            store_errors: 0,
            logs: Vec::new(),
        };

        for mut entry in due {
            report.attempted += 1;
            match self.dispatch(&mut entry).await {
                Ok(log) => {
                    match log.status {
                        PostStatus::Posted => report.posted += 1,
                        PostStatus::Failed => report.failed += 1,
                    }
                    report.logs.push(log);
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(schedule_id = %entry.id, content_id = %entry.content_id, error = %e, "dispatch failed");
                    if !entry.status.is_terminal() && !self.fail_entry(&entry, &e) {
                        report.store_errors += 1;
                    }
                }
            }
        }

        if report.attempted > 0 {
            info!(
                attempted = report.attempted,
                posted = report.posted,
                failed = report.failed,
                store_errors = report.store_errors,
                "dispatch tick finished"
            );
        } else {
            debug!("nothing due");
        }
        Ok(report)
    }

    fn fail_entry(&self, entry: &ScheduleEntry, cause: &MarketingError) -> bool {
        let mut failed = entry.clone();
        let saved = failed
            .mark_failed(cause.to_string(), Utc::now())
            .map_err(MarketingError::from)
            .and_then(|()| self.store.save_schedule(&failed));
        match saved {
            Ok(()) => true,
            Err(e) => {
                warn!(schedule_id = %entry.id, error = %e, "could not mark schedule entry failed");
                false
            }
        }
    }

    /// Publish one entry.
    ///
    /// `entry` becomes terminal only once that state is stored. The completed
    /// entry is written before its PostLog.
    async fn dispatch(&self, entry: &mut ScheduleEntry) -> Result<PostLog, MarketingError> {
        let mut content = self.store.require_content(entry.content_id)?;
        if content.status != ContentStatus::Scheduled {
            return Err(DomainError::precondition(format!(
                "content {} is {:?}, not scheduled",
                content.id, content.status
            ))
            .into());
        }
        if !content.is_scheduled_by(entry) {
            return Err(DomainError::precondition(format!(
                "superseded: content {} was rescheduled",
                content.id
            ))
            .into());
        }

        let timeout = self.config.publish_timeout;
        let mut log = tokio::time::timeout(timeout, self.publisher.publish(&content))
            .await
            .map_err(|_| PublishError::Timeout(timeout))??;
        log.schedule_id = Some(entry.id);

        let now = Utc::now();
        let mut completed = entry.clone();
        completed.mark_completed(now)?;
        self.store.save_schedule(&completed)?;
        *entry = completed;

        self.store.save_post_log(&log)?;

        match log.status {
            PostStatus::Posted => content.mark_posted(log.platform_post_id.clone(), now)?,
            PostStatus::Failed => content.mark_failed(log.message.clone(), now)?,
        }
        self.store.save_content(&content)?;

        debug!(schedule_id = %entry.id, content_id = %content.id, status = ?log.status, "entry dispatched");
        Ok(log)
    }
}
