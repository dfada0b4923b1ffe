//! Bulk approve / reject / schedule over an ordered list of content ids.
//!
//! Every id is handled on its own: a failure is recorded against that id and
//! the loop moves on. Nothing is rolled back.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cadence_core::{ContentId, DomainError};
use cadence_store::RecordStore;

use crate::compliance::ComplianceChecker;
use crate::error::MarketingError;
use crate::store::MarketingStore;
use crate::types::{ContentItem, ContentStatus, ScheduleEntry};

pub const DEFAULT_SPACING_MINS: i64 = 10;
pub const DEFAULT_JITTER_MAX_MINS: i64 = 6;
pub const MAX_SPACING_MINS: i64 = 180;
pub const MAX_JITTER_MINS: i64 = 30;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Only approved content may be scheduled
    pub approval_required: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            approval_required: true,
        }
    }
}

impl SchedulerConfig {
    pub fn with_approval_required(mut self, required: bool) -> Self {
        self.approval_required = required;
        self
    }
}

/// Source of the random minutes added to each scheduled time.
pub trait JitterSource: Send + Sync {
    /// A value in `[0, ceiling]`.
    fn minutes(&self, ceiling: u32) -> u32;
}

/// Uniform jitter from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn minutes(&self, ceiling: u32) -> u32 {
        if ceiling == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..=ceiling)
    }
}

/// Always the same offset, capped at the ceiling.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedJitter(pub u32);

impl JitterSource for FixedJitter {
    fn minutes(&self, ceiling: u32) -> u32 {
        self.0.min(ceiling)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BulkAction {
    Approve,
    Reject {
        #[serde(default)]
        reason: Option<String>,
    },
    Schedule {
        /// RFC 3339 timestamp of the first slot.
        scheduled_for_base: String,
        #[serde(default)]
        spacing_mins: Option<i64>,
        #[serde(default)]
        jitter_max_mins: Option<i64>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRequest {
    #[serde(flatten)]
    pub action: BulkAction,
    pub ids: Vec<String>,
    #[serde(default)]
    pub override_compliance: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkItemError {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub updated_count: usize,
    pub errors: Vec<BulkItemError>,
    /// Ids refused by the compliance check; not errors.
    pub compliance_blocked: Vec<String>,
}

impl BulkReport {
    fn error(&mut self, id: &str, error: impl ToString) {
        self.errors.push(BulkItemError {
            id: id.to_string(),
            error: error.to_string(),
        });
    }
}

/// Time of slot `index`: `base + (index * spacing + jitter)` minutes.
pub fn slot_time(base: DateTime<Utc>, index: usize, spacing_mins: i64, jitter_mins: i64) -> DateTime<Utc> {
    base + Duration::minutes(index as i64 * spacing_mins + jitter_mins)
}

enum ItemOutcome {
    Updated,
    Blocked,
}

pub struct BulkScheduler<S, C, J = RandomJitter> {
    store: MarketingStore<S>,
    checker: C,
    jitter: J,
    config: SchedulerConfig,
}

impl<S, C> BulkScheduler<S, C, RandomJitter>
where
    S: RecordStore,
    C: ComplianceChecker,
{
    pub fn new(store: MarketingStore<S>, checker: C, config: SchedulerConfig) -> Self {
        Self::with_jitter(store, checker, RandomJitter, config)
    }
}

impl<S, C, J> BulkScheduler<S, C, J>
where
    S: RecordStore,
    C: ComplianceChecker,
    J: JitterSource,
{
    pub fn with_jitter(store: MarketingStore<S>, checker: C, jitter: J, config: SchedulerConfig) -> Self {
        Self {
            store,
            checker,
            jitter,
            config,
        }
    }

    pub fn store(&self) -> &MarketingStore<S> {
        &self.store
    }

    fn gate_approval(&self, item: &ContentItem) -> Result<(), MarketingError> {
        if self.config.approval_required && item.status != ContentStatus::Approved {
            return Err(DomainError::precondition("approval required before scheduling").into());
        }
        Ok(())
    }

    /// Schedule one item at an exact time, honouring the approval gate.
    pub fn schedule_content(
        &self,
        id: ContentId,
        at: DateTime<Utc>,
    ) -> Result<(ContentItem, ScheduleEntry), MarketingError> {
        let item = self.store.require_content(id)?;
        self.gate_approval(&item)?;
        self.store.schedule_content(id, at)
    }

    /// Apply `request.action` to every id in order.
    pub fn run(&self, request: &BulkRequest) -> BulkReport {
        let report = match &request.action {
            BulkAction::Approve => self.approve(&request.ids, request.override_compliance),
            BulkAction::Reject { reason } => {
                self.reject(&request.ids, reason.as_deref().unwrap_or("Rejected"))
            }
            BulkAction::Schedule {
                scheduled_for_base,
                spacing_mins,
                jitter_max_mins,
            } => self.schedule(
                &request.ids,
                scheduled_for_base,
                spacing_mins.unwrap_or(DEFAULT_SPACING_MINS),
                jitter_max_mins.unwrap_or(DEFAULT_JITTER_MAX_MINS),
                request.override_compliance,
            ),
        };

        info!(
            action = ?request.action,
            ids = request.ids.len(),
            updated = report.updated_count,
            errors = report.errors.len(),
            blocked = report.compliance_blocked.len(),
            "bulk action finished"
        );
        report
    }

    pub fn approve(&self, ids: &[String], override_compliance: bool) -> BulkReport {
        self.each(ids, |_, id| {
            let item = self.store.require_content(id)?;
            if !override_compliance && !self.checker.check(&item).ok {
                return Ok(ItemOutcome::Blocked);
            }
            self.store.approve_content(id)?;
            Ok(ItemOutcome::Updated)
        })
    }

    pub fn reject(&self, ids: &[String], reason: &str) -> BulkReport {
        self.each(ids, |_, id| {
            self.store.reject_content(id, reason)?;
            Ok(ItemOutcome::Updated)
        })
    }

    /// Schedule `ids` in order, `spacing_mins` apart plus per-item jitter.
    ///
    /// Spacing is clamped to `[1, 180]` and the jitter ceiling to `[0, 30]`.
    pub fn schedule(
        &self,
        ids: &[String],
        base: &str,
        spacing_mins: i64,
        jitter_max_mins: i64,
        override_compliance: bool,
    ) -> BulkReport {
        let spacing = spacing_mins.clamp(1, MAX_SPACING_MINS);
        let jitter_max = jitter_max_mins.clamp(0, MAX_JITTER_MINS) as u32;

        let base = match parse_base(base) {
            Ok(base) => base,
            Err(e) => {
                let mut report = BulkReport::default();
                for id in ids.iter().filter(|id| !id.trim().is_empty()) {
                    report.error(id, &e);
                }
                return report;
            }
        };

        self.each(ids, |index, id| {
            let item = self.store.require_content(id)?;
            self.gate_approval(&item)?;
            if !override_compliance && !self.checker.check(&item).ok {
                return Ok(ItemOutcome::Blocked);
            }

            let jitter = self.jitter.minutes(jitter_max) as i64;
            let at = slot_time(base, index, spacing, jitter);
            self.store.schedule_content(id, at)?;
            Ok(ItemOutcome::Updated)
        })
    }

    fn each<F>(&self, ids: &[String], mut f: F) -> BulkReport
    where
        F: FnMut(usize, ContentId) -> Result<ItemOutcome, MarketingError>,
    {
        let mut report = BulkReport::default();

        for (index, raw) in ids.iter().enumerate() {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let outcome = raw
                .parse::<ContentId>()
                .map_err(MarketingError::from)
                .and_then(|id| f(index, id));

            match outcome {
                Ok(ItemOutcome::Updated) => report.updated_count += 1,
                Ok(ItemOutcome::Blocked) => report.compliance_blocked.push(raw.to_string()),
                Err(e) => {
                    warn!(content_id = raw, error = %e, "bulk item failed");
                    report.error(raw, e);
                }
            }
        }

        report
    }
}

fn parse_base(base: &str) -> Result<DateTime<Utc>, DomainError> {
    let base = base.trim();
    if base.is_empty() {
        return Err(DomainError::validation("scheduled_for_base is required"));
    }
    DateTime::parse_from_rfc3339(base)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::validation(format!("scheduled_for_base must be RFC 3339: {e}")))
}
