//! Stored pipeline invocations and the per-subject last-job pointer.

use cadence_core::PipelineJobId;
use cadence_store::{RecordStore, RecordStoreExt, StoreError};

use crate::executor::PipelineReport;

pub fn job_key(id: PipelineJobId) -> String {
    format!("pipeline:job:{id}")
}

pub fn last_job_key(subject: &str) -> String {
    format!("pipeline:{subject}:last_job")
}

/// Reports are written as they grow, so a reader sees a `running` job's
/// steps so far.
#[derive(Debug, Clone)]
pub struct JobStore<S> {
    store: S,
}

impl<S: RecordStore> JobStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Write the first snapshot and point the subject at it.
    pub fn start(&self, report: &PipelineReport) -> Result<(), StoreError> {
        self.save(report)?;
        self.store
            .set_json(&last_job_key(&report.subject), &report.job_id)
    }

    pub fn save(&self, report: &PipelineReport) -> Result<(), StoreError> {
        self.store.set_json(&job_key(report.job_id), report)
    }

    pub fn get(&self, id: PipelineJobId) -> Result<Option<PipelineReport>, StoreError> {
        self.store.get_json(&job_key(id))
    }

    /// Most recent job started for `subject`.
    pub fn last_for(&self, subject: &str) -> Result<Option<PipelineReport>, StoreError> {
        let id: Option<PipelineJobId> = self.store.get_json(&last_job_key(subject))?;
        match id {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }
}
