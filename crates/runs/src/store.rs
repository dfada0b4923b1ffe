//! Run records, per-run log lines and the recent-run index.

use chrono::{DateTime, Utc};

use cadence_core::RunId;
use cadence_store::{RecordStore, RecordStoreExt, StoreError, index};

use crate::keys;
use crate::types::Run;

/// Default number of log lines returned by [`RunStore::logs`].
pub const DEFAULT_LOG_LIMIT: usize = 300;

/// Default number of runs returned by [`RunStore::list_recent`].
pub const DEFAULT_RECENT_LIMIT: usize = 25;

#[derive(Debug, Clone)]
pub struct RunStore<S> {
    store: S,
}

impl<S: RecordStore> RunStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn get(&self, id: RunId) -> Result<Option<Run>, StoreError> {
        self.store.get_json(&keys::run(id))
    }

    /// Write the run and move it to the front of the recent index.
    pub fn save(&self, run: &Run) -> Result<(), StoreError> {
        self.store.set_json(&keys::run(run.id), run)?;
        index::prepend(&self.store, keys::RUN_INDEX, &run.id.to_string())
    }

    /// Most recently saved runs first.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<Run>, StoreError> {
        let mut out = Vec::new();
        for raw in index::read(&self.store, keys::RUN_INDEX, limit)? {
            let Ok(id) = raw.parse::<RunId>() else { continue };
            if let Some(run) = self.get(id)? {
                out.push(run);
            }
        }
        Ok(out)
    }

    /// Append a timestamped line to the run's log.
    pub fn append_log(&self, id: RunId, at: DateTime<Utc>, line: &str) -> Result<(), StoreError> {
        let entry = format!("{} {}", at.to_rfc3339(), line);
        self.store.push_back(&keys::run_logs(id), &entry)
    }

    /// The last `limit` log lines, oldest first.
    pub fn logs(&self, id: RunId, limit: usize) -> Result<Vec<String>, StoreError> {
        self.store.list_range(&keys::run_logs(id), limit)
    }
}
