//! FIFO queue of run ids held in the record store.

use tracing::warn;

use cadence_core::RunId;
use cadence_store::{RecordStore, StoreError};

use crate::keys;

/// Durable FIFO of pending run ids.
///
/// Popping an id and loading its record are two separate store calls; a crash
/// in between drops the id. Callers accept that ambiguity.
#[derive(Debug, Clone)]
pub struct RunQueue<S> {
    store: S,
}

impl<S: RecordStore> RunQueue<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Append a run id to the tail.
    pub fn enqueue(&self, id: RunId) -> Result<(), StoreError> {
        self.store.push_back(keys::QUEUE, &id.to_string())
    }

    /// Pop the head; `None` when the queue is empty. Never blocks.
    ///
    /// Entries that are not valid run ids are discarded.
    pub fn dequeue(&self) -> Result<Option<RunId>, StoreError> {
        while let Some(raw) = self.store.pop_front(keys::QUEUE)? {
            match raw.parse::<RunId>() {
                Ok(id) => return Ok(Some(id)),
                Err(e) => warn!(entry = %raw, error = %e, "discarding malformed queue entry"),
            }
        }
        Ok(None)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        self.store.list_len(keys::QUEUE)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}
