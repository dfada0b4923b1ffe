use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// Record store operation error.
///
/// Infrastructure failures only. A missing key is not an error: reads return
/// `Ok(None)` and callers decide what absence means.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store connection error: {0}")]
    Connection(String),

    #[error("store command error: {0}")]
    Command(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("record at {key} could not be decoded: {message}")]
    Deserialization { key: String, message: String },

    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Narrow key-value interface shared by every component.
///
/// Lists are FIFO: `push_back` appends to the tail, `pop_front` removes from
/// the head and never blocks.
pub trait RecordStore: Send + Sync {
    /// Read a record.
    fn get(&self, key: &str) -> Result<Option<JsonValue>, StoreError>;

    /// Write (replace) a record.
    fn set(&self, key: &str, value: JsonValue) -> Result<(), StoreError>;

    /// Remove a record. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Keys starting with `prefix`, sorted.
    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Append `item` to the tail of list `list`.
    fn push_back(&self, list: &str, item: &str) -> Result<(), StoreError>;

    /// Pop the head of list `list`; `None` when empty.
    fn pop_front(&self, list: &str) -> Result<Option<String>, StoreError>;

    /// The last `limit` items of list `list`, oldest first.
    fn list_range(&self, list: &str, limit: usize) -> Result<Vec<String>, StoreError>;

    /// Number of items in list `list`.
    fn list_len(&self, list: &str) -> Result<usize, StoreError>;
}

impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<JsonValue>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: JsonValue) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        (**self).keys(prefix)
    }

    fn push_back(&self, list: &str, item: &str) -> Result<(), StoreError> {
        (**self).push_back(list, item)
    }

    fn pop_front(&self, list: &str) -> Result<Option<String>, StoreError> {
        (**self).pop_front(list)
    }

    fn list_range(&self, list: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        (**self).list_range(list, limit)
    }

    fn list_len(&self, list: &str) -> Result<usize, StoreError> {
        (**self).list_len(list)
    }
}

/// Typed helpers over [`RecordStore`].
pub trait RecordStoreExt: RecordStore {
    /// Read and decode a record.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get(key)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Deserialization {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Encode and write a record.
    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value =
            serde_json::to_value(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.set(key, value)
    }
}

impl<T: RecordStore + ?Sized> RecordStoreExt for T {}
