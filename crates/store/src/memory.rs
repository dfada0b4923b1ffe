use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use serde_json::Value as JsonValue;

use crate::traits::{RecordStore, StoreError};

/// In-memory record store.
///
/// Intended for tests/dev. Records live in a sorted map so `keys` is a range
/// scan; lists are `VecDeque`s.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<BTreeMap<String, JsonValue>>,
    lists: RwLock<HashMap<String, VecDeque<String>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(&self, key: &str) -> Result<Option<JsonValue>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.get(key).cloned())
    }

    fn set(&self, key: &str, value: JsonValue) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        records.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        records.remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn push_back(&self, list: &str, item: &str) -> Result<(), StoreError> {
        let mut lists = self.lists.write().map_err(|_| StoreError::LockPoisoned)?;
        lists
            .entry(list.to_string())
            .or_default()
            .push_back(item.to_string());
        Ok(())
    }

    fn pop_front(&self, list: &str) -> Result<Option<String>, StoreError> {
        let mut lists = self.lists.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(lists.get_mut(list).and_then(|l| l.pop_front()))
    }

    fn list_range(&self, list: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let lists = self.lists.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(match lists.get(list) {
            Some(l) => {
                let skip = l.len().saturating_sub(limit);
                l.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        })
    }

    fn list_len(&self, list: &str) -> Result<usize, StoreError> {
        let lists = self.lists.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(lists.get(list).map_or(0, VecDeque::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::RecordStoreExt;
    use serde_json::json;

    #[test]
    fn get_set_delete() {
        let store = InMemoryRecordStore::new();
        assert!(store.get("a").unwrap().is_none());

        store.set("a", json!({"n": 1})).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(json!({"n": 1})));

        store.delete("a").unwrap();
        assert!(store.get("a").unwrap().is_none());
        // deleting again is fine
        store.delete("a").unwrap();
    }

    #[test]
    fn keys_by_prefix_are_sorted() {
        let store = InMemoryRecordStore::new();
        store.set("run:b", json!(1)).unwrap();
        store.set("run:a", json!(1)).unwrap();
        store.set("runs:index", json!([])).unwrap();
        store.set("content:x", json!(1)).unwrap();

        assert_eq!(store.keys("run:").unwrap(), vec!["run:a", "run:b"]);
        assert_eq!(store.keys("zzz").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn lists_are_fifo() {
        let store = InMemoryRecordStore::new();
        assert_eq!(store.pop_front("q").unwrap(), None);

        store.push_back("q", "1").unwrap();
        store.push_back("q", "2").unwrap();
        store.push_back("q", "3").unwrap();
        assert_eq!(store.list_len("q").unwrap(), 3);

        assert_eq!(store.pop_front("q").unwrap().as_deref(), Some("1"));
        assert_eq!(store.list_range("q", 10).unwrap(), vec!["2", "3"]);
        assert_eq!(store.list_range("q", 1).unwrap(), vec!["3"]);
    }

    #[test]
    fn typed_helpers_report_decode_failures() {
        let store = InMemoryRecordStore::new();
        store.set_json("n", &42u32).unwrap();
        assert_eq!(store.get_json::<u32>("n").unwrap(), Some(42));

        let err = store.get_json::<Vec<String>>("n").unwrap_err();
        assert!(matches!(err, StoreError::Deserialization { ref key, .. } if key == "n"));
    }

    #[test]
    fn arc_store_shares_state() {
        let store = InMemoryRecordStore::arc();
        let other = store.clone();
        store.push_back("q", "x").unwrap();
        assert_eq!(other.pop_front("q").unwrap().as_deref(), Some("x"));
    }
}
