//! Most-recent-first id index lists.
//!
//! An index is a JSON array of ids stored under one key. New ids are put at
//! the front and duplicates dropped. The full history is kept; reads are
//! capped so a single call stays cheap.

use crate::traits::{RecordStore, RecordStoreExt, StoreError};

/// Put `id` at the front of the index at `key`, removing any earlier copy.
pub fn prepend<S: RecordStore + ?Sized>(store: &S, key: &str, id: &str) -> Result<(), StoreError> {
    let mut ids: Vec<String> = store.get_json(key)?.unwrap_or_default();
    ids.retain(|existing| existing != id);
    ids.insert(0, id.to_string());
    store.set_json(key, &ids)
}

/// The first `cap` ids of the index at `key` (newest first).
pub fn read<S: RecordStore + ?Sized>(
    store: &S,
    key: &str,
    cap: usize,
) -> Result<Vec<String>, StoreError> {
    let mut ids: Vec<String> = store.get_json(key)?.unwrap_or_default();
    ids.truncate(cap);
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryRecordStore;

    #[test]
    fn newest_first_without_duplicates() {
        let store = InMemoryRecordStore::new();
        prepend(&store, "idx", "a").unwrap();
        prepend(&store, "idx", "b").unwrap();
        prepend(&store, "idx", "c").unwrap();
        prepend(&store, "idx", "a").unwrap();

        assert_eq!(read(&store, "idx", 10).unwrap(), vec!["a", "c", "b"]);
    }

    #[test]
    fn reads_are_capped_but_history_is_kept() {
        let store = InMemoryRecordStore::new();
        for i in 0..10 {
            prepend(&store, "idx", &i.to_string()).unwrap();
        }

        assert_eq!(read(&store, "idx", 3).unwrap(), vec!["9", "8", "7"]);
        assert_eq!(read(&store, "idx", usize::MAX).unwrap().len(), 10);
    }

    #[test]
    fn missing_index_is_empty() {
        let store = InMemoryRecordStore::new();
        assert!(read(&store, "nope", 5).unwrap().is_empty());
    }
}
