//! Per-project memory shared by every run of a project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use cadence_core::ProjectId;
use cadence_store::{RecordStore, RecordStoreExt, StoreError};

use crate::keys;

/// Notes kept per project; older ones are dropped.
pub const MAX_NOTES: usize = 200;

/// Accumulated notes and state of one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMemory {
    pub project_id: ProjectId,
    /// Append-only, newest last, capped at [`MAX_NOTES`].
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub state: Map<String, JsonValue>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Changes a successful run asks to make to its project's memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryPatch {
    #[serde(default, alias = "notesToAdd")]
    pub notes_to_add: Vec<String>,
    /// Shallow-merged into `state`; later keys overwrite earlier ones.
    #[serde(default)]
    pub set: Map<String, JsonValue>,
}

impl MemoryPatch {
    pub fn is_empty(&self) -> bool {
        self.notes_to_add.is_empty() && self.set.is_empty()
    }
}

impl ProjectMemory {
    pub fn empty(project_id: ProjectId) -> Self {
        Self {
            project_id,
            notes: Vec::new(),
            state: Map::new(),
            updated_at: None,
        }
    }

    pub fn apply(&mut self, patch: &MemoryPatch, now: DateTime<Utc>) {
        self.notes.extend(patch.notes_to_add.iter().cloned());
        if self.notes.len() > MAX_NOTES {
            let excess = self.notes.len() - MAX_NOTES;
            self.notes.drain(..excess);
        }
        for (k, v) in &patch.set {
            self.state.insert(k.clone(), v.clone());
        }
        self.updated_at = Some(now);
    }
}

#[derive(Debug, Clone)]
pub struct ProjectMemoryStore<S> {
    store: S,
}

impl<S: RecordStore> ProjectMemoryStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Load a project's memory; a project with no memory yet gets an empty one.
    pub fn load(&self, project_id: &ProjectId) -> Result<ProjectMemory, StoreError> {
        Ok(self
            .store
            .get_json(&keys::project_memory(project_id))?
            .unwrap_or_else(|| ProjectMemory::empty(project_id.clone())))
    }

    pub fn save(&self, memory: &ProjectMemory) -> Result<(), StoreError> {
        self.store
            .set_json(&keys::project_memory(&memory.project_id), memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_store::InMemoryRecordStore;
    use serde_json::json;

    fn patch(notes: &[&str], set: JsonValue) -> MemoryPatch {
        MemoryPatch {
            notes_to_add: notes.iter().map(|s| s.to_string()).collect(),
            set: set.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn apply_appends_and_merges_shallowly() {
        let mut memory = ProjectMemory::empty(ProjectId::new("p"));
        memory.apply(&patch(&["a"], json!({"stage": "audit", "nested": {"x": 1}})), Utc::now());
        memory.apply(&patch(&["b"], json!({"nested": {"y": 2}})), Utc::now());

        assert_eq!(memory.notes, vec!["a", "b"]);
        assert_eq!(memory.state["stage"], json!("audit"));
        // shallow: the nested object is replaced, not merged
        assert_eq!(memory.state["nested"], json!({"y": 2}));
        assert!(memory.updated_at.is_some());
    }

    #[test]
    fn notes_keep_the_most_recent() {
        let mut memory = ProjectMemory::empty(ProjectId::new("p"));
        let notes: Vec<String> = (0..250).map(|i| format!("n{i}")).collect();
        let refs: Vec<&str> = notes.iter().map(String::as_str).collect();

        memory.apply(&patch(&refs, json!({})), Utc::now());

        assert_eq!(memory.notes.len(), MAX_NOTES);
        assert_eq!(memory.notes.first().map(String::as_str), Some("n50"));
        assert_eq!(memory.notes.last().map(String::as_str), Some("n249"));
    }

    #[test]
    fn patch_accepts_camel_case() {
        let patch: MemoryPatch =
            serde_json::from_value(json!({"notesToAdd": ["x"], "set": {"k": true}})).unwrap();
        assert_eq!(patch.notes_to_add, vec!["x"]);
        assert!(!patch.is_empty());
    }

    #[test]
    fn load_missing_is_empty_and_save_round_trips() {
        let store = ProjectMemoryStore::new(InMemoryRecordStore::arc());
        let project = ProjectId::new("acme");

        let mut memory = store.load(&project).unwrap();
        assert!(memory.notes.is_empty());

        memory.apply(&patch(&["first"], json!({"n": 1})), Utc::now());
        store.save(&memory).unwrap();

        assert_eq!(store.load(&project).unwrap(), memory);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: after any sequence of patches the notes are the newest
            /// `MAX_NOTES` of everything added, in order.
            #[test]
            fn notes_are_the_capped_tail(batches in proptest::collection::vec(0usize..120, 0..8)) {
                let mut memory = ProjectMemory::empty(ProjectId::new("p"));
                let mut all = Vec::new();
                for (b, size) in batches.into_iter().enumerate() {
                    let notes: Vec<String> = (0..size).map(|i| format!("{b}-{i}")).collect();
                    all.extend(notes.iter().cloned());
                    memory.apply(&MemoryPatch { notes_to_add: notes, set: Map::new() }, Utc::now());
                }

                let keep = all.len().min(MAX_NOTES);
                prop_assert_eq!(&memory.notes[..], &all[all.len() - keep..]);
            }
        }
    }
}
