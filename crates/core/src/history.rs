//! Reversible edit history for project documents.
//!
//! [`DocumentStore`] owns the edited document and records every committed
//! mutation as a pair of forward/inverse patch lists, so any point on the
//! timeline can be reached by replaying single steps. History is linear:
//! a new commit after one or more undos discards the undone branch.

use std::collections::VecDeque;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::labels::{derive_label, DEFAULT_LABEL};
use crate::patch::{apply_patches, diff, Patch};
use crate::types::Timestamp;

/// Default number of history entries a store retains.
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// One recorded transition between adjacent document states.
///
/// Entries are immutable once created. `patches` moves the document
/// forward across this transition; `inverse_patches` moves it back.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub label: String,
    pub at: Timestamp,
    pub patches: Vec<Patch>,
    pub inverse_patches: Vec<Patch>,
}

/// The editing surface's document holder: current value plus past/future
/// stacks of [`HistoryEntry`].
///
/// The store is synchronous and single-threaded; operations never suspend
/// and must not be interleaved from concurrent callers.
///
/// Diffs are computed over `serde_json::Value` snapshots of the document,
/// so the engine works for any `T` with a faithful serde representation.
///
/// # Panics
///
/// A document that cannot be serialized, or a snapshot that no longer
/// deserializes after patching, is a programming error and panics.
pub struct DocumentStore<T> {
    doc: T,
    snapshot: Value,
    past: VecDeque<HistoryEntry>,
    future: VecDeque<HistoryEntry>,
    max_history: usize,
}

impl<T: Clone + Serialize + DeserializeOwned> DocumentStore<T> {
    /// Create a store with the default history capacity.
    pub fn new(doc: T) -> Self {
        Self::with_capacity(doc, DEFAULT_MAX_HISTORY)
    }

    /// Create a store retaining at most `max_history` entries. When a
    /// commit or redo pushes the past stack beyond the bound, the oldest
    /// entries are silently discarded and those states become unreachable.
    pub fn with_capacity(doc: T, max_history: usize) -> Self {
        let snapshot = to_snapshot(&doc);
        Self {
            doc,
            snapshot,
            past: VecDeque::new(),
            future: VecDeque::new(),
            max_history,
        }
    }

    /// The current document value.
    pub fn document(&self) -> &T {
        &self.doc
    }

    /// Apply `updater` to a draft of the current document and record the
    /// resulting change as a new history entry.
    ///
    /// A `label` other than [`DEFAULT_LABEL`] is used verbatim; the default
    /// triggers classification over the touched paths. An updater that
    /// produces no observable change is a no-op: nothing is recorded, the
    /// future stack is untouched, and the current document value is kept
    /// (the draft is dropped, not swapped in).
    ///
    /// Returns `true` if a transition was recorded.
    pub fn commit(&mut self, label: &str, updater: impl FnOnce(&mut T)) -> bool {
        let mut draft = self.doc.clone();
        updater(&mut draft);
        let next = to_snapshot(&draft);

        let (patches, inverse_patches) = diff(&self.snapshot, &next);
        if patches.is_empty() {
            return false;
        }

        let label = if label == DEFAULT_LABEL {
            derive_label(&patches).to_string()
        } else {
            label.to_string()
        };

        self.past.push_back(HistoryEntry {
            label,
            at: Utc::now(),
            patches,
            inverse_patches,
        });
        // A new edit always invalidates previously-undone branches.
        self.future.clear();
        self.evict();

        self.doc = draft;
        self.snapshot = next;
        true
    }

    /// Apply a change without recording history. Used for transient,
    /// non-undoable state; past and future stacks are untouched.
    pub fn mutate(&mut self, updater: impl FnOnce(&mut T)) {
        updater(&mut self.doc);
        self.snapshot = to_snapshot(&self.doc);
    }

    /// Step back across the most recent transition. No-op when the past
    /// stack is empty. Returns `true` if a step was taken.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.past.pop_back() else {
            return false;
        };
        apply_patches(&mut self.snapshot, &entry.inverse_patches);
        self.doc = from_snapshot(&self.snapshot);
        self.future.push_front(entry);
        true
    }

    /// Step forward across the earliest undone transition. No-op when the
    /// future stack is empty. Returns `true` if a step was taken.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.future.pop_front() else {
            return false;
        };
        apply_patches(&mut self.snapshot, &entry.patches);
        self.doc = from_snapshot(&self.snapshot);
        self.past.push_back(entry);
        self.evict();
        true
    }

    /// Walk to `position` on the timeline, where `0` is the initial
    /// pre-history state and [`transition_count`](Self::transition_count)
    /// is the newest. Out-of-range positions are clamped.
    ///
    /// Implemented as repeated single-step undo/redo: patches are diffs
    /// between adjacent states and must be replayed in sequence, never
    /// skipped.
    pub fn go_to(&mut self, position: usize) {
        let target = position.min(self.transition_count());
        while self.position() > target {
            self.undo();
        }
        while self.position() < target {
            self.redo();
        }
    }

    /// Replace the document and drop all history. Used to load a different
    /// document entirely; the replacement is not an undoable transition.
    pub fn reset(&mut self, doc: T) {
        self.snapshot = to_snapshot(&doc);
        self.doc = doc;
        self.past.clear();
        self.future.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// The cursor position on the timeline: the number of past entries.
    pub fn position(&self) -> usize {
        self.past.len()
    }

    /// Total number of recorded transitions, past and future.
    pub fn transition_count(&self) -> usize {
        self.past.len() + self.future.len()
    }

    /// Recorded transitions behind the cursor, oldest first.
    pub fn past(&self) -> &VecDeque<HistoryEntry> {
        &self.past
    }

    /// Undone transitions ahead of the cursor, nearest first.
    pub fn future(&self) -> &VecDeque<HistoryEntry> {
        &self.future
    }

    fn evict(&mut self) {
        while self.past.len() > self.max_history {
            self.past.pop_front();
        }
    }
}

fn to_snapshot<T: Serialize>(doc: &T) -> Value {
    serde_json::to_value(doc).expect("document must serialize to JSON")
}

fn from_snapshot<T: DeserializeOwned>(snapshot: &Value) -> T {
    serde_json::from_value(snapshot.clone())
        .expect("document snapshot must deserialize after patching")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Screen {
        text: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
        screens: Vec<Screen>,
    }

    fn doc() -> Doc {
        Doc {
            name: "Demo".to_string(),
            screens: vec![Screen {
                text: "Welcome".to_string(),
            }],
        }
    }

    fn rename(name: &'static str) -> impl FnOnce(&mut Doc) {
        move |d: &mut Doc| d.name = name.to_string()
    }

    #[test]
    fn commit_records_an_entry_and_updates_the_document() {
        let mut store = DocumentStore::new(doc());
        let changed = store.commit("Rename", rename("One"));

        assert!(changed);
        assert_eq!(store.document().name, "One");
        assert_eq!(store.position(), 1);
        assert_eq!(store.transition_count(), 1);
        assert_eq!(store.past()[0].label, "Rename");
    }

    #[test]
    fn noop_commit_records_nothing_and_keeps_the_future_stack() {
        let mut store = DocumentStore::new(doc());
        store.commit("Rename", rename("One"));
        store.undo();
        assert!(store.can_redo());

        let changed = store.commit("Nothing", |_d| {});

        assert!(!changed);
        assert_eq!(store.position(), 0);
        assert!(store.can_redo(), "a no-op commit must not clear the future");
        assert_eq!(store.document(), &doc());
    }

    #[test]
    fn undo_then_redo_restores_document_and_stacks() {
        let mut store = DocumentStore::new(doc());
        store.commit("Rename", rename("One"));
        let after_commit = store.document().clone();

        assert!(store.undo());
        assert_eq!(store.document(), &doc());
        assert_eq!(store.position(), 0);
        assert!(store.can_redo());

        assert!(store.redo());
        assert_eq!(store.document(), &after_commit);
        assert_eq!(store.position(), 1);
        assert!(!store.can_redo());
        assert_eq!(store.transition_count(), 1);
    }

    #[test]
    fn undo_and_redo_are_noops_on_empty_stacks() {
        let mut store = DocumentStore::new(doc());
        assert!(!store.undo());
        assert!(!store.redo());
        store.commit("Rename", rename("One"));
        assert!(!store.redo());
    }

    #[test]
    fn commit_after_undo_discards_the_future_branch() {
        let mut store = DocumentStore::new(doc());
        store.commit("Rename", rename("One"));
        store.commit("Rename", rename("Two"));
        store.undo();
        assert!(store.can_redo());

        store.commit("Rename", rename("Three"));

        assert!(!store.can_redo());
        assert_eq!(store.transition_count(), 2);
        assert_eq!(store.document().name, "Three");
    }

    #[test]
    fn go_to_walks_both_directions_and_is_idempotent() {
        let mut store = DocumentStore::new(doc());
        store.commit("Rename", rename("One"));
        store.commit("Rename", rename("Two"));
        store.commit("Rename", rename("Three"));

        store.go_to(1);
        assert_eq!(store.document().name, "One");
        assert_eq!(store.position(), 1);

        let value_before = store.document().clone();
        let (past_len, future_len) = (store.past().len(), store.future().len());
        store.go_to(1);
        assert_eq!(store.document(), &value_before);
        assert_eq!(store.past().len(), past_len);
        assert_eq!(store.future().len(), future_len);

        store.go_to(3);
        assert_eq!(store.document().name, "Three");

        store.go_to(0);
        assert_eq!(store.document(), &doc());
    }

    #[test]
    fn go_to_clamps_out_of_range_positions() {
        let mut store = DocumentStore::new(doc());
        store.commit("Rename", rename("One"));
        store.go_to(99);
        assert_eq!(store.position(), 1);
        assert_eq!(store.document().name, "One");
    }

    #[test]
    fn history_capacity_evicts_oldest_entries_first() {
        let mut store = DocumentStore::with_capacity(doc(), 2);
        store.commit("Rename", rename("One"));
        store.commit("Rename", rename("Two"));
        store.commit("Rename", rename("Three"));

        assert_eq!(store.transition_count(), 2);
        assert_eq!(store.past()[0].label, "Rename");
        // The oldest state is unreachable: undoing to the bottom lands on
        // "One", not the initial document.
        store.go_to(0);
        assert_eq!(store.document().name, "One");
    }

    #[test]
    fn capacity_bound_holds_across_undo_redo_sequences() {
        let mut store = DocumentStore::with_capacity(doc(), 3);
        for name in ["a", "b", "c", "d", "e"] {
            store.commit("Rename", move |d| d.name = name.to_string());
        }
        store.undo();
        store.undo();
        store.redo();
        assert!(store.past().len() + store.future().len() <= 3);
    }

    #[test]
    fn mutate_changes_the_document_without_history() {
        let mut store = DocumentStore::new(doc());
        store.commit("Rename", rename("One"));
        store.undo();

        store.mutate(|d| d.name = "Transient".to_string());

        assert_eq!(store.document().name, "Transient");
        assert_eq!(store.position(), 0);
        assert!(store.can_redo(), "mutate must not touch the stacks");
    }

    #[test]
    fn reset_replaces_the_document_and_clears_history() {
        let mut store = DocumentStore::new(doc());
        store.commit("Rename", rename("One"));
        store.undo();

        let other = Doc {
            name: "Other".to_string(),
            screens: vec![],
        };
        store.reset(other.clone());

        assert_eq!(store.document(), &other);
        assert_eq!(store.transition_count(), 0);
        assert!(!store.can_undo());
        assert!(!store.can_redo());
    }

    #[test]
    fn default_label_is_classified_from_touched_paths() {
        let mut store = DocumentStore::new(doc());
        store.commit(DEFAULT_LABEL, |d| {
            d.screens[0].text = "Hello".to_string();
        });
        assert_eq!(store.past()[0].label, "Edit text");

        store.commit(DEFAULT_LABEL, |d| {
            d.screens.push(Screen {
                text: "Next".to_string(),
            });
        });
        assert_eq!(store.past()[1].label, "Add screen");
    }

    #[test]
    fn explicit_labels_are_used_verbatim() {
        let mut store = DocumentStore::new(doc());
        store.commit("Apply template", |d| {
            d.screens[0].text = "Hello".to_string();
        });
        assert_eq!(store.past()[0].label, "Apply template");
    }

    #[test]
    fn round_trip_law_holds_through_the_store() {
        let initial = doc();
        let mut store = DocumentStore::new(initial.clone());
        store.commit("Edit", |d| {
            d.name = "Changed".to_string();
            d.screens[0].text = "Other".to_string();
            d.screens.push(Screen {
                text: "New".to_string(),
            });
        });
        store.undo();
        assert_eq!(store.document(), &initial);
        store.redo();
        store.undo();
        assert_eq!(store.document(), &initial);
    }
}
