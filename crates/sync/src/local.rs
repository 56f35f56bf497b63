//! The device-local record set the orchestrator synchronizes from.
//!
//! [`LocalProjects`] is the seam between the orchestrator and however the
//! embedder keeps documents on device (an editor store, a file cache, a
//! browser database behind FFI). [`MemoryProjects`] is the in-memory
//! implementation used by tests and simple embedders.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use crate::gate::RemoteProject;

/// A local record with edits the server has not accepted yet.
#[derive(Debug, Clone)]
pub struct PendingPush {
    pub id: String,
    pub name: String,
    pub data: Value,
    /// The server revision this client last saw; `0` if the server has no
    /// copy of this record.
    pub base_revision: i64,
    /// The record was deleted locally; push as a tombstone.
    pub deleted: bool,
}

/// A locally-created record that has never been registered server-side.
#[derive(Debug, Clone)]
pub struct PendingClaim {
    pub id: String,
    pub name: String,
    pub data: Value,
}

/// Access to the device-local record set.
///
/// Records awaiting their one-time claim are excluded from
/// [`pending_pushes`](Self::pending_pushes); they reach the server through
/// [`SyncOrchestrator::claim_local_projects`](crate::SyncOrchestrator::claim_local_projects)
/// first.
pub trait LocalProjects: Send + Sync {
    /// All records with unpushed edits.
    fn pending_pushes(&self) -> Vec<PendingPush>;

    /// A single record's unpushed edits, if any.
    fn pending_push(&self, id: &str) -> Option<PendingPush>;

    /// Locally-created records awaiting their one-time claim.
    fn pending_claims(&self) -> Vec<PendingClaim>;

    /// The server accepted a write; `revision` is the new base for this
    /// record.
    fn record_accepted(&self, id: &str, revision: i64);

    /// The server rejected a write; `server` is the authoritative row the
    /// embedder can rebase against. The record keeps its pending edits.
    fn record_conflict(&self, id: &str, server: RemoteProject);
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct LocalRecord {
    name: String,
    data: Value,
    base_revision: i64,
    dirty: bool,
    deleted: bool,
    needs_claim: bool,
    conflict: Option<RemoteProject>,
}

/// In-memory [`LocalProjects`] implementation.
#[derive(Default)]
pub struct MemoryProjects {
    records: Mutex<HashMap<String, LocalRecord>>,
}

impl MemoryProjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a project locally, before any session exists: base revision
    /// zero, awaiting its one-time claim.
    pub fn create_local(&self, id: &str, name: &str, data: Value) {
        self.records.lock().unwrap().insert(
            id.to_string(),
            LocalRecord {
                name: name.to_string(),
                data,
                base_revision: 0,
                dirty: false,
                deleted: false,
                needs_claim: true,
                conflict: None,
            },
        );
    }

    /// Track a record that mirrors a known server copy at `revision`.
    pub fn track_remote(&self, id: &str, name: &str, data: Value, revision: i64) {
        self.records.lock().unwrap().insert(
            id.to_string(),
            LocalRecord {
                name: name.to_string(),
                data,
                base_revision: revision,
                dirty: false,
                deleted: false,
                needs_claim: false,
                conflict: None,
            },
        );
    }

    /// Apply a local edit, marking the record for the next sync pass.
    pub fn edit(&self, id: &str, name: &str, data: Value) {
        if let Some(record) = self.records.lock().unwrap().get_mut(id) {
            record.name = name.to_string();
            record.data = data;
            record.dirty = true;
        }
    }

    /// Delete locally. Deleting a record that was never claimed cancels
    /// the claim; the tombstone push then reports "nothing on the server",
    /// which the orchestrator treats as done.
    pub fn delete(&self, id: &str) {
        if let Some(record) = self.records.lock().unwrap().get_mut(id) {
            record.deleted = true;
            record.dirty = true;
            record.needs_claim = false;
        }
    }

    /// The record's current base revision.
    pub fn base_revision(&self, id: &str) -> Option<i64> {
        self.records
            .lock()
            .unwrap()
            .get(id)
            .map(|r| r.base_revision)
    }

    /// Whether the record still has unpushed edits.
    pub fn is_dirty(&self, id: &str) -> bool {
        self.records
            .lock()
            .unwrap()
            .get(id)
            .is_some_and(|r| r.dirty)
    }

    /// The authoritative server row from the record's last conflict, if
    /// one is pending resolution.
    pub fn conflict(&self, id: &str) -> Option<RemoteProject> {
        self.records
            .lock()
            .unwrap()
            .get(id)
            .and_then(|r| r.conflict.clone())
    }
}

impl LocalProjects for MemoryProjects {
    fn pending_pushes(&self) -> Vec<PendingPush> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, r)| r.dirty && !r.needs_claim)
            .map(|(id, r)| PendingPush {
                id: id.clone(),
                name: r.name.clone(),
                data: r.data.clone(),
                base_revision: r.base_revision,
                deleted: r.deleted,
            })
            .collect()
    }

    fn pending_push(&self, id: &str) -> Option<PendingPush> {
        self.records
            .lock()
            .unwrap()
            .get(id)
            .filter(|r| r.dirty && !r.needs_claim)
            .map(|r| PendingPush {
                id: id.to_string(),
                name: r.name.clone(),
                data: r.data.clone(),
                base_revision: r.base_revision,
                deleted: r.deleted,
            })
    }

    fn pending_claims(&self) -> Vec<PendingClaim> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, r)| r.needs_claim && !r.deleted)
            .map(|(id, r)| PendingClaim {
                id: id.clone(),
                name: r.name.clone(),
                data: r.data.clone(),
            })
            .collect()
    }

    fn record_accepted(&self, id: &str, revision: i64) {
        if let Some(record) = self.records.lock().unwrap().get_mut(id) {
            record.base_revision = revision;
            record.dirty = false;
            record.needs_claim = false;
            record.conflict = None;
        }
    }

    fn record_conflict(&self, id: &str, server: RemoteProject) {
        if let Some(record) = self.records.lock().unwrap().get_mut(id) {
            record.conflict = Some(server);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn locally_created_records_claim_before_they_push() {
        let local = MemoryProjects::new();
        local.create_local("p1", "Draft", json!({}));

        assert!(local.pending_pushes().is_empty());
        assert_eq!(local.pending_claims().len(), 1);

        local.record_accepted("p1", 1);
        assert!(local.pending_claims().is_empty());
        assert_eq!(local.base_revision("p1"), Some(1));
    }

    #[test]
    fn edits_mark_tracked_records_dirty() {
        let local = MemoryProjects::new();
        local.track_remote("p1", "One", json!({}), 3);
        assert!(local.pending_pushes().is_empty());

        local.edit("p1", "One b", json!({"x": 1}));
        let pushes = local.pending_pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].base_revision, 3);
        assert!(!pushes[0].deleted);
    }

    #[test]
    fn deleting_an_unclaimed_record_cancels_the_claim() {
        let local = MemoryProjects::new();
        local.create_local("p1", "Draft", json!({}));
        local.delete("p1");

        assert!(local.pending_claims().is_empty());
        let pushes = local.pending_pushes();
        assert_eq!(pushes.len(), 1);
        assert!(pushes[0].deleted);
        assert_eq!(pushes[0].base_revision, 0);
    }
}
