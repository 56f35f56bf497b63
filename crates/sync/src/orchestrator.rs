//! The sync orchestrator: drains local edits through the project gate.
//!
//! Scheduling is deliberately absent. The embedder decides *when* to call
//! [`SyncOrchestrator::sync_all`] (timers, explicit save, reconnect); each
//! call performs one pass with no internal retries or backoff, and the
//! outcome is reflected in the observable [`SyncStatus`].

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::gate::{ClaimRequest, GateError, ProjectGate, UpsertRequest};
use crate::local::LocalProjects;
use crate::status::SyncStatus;

/// Counters for one [`SyncOrchestrator::sync_all`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Writes the server accepted.
    pub accepted: usize,
    /// Writes rejected with a revision conflict; each was recorded on the
    /// local store for the embedder to resolve.
    pub conflicts: usize,
    /// Transport or server failures.
    pub failed: usize,
}

/// Counters for one [`SyncOrchestrator::claim_local_projects`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClaimReport {
    pub claimed: usize,
    pub already_existed: usize,
    pub failed: usize,
}

/// Pushes local edits through a [`ProjectGate`] and exposes aggregate
/// status to the editing surface.
pub struct SyncOrchestrator<G> {
    gate: G,
    local: Arc<dyn LocalProjects>,
    queue: Mutex<VecDeque<String>>,
    status_tx: watch::Sender<SyncStatus>,
}

impl<G: ProjectGate> SyncOrchestrator<G> {
    pub fn new(gate: G, local: Arc<dyn LocalProjects>) -> Self {
        let (status_tx, _) = watch::channel(SyncStatus::Idle);
        Self {
            gate,
            local,
            queue: Mutex::new(VecDeque::new()),
            status_tx,
        }
    }

    /// Subscribe to the aggregate status.
    pub fn status(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    /// The current aggregate status.
    pub fn current_status(&self) -> SyncStatus {
        *self.status_tx.borrow()
    }

    /// Mark a project for the next [`sync_all`](Self::sync_all) pass.
    /// Duplicate ids collapse.
    pub fn enqueue(&self, project_id: impl Into<String>) {
        let id = project_id.into();
        let mut queue = self.queue.lock().unwrap();
        if !queue.contains(&id) {
            queue.push_back(id);
        }
    }

    /// Push every queued and dirty local record to the server in one pass.
    ///
    /// Locally-deleted records are tombstoned, everything else is
    /// upserted. A conflict is recorded on the local store and reflected
    /// as an [`SyncStatus::Error`]; nothing is merged or retried here.
    pub async fn sync_all(&self) -> SyncReport {
        self.status_tx.send_replace(SyncStatus::Syncing);

        // Explicitly queued ids first, then whatever else is dirty.
        let queued: Vec<String> = self.queue.lock().unwrap().drain(..).collect();
        let mut seen = HashSet::new();
        let mut pushes = Vec::new();
        for id in queued {
            if let Some(push) = self.local.pending_push(&id) {
                if seen.insert(push.id.clone()) {
                    pushes.push(push);
                }
            }
        }
        for push in self.local.pending_pushes() {
            if seen.insert(push.id.clone()) {
                pushes.push(push);
            }
        }

        let mut report = SyncReport::default();
        for push in pushes {
            let outcome = if push.deleted {
                let base = (push.base_revision > 0).then_some(push.base_revision);
                self.gate.tombstone(&push.id, base).await
            } else {
                let request = UpsertRequest {
                    name: push.name.clone(),
                    data: push.data.clone(),
                    base_revision: push.base_revision,
                };
                self.gate.upsert(&push.id, &request).await
            };

            match outcome {
                Ok(receipt) => {
                    self.local.record_accepted(&push.id, receipt.revision);
                    report.accepted += 1;
                }
                Err(GateError::Conflict { server }) => {
                    tracing::debug!(project_id = %push.id, server_revision = server.revision,
                        "sync push conflicted");
                    self.local.record_conflict(&push.id, *server);
                    report.conflicts += 1;
                }
                // Tombstoning a record the server never saw: nothing to
                // delete and nothing left to push.
                Err(GateError::NotFound) if push.deleted && push.base_revision == 0 => {
                    self.local.record_accepted(&push.id, 0);
                    report.accepted += 1;
                }
                Err(error) => {
                    tracing::warn!(project_id = %push.id, %error, "sync push failed");
                    report.failed += 1;
                }
            }
        }

        let status = if report.conflicts > 0 || report.failed > 0 {
            SyncStatus::Error
        } else {
            SyncStatus::Synced
        };
        self.status_tx.send_replace(status);
        report
    }

    /// Register every locally-created record with the server, once.
    ///
    /// [`GateError::ProjectExists`] is surfaced in the report, not
    /// retried: the record keeps its claim flag so the embedder can decide
    /// what to do with the duplicate id.
    pub async fn claim_local_projects(&self) -> ClaimReport {
        let mut report = ClaimReport::default();
        for claim in self.local.pending_claims() {
            let request = ClaimRequest {
                id: claim.id.clone(),
                name: claim.name,
                data: claim.data,
            };
            match self.gate.claim(&request).await {
                Ok(receipt) => {
                    self.local.record_accepted(&claim.id, receipt.revision);
                    report.claimed += 1;
                }
                Err(GateError::ProjectExists) => {
                    tracing::debug!(project_id = %claim.id, "claim collided with an existing row");
                    report.already_existed += 1;
                }
                Err(error) => {
                    tracing::warn!(project_id = %claim.id, %error, "claim failed");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{RemoteProject, RemoteSummary, WriteReceipt};
    use crate::local::MemoryProjects;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;

    /// A scripted gate: accepts every write at `base + 1` unless the id is
    /// listed in `conflicts` (upsert/tombstone) or `existing` (claim);
    /// unknown ids 404 on tombstone.
    #[derive(Default)]
    struct ScriptedGate {
        known: Mutex<HashSet<String>>,
        conflicts: Mutex<HashMap<String, RemoteProject>>,
        existing: Mutex<HashSet<String>>,
        upserts: Mutex<Vec<(String, i64)>>,
        tombstones: Mutex<Vec<(String, Option<i64>)>>,
    }

    impl ScriptedGate {
        fn with_known(ids: &[&str]) -> Self {
            let gate = Self::default();
            let mut known = gate.known.lock().unwrap();
            for id in ids {
                known.insert(id.to_string());
            }
            drop(known);
            gate
        }

        fn conflict_on(&self, id: &str, server: RemoteProject) {
            self.conflicts.lock().unwrap().insert(id.to_string(), server);
        }

        fn exists_on(&self, id: &str) {
            self.existing.lock().unwrap().insert(id.to_string());
        }
    }

    fn receipt(id: &str, revision: i64, deleted: bool) -> WriteReceipt {
        WriteReceipt {
            id: id.to_string(),
            revision,
            updated_at: chrono::Utc::now(),
            deleted_at: deleted.then(chrono::Utc::now),
        }
    }

    fn server_row(id: &str, revision: i64) -> RemoteProject {
        RemoteProject {
            id: id.to_string(),
            user_id: 1,
            name: "server copy".to_string(),
            data: json!({"server": true}),
            revision,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            deleted_at: None,
        }
    }

    #[async_trait]
    impl ProjectGate for ScriptedGate {
        async fn fetch(&self, id: &str) -> Result<RemoteProject, GateError> {
            self.conflicts
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or(GateError::NotFound)
        }

        async fn upsert(
            &self,
            id: &str,
            request: &UpsertRequest,
        ) -> Result<WriteReceipt, GateError> {
            if let Some(server) = self.conflicts.lock().unwrap().get(id) {
                return Err(GateError::Conflict {
                    server: Box::new(server.clone()),
                });
            }
            self.upserts
                .lock()
                .unwrap()
                .push((id.to_string(), request.base_revision));
            self.known.lock().unwrap().insert(id.to_string());
            Ok(receipt(id, request.base_revision + 1, false))
        }

        async fn tombstone(
            &self,
            id: &str,
            base_revision: Option<i64>,
        ) -> Result<WriteReceipt, GateError> {
            if !self.known.lock().unwrap().contains(id) {
                return Err(GateError::NotFound);
            }
            if let Some(server) = self.conflicts.lock().unwrap().get(id) {
                return Err(GateError::Conflict {
                    server: Box::new(server.clone()),
                });
            }
            self.tombstones
                .lock()
                .unwrap()
                .push((id.to_string(), base_revision));
            Ok(receipt(id, base_revision.unwrap_or(0) + 1, true))
        }

        async fn list(&self, _include_deleted: bool) -> Result<Vec<RemoteSummary>, GateError> {
            Ok(Vec::new())
        }

        async fn claim(&self, request: &ClaimRequest) -> Result<WriteReceipt, GateError> {
            if self.existing.lock().unwrap().contains(&request.id) {
                return Err(GateError::ProjectExists);
            }
            self.known.lock().unwrap().insert(request.id.clone());
            Ok(receipt(&request.id, 1, false))
        }
    }

    fn orchestrator(
        gate: ScriptedGate,
    ) -> (SyncOrchestrator<ScriptedGate>, Arc<MemoryProjects>) {
        let local = Arc::new(MemoryProjects::new());
        let orchestrator = SyncOrchestrator::new(gate, local.clone() as Arc<dyn LocalProjects>);
        (orchestrator, local)
    }

    #[tokio::test]
    async fn sync_all_pushes_dirty_records_and_advances_the_base() {
        let (orchestrator, local) = orchestrator(ScriptedGate::with_known(&["p1"]));
        local.track_remote("p1", "One", json!({}), 1);
        local.edit("p1", "One b", json!({"x": 1}));

        assert_eq!(orchestrator.current_status(), SyncStatus::Idle);
        let report = orchestrator.sync_all().await;

        assert_eq!(report, SyncReport { accepted: 1, conflicts: 0, failed: 0 });
        assert_eq!(orchestrator.current_status(), SyncStatus::Synced);
        assert_eq!(local.base_revision("p1"), Some(2));
        assert!(!local.is_dirty("p1"));
    }

    #[tokio::test]
    async fn conflicts_are_recorded_and_surface_as_error_status() {
        let gate = ScriptedGate::with_known(&["p1"]);
        gate.conflict_on("p1", server_row("p1", 5));
        let (orchestrator, local) = orchestrator(gate);
        local.track_remote("p1", "One", json!({}), 1);
        local.edit("p1", "One b", json!({"x": 1}));

        let report = orchestrator.sync_all().await;

        assert_eq!(report, SyncReport { accepted: 0, conflicts: 1, failed: 0 });
        assert_eq!(orchestrator.current_status(), SyncStatus::Error);
        let server = local.conflict("p1").expect("conflict must be recorded");
        assert_eq!(server.revision, 5);
        assert!(local.is_dirty("p1"), "a conflicted record keeps its edits");
        assert_eq!(local.base_revision("p1"), Some(1), "base must not advance");
    }

    #[tokio::test]
    async fn locally_deleted_records_push_a_guarded_tombstone() {
        let gate = ScriptedGate::with_known(&["p1"]);
        let (orchestrator, local) = orchestrator(gate);
        local.track_remote("p1", "One", json!({}), 4);
        local.delete("p1");

        let report = orchestrator.sync_all().await;

        assert_eq!(report.accepted, 1);
        assert_eq!(
            *orchestrator.gate.tombstones.lock().unwrap(),
            vec![("p1".to_string(), Some(4))]
        );
    }

    #[tokio::test]
    async fn deleting_a_never_synced_record_needs_no_server_row() {
        let (orchestrator, local) = orchestrator(ScriptedGate::default());
        local.create_local("p1", "Draft", json!({}));
        local.delete("p1");

        let report = orchestrator.sync_all().await;

        assert_eq!(report, SyncReport { accepted: 1, conflicts: 0, failed: 0 });
        assert_eq!(orchestrator.current_status(), SyncStatus::Synced);
        assert!(!local.is_dirty("p1"));
    }

    #[tokio::test]
    async fn enqueued_ids_are_deduplicated_against_the_dirty_scan() {
        let (orchestrator, local) = orchestrator(ScriptedGate::with_known(&["p1"]));
        local.track_remote("p1", "One", json!({}), 1);
        local.edit("p1", "One b", json!({}));
        orchestrator.enqueue("p1");
        orchestrator.enqueue("p1");

        let report = orchestrator.sync_all().await;

        assert_eq!(report.accepted, 1);
        assert_eq!(orchestrator.gate.upserts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn claim_registers_local_records_once() {
        let gate = ScriptedGate::default();
        gate.exists_on("taken");
        let (orchestrator, local) = orchestrator(gate);
        local.create_local("fresh", "Fresh", json!({}));
        local.create_local("taken", "Taken", json!({}));

        let report = orchestrator.claim_local_projects().await;

        assert_eq!(
            report,
            ClaimReport { claimed: 1, already_existed: 1, failed: 0 }
        );
        assert_eq!(local.base_revision("fresh"), Some(1));
        // The colliding record keeps waiting for the embedder's decision.
        assert_eq!(local.pending_claims().len(), 1);

        // A second pass claims nothing new for the fresh record.
        let report = orchestrator.claim_local_projects().await;
        assert_eq!(report.claimed, 0);
    }

    #[tokio::test]
    async fn status_is_observable_through_the_watch_channel() {
        let (orchestrator, local) = orchestrator(ScriptedGate::with_known(&["p1"]));
        local.track_remote("p1", "One", json!({}), 1);
        local.edit("p1", "One b", json!({}));

        let status = orchestrator.status();
        assert_eq!(*status.borrow(), SyncStatus::Idle);

        orchestrator.sync_all().await;
        assert_eq!(*status.borrow(), SyncStatus::Synced);
    }
}
