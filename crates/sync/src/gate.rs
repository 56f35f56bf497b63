//! The typed contract of the server-side revision gate.
//!
//! [`ProjectGate`] mirrors the HTTP surface one method per operation, so
//! the orchestrator can be driven against [`HttpGate`](crate::HttpGate) in
//! production and against a scripted gate in tests.

use async_trait::async_trait;
use mockstage_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Wire DTOs
// ---------------------------------------------------------------------------

/// A full project row as returned by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProject {
    pub id: String,
    pub user_id: DbId,
    pub name: String,
    pub data: Value,
    pub revision: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// A lightweight row from the list endpoint (no payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSummary {
    pub id: String,
    pub name: String,
    pub revision: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// Receipt for an accepted write: the new base revision for this client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReceipt {
    pub id: String,
    pub revision: i64,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub deleted_at: Option<Timestamp>,
}

/// Body of a guarded upsert.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRequest {
    pub name: String,
    pub data: Value,
    /// The revision this client last saw; `0` asserts no server copy exists.
    pub base_revision: i64,
}

/// Body of a one-time claim.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub id: String,
    pub name: String,
    pub data: Value,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Client-side mirror of the gate's error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// No or invalid session; the user must re-authenticate.
    #[error("no valid session")]
    Unauthorized,

    /// The id is unknown (or owned by someone else -- the server does not
    /// distinguish the two).
    #[error("project not found")]
    NotFound,

    /// The write lost the revision race. Carries the authoritative server
    /// row so the caller can rebase without another fetch.
    #[error("revision conflict at server revision {}", server.revision)]
    Conflict { server: Box<RemoteProject> },

    /// A claim targeted an id the caller already owns server-side.
    #[error("project already exists")]
    ProjectExists,

    /// The request was malformed; a client bug, not retried.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request never produced a server verdict.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server failed unexpectedly.
    #[error("server error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// Gate trait
// ---------------------------------------------------------------------------

/// Asynchronous access to the revision gate, one method per operation.
///
/// Every call is independent and stateless; the server applies or rejects
/// it atomically whether or not the caller is still listening.
#[async_trait]
pub trait ProjectGate: Send + Sync {
    /// Fetch the full row.
    async fn fetch(&self, id: &str) -> Result<RemoteProject, GateError>;

    /// Write guarded by `request.base_revision`; an accepted write revives
    /// a tombstoned row.
    async fn upsert(&self, id: &str, request: &UpsertRequest) -> Result<WriteReceipt, GateError>;

    /// Soft-delete. A `None` base forces the tombstone regardless of the
    /// server's current revision.
    async fn tombstone(
        &self,
        id: &str,
        base_revision: Option<i64>,
    ) -> Result<WriteReceipt, GateError>;

    /// The caller's rows, most recently updated first.
    async fn list(&self, include_deleted: bool) -> Result<Vec<RemoteSummary>, GateError>;

    /// One-time create; fails with [`GateError::ProjectExists`] instead of
    /// overwriting.
    async fn claim(&self, request: &ClaimRequest) -> Result<WriteReceipt, GateError>;
}
