//! Project entity model, write inputs, and write outcomes.

use mockstage_core::types::{DbId, ProjectId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A project row from the `projects` table.
///
/// `data` is the opaque document payload; the server stores and returns it
/// without ever inspecting its structure. A non-null `deleted_at` marks a
/// tombstone — still a normal row, revivable by a later accepted upsert.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub user_id: DbId,
    pub name: String,
    pub data: serde_json::Value,
    pub revision: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// A lightweight project record for list views: everything but the payload.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub revision: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// What the client gets back after an accepted write: enough to advance its
/// base revision without re-fetching the row.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReceipt {
    pub id: ProjectId,
    pub revision: i64,
    pub updated_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

/// Input for a guarded upsert.
#[derive(Debug, Clone)]
pub struct UpsertProject {
    pub name: String,
    pub data: serde_json::Value,
    /// The revision the client last saw; `0` means "no server copy exists".
    pub base_revision: i64,
}

/// Input for the one-time claim of a locally-created project.
#[derive(Debug, Clone)]
pub struct ClaimProject {
    pub id: ProjectId,
    pub name: String,
    pub data: serde_json::Value,
}

/// Result of a write guarded by the revision counter.
#[derive(Debug)]
pub enum WriteOutcome {
    /// The compare-and-swap succeeded and the revision advanced by one.
    Written(WriteReceipt),
    /// The row exists but its revision did not match the client's base.
    /// Carries the authoritative server row so the caller can rebase
    /// without an extra round trip.
    Conflict(Box<Project>),
    /// No row owned by the caller exists under this id.
    NotFound,
}

/// Result of a claim.
#[derive(Debug)]
pub enum ClaimOutcome {
    Created(WriteReceipt),
    /// The caller already owns a row with this id; nothing was written.
    AlreadyExists,
}
