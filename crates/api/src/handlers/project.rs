//! Handlers for the `/projects` resource.
//!
//! Every operation is scoped to the authenticated user; a row owned by
//! someone else responds exactly like a missing row so ids leak nothing.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use mockstage_core::error::CoreError;
use mockstage_db::models::project::{
    ClaimOutcome, ClaimProject, Project, ProjectSummary, UpsertProject, WriteOutcome, WriteReceipt,
};
use mockstage_db::repositories::ProjectRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / query parameter types
// ---------------------------------------------------------------------------

/// Body for `PUT /projects/{id}`.
///
/// `name` and `data` are required but modeled as `Option` so their absence
/// maps to a 400 with a clear message rather than a deserialization
/// rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProjectBody {
    pub name: Option<String>,
    pub data: Option<serde_json::Value>,
    /// The revision the client last saw; `0` (the default) asserts that no
    /// server copy exists yet.
    #[serde(default)]
    pub base_revision: i64,
}

/// Optional body for `DELETE /projects/{id}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TombstoneProjectBody {
    pub base_revision: Option<i64>,
}

/// Body for `POST /projects`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimProjectBody {
    pub id: Option<String>,
    pub name: Option<String>,
    pub data: Option<serde_json::Value>,
}

/// Query parameters for `GET /projects`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// `1` includes tombstoned projects; `0` (the default) filters them out.
    #[serde(default)]
    pub include_deleted: u8,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/projects/{id}
pub async fn fetch(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Project>> {
    let project = ProjectRepo::find(&state.pool, user.user_id, &id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))?;
    Ok(Json(project))
}

/// PUT /api/v1/projects/{id}
pub async fn upsert(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpsertProjectBody>,
) -> AppResult<Json<WriteReceipt>> {
    let (Some(name), Some(data)) = (body.name, body.data) else {
        return Err(AppError::BadRequest("name and data are required".into()));
    };
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    if body.base_revision < 0 {
        return Err(AppError::BadRequest(
            "baseRevision must be non-negative".into(),
        ));
    }

    let input = UpsertProject {
        name,
        data,
        base_revision: body.base_revision,
    };
    match ProjectRepo::upsert(&state.pool, user.user_id, &id, &input).await? {
        WriteOutcome::Written(receipt) => Ok(Json(receipt)),
        WriteOutcome::Conflict(server) => Err(AppError::RevisionConflict(server)),
        WriteOutcome::NotFound => Err(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        })),
    }
}

/// DELETE /api/v1/projects/{id}
///
/// The body is optional; a missing or zero `baseRevision` forces the
/// tombstone regardless of the current server revision.
pub async fn tombstone(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Option<Json<TombstoneProjectBody>>,
) -> AppResult<Json<WriteReceipt>> {
    let base_revision = body.and_then(|Json(b)| b.base_revision);

    match ProjectRepo::tombstone(&state.pool, user.user_id, &id, base_revision).await? {
        WriteOutcome::Written(receipt) => Ok(Json(receipt)),
        WriteOutcome::Conflict(server) => Err(AppError::RevisionConflict(server)),
        WriteOutcome::NotFound => Err(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        })),
    }
}

/// GET /api/v1/projects
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Vec<ProjectSummary>>> {
    let include_deleted = params.include_deleted != 0;
    let projects = ProjectRepo::list(&state.pool, user.user_id, include_deleted).await?;
    Ok(Json(projects))
}

/// POST /api/v1/projects
///
/// One-time registration of a project created before the user had a
/// session. Unlike the upsert create path, an existing row is a distinct
/// conflict and is never overwritten.
pub async fn claim(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<ClaimProjectBody>,
) -> AppResult<(StatusCode, Json<WriteReceipt>)> {
    let (Some(id), Some(name), Some(data)) = (body.id, body.name, body.data) else {
        return Err(AppError::BadRequest("id, name and data are required".into()));
    };
    if id.trim().is_empty() || name.trim().is_empty() {
        return Err(AppError::BadRequest("id and name must not be empty".into()));
    }

    let input = ClaimProject { id, name, data };
    match ProjectRepo::claim(&state.pool, user.user_id, &input).await? {
        ClaimOutcome::Created(receipt) => Ok((StatusCode::CREATED, Json(receipt))),
        ClaimOutcome::AlreadyExists => Err(AppError::ProjectExists(input.id)),
    }
}
