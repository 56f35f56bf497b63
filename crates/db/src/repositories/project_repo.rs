//! Repository for the `projects` table.
//!
//! Writes are guarded by a compare-and-swap on the `revision` column.
//! Every guarded write is a single conditional statement, so the revision
//! check and the mutation are atomic with respect to concurrent writers;
//! a follow-up SELECT is issued only to classify a failed CAS (row missing
//! vs. revision moved) and to fetch the authoritative row for the caller.

use mockstage_core::types::DbId;
use sqlx::PgPool;

use crate::models::project::{
    ClaimOutcome, ClaimProject, Project, ProjectSummary, UpsertProject, WriteOutcome, WriteReceipt,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, name, data, revision, created_at, updated_at, deleted_at";

/// Columns returned to the client after an accepted write.
const RECEIPT_COLUMNS: &str = "id, revision, updated_at, deleted_at";

/// Columns for list views (no payload).
const SUMMARY_COLUMNS: &str = "id, name, revision, created_at, updated_at, deleted_at";

/// Provides revision-gated operations for projects.
///
/// All operations are scoped to `(id, user_id)`. A row owned by a
/// different user is indistinguishable from a missing row.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Find a project owned by `user_id`, tombstoned or not.
    pub async fn find(
        pool: &PgPool,
        user_id: DbId,
        id: &str,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Write a project with a compare-and-swap on its revision.
    ///
    /// With `base_revision == 0` the client asserts no server copy exists:
    /// the row is inserted at revision 1, or the write conflicts against
    /// the existing row. With a non-zero base, the write is accepted only
    /// if the current revision matches; an accepted upsert always clears
    /// `deleted_at`, reviving a tombstoned row.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        id: &str,
        input: &UpsertProject,
    ) -> Result<WriteOutcome, sqlx::Error> {
        if input.base_revision == 0 {
            let query = format!(
                "INSERT INTO projects (id, user_id, name, data, revision)
                 VALUES ($1, $2, $3, $4, 1)
                 ON CONFLICT (id, user_id) DO NOTHING
                 RETURNING {RECEIPT_COLUMNS}"
            );
            let receipt = sqlx::query_as::<_, WriteReceipt>(&query)
                .bind(id)
                .bind(user_id)
                .bind(&input.name)
                .bind(&input.data)
                .fetch_optional(pool)
                .await?;
            if let Some(receipt) = receipt {
                return Ok(WriteOutcome::Written(receipt));
            }
            // A row already exists; its revision is >= 1 and can never
            // match a zero base.
            return Ok(match Self::find(pool, user_id, id).await? {
                Some(current) => WriteOutcome::Conflict(Box::new(current)),
                None => WriteOutcome::NotFound,
            });
        }

        let query = format!(
            "UPDATE projects
             SET name = $4, data = $5, revision = revision + 1,
                 deleted_at = NULL, updated_at = NOW()
             WHERE id = $1 AND user_id = $2 AND revision = $3
             RETURNING {RECEIPT_COLUMNS}"
        );
        let receipt = sqlx::query_as::<_, WriteReceipt>(&query)
            .bind(id)
            .bind(user_id)
            .bind(input.base_revision)
            .bind(&input.name)
            .bind(&input.data)
            .fetch_optional(pool)
            .await?;
        if let Some(receipt) = receipt {
            return Ok(WriteOutcome::Written(receipt));
        }
        Ok(match Self::find(pool, user_id, id).await? {
            Some(current) => WriteOutcome::Conflict(Box::new(current)),
            None => WriteOutcome::NotFound,
        })
    }

    /// Tombstone a project.
    ///
    /// A `Some(base)` with `base != 0` is checked against the current
    /// revision like any other write. A missing or zero base forces the
    /// tombstone regardless of the current revision.
    pub async fn tombstone(
        pool: &PgPool,
        user_id: DbId,
        id: &str,
        base_revision: Option<i64>,
    ) -> Result<WriteOutcome, sqlx::Error> {
        match base_revision {
            Some(base) if base != 0 => {
                let query = format!(
                    "UPDATE projects
                     SET deleted_at = NOW(), revision = revision + 1, updated_at = NOW()
                     WHERE id = $1 AND user_id = $2 AND revision = $3
                     RETURNING {RECEIPT_COLUMNS}"
                );
                let receipt = sqlx::query_as::<_, WriteReceipt>(&query)
                    .bind(id)
                    .bind(user_id)
                    .bind(base)
                    .fetch_optional(pool)
                    .await?;
                if let Some(receipt) = receipt {
                    return Ok(WriteOutcome::Written(receipt));
                }
                Ok(match Self::find(pool, user_id, id).await? {
                    Some(current) => WriteOutcome::Conflict(Box::new(current)),
                    None => WriteOutcome::NotFound,
                })
            }
            _ => {
                let query = format!(
                    "UPDATE projects
                     SET deleted_at = NOW(), revision = revision + 1, updated_at = NOW()
                     WHERE id = $1 AND user_id = $2
                     RETURNING {RECEIPT_COLUMNS}"
                );
                let receipt = sqlx::query_as::<_, WriteReceipt>(&query)
                    .bind(id)
                    .bind(user_id)
                    .fetch_optional(pool)
                    .await?;
                Ok(match receipt {
                    Some(receipt) => WriteOutcome::Written(receipt),
                    None => WriteOutcome::NotFound,
                })
            }
        }
    }

    /// List the caller's projects, most recently updated first. Tombstoned
    /// rows are filtered out unless `include_deleted` is set.
    pub async fn list(
        pool: &PgPool,
        user_id: DbId,
        include_deleted: bool,
    ) -> Result<Vec<ProjectSummary>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM projects
             WHERE user_id = $1 AND ($2 OR deleted_at IS NULL)
             ORDER BY updated_at DESC"
        );
        sqlx::query_as::<_, ProjectSummary>(&query)
            .bind(user_id)
            .bind(include_deleted)
            .fetch_all(pool)
            .await
    }

    /// One-time create for a project authored before the caller had a
    /// session. Unlike `upsert` with a zero base, a pre-existing row is
    /// reported as [`ClaimOutcome::AlreadyExists`] and left untouched.
    pub async fn claim(
        pool: &PgPool,
        user_id: DbId,
        input: &ClaimProject,
    ) -> Result<ClaimOutcome, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (id, user_id, name, data, revision)
             VALUES ($1, $2, $3, $4, 1)
             ON CONFLICT (id, user_id) DO NOTHING
             RETURNING {RECEIPT_COLUMNS}"
        );
        let receipt = sqlx::query_as::<_, WriteReceipt>(&query)
            .bind(&input.id)
            .bind(user_id)
            .bind(&input.name)
            .bind(&input.data)
            .fetch_optional(pool)
            .await?;
        Ok(match receipt {
            Some(receipt) => ClaimOutcome::Created(receipt),
            None => ClaimOutcome::AlreadyExists,
        })
    }
}
