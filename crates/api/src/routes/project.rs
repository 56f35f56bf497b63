//! Route definitions for the `/projects` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::project;
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /         -> list
/// POST   /         -> claim
/// GET    /{id}     -> fetch
/// PUT    /{id}     -> upsert
/// DELETE /{id}     -> tombstone
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(project::list).post(project::claim))
        .route(
            "/{id}",
            get(project::fetch)
                .put(project::upsert)
                .delete(project::tombstone),
        )
}
