//! Route definitions for tasks.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::task;
use crate::state::AppState;

/// ```text
/// GET    /projects/{project_id}/tasks          -> index
/// POST   /projects/{project_id}/tasks          -> store
/// GET    /tasks/{id}                           -> show
/// PUT    /tasks/{id}                           -> update
/// DELETE /tasks/{id}                           -> destroy
/// DELETE /tasks/{id}/attachments/{media_id}    -> detach
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{project_id}/tasks",
            get(task::index).post(task::store),
        )
        .route(
            "/tasks/{id}",
            get(task::show).put(task::update).delete(task::destroy),
        )
        .route("/tasks/{id}/attachments/{media_id}", delete(task::detach))
}
