pub mod auth;
pub mod health;
pub mod task;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /register                                  register (public)
/// /login                                     login (public)
/// /logout                                    logout (requires auth)
/// /user                                      current user (requires auth)
///
/// /projects/{project_id}/tasks               list, create
/// /tasks/{id}                                get, update, delete
/// /tasks/{id}/attachments/{media_id}         remove attachment
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(task::router())
}
