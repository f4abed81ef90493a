use std::sync::Arc;

use crate::config::ServerConfig;
use crate::services::TaskService;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: inner data is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: taskboard_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Task operations (repository, attachment store, notifications).
    pub tasks: TaskService,
}
