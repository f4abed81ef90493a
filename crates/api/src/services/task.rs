//! Task use cases.
//!
//! Handlers call [`TaskService`] instead of the repositories so that
//! cross-entity checks and side effects (notifications) live in one place.
//! Everything except creation is a straight pass-through.

use std::sync::Arc;

use taskboard_core::error::CoreError;
use taskboard_core::filter::TaskFilter;
use taskboard_core::storage::{AttachmentStore, FileUpload};
use taskboard_core::types::DbId;
use taskboard_db::models::media::MediaDto;
use taskboard_db::models::task::{CreateTask, TaskDto, UpdateTask};
use taskboard_db::repositories::{ProjectRepo, TaskRepo};
use taskboard_db::{DbPool, RepoError};
use taskboard_events::NotificationQueue;

#[derive(Clone)]
pub struct TaskService {
    pool: DbPool,
    store: Arc<dyn AttachmentStore>,
    notifications: NotificationQueue,
}

impl TaskService {
    pub fn new(
        pool: DbPool,
        store: Arc<dyn AttachmentStore>,
        notifications: NotificationQueue,
    ) -> Self {
        Self {
            pool,
            store,
            notifications,
        }
    }

    pub async fn get_tasks_by_project(
        &self,
        project_id: DbId,
        filters: &[TaskFilter],
    ) -> Result<Vec<TaskDto>, RepoError> {
        TaskRepo::get_by_project(&self.pool, project_id, filters).await
    }

    /// Create a task in `project_id` and queue its notification.
    ///
    /// Fails with `NotFound("Project")` before anything is written when the
    /// project is missing or soft-deleted. `request.project_id` is replaced
    /// by `project_id`.
    pub async fn create_task(
        &self,
        project_id: DbId,
        mut request: CreateTask,
    ) -> Result<TaskDto, RepoError> {
        if !ProjectRepo::project_exists(&self.pool, project_id).await? {
            return Err(CoreError::not_found("Project", project_id).into());
        }

        request.project_id = project_id;
        let task = TaskRepo::create(&self.pool, &request).await?;
        tracing::info!(task_id = task.id, project_id, "Task created");

        self.notifications.enqueue(task.id);
        Ok(task)
    }

    pub async fn get_task(&self, id: DbId) -> Result<TaskDto, RepoError> {
        TaskRepo::get_by_id(&self.pool, id).await
    }

    pub async fn update_task(&self, id: DbId, patch: &UpdateTask) -> Result<(), RepoError> {
        TaskRepo::update(&self.pool, id, patch).await
    }

    pub async fn delete_task(&self, id: DbId) -> Result<(), RepoError> {
        TaskRepo::delete(&self.pool, self.store.as_ref(), id).await?;
        tracing::info!(task_id = id, "Task deleted");
        Ok(())
    }

    pub async fn attach_file(&self, id: DbId, upload: &FileUpload) -> Result<MediaDto, RepoError> {
        TaskRepo::attach_file(&self.pool, self.store.as_ref(), id, upload).await
    }

    pub async fn detach_file(&self, id: DbId, media_id: DbId) -> Result<(), RepoError> {
        TaskRepo::detach_file(&self.pool, self.store.as_ref(), id, media_id).await
    }
}
