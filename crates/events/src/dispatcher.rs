//! Background worker that turns queued task ids into emails.

use std::sync::Arc;

use taskboard_core::types::DbId;
use taskboard_db::repositories::TaskRepo;
use taskboard_db::{DbPool, RepoError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::delivery::email::EmailError;
use crate::delivery::Mailer;
use crate::message::compose_task_created_email;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to load task: {0}")]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Email(#[from] EmailError),
}

/// Drains the notification queue and mails task assignees.
pub struct NotificationDispatcher {
    pool: DbPool,
    mailer: Arc<dyn Mailer>,
    app_url: String,
}

impl NotificationDispatcher {
    /// `app_url` is the public base URL used in "View Task" links.
    pub fn new(pool: DbPool, mailer: Arc<dyn Mailer>, app_url: impl Into<String>) -> Self {
        Self {
            pool,
            mailer,
            app_url: app_url.into(),
        }
    }

    /// Run until `cancel` fires or every queue producer is dropped.
    ///
    /// A failed notification is logged and the loop moves on.
    pub async fn run(&self, mut receiver: mpsc::Receiver<DbId>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Notification dispatcher cancelled");
                    break;
                }
                next = receiver.recv() => match next {
                    Some(task_id) => {
                        if let Err(e) = self.notify_task_created(task_id).await {
                            tracing::error!(task_id, error = %e, "Failed to send task notification");
                        }
                    }
                    None => {
                        tracing::info!("Notification queue closed, dispatcher shutting down");
                        break;
                    }
                },
            }
        }
    }

    /// Mail the assignee of `task_id`. Returns `false` when the task has no
    /// assignee and nothing was sent.
    pub async fn notify_task_created(&self, task_id: DbId) -> Result<bool, DispatchError> {
        let task = TaskRepo::get_by_id(&self.pool, task_id).await?;

        let Some(message) = compose_task_created_email(&task, &self.app_url) else {
            tracing::debug!(task_id, "Task has no assignee, skipping notification");
            return Ok(false);
        };

        self.mailer.send(&message).await?;
        Ok(true)
    }
}
