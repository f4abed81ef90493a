//! Bounded queue of "task created" notifications.
//!
//! The producer side never blocks and never fails: a full or closed queue is
//! logged and the notification is dropped.

use taskboard_core::types::DbId;
use tokio::sync::mpsc;

/// Default capacity when `NOTIFICATION_QUEUE_CAPACITY` is not configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Producer handle, cheap to clone into application state.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: mpsc::Sender<DbId>,
}

impl NotificationQueue {
    /// Create a queue and the receiver to hand to the dispatcher.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DbId>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Announce that task `task_id` was created.
    ///
    /// Returns `false` when the notification was dropped.
    pub fn enqueue(&self, task_id: DbId) -> bool {
        match self.sender.try_send(task_id) {
            Ok(()) => {
                tracing::debug!(task_id, "Task notification queued");
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(task_id, "Notification queue full, dropping task notification");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(task_id, "Notification queue closed, dropping task notification");
                false
            }
        }
    }
}
