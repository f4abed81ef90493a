//! Integration tests for the notification dispatcher.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use sqlx::PgPool;
use taskboard_core::task::TaskStatus;
use taskboard_db::models::project::CreateProject;
use taskboard_db::models::task::CreateTask;
use taskboard_db::models::user::CreateUser;
use taskboard_db::repositories::{ProjectRepo, TaskRepo, UserRepo};
use taskboard_events::{
    DispatchError, EmailError, EmailMessage, Mailer, NotificationDispatcher, NotificationQueue,
};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

async fn seed_task(pool: &PgPool, assigned: bool) -> i64 {
    let project = ProjectRepo::create(
        pool,
        &CreateProject {
            name: "Test Project".to_string(),
            description: None,
        },
    )
    .await
    .unwrap();

    let assignee_id = if assigned {
        let user = UserRepo::create(
            pool,
            &CreateUser {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "hash".to_string(),
            },
        )
        .await
        .unwrap();
        Some(user.id)
    } else {
        None
    };

    TaskRepo::create(
        pool,
        &CreateTask {
            title: "Test Task".to_string(),
            description: None,
            status: TaskStatus::Planned,
            assignee_id,
            project_id: project.id,
            completion_date: None,
        },
    )
    .await
    .unwrap()
    .id
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_assigned_task_sends_email(pool: PgPool) {
    let task_id = seed_task(&pool, true).await;
    let mailer = Arc::new(RecordingMailer::default());
    let dispatcher = NotificationDispatcher::new(pool, mailer.clone(), "http://app.test");

    assert!(dispatcher.notify_task_created(task_id).await.unwrap());

    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ada@example.com");
    assert_eq!(sent[0].subject, "New Task Assigned: Test Task");
    assert!(sent[0]
        .body
        .contains(&format!("View Task: http://app.test/tasks/{task_id}")));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unassigned_task_is_skipped(pool: PgPool) {
    let task_id = seed_task(&pool, false).await;
    let mailer = Arc::new(RecordingMailer::default());
    let dispatcher = NotificationDispatcher::new(pool, mailer.clone(), "http://app.test");

    assert!(!dispatcher.notify_task_created(task_id).await.unwrap());
    assert!(mailer.sent.lock().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_task_is_an_error(pool: PgPool) {
    let mailer = Arc::new(RecordingMailer::default());
    let dispatcher = NotificationDispatcher::new(pool, mailer, "http://app.test");

    assert_matches!(
        dispatcher.notify_task_created(777).await,
        Err(DispatchError::Repo(ref e)) if e.is_not_found()
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_run_drains_queue_until_cancelled(pool: PgPool) {
    let task_id = seed_task(&pool, true).await;
    let mailer = Arc::new(RecordingMailer::default());
    let dispatcher = NotificationDispatcher::new(pool, mailer.clone(), "http://app.test");
    let (queue, rx) = NotificationQueue::new(8);
    let cancel = CancellationToken::new();

    let worker_cancel = cancel.clone();
    let worker = tokio::spawn(async move { dispatcher.run(rx, worker_cancel).await });

    // A missing task must not stop the loop.
    assert!(queue.enqueue(9_999));
    assert!(queue.enqueue(task_id));

    for _ in 0..50 {
        if !mailer.sent.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cancel.cancel();
    worker.await.unwrap();

    assert_eq!(mailer.sent.lock().unwrap().len(), 1);
}
