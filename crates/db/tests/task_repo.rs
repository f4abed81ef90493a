//! Integration tests for the task repository.
//!
//! Exercises `TaskRepo` against a real database to verify:
//! - create/get round-trips and DTO hydration
//! - sparse patches, including the empty patch
//! - soft delete hides tasks from every read
//! - status/date filters and their intersection
//! - attachment staging, cleanup on failure, and idempotent detach
//! - row locks serialize writers to the same task

use std::path::Path;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use sqlx::PgPool;
use taskboard_core::error::CoreError;
use taskboard_core::filter::{TaskFilter, TaskFilterField};
use taskboard_core::storage::{
    AttachmentStore, FileUpload, LocalAttachmentStore, StagedFile, StorageError,
};
use taskboard_core::task::TaskStatus;
use taskboard_core::types::{Date, DbId};
use taskboard_db::models::project::CreateProject;
use taskboard_db::models::task::{CreateTask, UpdateTask};
use taskboard_db::models::user::CreateUser;
use taskboard_db::repositories::{ProjectRepo, TaskRepo, UserRepo};
use taskboard_db::RepoError;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_project(pool: &PgPool, name: &str) -> DbId {
    ProjectRepo::create(
        pool,
        &CreateProject {
            name: name.to_string(),
            description: Some("repository test".to_string()),
        },
    )
    .await
    .unwrap()
    .id
}

async fn seed_user(pool: &PgPool, email: &str) -> DbId {
    UserRepo::create(
        pool,
        &CreateUser {
            name: "Ada".to_string(),
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

fn new_task(project_id: DbId, title: &str, status: TaskStatus) -> CreateTask {
    CreateTask {
        title: title.to_string(),
        description: None,
        status,
        assignee_id: None,
        project_id,
        completion_date: None,
    }
}

fn date(y: i32, m: u32, d: u32) -> Date {
    Date::from_ymd_opt(y, m, d).unwrap()
}

fn pdf_upload(size: usize) -> FileUpload {
    FileUpload {
        file_name: "document.pdf".to_string(),
        mime_type: "application/pdf".to_string(),
        bytes: vec![0x25; size],
    }
}

fn staged_files(root: &Path) -> usize {
    match std::fs::read_dir(root.join(".staging")) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

/// Store whose `promote` always fails, to drive the cleanup path.
struct FailingPromoteStore {
    inner: LocalAttachmentStore,
}

#[async_trait]
impl AttachmentStore for FailingPromoteStore {
    async fn stage(&self, upload: &FileUpload) -> Result<StagedFile, StorageError> {
        self.inner.stage(upload).await
    }

    async fn promote(&self, _staged: &StagedFile, key: &str) -> Result<(), StorageError> {
        Err(StorageError::InvalidKey(key.to_string()))
    }

    async fn discard(&self, staged: &StagedFile) -> Result<(), StorageError> {
        self.inner.discard(staged).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.delete(key).await
    }

    fn url(&self, key: &str) -> String {
        self.inner.url(key)
    }
}

// ---------------------------------------------------------------------------
// Test: create then get_by_id round-trips every field
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_and_get_round_trip(pool: PgPool) {
    let project_id = seed_project(&pool, "Round Trip").await;
    let assignee_id = seed_user(&pool, "ada@example.com").await;

    let input = CreateTask {
        title: "Write report".to_string(),
        description: Some("quarterly numbers".to_string()),
        status: TaskStatus::InProgress,
        assignee_id: Some(assignee_id),
        project_id,
        completion_date: Some(date(2030, 1, 15)),
    };
    let created = TaskRepo::create(&pool, &input).await.unwrap();
    let fetched = TaskRepo::get_by_id(&pool, created.id).await.unwrap();

    assert_eq!(created, fetched);
    assert_eq!(fetched.title, "Write report");
    assert_eq!(fetched.description.as_deref(), Some("quarterly numbers"));
    assert_eq!(fetched.status, TaskStatus::InProgress);
    assert_eq!(fetched.project_id, project_id);
    assert_eq!(fetched.assignee_id, Some(assignee_id));
    assert_eq!(fetched.completion_date.as_deref(), Some("2030-01-15"));
    assert_eq!(fetched.project.name, "Round Trip");
    assert_eq!(fetched.assignee.unwrap().email, "ada@example.com");
    assert!(fetched.attachments.is_empty());
}

// ---------------------------------------------------------------------------
// Test: the "Test Project" / "Test Task" scenario
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_single_task_listed_for_project(pool: PgPool) {
    let project_id = seed_project(&pool, "Test Project").await;
    let task = TaskRepo::create(&pool, &new_task(project_id, "Test Task", TaskStatus::Planned))
        .await
        .unwrap();

    assert!(task.completion_date.is_none());
    assert_eq!(task.status, TaskStatus::Planned);

    let listed = TaskRepo::get_by_project(&pool, project_id, &[]).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, task.id);
}

// ---------------------------------------------------------------------------
// Test: get_by_id on a missing task is NotFound
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_get_missing_task_is_not_found(pool: PgPool) {
    let result = TaskRepo::get_by_id(&pool, 999_999).await;
    assert_matches!(
        result,
        Err(RepoError::Core(CoreError::NotFound { entity: "Task", id: 999_999 }))
    );
}

// ---------------------------------------------------------------------------
// Test: patches
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_empty_patch_changes_nothing(pool: PgPool) {
    let project_id = seed_project(&pool, "Patch").await;
    let before = TaskRepo::create(&pool, &new_task(project_id, "Stable", TaskStatus::Planned))
        .await
        .unwrap();

    TaskRepo::update(&pool, before.id, &UpdateTask::default())
        .await
        .unwrap();

    let after = TaskRepo::get_by_id(&pool, before.id).await.unwrap();
    assert_eq!(before, after, "empty patch must not touch any column");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_patch_applies_only_present_fields(pool: PgPool) {
    let project_id = seed_project(&pool, "Patch").await;
    let mut input = new_task(project_id, "Original", TaskStatus::Planned);
    input.description = Some("keep me".to_string());
    let task = TaskRepo::create(&pool, &input).await.unwrap();

    let patch = UpdateTask {
        status: Some(TaskStatus::Done),
        completion_date: Some(date(2030, 3, 1)),
        ..Default::default()
    };
    TaskRepo::update(&pool, task.id, &patch).await.unwrap();

    let updated = TaskRepo::get_by_id(&pool, task.id).await.unwrap();
    assert_eq!(updated.title, "Original");
    assert_eq!(updated.description.as_deref(), Some("keep me"));
    assert_eq!(updated.status, TaskStatus::Done);
    assert_eq!(updated.completion_date.as_deref(), Some("2030-03-01"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_same_patch_twice_is_idempotent(pool: PgPool) {
    let project_id = seed_project(&pool, "Patch").await;
    let task = TaskRepo::create(&pool, &new_task(project_id, "Twice", TaskStatus::Planned))
        .await
        .unwrap();

    let patch = UpdateTask {
        title: Some("Renamed".to_string()),
        status: Some(TaskStatus::InProgress),
        ..Default::default()
    };
    TaskRepo::update(&pool, task.id, &patch).await.unwrap();
    let once = TaskRepo::get_by_id(&pool, task.id).await.unwrap();
    TaskRepo::update(&pool, task.id, &patch).await.unwrap();
    let twice = TaskRepo::get_by_id(&pool, task.id).await.unwrap();

    assert_eq!(once.title, twice.title);
    assert_eq!(once.description, twice.description);
    assert_eq!(once.status, twice.status);
    assert_eq!(once.completion_date, twice.completion_date);
    assert_eq!(once.assignee_id, twice.assignee_id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_missing_task_is_not_found(pool: PgPool) {
    let patch = UpdateTask {
        title: Some("ghost".to_string()),
        ..Default::default()
    };
    let result = TaskRepo::update(&pool, 424_242, &patch).await;
    assert!(result.unwrap_err().is_not_found());
}

// ---------------------------------------------------------------------------
// Test: soft delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_hides_task_from_reads(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalAttachmentStore::new(dir.path(), "http://localhost/storage");
    let project_id = seed_project(&pool, "Delete").await;
    let task = TaskRepo::create(&pool, &new_task(project_id, "Doomed", TaskStatus::Planned))
        .await
        .unwrap();

    TaskRepo::delete(&pool, &store, task.id).await.unwrap();

    assert!(TaskRepo::get_by_id(&pool, task.id)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(TaskRepo::get_by_project(&pool, project_id, &[])
        .await
        .unwrap()
        .is_empty());

    // The row is tombstoned, not removed.
    let (deleted,): (bool,) =
        sqlx::query_as("SELECT deleted_at IS NOT NULL FROM tasks WHERE id = $1")
            .bind(task.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(deleted);

    // A second delete finds nothing to lock.
    assert!(TaskRepo::delete(&pool, &store, task.id)
        .await
        .unwrap_err()
        .is_not_found());
}

// ---------------------------------------------------------------------------
// Test: filters
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_status_and_date_filters_narrow_results(pool: PgPool) {
    let project_id = seed_project(&pool, "Filters").await;
    let other_project = seed_project(&pool, "Elsewhere").await;
    let due = date(2030, 6, 1);

    let mut planned_due = new_task(project_id, "planned due", TaskStatus::Planned);
    planned_due.completion_date = Some(due);
    let planned_due = TaskRepo::create(&pool, &planned_due).await.unwrap();

    let planned_later = TaskRepo::create(
        &pool,
        &new_task(project_id, "planned undated", TaskStatus::Planned),
    )
    .await
    .unwrap();

    let mut done_due = new_task(project_id, "done due", TaskStatus::Done);
    done_due.completion_date = Some(due);
    TaskRepo::create(&pool, &done_due).await.unwrap();

    TaskRepo::create(
        &pool,
        &new_task(other_project, "other planned", TaskStatus::Planned),
    )
    .await
    .unwrap();

    let status = TaskFilter::string_eq(TaskFilterField::Status, "planned");
    let mut planned: Vec<DbId> = TaskRepo::get_by_project(&pool, project_id, &[status.clone()])
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    planned.sort_unstable();
    assert_eq!(planned, vec![planned_due.id, planned_later.id]);

    let by_date = TaskFilter::date_eq(TaskFilterField::CompletionDate, due);
    let both = TaskRepo::get_by_project(&pool, project_id, &[status.clone(), by_date.clone()])
        .await
        .unwrap();
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].id, planned_due.id);

    // Filter order only affects SQL construction.
    let reversed = TaskRepo::get_by_project(&pool, project_id, &[by_date, status])
        .await
        .unwrap();
    assert_eq!(reversed, both);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_listing_spans_multiple_chunks(pool: PgPool) {
    let project_id = seed_project(&pool, "Bulk").await;
    for i in 0..230 {
        TaskRepo::create(
            &pool,
            &new_task(project_id, &format!("task {i}"), TaskStatus::Planned),
        )
        .await
        .unwrap();
    }

    let tasks = TaskRepo::get_by_project(&pool, project_id, &[]).await.unwrap();
    assert_eq!(tasks.len(), 230);
    assert!(tasks.windows(2).all(|w| w[0].id < w[1].id));
}

// ---------------------------------------------------------------------------
// Test: attachments
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_attach_and_detach_document(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalAttachmentStore::new(dir.path(), "http://localhost/storage");
    let project_id = seed_project(&pool, "Files").await;
    let task = TaskRepo::create(&pool, &new_task(project_id, "With file", TaskStatus::Planned))
        .await
        .unwrap();

    let media = TaskRepo::attach_file(&pool, &store, task.id, &pdf_upload(102_400))
        .await
        .unwrap();

    let fetched = TaskRepo::get_by_id(&pool, task.id).await.unwrap();
    assert_eq!(fetched.attachments.len(), 1);
    assert_eq!(fetched.attachments[0].file_name, "document.pdf");
    assert_eq!(fetched.attachments[0].name, "document");
    assert_eq!(fetched.attachments[0].mime_type, "application/pdf");
    assert_eq!(fetched.attachments[0].size, 102_400);
    assert!(fetched.attachments[0]
        .url
        .starts_with("http://localhost/storage/tasks/"));
    assert_eq!(staged_files(dir.path()), 0, "staging area must be empty");

    TaskRepo::detach_file(&pool, &store, task.id, media.id)
        .await
        .unwrap();
    let fetched = TaskRepo::get_by_id(&pool, task.id).await.unwrap();
    assert!(fetched.attachments.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_detach_unknown_attachment_is_noop(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalAttachmentStore::new(dir.path(), "http://localhost/storage");
    let project_id = seed_project(&pool, "Files").await;
    let task = TaskRepo::create(&pool, &new_task(project_id, "Keep file", TaskStatus::Planned))
        .await
        .unwrap();
    let kept = TaskRepo::attach_file(&pool, &store, task.id, &pdf_upload(16))
        .await
        .unwrap();

    TaskRepo::detach_file(&pool, &store, task.id, kept.id + 1_000)
        .await
        .unwrap();

    let fetched = TaskRepo::get_by_id(&pool, task.id).await.unwrap();
    assert_eq!(fetched.attachments, vec![kept]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_attach_leaves_no_staged_file(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let store = FailingPromoteStore {
        inner: LocalAttachmentStore::new(dir.path(), "http://localhost/storage"),
    };
    let project_id = seed_project(&pool, "Files").await;
    let task = TaskRepo::create(&pool, &new_task(project_id, "Broken", TaskStatus::Planned))
        .await
        .unwrap();

    let result = TaskRepo::attach_file(&pool, &store, task.id, &pdf_upload(64)).await;
    assert_matches!(result, Err(RepoError::Storage(_)));
    assert_eq!(staged_files(dir.path()), 0);

    // The metadata insert was rolled back with the transaction.
    let fetched = TaskRepo::get_by_id(&pool, task.id).await.unwrap();
    assert!(fetched.attachments.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_attach_to_missing_task_cleans_up(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalAttachmentStore::new(dir.path(), "http://localhost/storage");

    let result = TaskRepo::attach_file(&pool, &store, 31_337, &pdf_upload(64)).await;
    assert!(result.unwrap_err().is_not_found());
    assert_eq!(staged_files(dir.path()), 0);
}

// ---------------------------------------------------------------------------
// Test: row lock serializes concurrent writers
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_waits_for_row_lock(pool: PgPool) {
    let project_id = seed_project(&pool, "Locks").await;
    let task = TaskRepo::create(&pool, &new_task(project_id, "Contended", TaskStatus::Planned))
        .await
        .unwrap();

    // Hold the row lock in an outside transaction.
    let mut holder = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM tasks WHERE id = $1 FOR UPDATE")
        .bind(task.id)
        .fetch_one(&mut *holder)
        .await
        .unwrap();
    sqlx::query("UPDATE tasks SET title = 'first writer' WHERE id = $1")
        .bind(task.id)
        .execute(&mut *holder)
        .await
        .unwrap();

    let writer_pool = pool.clone();
    let task_id = task.id;
    let writer = tokio::spawn(async move {
        let patch = UpdateTask {
            status: Some(TaskStatus::Done),
            ..Default::default()
        };
        TaskRepo::update(&writer_pool, task_id, &patch).await
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!writer.is_finished(), "update must block behind the lock holder");

    holder.commit().await.unwrap();
    writer.await.unwrap().unwrap();

    // The later writer saw the first writer's commit: nothing was lost.
    let fetched = TaskRepo::get_by_id(&pool, task.id).await.unwrap();
    assert_eq!(fetched.title, "first writer");
    assert_eq!(fetched.status, TaskStatus::Done);
}
