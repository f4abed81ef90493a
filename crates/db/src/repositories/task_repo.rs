//! Repository for the `tasks` table.
//!
//! Reads return fully hydrated [`TaskDto`]s (project, assignee, attachments).
//! Every mutation locks the live task row with `SELECT ... FOR UPDATE` inside
//! its own transaction, so concurrent writers to one task are serialized while
//! writers to different tasks proceed independently.

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use taskboard_core::error::CoreError;
use taskboard_core::filter::TaskFilter;
use taskboard_core::storage::{
    attachment_key, display_name, sanitize_file_name, AttachmentStore, FileUpload, StagedFile,
};
use taskboard_core::types::DbId;

use crate::error::RepoError;
use crate::models::media::{CreateMedia, Media, MediaDto};
use crate::models::task::{CreateTask, TaskDto, TaskRecord, UpdateTask};
use crate::repositories::MediaRepo;
use crate::retry::{is_transient_conflict, with_retry, MAX_DEADLOCK_RETRIES};

/// Columns of a [`TaskRecord`]: the task plus its project and assignee.
const RECORD_COLUMNS: &str = "t.id, t.project_id, t.title, t.description, t.status, \
    t.completion_date, t.assignee_id, t.created_at, t.updated_at, \
    p.name AS project_name, p.description AS project_description, \
    u.name AS assignee_name, u.email AS assignee_email";

const RECORD_SOURCE: &str = "FROM tasks t \
    JOIN projects p ON p.id = t.project_id \
    LEFT JOIN users u ON u.id = t.assignee_id";

/// Rows fetched per round trip when listing a project's tasks.
pub const CHUNK_SIZE: i64 = 100;

// ---------------------------------------------------------------------------
// Filter application
// ---------------------------------------------------------------------------

/// Append one filter to a query whose `WHERE` clause is already open.
///
/// String filters compare the column's text form, date filters compare the
/// calendar date only.
pub fn apply_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &TaskFilter) {
    match filter {
        TaskFilter::Str { field, value } => {
            builder.push(format!(" AND t.{}::text = ", field.column()));
            builder.push_bind(value.clone());
        }
        TaskFilter::Date { field, value } => {
            builder.push(format!(" AND t.{}::date = ", field.column()));
            builder.push_bind(*value);
        }
    }
}

/// Fold all filters into the query, joined with AND.
pub fn apply_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &[TaskFilter]) {
    for filter in filters {
        apply_filter(builder, filter);
    }
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

pub struct TaskRepo;

impl TaskRepo {
    /// Fetch one live task. Fails with `NotFound` if it is absent or soft-deleted.
    pub async fn get_by_id(pool: &PgPool, id: DbId) -> Result<TaskDto, RepoError> {
        let mut conn = pool.acquire().await?;
        Self::load_one(&mut conn, id).await
    }

    /// All live tasks of a project matching every filter.
    ///
    /// Runs in a repeatable-read transaction so the chunks form one snapshot,
    /// retried up to [`MAX_DEADLOCK_RETRIES`] times on serialization failures
    /// and deadlocks.
    pub async fn get_by_project(
        pool: &PgPool,
        project_id: DbId,
        filters: &[TaskFilter],
    ) -> Result<Vec<TaskDto>, RepoError> {
        let tasks = with_retry(MAX_DEADLOCK_RETRIES, is_transient_conflict, move || {
            Self::load_project_tasks(pool, project_id, filters)
        })
        .await?;
        Ok(tasks)
    }

    /// Insert a task and return it hydrated.
    pub async fn create(pool: &PgPool, input: &CreateTask) -> Result<TaskDto, RepoError> {
        let mut tx = pool.begin().await?;

        let (id,): (DbId,) = sqlx::query_as(
            "INSERT INTO tasks (project_id, title, description, status, completion_date, assignee_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(input.project_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.status.as_str())
        .bind(input.completion_date)
        .bind(input.assignee_id)
        .fetch_one(&mut *tx)
        .await?;

        let task = Self::load_one(&mut tx, id).await?;
        tx.commit().await?;
        Ok(task)
    }

    /// Apply the fields present in `patch` under the task's row lock.
    ///
    /// An empty patch still verifies the task exists but writes nothing, so
    /// `updated_at` is left alone.
    pub async fn update(pool: &PgPool, id: DbId, patch: &UpdateTask) -> Result<(), RepoError> {
        let mut tx = pool.begin().await?;
        Self::lock_task(&mut tx, id).await?;

        if !patch.is_empty() {
            sqlx::query(
                "UPDATE tasks SET
                    title = COALESCE($2, title),
                    description = COALESCE($3, description),
                    status = COALESCE($4, status),
                    completion_date = COALESCE($5, completion_date),
                    assignee_id = COALESCE($6, assignee_id),
                    updated_at = NOW()
                 WHERE id = $1",
            )
            .bind(id)
            .bind(&patch.title)
            .bind(&patch.description)
            .bind(patch.status.map(|s| s.as_str()))
            .bind(patch.completion_date)
            .bind(patch.assignee_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Soft-delete a task under its row lock and drop its attachments.
    ///
    /// Attachment files are removed after the commit; a failure there is
    /// logged and does not undo the deletion.
    pub async fn delete(
        pool: &PgPool,
        store: &dyn AttachmentStore,
        id: DbId,
    ) -> Result<(), RepoError> {
        let mut tx = pool.begin().await?;
        Self::lock_task(&mut tx, id).await?;

        sqlx::query("UPDATE tasks SET deleted_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let removed = MediaRepo::delete_all_for_task(&mut tx, id).await?;

        tx.commit().await?;
        remove_blobs(store, &removed).await;
        Ok(())
    }

    /// Store `upload` and record it as an attachment of task `id`.
    ///
    /// The bytes are staged first; the metadata row is written under the row
    /// lock and the staged file promoted to its final key before commit. If
    /// anything after staging fails, the staged copy is discarded before the
    /// error is returned.
    pub async fn attach_file(
        pool: &PgPool,
        store: &dyn AttachmentStore,
        id: DbId,
        upload: &FileUpload,
    ) -> Result<MediaDto, RepoError> {
        let staged = store.stage(upload).await?;

        match Self::record_attachment(pool, store, id, upload, &staged).await {
            Ok(media) => Ok(media),
            Err(err) => {
                if let Err(cleanup_err) = store.discard(&staged).await {
                    tracing::warn!(
                        task_id = id,
                        staging_key = %staged.staging_key,
                        error = %cleanup_err,
                        "Failed to discard staged attachment"
                    );
                }
                Err(err)
            }
        }
    }

    /// Remove attachment `media_id` from task `id`.
    ///
    /// Fails with `NotFound` only when the task is missing; an unknown
    /// attachment id is a no-op.
    pub async fn detach_file(
        pool: &PgPool,
        store: &dyn AttachmentStore,
        id: DbId,
        media_id: DbId,
    ) -> Result<(), RepoError> {
        let mut tx = pool.begin().await?;
        Self::lock_task(&mut tx, id).await?;
        let removed = MediaRepo::delete_for_task(&mut tx, id, media_id).await?;
        tx.commit().await?;

        match removed {
            Some(media) => remove_blobs(store, std::slice::from_ref(&media)).await,
            None => tracing::debug!(task_id = id, media_id, "Attachment not found, nothing to detach"),
        }
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Take the exclusive row lock on a live task.
    async fn lock_task(conn: &mut PgConnection, id: DbId) -> Result<(), RepoError> {
        let row: Option<(DbId,)> =
            sqlx::query_as("SELECT id FROM tasks WHERE id = $1 AND deleted_at IS NULL FOR UPDATE")
                .bind(id)
                .fetch_optional(conn)
                .await?;
        match row {
            Some(_) => Ok(()),
            None => Err(CoreError::not_found("Task", id).into()),
        }
    }

    async fn load_one(conn: &mut PgConnection, id: DbId) -> Result<TaskDto, RepoError> {
        let query = format!(
            "SELECT {RECORD_COLUMNS} {RECORD_SOURCE} WHERE t.id = $1 AND t.deleted_at IS NULL"
        );
        let record = sqlx::query_as::<_, TaskRecord>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| CoreError::not_found("Task", id))?;

        let media = MediaRepo::list_for_tasks(conn, &[id]).await?;
        Ok(TaskDto::assemble(record, media))
    }

    async fn load_project_tasks(
        pool: &PgPool,
        project_id: DbId,
        filters: &[TaskFilter],
    ) -> Result<Vec<TaskDto>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        let mut tasks = Vec::new();
        let mut last_id: DbId = 0;
        loop {
            let mut builder = QueryBuilder::<Postgres>::new(format!(
                "SELECT {RECORD_COLUMNS} {RECORD_SOURCE} \
                 WHERE t.deleted_at IS NULL AND t.project_id = "
            ));
            builder.push_bind(project_id);
            builder.push(" AND t.id > ");
            builder.push_bind(last_id);
            apply_filters(&mut builder, filters);
            builder.push(" ORDER BY t.id LIMIT ");
            builder.push_bind(CHUNK_SIZE);

            let chunk: Vec<TaskRecord> = builder
                .build_query_as::<TaskRecord>()
                .fetch_all(&mut *tx)
                .await?;

            let fetched = chunk.len() as i64;
            if let Some(last) = chunk.last() {
                last_id = last.id;
            }
            tasks.extend(hydrate(&mut tx, chunk).await?);

            if fetched < CHUNK_SIZE {
                break;
            }
        }

        tx.commit().await?;
        Ok(tasks)
    }

    async fn record_attachment(
        pool: &PgPool,
        store: &dyn AttachmentStore,
        id: DbId,
        upload: &FileUpload,
        staged: &StagedFile,
    ) -> Result<MediaDto, RepoError> {
        let file_name = sanitize_file_name(&upload.file_name);
        let storage_key = attachment_key(id, &file_name);
        let input = CreateMedia {
            task_id: id,
            name: display_name(&file_name),
            mime_type: upload.mime_type.clone(),
            size: staged.size as i64,
            url: store.url(&storage_key),
            storage_key: storage_key.clone(),
            file_name,
        };

        let mut tx = pool.begin().await?;
        Self::lock_task(&mut tx, id).await?;
        let media = MediaRepo::create(&mut tx, &input).await?;
        store.promote(staged, &storage_key).await?;

        if let Err(err) = tx.commit().await {
            if let Err(cleanup_err) = store.delete(&storage_key).await {
                tracing::warn!(
                    task_id = id,
                    storage_key = %storage_key,
                    error = %cleanup_err,
                    "Failed to remove promoted attachment after rollback"
                );
            }
            return Err(err.into());
        }

        tracing::info!(task_id = id, media_id = media.id, size = media.size, "Attachment stored");
        Ok(media.into())
    }
}

/// Load the attachments of a chunk of records and assemble DTOs in order.
async fn hydrate(
    conn: &mut PgConnection,
    records: Vec<TaskRecord>,
) -> Result<Vec<TaskDto>, sqlx::Error> {
    let ids: Vec<DbId> = records.iter().map(|r| r.id).collect();
    let mut by_task: HashMap<DbId, Vec<Media>> = HashMap::new();
    for media in MediaRepo::list_for_tasks(conn, &ids).await? {
        by_task.entry(media.task_id).or_default().push(media);
    }

    Ok(records
        .into_iter()
        .map(|record| {
            let media = by_task.remove(&record.id).unwrap_or_default();
            TaskDto::assemble(record, media)
        })
        .collect())
}

/// Best-effort removal of committed attachment files.
async fn remove_blobs(store: &dyn AttachmentStore, media: &[Media]) {
    for item in media {
        if let Err(err) = store.delete(&item.storage_key).await {
            tracing::warn!(
                media_id = item.id,
                storage_key = %item.storage_key,
                error = %err,
                "Failed to remove attachment file"
            );
        }
    }
}
