//! Repository for the `media` table.
//!
//! Every function runs on a caller-supplied connection: attachment rows are
//! only written while the owning task row is locked by the caller's
//! transaction.

use sqlx::PgConnection;
use taskboard_core::task::ATTACHMENT_COLLECTION;
use taskboard_core::types::DbId;

use crate::models::media::{CreateMedia, Media};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, task_id, collection_name, name, file_name, mime_type, size, \
    storage_key, url, created_at";

pub struct MediaRepo;

impl MediaRepo {
    pub async fn create(conn: &mut PgConnection, input: &CreateMedia) -> Result<Media, sqlx::Error> {
        let query = format!(
            "INSERT INTO media (task_id, collection_name, name, file_name, mime_type, size, storage_key, url)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Media>(&query)
            .bind(input.task_id)
            .bind(ATTACHMENT_COLLECTION)
            .bind(&input.name)
            .bind(&input.file_name)
            .bind(&input.mime_type)
            .bind(input.size)
            .bind(&input.storage_key)
            .bind(&input.url)
            .fetch_one(conn)
            .await
    }

    /// Attachments of the given tasks, ordered by task then id.
    pub async fn list_for_tasks(
        conn: &mut PgConnection,
        task_ids: &[DbId],
    ) -> Result<Vec<Media>, sqlx::Error> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM media
             WHERE task_id = ANY($1) AND collection_name = $2
             ORDER BY task_id, id"
        );
        sqlx::query_as::<_, Media>(&query)
            .bind(task_ids)
            .bind(ATTACHMENT_COLLECTION)
            .fetch_all(conn)
            .await
    }

    /// Delete one attachment of `task_id`. Returns the removed row, or `None`
    /// if the task has no attachment with that id.
    pub async fn delete_for_task(
        conn: &mut PgConnection,
        task_id: DbId,
        media_id: DbId,
    ) -> Result<Option<Media>, sqlx::Error> {
        let query = format!(
            "DELETE FROM media
             WHERE id = $1 AND task_id = $2 AND collection_name = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Media>(&query)
            .bind(media_id)
            .bind(task_id)
            .bind(ATTACHMENT_COLLECTION)
            .fetch_optional(conn)
            .await
    }

    /// Delete every attachment of `task_id`, returning the removed rows.
    pub async fn delete_all_for_task(
        conn: &mut PgConnection,
        task_id: DbId,
    ) -> Result<Vec<Media>, sqlx::Error> {
        let query = format!("DELETE FROM media WHERE task_id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Media>(&query)
            .bind(task_id)
            .fetch_all(conn)
            .await
    }
}
