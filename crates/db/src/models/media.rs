//! Attachment metadata rows (`media` table).

use serde::Serialize;
use sqlx::FromRow;
use taskboard_core::types::{DbId, Timestamp};

/// A media row. The bytes live in the attachment store under `storage_key`.
#[derive(Debug, Clone, FromRow)]
pub struct Media {
    pub id: DbId,
    pub task_id: DbId,
    pub collection_name: String,
    pub name: String,
    pub file_name: String,
    pub mime_type: String,
    pub size: i64,
    pub storage_key: String,
    pub url: String,
    pub created_at: Timestamp,
}

/// Input for recording a committed attachment.
#[derive(Debug, Clone)]
pub struct CreateMedia {
    pub task_id: DbId,
    pub name: String,
    pub file_name: String,
    pub mime_type: String,
    pub size: i64,
    pub storage_key: String,
    pub url: String,
}

/// Attachment as embedded in a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaDto {
    pub id: DbId,
    pub name: String,
    pub file_name: String,
    pub mime_type: String,
    pub size: i64,
    pub url: String,
}

impl From<Media> for MediaDto {
    fn from(media: Media) -> Self {
        Self {
            id: media.id,
            name: media.name,
            file_name: media.file_name,
            mime_type: media.mime_type,
            size: media.size,
            url: media.url,
        }
    }
}
