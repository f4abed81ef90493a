//! Task entity model and DTOs.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taskboard_core::task::TaskStatus;
use taskboard_core::types::{Date, DbId, Timestamp};

use crate::models::media::{Media, MediaDto};
use crate::models::project::ProjectDto;
use crate::models::user::UserDto;

/// A task row joined with its project and assignee.
///
/// Produced by every read in `TaskRepo`; soft-deleted tasks never appear.
#[derive(Debug, Clone, FromRow)]
pub struct TaskRecord {
    pub id: DbId,
    pub project_id: DbId,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    pub completion_date: Option<Date>,
    pub assignee_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub project_name: String,
    pub project_description: Option<String>,
    pub assignee_name: Option<String>,
    pub assignee_email: Option<String>,
}

/// Input for inserting a task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    pub assignee_id: Option<DbId>,
    pub project_id: DbId,
    pub completion_date: Option<Date>,
}

/// Sparse patch for a task.
///
/// `None` leaves the column untouched. There is no way to clear a column
/// back to NULL through a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub completion_date: Option<Date>,
    pub assignee_id: Option<DbId>,
}

impl UpdateTask {
    /// `true` when the patch would not change any column.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.completion_date.is_none()
            && self.assignee_id.is_none()
    }
}

/// Fully hydrated task handed out of the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDto {
    pub id: DbId,
    pub project_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assignee_id: Option<DbId>,
    pub assignee: Option<UserDto>,
    pub project: ProjectDto,
    pub attachments: Vec<MediaDto>,
    /// `YYYY-MM-DD`, or `null`.
    pub completion_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskDto {
    /// Map a joined row and its attachments into the transfer shape.
    pub fn assemble(record: TaskRecord, media: Vec<Media>) -> Self {
        let assignee = match (record.assignee_name, record.assignee_email) {
            (Some(name), Some(email)) => Some(UserDto { name, email }),
            _ => None,
        };

        Self {
            id: record.id,
            project_id: record.project_id,
            title: record.title,
            description: record.description,
            status: record.status,
            assignee_id: record.assignee_id,
            assignee,
            project: ProjectDto {
                name: record.project_name,
                description: record.project_description,
            },
            attachments: media.into_iter().map(MediaDto::from).collect(),
            completion_date: record.completion_date.map(format_date),
            created_at: format_timestamp(&record.created_at),
            updated_at: format_timestamp(&record.updated_at),
        }
    }
}

pub fn format_date(date: Date) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
