//! Handlers for tasks and their attachments.
//!
//! Create and update accept either a JSON object or `multipart/form-data`
//! (text fields plus an optional `attachment` file). Both are read into the
//! same [`TaskPayload`].

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{Map, Value};
use taskboard_core::error::CoreError;
use taskboard_core::filter::{parse_date, TaskFilter, TaskFilterField};
use taskboard_core::storage::FileUpload;
use taskboard_core::task::{TaskStatus, MAX_ATTACHMENT_BYTES, MAX_TITLE_LENGTH};
use taskboard_core::types::{Date, DbId};
use taskboard_db::models::task::{CreateTask, TaskDto, UpdateTask};
use taskboard_db::repositories::UserRepo;
use taskboard_db::DbPool;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult, FieldErrors};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

const STATUS_MESSAGE: &str = "Status must be one of: planned, in_progress, done";
const ASSIGNEE_MESSAGE: &str = "Selected assignee does not exist";
const ATTACHMENT_MESSAGE: &str = "Attachment size must not exceed 10MB";
const DATE_FORMAT_MESSAGE: &str = "Invalid date format";
const PAST_DATE_MESSAGE: &str = "Completion date must be today or in the future";

/// Multipart field carrying the uploaded file.
const ATTACHMENT_FIELD: &str = "attachment";

// ---------------------------------------------------------------------------
// Request payload
// ---------------------------------------------------------------------------

/// Task fields as sent by the client. Absent fields are `None`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TaskInput {
    #[validate(length(
        max = MAX_TITLE_LENGTH,
        message = "The title may not be greater than 255 characters."
    ))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,
    #[validate(custom(function = "validate_completion_date"))]
    pub completion_date: Option<String>,
    pub assignee_id: Option<DbId>,
}

fn validate_status(status: &str) -> Result<(), ValidationError> {
    match status.parse::<TaskStatus>() {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new("in").with_message(STATUS_MESSAGE.into())),
    }
}

fn validate_completion_date(raw: &str) -> Result<(), ValidationError> {
    let date = parse_date(raw)
        .ok_or_else(|| ValidationError::new("date").with_message(DATE_FORMAT_MESSAGE.into()))?;
    if date < chrono::Utc::now().date_naive() {
        return Err(ValidationError::new("after_or_equal").with_message(PAST_DATE_MESSAGE.into()));
    }
    Ok(())
}

impl TaskInput {
    fn status(&self) -> Result<Option<TaskStatus>, CoreError> {
        self.status.as_deref().map(str::parse).transpose()
    }

    fn completion_date(&self) -> Result<Option<Date>, CoreError> {
        self.completion_date
            .as_deref()
            .map(|raw| parse_date(raw).ok_or_else(|| CoreError::Validation(DATE_FORMAT_MESSAGE.into())))
            .transpose()
    }

    pub fn into_create(self, project_id: DbId) -> Result<CreateTask, CoreError> {
        let status = self.status()?.unwrap_or_default();
        let completion_date = self.completion_date()?;
        Ok(CreateTask {
            title: self.title.unwrap_or_default(),
            description: self.description,
            status,
            assignee_id: self.assignee_id,
            project_id,
            completion_date,
        })
    }

    pub fn into_patch(self) -> Result<UpdateTask, CoreError> {
        let status = self.status()?;
        let completion_date = self.completion_date()?;
        Ok(UpdateTask {
            title: self.title,
            description: self.description,
            status,
            completion_date,
            assignee_id: self.assignee_id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    Create,
    Update,
}

/// Body of a create or update request.
#[derive(Debug)]
pub struct TaskPayload {
    pub input: TaskInput,
    pub attachment: Option<FileUpload>,
}

impl TaskPayload {
    /// Apply the field rules, including the ones that need the database.
    pub async fn validate(&self, pool: &DbPool, mode: PayloadMode) -> AppResult<()> {
        let mut errors = match self.input.validate() {
            Ok(()) => FieldErrors::default(),
            Err(e) => e.into(),
        };

        if mode == PayloadMode::Create {
            if self.input.title.is_none() {
                errors.add("title", "Task title is required");
            }
            if self.input.status.is_none() {
                errors.add("status", "The status field is required.");
            }
        }

        if let Some(assignee_id) = self.input.assignee_id {
            if !UserRepo::exists(pool, assignee_id).await? {
                errors.add("assignee_id", ASSIGNEE_MESSAGE);
            }
        }

        if let Some(upload) = &self.attachment {
            if upload.size() > MAX_ATTACHMENT_BYTES {
                errors.add(ATTACHMENT_FIELD, ATTACHMENT_MESSAGE);
            }
        }

        errors.into_result()
    }
}

impl FromRequest<AppState> for TaskPayload {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        let (fields, attachment) = if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            read_multipart(multipart).await?
        } else {
            let bytes = Bytes::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            (read_json(&bytes)?, None)
        };

        let input = serde_json::from_value(Value::Object(normalize_fields(fields)))
            .map_err(|e| CoreError::Validation(format!("Invalid request body: {e}")))?;

        Ok(Self { input, attachment })
    }
}

async fn read_multipart(
    mut multipart: Multipart,
) -> AppResult<(Map<String, Value>, Option<FileUpload>)> {
    let mut fields = Map::new();
    let mut attachment = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == ATTACHMENT_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let mime_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;

            // An empty file input still submits a nameless, empty part.
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            attachment = Some(FileUpload {
                file_name,
                mime_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            fields.insert(name, Value::String(text));
        }
    }

    Ok((fields, attachment))
}

fn read_json(bytes: &[u8]) -> AppResult<Map<String, Value>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::BadRequest(
            "Request body must be a JSON object".into(),
        )),
        Err(e) => Err(AppError::BadRequest(format!("Invalid JSON: {e}"))),
    }
}

/// Nulls and blank strings count as absent; a numeric `assignee_id` string
/// (as multipart forms send it) becomes a number.
fn normalize_fields(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::String(s) if s.trim().is_empty() => return None,
                Value::String(s) if key == "assignee_id" => match s.trim().parse::<DbId>() {
                    Ok(id) => Value::from(id),
                    Err(_) => Value::String(s),
                },
                other => other,
            };
            Some((key, value))
        })
        .collect()
}

/// Turn `?key=value` pairs into filters.
///
/// Unknown keys and blank values are ignored. Known keys are checked the
/// same way as the corresponding task fields.
async fn parse_filters(pool: &DbPool, params: &[(String, String)]) -> AppResult<Vec<TaskFilter>> {
    let mut filters = Vec::new();
    let mut errors = FieldErrors::default();

    for (key, value) in params {
        let value = value.trim();
        let Some(field) = TaskFilterField::from_key(key) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        let problem = match field {
            TaskFilterField::Status => value.parse::<TaskStatus>().is_err().then_some(STATUS_MESSAGE),
            TaskFilterField::AssigneeId => {
                let exists = match value.parse::<DbId>() {
                    Ok(id) => UserRepo::exists(pool, id).await?,
                    Err(_) => false,
                };
                (!exists).then_some(ASSIGNEE_MESSAGE)
            }
            _ => None,
        };
        if let Some(message) = problem {
            errors.add(key.as_str(), message);
            continue;
        }

        match TaskFilter::from_query_pair(key, value) {
            Ok(filter) => filters.push(filter),
            Err(CoreError::Validation(message)) => errors.add(key.as_str(), message),
            Err(other) => return Err(other.into()),
        }
    }

    errors.into_result()?;
    Ok(filters)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/projects/{project_id}/tasks
pub async fn index(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(project_id): Path<DbId>,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Json<ApiResponse<Vec<TaskDto>>>> {
    let filters = parse_filters(&state.pool, &params).await?;
    let tasks = state.tasks.get_tasks_by_project(project_id, &filters).await?;
    Ok(Json(ApiResponse::data(tasks)))
}

/// POST /api/projects/{project_id}/tasks
pub async fn store(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(project_id): Path<DbId>,
    payload: TaskPayload,
) -> AppResult<(StatusCode, Json<ApiResponse<TaskDto>>)> {
    payload.validate(&state.pool, PayloadMode::Create).await?;
    let TaskPayload { input, attachment } = payload;

    let task = state
        .tasks
        .create_task(project_id, input.into_create(project_id)?)
        .await?;
    if let Some(upload) = attachment {
        state.tasks.attach_file(task.id, &upload).await?;
    }

    let task = state.tasks.get_task(task.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Task created successfully", task)),
    ))
}

/// GET /api/tasks/{id}
pub async fn show(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<TaskDto>>> {
    let task = state.tasks.get_task(id).await?;
    Ok(Json(ApiResponse::data(task)))
}

/// PUT /api/tasks/{id}
pub async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
    payload: TaskPayload,
) -> AppResult<Json<ApiResponse<TaskDto>>> {
    payload.validate(&state.pool, PayloadMode::Update).await?;
    let TaskPayload { input, attachment } = payload;

    state.tasks.update_task(id, &input.into_patch()?).await?;
    if let Some(upload) = attachment {
        state.tasks.attach_file(id, &upload).await?;
    }

    let task = state.tasks.get_task(id).await?;
    Ok(Json(ApiResponse::with_message("Task updated successfully", task)))
}

/// DELETE /api/tasks/{id}
pub async fn destroy(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.tasks.delete_task(id).await?;
    Ok(Json(ApiResponse::message("Task deleted successfully")))
}

/// DELETE /api/tasks/{id}/attachments/{media_id}
///
/// Removing an attachment that does not exist still succeeds.
pub async fn detach(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((id, media_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<ApiResponse<TaskDto>>> {
    state.tasks.detach_file(id, media_id).await?;
    let task = state.tasks.get_task(id).await?;
    Ok(Json(ApiResponse::with_message(
        "Attachment removed successfully",
        task,
    )))
}
