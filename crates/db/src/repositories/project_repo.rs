//! Repository for the `projects` table.

use sqlx::PgPool;
use taskboard_core::error::CoreError;
use taskboard_core::types::DbId;

use crate::error::RepoError;
use crate::models::project::{CreateProject, Project, ProjectDto};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, deleted_at, created_at, updated_at";

/// Provides read access and seeding helpers for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateProject) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (name, description)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// `true` if a live (not soft-deleted) project with this id exists.
    pub async fn project_exists(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM projects WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Find a project by its internal ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Fetch a project as a DTO, failing with `NotFound` when it is absent.
    pub async fn get_by_id(pool: &PgPool, id: DbId) -> Result<ProjectDto, RepoError> {
        Self::find_by_id(pool, id)
            .await?
            .map(ProjectDto::from)
            .ok_or_else(|| CoreError::not_found("Project", id).into())
    }

    /// Soft-delete a project by ID. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
