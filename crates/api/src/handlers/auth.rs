//! Handlers for registration, login, logout and the current user.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use taskboard_core::error::CoreError;
use taskboard_core::types::DbId;
use taskboard_db::models::task::format_timestamp;
use taskboard_db::models::user::{CreateUser, User};
use taskboard_db::repositories::UserRepo;
use validator::Validate;

use crate::auth::jwt::generate_access_token;
use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::middleware::auth::AuthUser;
use crate::response::{ApiResponse, AuthResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255, message = "The name field is required."))]
    pub name: String,
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,
    #[validate(length(
        min = MIN_PASSWORD_LENGTH,
        message = "The password must be at least 8 characters."
    ))]
    pub password: String,
}

/// Request body for `POST /login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "The password field is required."))]
    pub password: String,
}

/// User plus a freshly issued access token.
#[derive(Debug, Serialize)]
pub struct UserTokenDto {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub api_token: String,
}

/// The authenticated user as returned by `GET /user`.
#[derive(Debug, Serialize)]
pub struct CurrentUser {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: format_timestamp(&user.created_at),
            updated_at: format_timestamp(&user.updated_at),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/register
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse<UserTokenDto>>)> {
    let mut errors = match input.validate() {
        Ok(()) => FieldErrors::default(),
        Err(e) => e.into(),
    };
    if errors.get("email").is_none()
        && UserRepo::find_by_email(&state.pool, &input.email)
            .await?
            .is_some()
    {
        errors.add("email", "The email has already been taken.");
    }
    errors.into_result()?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            name: input.name,
            email: input.email,
            password_hash,
        },
    )
    .await?;
    tracing::info!(user_id = user.id, "User registered");

    let body = AuthResponse::new("User registered successfully", issue_token(&state, &user)?);
    Ok((StatusCode::CREATED, Json(body)))
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse<UserTokenDto>>> {
    input.validate()?;

    let invalid = || AppError::Core(CoreError::Unauthorized("Invalid credentials".into()));

    let user = UserRepo::find_by_email(&state.pool, &input.email)
        .await?
        .ok_or_else(invalid)?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(invalid());
    }

    tracing::info!(user_id = user.id, "User logged in");
    Ok(Json(AuthResponse::new(
        "Login successful",
        issue_token(&state, &user)?,
    )))
}

/// POST /api/logout
///
/// Revokes every token issued to the user so far.
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<ApiResponse<()>>> {
    UserRepo::bump_token_version(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| CoreError::not_found("User", auth_user.user_id))?;

    tracing::info!(user_id = auth_user.user_id, "User logged out");
    Ok(Json(ApiResponse::message("Logout successful")))
}

/// GET /api/user
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<ApiResponse<CurrentUser>>> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| CoreError::not_found("User", auth_user.user_id))?;
    Ok(Json(ApiResponse::data(user.into())))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn issue_token(state: &AppState, user: &User) -> AppResult<UserTokenDto> {
    let api_token = generate_access_token(user.id, user.token_version, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    Ok(UserTokenDto {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        api_token,
    })
}
