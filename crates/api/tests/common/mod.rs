#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use taskboard_api::auth::jwt::JwtConfig;
use taskboard_api::config::ServerConfig;
use taskboard_api::router::build_app_router;
use taskboard_api::services::TaskService;
use taskboard_api::state::AppState;
use taskboard_core::storage::LocalAttachmentStore;
use taskboard_core::types::DbId;
use taskboard_db::models::project::CreateProject;
use taskboard_db::repositories::ProjectRepo;
use taskboard_events::NotificationQueue;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const TEST_APP_URL: &str = "http://localhost:3000";

/// A router plus the resources that must outlive it.
pub struct TestApp {
    pub router: Router,
    /// Attachment root; removed when the test ends.
    pub storage: TempDir,
    /// Receiving end of the notification queue.
    pub notifications: mpsc::Receiver<DbId>,
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(storage: &TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 60,
        },
        storage_root: storage.path().to_path_buf(),
        app_url: TEST_APP_URL.to_string(),
        max_upload_bytes: 11 * 1024 * 1024,
        notification_queue_capacity: 16,
    }
}

/// Build the full application router, with the same middleware stack as
/// production, over the given pool.
pub fn build_test_app(pool: PgPool) -> TestApp {
    let storage = tempfile::tempdir().unwrap();
    let config = test_config(&storage);

    let store = Arc::new(LocalAttachmentStore::new(
        storage.path(),
        config.storage_url(),
    ));
    let (queue, notifications) = NotificationQueue::new(config.notification_queue_capacity);

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        tasks: TaskService::new(pool, store, queue),
    };

    TestApp {
        router: build_app_router(state, &config),
        storage,
        notifications,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn with_auth(builder: axum::http::request::Builder, token: Option<&str>) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header("authorization", format!("Bearer {token}")),
        None => builder,
    }
}

pub async fn get(router: &Router, uri: &str, token: Option<&str>) -> Response {
    let request = with_auth(Request::get(uri), token)
        .body(Body::empty())
        .unwrap();
    send(router, request).await
}

pub async fn delete(router: &Router, uri: &str, token: Option<&str>) -> Response {
    let request = with_auth(Request::delete(uri), token)
        .body(Body::empty())
        .unwrap();
    send(router, request).await
}

pub async fn post_json(
    router: &Router,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> Response {
    let request = with_auth(Request::post(uri), token)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

pub async fn put_json(
    router: &Router,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> Response {
    let request = with_auth(Request::put(uri), token)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

/// A file part for [`multipart_body`].
pub struct FilePart<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub mime_type: &'a str,
    pub bytes: &'a [u8],
}

const BOUNDARY: &str = "taskboard-test-boundary";

/// Encode text fields and an optional file as `multipart/form-data`.
///
/// Returns the content type header value and the body.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<FilePart<'_>>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(file) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.field, file.file_name, file.mime_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub async fn send_multipart(
    router: &Router,
    method: &str,
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<FilePart<'_>>,
    token: &str,
) -> Response {
    let (content_type, body) = multipart_body(fields, file);
    let request = with_auth(Request::builder().method(method).uri(uri), Some(token))
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap();
    send(router, request).await
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Register a user through the API and return `(user_id, token)`.
pub async fn register_user(router: &Router, email: &str) -> (DbId, String) {
    let body = serde_json::json!({
        "name": "Test User",
        "email": email,
        "password": "password123",
    });
    let response = post_json(router, "/api/register", body, None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    (
        json["user"]["id"].as_i64().unwrap(),
        json["user"]["api_token"].as_str().unwrap().to_string(),
    )
}

pub async fn create_project(pool: &PgPool, name: &str) -> DbId {
    ProjectRepo::create(
        pool,
        &CreateProject {
            name: name.to_string(),
            description: Some("integration test project".to_string()),
        },
    )
    .await
    .unwrap()
    .id
}
