use std::path::PathBuf;

use taskboard_core::task::MAX_ATTACHMENT_BYTES;
use taskboard_events::queue::DEFAULT_QUEUE_CAPACITY;

use crate::auth::jwt::JwtConfig;

/// Multipart framing and text fields on top of the largest allowed attachment.
const UPLOAD_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long background workers get to drain after the server stops.
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    /// Directory attachment files are written under and served from.
    pub storage_root: PathBuf,
    /// Public base URL of the application, used for attachment URLs and
    /// links in notification emails.
    pub app_url: String,
    /// Request body limit. Must exceed the attachment limit so oversized
    /// files reach validation instead of being cut off.
    pub max_upload_bytes: usize,
    /// Capacity of the task notification queue.
    pub notification_queue_capacity: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                    |
    /// |-------------------------------|----------------------------|
    /// | `HOST`                        | `0.0.0.0`                  |
    /// | `PORT`                        | `3000`                     |
    /// | `CORS_ORIGINS`                | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `30`                       |
    /// | `STORAGE_ROOT`                | `./storage`                |
    /// | `APP_URL`                     | `http://localhost:3000`    |
    /// | `MAX_UPLOAD_BYTES`            | 11 MiB                     |
    /// | `NOTIFICATION_QUEUE_CAPACITY` | `1024`                     |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let storage_root = PathBuf::from(
            std::env::var("STORAGE_ROOT").unwrap_or_else(|_| "./storage".into()),
        );

        let app_url = std::env::var("APP_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .ok()
            .map(|v| v.parse().expect("MAX_UPLOAD_BYTES must be a valid usize"))
            .unwrap_or(MAX_ATTACHMENT_BYTES + UPLOAD_OVERHEAD_BYTES);

        let notification_queue_capacity: usize = std::env::var("NOTIFICATION_QUEUE_CAPACITY")
            .ok()
            .map(|v| {
                v.parse()
                    .expect("NOTIFICATION_QUEUE_CAPACITY must be a valid usize")
            })
            .unwrap_or(DEFAULT_QUEUE_CAPACITY);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            storage_root,
            app_url,
            max_upload_bytes,
            notification_queue_capacity,
        }
    }

    /// URL prefix under which `storage_root` is served.
    pub fn storage_url(&self) -> String {
        format!("{}/storage", self.app_url)
    }
}
