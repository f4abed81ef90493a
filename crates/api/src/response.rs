//! Success envelopes for API handlers.
//!
//! Every successful response carries `"success": true`, an optional
//! `message`, and the payload under `data` (or `user` for auth endpoints).

use serde::Serialize;

/// Standard `{ "success": true, "message"?, "data"? }` envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Payload without a message.
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// Payload with a human-readable message.
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Message-only response.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// `{ "success": true, "message", "user" }` returned by register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub user: T,
}

impl<T: Serialize> AuthResponse<T> {
    pub fn new(message: impl Into<String>, user: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            user,
        }
    }
}
