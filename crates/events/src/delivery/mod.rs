//! Outbound delivery channels for task notifications.

pub mod email;
pub mod log;

use async_trait::async_trait;

use crate::message::EmailMessage;
use email::EmailError;

/// Sends a rendered email somewhere.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}
