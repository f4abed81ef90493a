//! Fallback mailer used when SMTP is not configured.

use async_trait::async_trait;

use super::email::EmailError;
use super::Mailer;
use crate::message::EmailMessage;

/// Writes each email to the log instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "SMTP not configured, logging notification email"
        );
        Ok(())
    }
}
