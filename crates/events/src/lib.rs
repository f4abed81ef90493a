//! Task notification infrastructure.
//!
//! - [`NotificationQueue`]: bounded, non-blocking hand-off used by the task
//!   service to announce newly created tasks.
//! - [`NotificationDispatcher`]: background worker that drains the queue,
//!   loads each task and mails its assignee.
//! - [`message`]: composition of the outgoing emails.
//! - [`delivery`]: outbound channels (SMTP via `lettre`, or a logging fallback).

pub mod delivery;
pub mod dispatcher;
pub mod message;
pub mod queue;

pub use delivery::email::{EmailConfig, EmailDelivery, EmailError};
pub use delivery::log::LogMailer;
pub use delivery::Mailer;
pub use dispatcher::{DispatchError, NotificationDispatcher};
pub use message::{compose_task_created_email, EmailMessage};
pub use queue::NotificationQueue;
