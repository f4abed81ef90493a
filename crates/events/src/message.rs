//! Outgoing notification emails.

use taskboard_db::models::task::TaskDto;

/// A rendered plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Render the "new task assigned" email for the task's assignee.
///
/// Returns `None` when the task has no assignee.
pub fn compose_task_created_email(task: &TaskDto, app_url: &str) -> Option<EmailMessage> {
    let assignee = task.assignee.as_ref()?;

    let mut lines = vec![
        format!("Hello {}!", assignee.name),
        String::new(),
        "You have been assigned a new task.".to_string(),
        String::new(),
        format!("Task: {}", task.title),
        format!("Project: {}", task.project.name),
        format!(
            "Description: {}",
            task.description.as_deref().unwrap_or("No description")
        ),
        format!("Status: {}", task.status),
    ];
    if let Some(due) = &task.completion_date {
        lines.push(format!("Due Date: {due}"));
    }
    lines.push(String::new());
    lines.push(format!(
        "View Task: {}/tasks/{}",
        app_url.trim_end_matches('/'),
        task.id
    ));

    Some(EmailMessage {
        to: assignee.email.clone(),
        subject: format!("New Task Assigned: {}", task.title),
        body: lines.join("\n"),
    })
}
