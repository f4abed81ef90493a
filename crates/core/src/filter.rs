//! Typed predicates narrowing a task listing.
//!
//! A [`TaskFilter`] names a [`TaskFilterField`] (a closed set, so column names
//! never come from user input) and carries either a string or a calendar date.
//! The database layer folds a list of filters into a query with logical AND;
//! the order of the list affects only how the SQL is built.

use serde::Serialize;

use crate::error::CoreError;
use crate::types::Date;

/// How the value of a filter is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterKind {
    /// Exact equality on the column's text form.
    StringEq,
    /// Equality on the calendar date, ignoring any time of day.
    DateEq,
}

/// Task columns that may be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFilterField {
    Status,
    AssigneeId,
    Title,
    CompletionDate,
}

impl TaskFilterField {
    /// Column name in the `tasks` table.
    pub fn column(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::AssigneeId => "assignee_id",
            Self::Title => "title",
            Self::CompletionDate => "completion_date",
        }
    }

    /// Resolve a query-string key.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "status" => Some(Self::Status),
            "assignee_id" => Some(Self::AssigneeId),
            "title" => Some(Self::Title),
            "completion_date" => Some(Self::CompletionDate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFilter {
    Str { field: TaskFilterField, value: String },
    Date { field: TaskFilterField, value: Date },
}

impl TaskFilter {
    pub fn string_eq(field: TaskFilterField, value: impl Into<String>) -> Self {
        Self::Str {
            field,
            value: value.into(),
        }
    }

    pub fn date_eq(field: TaskFilterField, value: Date) -> Self {
        Self::Date { field, value }
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Self::Str { .. } => FilterKind::StringEq,
            Self::Date { .. } => FilterKind::DateEq,
        }
    }

    pub fn field(&self) -> TaskFilterField {
        match self {
            Self::Str { field, .. } | Self::Date { field, .. } => *field,
        }
    }

    /// Build a filter from one `?key=value` pair.
    ///
    /// `completion_date` becomes a date filter (`YYYY-MM-DD`); every other
    /// known key becomes a string filter.
    pub fn from_query_pair(key: &str, value: &str) -> Result<Self, CoreError> {
        let field = TaskFilterField::from_key(key)
            .ok_or_else(|| CoreError::Validation(format!("Unknown filter '{key}'")))?;

        match field {
            TaskFilterField::CompletionDate => {
                let date = parse_date(value)
                    .ok_or_else(|| CoreError::Validation("Invalid date format".into()))?;
                Ok(Self::date_eq(field, date))
            }
            _ => Ok(Self::string_eq(field, value)),
        }
    }
}

/// Parse a wire date (`YYYY-MM-DD`).
pub fn parse_date(value: &str) -> Option<Date> {
    Date::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}
