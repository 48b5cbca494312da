//! Task domain model.
//!
//! Tasks are plain records fetched from the backend; the client derives no
//! identity of its own beyond what the backend returns.

use crate::serde_helpers::{flexible_id, flexible_opt_id};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Open,
    InProgress,
    Completed,
    Closed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Open,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Closed,
    ];

    /// Completed and closed tasks are no longer actionable.
    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Closed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Open => "Open",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::Closed => "Closed",
        }
    }

    /// Parses the spellings the backend and users produce:
    /// `in_progress`, `in-progress`, `In Progress`, `inprogress`.
    pub fn parse(value: &str) -> Option<Self> {
        match normalize(value).as_str() {
            "open" => Some(TaskStatus::Open),
            "inprogress" => Some(TaskStatus::InProgress),
            "completed" | "complete" | "done" => Some(TaskStatus::Completed),
            "closed" => Some(TaskStatus::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TaskStatus::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown task status: {raw}")))
    }
}

/// Priority of a task, ordered from least to most pressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Urgent,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TaskPriority::Low => "Low",
            TaskPriority::Medium => "Medium",
            TaskPriority::High => "High",
            TaskPriority::Urgent => "Urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize(value).as_str() {
            "low" => Some(TaskPriority::Low),
            "medium" | "normal" => Some(TaskPriority::Medium),
            "high" => Some(TaskPriority::High),
            "urgent" => Some(TaskPriority::Urgent),
            _ => None,
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl<'de> Deserialize<'de> for TaskPriority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TaskPriority::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown task priority: {raw}")))
    }
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// A task as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(deserialize_with = "flexible_id")]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    /// Raw due date: either a calendar date or an RFC 3339 timestamp.
    #[serde(default, alias = "dueDate")]
    pub due_date: Option<String>,
    #[serde(
        default,
        alias = "assignedTo",
        alias = "assignee_id",
        deserialize_with = "flexible_opt_id"
    )]
    pub assigned_to: Option<i64>,
    #[serde(default, alias = "createdBy", deserialize_with = "flexible_opt_id")]
    pub created_by: Option<i64>,
    #[serde(
        default,
        alias = "organisationId",
        alias = "organization_id",
        deserialize_with = "flexible_opt_id"
    )]
    pub organisation_id: Option<i64>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<String>,
}

impl Task {
    /// The due date as an instant. Calendar dates resolve to the end of that
    /// day in UTC.
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        parse_due(self.due_date.as_deref()?)
    }

    /// A task is overdue when its due instant has passed and it is not done.
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_done() && self.due_at().is_some_and(|due| due < now)
    }
}

fn parse_due(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(23, 59, 59)?.and_utc())
}

/// Payload for `POST /tasks`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organisation_id: Option<i64>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Payload for `PUT /tasks/{id}`. Unset fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<i64>,
    /// Filled in from the current user by the task service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organisation_id: Option<i64>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.assigned_to.is_none()
    }
}

/// A file attached to a task, as returned by `POST /tasks/{id}/attachments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAttachment {
    #[serde(deserialize_with = "flexible_id")]
    pub id: i64,
    #[serde(default, alias = "fileName", alias = "filename", alias = "name")]
    pub file_name: String,
    #[serde(default)]
    pub url: Option<String>,
}
