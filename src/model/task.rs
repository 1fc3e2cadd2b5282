use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString, Serialize, Deserialize, ToSchema)]
pub enum TaskStatus {
    Pending,
    #[strum(serialize = "In Progress")]
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum TaskAction {
    Created,
    Passed,
    StatusChanged,
    Updated,
}

impl TaskAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskAction::Created => "created",
            TaskAction::Passed => "passed",
            TaskAction::StatusChanged => "status_changed",
            TaskAction::Updated => "updated",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Task {
    pub task_id: u64,
    pub title: String,
    pub description: Option<String>,
    pub assigned_by: u64,
    pub assigned_to: u64,
    #[schema(example = "Pending")]
    pub status: String,
    pub due_date: Option<DateTime<Utc>>,
    pub last_passed_by: Option<u64>,
    pub last_passed_to: Option<u64>,
    pub last_pass_note: Option<String>,
    pub last_passed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct TaskHistory {
    pub id: u64,
    pub task_id: u64,
    pub user_id: u64,
    #[schema(example = "passed")]
    pub action: String,
    pub details: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}
