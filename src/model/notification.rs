use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveNotification {
    pub notification_id: u64,
    pub user_id: u64,
    pub leave_id: u64,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct TaskNotification {
    pub notification_id: u64,
    pub user_id: u64,
    pub task_id: u64,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub pass_details: Option<String>,
    pub is_read: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ShiftNotification {
    pub notification_id: u64,
    pub user_id: u64,
    pub shift_assignment_id: u64,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: Option<DateTime<Utc>>,
}
