use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Shift {
    pub shift_id: u64,
    #[schema(example = "Morning Shift")]
    pub name: String,
    #[schema(example = "06:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "14:00:00", value_type = String)]
    pub end_time: NaiveTime,
    pub department: Option<String>,
    pub is_active: bool,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ShiftAssignment {
    pub assignment_id: u64,
    pub user_id: u64,
    pub shift_id: u64,
    #[schema(example = "2026-03-02", value_type = String, format = "date")]
    pub assignment_date: NaiveDate,
    pub assigned_by: Option<u64>,
    pub notes: Option<String>,
    pub is_reassigned: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
