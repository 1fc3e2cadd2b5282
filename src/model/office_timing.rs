use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Office hour configuration, global (no department) or per department.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OfficeTiming {
    pub id: u64,
    pub department: Option<String>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub check_in_grace_minutes: i32,
    pub check_out_grace_minutes: i32,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl OfficeTiming {
    pub fn is_global(&self) -> bool {
        self.department
            .as_deref()
            .map(|d| d.trim().is_empty())
            .unwrap_or(true)
    }
}
