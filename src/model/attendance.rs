use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub attendance_id: u64,
    pub user_id: u64,
    pub check_in: DateTime<Utc>,
    pub check_out: Option<DateTime<Utc>>,
    pub total_hours: f64,
    pub gps_location: Option<String>,
    pub selfie: Option<String>,
    pub work_summary: Option<String>,
    pub work_report: Option<String>,
}
