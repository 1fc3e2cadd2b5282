use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct User {
    #[schema(example = 1)]
    pub user_id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: Option<String>,

    #[schema(example = "John Doe")]
    pub name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,

    #[schema(example = "Employee")]
    pub role: String,

    #[schema(example = "Engineering")]
    pub department: Option<String>,

    pub designation: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub pan_card: Option<String>,
    pub aadhar_card: Option<String>,
    pub shift_type: Option<String>,
    pub employee_type: Option<String>,
    pub joining_date: Option<DateTime<Utc>>,
    pub resignation_date: Option<DateTime<Utc>>,
    pub profile_photo: Option<String>,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
}
