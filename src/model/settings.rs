use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct UserSettings {
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "system")]
    pub theme_mode: String,
    #[schema(example = "default")]
    pub color_theme: String,
    #[schema(example = "en")]
    pub language: String,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub two_factor_enabled: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
