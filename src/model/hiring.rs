use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const VACANCY_STATUSES: &[&str] = &["open", "closed", "on_hold"];

pub const CANDIDATE_STATUSES: &[&str] = &[
    "applied",
    "screening",
    "interview",
    "shortlisted",
    "rejected",
    "hired",
];

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Vacancy {
    pub vacancy_id: u64,
    #[schema(example = "Senior Backend Engineer")]
    pub title: String,
    #[schema(example = "Engineering")]
    pub department: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub responsibilities: Option<String>,
    pub nice_to_have_skills: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub experience_required: Option<String>,
    pub salary_range: Option<String>,
    #[schema(example = "open")]
    pub status: String,
    pub created_by: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closing_date: Option<DateTime<Utc>>,
    pub posted_on_linkedin: bool,
    pub posted_on_naukri: bool,
    pub posted_on_indeed: bool,
    pub posted_on_other: bool,
    pub social_media_links: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Candidate {
    pub candidate_id: u64,
    pub vacancy_id: u64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub resume_url: Option<String>,
    pub cover_letter: Option<String>,
    pub experience_years: Option<i32>,
    pub current_company: Option<String>,
    pub current_position: Option<String>,
    pub expected_salary: Option<String>,
    pub notice_period: Option<String>,
    #[schema(example = "applied")]
    pub status: String,
    pub interview_date: Option<DateTime<Utc>>,
    pub interview_notes: Option<String>,
    pub source: Option<String>,
    pub applied_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
