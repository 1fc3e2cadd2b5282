use crate::auth::auth::AuthUser;
use crate::model::hiring::{CANDIDATE_STATUSES, Candidate, VACANCY_STATUSES, Vacancy};
use crate::utils::db_utils::{build_update_sql, execute_update};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

const VACANCY_COLUMNS: &[&str] = &[
    "title",
    "department",
    "description",
    "requirements",
    "responsibilities",
    "nice_to_have_skills",
    "location",
    "employment_type",
    "experience_required",
    "salary_range",
    "status",
    "closing_date",
];

const CANDIDATE_COLUMNS: &[&str] = &[
    "name",
    "email",
    "phone",
    "resume_url",
    "cover_letter",
    "experience_years",
    "current_company",
    "current_position",
    "expected_salary",
    "notice_period",
    "status",
    "interview_date",
    "interview_notes",
    "source",
];

#[derive(Deserialize, ToSchema)]
pub struct CreateVacancy {
    #[schema(example = "Senior Backend Engineer")]
    pub title: String,
    #[schema(example = "Engineering")]
    pub department: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub responsibilities: Option<String>,
    pub nice_to_have_skills: Option<String>,
    pub location: Option<String>,
    #[schema(example = "Full-time")]
    pub employment_type: Option<String>,
    pub experience_required: Option<String>,
    pub salary_range: Option<String>,
    pub closing_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize, ToSchema)]
pub struct PostSocial {
    pub posted_on_linkedin: Option<bool>,
    pub posted_on_naukri: Option<bool>,
    pub posted_on_indeed: Option<bool>,
    pub posted_on_other: Option<bool>,
    /// JSON string of posting links
    pub social_media_links: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateCandidate {
    pub vacancy_id: u64,
    #[schema(example = "Jane Applicant")]
    pub name: String,
    #[schema(example = "jane@example.com", format = "email", value_type = String)]
    pub email: String,
    pub phone: Option<String>,
    pub resume_url: Option<String>,
    pub cover_letter: Option<String>,
    pub experience_years: Option<i32>,
    pub current_company: Option<String>,
    pub current_position: Option<String>,
    pub expected_salary: Option<String>,
    pub notice_period: Option<String>,
    #[schema(example = "linkedin")]
    pub source: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct VacancyFilter {
    #[schema(example = "open")]
    pub status: Option<String>,
    pub department: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct CandidateFilter {
    pub vacancy_id: Option<u64>,
    #[schema(example = "interview")]
    pub status: Option<String>,
}

async fn fetch_vacancy(pool: &MySqlPool, id: u64) -> Result<Option<Vacancy>, sqlx::Error> {
    sqlx::query_as::<_, Vacancy>("SELECT * FROM vacancies WHERE vacancy_id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

async fn fetch_candidate(pool: &MySqlPool, id: u64) -> Result<Option<Candidate>, sqlx::Error> {
    sqlx::query_as::<_, Candidate>("SELECT * FROM candidates WHERE candidate_id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

// ---------------------------------
// Vacancies
// ---------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/hiring/vacancies",
    request_body = CreateVacancy,
    responses(
        (status = 201, description = "Vacancy opened", body = Vacancy),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Hiring"
)]
pub async fn create_vacancy(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateVacancy>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if payload.title.trim().is_empty() || payload.department.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Title and department must not be empty"
        })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO vacancies
        (title, department, description, requirements, responsibilities, nice_to_have_skills,
         location, employment_type, experience_required, salary_range, created_by, closing_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.title.trim())
    .bind(payload.department.trim())
    .bind(&payload.description)
    .bind(&payload.requirements)
    .bind(&payload.responsibilities)
    .bind(&payload.nice_to_have_skills)
    .bind(&payload.location)
    .bind(&payload.employment_type)
    .bind(&payload.experience_required)
    .bind(&payload.salary_range)
    .bind(auth.user_id)
    .bind(payload.closing_date)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create vacancy");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let vacancy = fetch_vacancy(pool.get_ref(), result.last_insert_id())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to reload vacancy");
            ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

    Ok(HttpResponse::Created().json(vacancy))
}

#[utoipa::path(
    get,
    path = "/api/v1/hiring/vacancies",
    params(VacancyFilter),
    responses(
        (status = 200, description = "Vacancies, newest first", body = [Vacancy])
    ),
    security(("bearer_auth" = [])),
    tag = "Hiring"
)]
pub async fn list_vacancies(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<VacancyFilter>,
) -> actix_web::Result<impl Responder> {
    let mut sql = String::from("SELECT * FROM vacancies WHERE 1=1");
    if query.status.is_some() {
        sql.push_str(" AND status = ?");
    }
    if query.department.is_some() {
        sql.push_str(" AND LOWER(department) = LOWER(?)");
    }
    sql.push_str(" ORDER BY created_at DESC");

    let mut q = sqlx::query_as::<_, Vacancy>(&sql);
    if let Some(status) = query.status.as_deref() {
        q = q.bind(status);
    }
    if let Some(department) = query.department.as_deref() {
        q = q.bind(department);
    }

    let rows = q.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to list vacancies");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    get,
    path = "/api/v1/hiring/vacancies/{vacancy_id}",
    params(("vacancy_id" = u64, Path, description = "Vacancy ID")),
    responses(
        (status = 200, description = "Vacancy found", body = Vacancy),
        (status = 404, description = "Vacancy not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Hiring"
)]
pub async fn get_vacancy(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let vacancy = fetch_vacancy(pool.get_ref(), path.into_inner())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch vacancy");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match vacancy {
        Some(v) => Ok(HttpResponse::Ok().json(v)),
        None => Ok(HttpResponse::NotFound().json(json!({ "message": "Vacancy not found" }))),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/hiring/vacancies/{vacancy_id}",
    params(("vacancy_id" = u64, Path, description = "Vacancy ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Vacancy updated", body = Vacancy),
        (status = 400, description = "Unknown field or bad status"),
        (status = 404, description = "Vacancy not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Hiring"
)]
pub async fn update_vacancy(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let vacancy_id = path.into_inner();

    if let Some(status) = body.get("status").and_then(Value::as_str) {
        if !VACANCY_STATUSES.contains(&status) {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Invalid status. Allowed: open, closed, on_hold"
            })));
        }
    }

    let update = build_update_sql("vacancies", &body, VACANCY_COLUMNS, "vacancy_id", vacancy_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Vacancy not found" })));
    }

    let vacancy = fetch_vacancy(pool.get_ref(), vacancy_id)
        .await
        .map_err(|e| {
            error!(error = %e, vacancy_id, "Failed to reload vacancy");
            ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

    Ok(HttpResponse::Ok().json(vacancy))
}

#[utoipa::path(
    delete,
    path = "/api/v1/hiring/vacancies/{vacancy_id}",
    params(("vacancy_id" = u64, Path, description = "Vacancy ID")),
    responses(
        (status = 204, description = "Vacancy deleted with its candidates"),
        (status = 404, description = "Vacancy not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Hiring"
)]
pub async fn delete_vacancy(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let vacancy_id = path.into_inner();

    let result = sqlx::query("DELETE FROM vacancies WHERE vacancy_id = ?")
        .bind(vacancy_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, vacancy_id, "Failed to delete vacancy");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Vacancy not found" })));
    }

    Ok(HttpResponse::NoContent().finish())
}

/// Record where the vacancy has been advertised
#[utoipa::path(
    post,
    path = "/api/v1/hiring/vacancies/{vacancy_id}/post-social",
    params(("vacancy_id" = u64, Path, description = "Vacancy ID")),
    request_body = PostSocial,
    responses(
        (status = 200, description = "Posting flags updated", body = Vacancy),
        (status = 404, description = "Vacancy not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Hiring"
)]
pub async fn post_vacancy_social(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<PostSocial>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let vacancy_id = path.into_inner();

    let result = sqlx::query(
        r#"
        UPDATE vacancies
        SET posted_on_linkedin = COALESCE(?, posted_on_linkedin),
            posted_on_naukri = COALESCE(?, posted_on_naukri),
            posted_on_indeed = COALESCE(?, posted_on_indeed),
            posted_on_other = COALESCE(?, posted_on_other),
            social_media_links = COALESCE(?, social_media_links)
        WHERE vacancy_id = ?
        "#,
    )
    .bind(payload.posted_on_linkedin)
    .bind(payload.posted_on_naukri)
    .bind(payload.posted_on_indeed)
    .bind(payload.posted_on_other)
    .bind(&payload.social_media_links)
    .bind(vacancy_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, vacancy_id, "Failed to update posting flags");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Vacancy not found" })));
    }

    let vacancy = fetch_vacancy(pool.get_ref(), vacancy_id)
        .await
        .map_err(|e| {
            error!(error = %e, vacancy_id, "Failed to reload vacancy");
            ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

    Ok(HttpResponse::Ok().json(vacancy))
}

// ---------------------------------
// Candidates
// ---------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/hiring/candidates",
    request_body = CreateCandidate,
    responses(
        (status = 201, description = "Candidate added", body = Candidate),
        (status = 400, description = "Vacancy missing or not open"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Hiring"
)]
pub async fn create_candidate(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateCandidate>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if payload.name.trim().is_empty() || payload.email.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Name and email must not be empty"
        })));
    }

    let vacancy = fetch_vacancy(pool.get_ref(), payload.vacancy_id)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch vacancy");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match vacancy {
        Some(v) if v.status == "open" => {}
        Some(_) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Vacancy is not open for applications"
            })));
        }
        None => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Vacancy not found"
            })));
        }
    }

    let result = sqlx::query(
        r#"
        INSERT INTO candidates
        (vacancy_id, name, email, phone, resume_url, cover_letter, experience_years,
         current_company, current_position, expected_salary, notice_period, source)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.vacancy_id)
    .bind(payload.name.trim())
    .bind(payload.email.trim())
    .bind(&payload.phone)
    .bind(&payload.resume_url)
    .bind(&payload.cover_letter)
    .bind(payload.experience_years)
    .bind(&payload.current_company)
    .bind(&payload.current_position)
    .bind(&payload.expected_salary)
    .bind(&payload.notice_period)
    .bind(&payload.source)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create candidate");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let candidate = fetch_candidate(pool.get_ref(), result.last_insert_id())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to reload candidate");
            ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

    Ok(HttpResponse::Created().json(candidate))
}

#[utoipa::path(
    get,
    path = "/api/v1/hiring/candidates",
    params(CandidateFilter),
    responses(
        (status = 200, description = "Candidates, newest first", body = [Candidate])
    ),
    security(("bearer_auth" = [])),
    tag = "Hiring"
)]
pub async fn list_candidates(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<CandidateFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let mut sql = String::from("SELECT * FROM candidates WHERE 1=1");
    if query.vacancy_id.is_some() {
        sql.push_str(" AND vacancy_id = ?");
    }
    if query.status.is_some() {
        sql.push_str(" AND status = ?");
    }
    sql.push_str(" ORDER BY applied_at DESC");

    let mut q = sqlx::query_as::<_, Candidate>(&sql);
    if let Some(vacancy_id) = query.vacancy_id {
        q = q.bind(vacancy_id);
    }
    if let Some(status) = query.status.as_deref() {
        q = q.bind(status);
    }

    let rows = q.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to list candidates");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    get,
    path = "/api/v1/hiring/candidates/{candidate_id}",
    params(("candidate_id" = u64, Path, description = "Candidate ID")),
    responses(
        (status = 200, description = "Candidate found", body = Candidate),
        (status = 404, description = "Candidate not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Hiring"
)]
pub async fn get_candidate(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let candidate = fetch_candidate(pool.get_ref(), path.into_inner())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch candidate");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match candidate {
        Some(c) => Ok(HttpResponse::Ok().json(c)),
        None => Ok(HttpResponse::NotFound().json(json!({ "message": "Candidate not found" }))),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/hiring/candidates/{candidate_id}",
    params(("candidate_id" = u64, Path, description = "Candidate ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Candidate updated", body = Candidate),
        (status = 400, description = "Unknown field or bad status"),
        (status = 404, description = "Candidate not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Hiring"
)]
pub async fn update_candidate(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let candidate_id = path.into_inner();

    if let Some(status) = body.get("status").and_then(Value::as_str) {
        if !CANDIDATE_STATUSES.contains(&status) {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Invalid status. Allowed: applied, screening, interview, shortlisted, rejected, hired"
            })));
        }
    }

    let update = build_update_sql(
        "candidates",
        &body,
        CANDIDATE_COLUMNS,
        "candidate_id",
        candidate_id,
    )?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Candidate not found" })));
    }

    let candidate = fetch_candidate(pool.get_ref(), candidate_id)
        .await
        .map_err(|e| {
            error!(error = %e, candidate_id, "Failed to reload candidate");
            ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

    Ok(HttpResponse::Ok().json(candidate))
}

#[utoipa::path(
    delete,
    path = "/api/v1/hiring/candidates/{candidate_id}",
    params(("candidate_id" = u64, Path, description = "Candidate ID")),
    responses(
        (status = 204, description = "Candidate deleted"),
        (status = 404, description = "Candidate not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Hiring"
)]
pub async fn delete_candidate(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let candidate_id = path.into_inner();

    let result = sqlx::query("DELETE FROM candidates WHERE candidate_id = ?")
        .bind(candidate_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, candidate_id, "Failed to delete candidate");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Candidate not found" })));
    }

    Ok(HttpResponse::NoContent().finish())
}
