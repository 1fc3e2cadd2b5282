use crate::auth::auth::AuthUser;
use crate::model::office_timing::OfficeTiming;
use crate::utils::attendance_status::load_office_timing_cache;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct OfficeTimingUpsert {
    /// Blank or missing means the global row
    #[schema(example = "Engineering")]
    pub department: Option<String>,
    #[schema(example = "09:00")]
    pub start_time: String,
    #[schema(example = "18:00")]
    pub end_time: String,
    #[serde(default)]
    pub check_in_grace_minutes: i32,
    #[serde(default)]
    pub check_out_grace_minutes: i32,
}

#[derive(Serialize, ToSchema)]
pub struct OfficeTimingOut {
    pub id: u64,
    pub department: Option<String>,
    #[schema(example = "09:00")]
    pub start_time: String,
    #[schema(example = "18:00")]
    pub end_time: String,
    pub check_in_grace_minutes: i32,
    pub check_out_grace_minutes: i32,
    pub is_global: bool,
}

impl From<OfficeTiming> for OfficeTimingOut {
    fn from(row: OfficeTiming) -> Self {
        let is_global = row.is_global();
        OfficeTimingOut {
            id: row.id,
            department: row.department,
            start_time: row.start_time.format("%H:%M").to_string(),
            end_time: row.end_time.format("%H:%M").to_string(),
            check_in_grace_minutes: row.check_in_grace_minutes,
            check_out_grace_minutes: row.check_out_grace_minutes,
            is_global,
        }
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct EffectiveQuery {
    /// Department to resolve; omit for the global window
    pub department: Option<String>,
}

fn normalize_department(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Active office hour rows, global first then departments alphabetically
#[utoipa::path(
    get,
    path = "/api/v1/attendance/office-hours",
    responses(
        (status = 200, description = "Active office timings", body = [OfficeTimingOut])
    ),
    security(("bearer_auth" = [])),
    tag = "OfficeHours"
)]
pub async fn list_office_timings(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_up()?;

    let rows = sqlx::query_as::<_, OfficeTiming>(
        r#"
        SELECT * FROM office_timings
        WHERE is_active = TRUE
        ORDER BY (department IS NULL) DESC, department ASC
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to list office timings");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let out: Vec<OfficeTimingOut> = rows.into_iter().map(OfficeTimingOut::from).collect();
    Ok(HttpResponse::Ok().json(out))
}

/// Timing that applies to a department after fallback to the global row
#[utoipa::path(
    get,
    path = "/api/v1/attendance/office-hours/effective",
    params(EffectiveQuery),
    responses(
        (status = 200, description = "Resolved office timing", body = OfficeTimingOut),
        (status = 404, description = "Office timing not configured")
    ),
    security(("bearer_auth" = [])),
    tag = "OfficeHours"
)]
pub async fn effective_office_timing(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EffectiveQuery>,
) -> actix_web::Result<impl Responder> {
    let cache = load_office_timing_cache(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to load office timings");
        ErrorInternalServerError("Internal Server Error")
    })?;

    match cache.resolve(query.department.as_deref()) {
        Some(timing) => Ok(HttpResponse::Ok().json(OfficeTimingOut::from(timing.clone()))),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Office timing not configured"
        }))),
    }
}

/// Create or replace the timing row for a department (or the global row)
#[utoipa::path(
    put,
    path = "/api/v1/attendance/office-hours",
    request_body = OfficeTimingUpsert,
    responses(
        (status = 201, description = "Office timing stored", body = OfficeTimingOut),
        (status = 400, description = "Bad time format or end before start"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "OfficeHours"
)]
pub async fn upsert_office_timing(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<OfficeTimingUpsert>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let department = normalize_department(payload.department.as_deref());

    let start = match NaiveTime::parse_from_str(&payload.start_time, "%H:%M") {
        Ok(t) => t,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Invalid time format. Use HH:MM"
            })));
        }
    };
    let end = match NaiveTime::parse_from_str(&payload.end_time, "%H:%M") {
        Ok(t) => t,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Invalid time format. Use HH:MM"
            })));
        }
    };

    if end <= start {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "End time must be after start time"
        })));
    }

    let existing_id = match department.as_deref() {
        None => {
            sqlx::query_scalar::<_, u64>(
                "SELECT id FROM office_timings WHERE is_active = TRUE AND department IS NULL LIMIT 1",
            )
            .fetch_optional(pool.get_ref())
            .await
        }
        Some(dept) => {
            sqlx::query_scalar::<_, u64>(
                "SELECT id FROM office_timings WHERE is_active = TRUE AND LOWER(department) = LOWER(?) LIMIT 1",
            )
            .bind(dept)
            .fetch_optional(pool.get_ref())
            .await
        }
    }
    .map_err(|e| {
        error!(error = %e, "Failed to look up office timing");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let timing_id = match existing_id {
        Some(id) => {
            sqlx::query(
                r#"
                UPDATE office_timings
                SET department = ?, start_time = ?, end_time = ?,
                    check_in_grace_minutes = ?, check_out_grace_minutes = ?, is_active = TRUE
                WHERE id = ?
                "#,
            )
            .bind(&department)
            .bind(start)
            .bind(end)
            .bind(payload.check_in_grace_minutes)
            .bind(payload.check_out_grace_minutes)
            .bind(id)
            .execute(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to update office timing");
                ErrorInternalServerError("Internal Server Error")
            })?;
            id
        }
        None => {
            let result = sqlx::query(
                r#"
                INSERT INTO office_timings
                (department, start_time, end_time, check_in_grace_minutes, check_out_grace_minutes, is_active)
                VALUES (?, ?, ?, ?, ?, TRUE)
                "#,
            )
            .bind(&department)
            .bind(start)
            .bind(end)
            .bind(payload.check_in_grace_minutes)
            .bind(payload.check_out_grace_minutes)
            .execute(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to insert office timing");
                ErrorInternalServerError("Internal Server Error")
            })?;
            result.last_insert_id()
        }
    };

    let row = sqlx::query_as::<_, OfficeTiming>("SELECT * FROM office_timings WHERE id = ?")
        .bind(timing_id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to reload office timing");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Created().json(OfficeTimingOut::from(row)))
}

/// Soft-delete a timing row
#[utoipa::path(
    delete,
    path = "/api/v1/attendance/office-hours/{timing_id}",
    params(("timing_id", Path, description = "Office timing ID")),
    responses(
        (status = 204, description = "Office timing deactivated"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Office timing not found")
    ),
    security(("bearer_auth" = [])),
    tag = "OfficeHours"
)]
pub async fn deactivate_office_timing(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let timing_id = path.into_inner();

    let result = sqlx::query("UPDATE office_timings SET is_active = FALSE WHERE id = ?")
        .bind(timing_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, timing_id, "Failed to deactivate office timing");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Office timing not found"
        })));
    }

    Ok(HttpResponse::NoContent().finish())
}
