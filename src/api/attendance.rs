use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::model::attendance::Attendance;
use crate::utils::attendance_status::{evaluate_attendance, load_office_timing_cache};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, warn};
use utoipa::{IntoParams, ToSchema};

const LOCATION_LABEL_MAX: usize = 240;
const LOCATION_FIELD_MAX: usize = 250;
const ADDRESS_MAX: usize = 180;

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct LocationDetails {
    #[schema(example = "221B Baker Street, London")]
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Deserialize, ToSchema)]
pub struct CheckInRequest {
    pub gps_location: Option<LocationDetails>,
    /// Base64 selfie, raw or as a data URL
    pub selfie: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CheckOutRequest {
    pub gps_location: Option<LocationDetails>,
    /// Base64 selfie, raw or as a data URL
    pub selfie: Option<String>,
    #[schema(example = "Closed three tickets, reviewed two PRs")]
    pub work_summary: String,
    /// Base64 work report document, raw or as a data URL
    pub work_report: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceOut {
    pub attendance_id: u64,
    pub user_id: u64,
    pub check_in: DateTime<Utc>,
    pub check_out: Option<DateTime<Utc>>,
    #[schema(example = 8.25)]
    pub total_hours: f64,
    pub work_summary: Option<String>,
    pub work_report: Option<String>,
    pub check_in_location: Option<String>,
    pub check_out_location: Option<String>,
    pub check_in_selfie: Option<String>,
    pub check_out_selfie: Option<String>,
}

impl From<Attendance> for AttendanceOut {
    fn from(row: Attendance) -> Self {
        let (check_in_location, check_out_location) =
            split_location_labels(row.gps_location.as_deref());
        let selfies = load_selfie_paths(row.selfie.as_deref());

        AttendanceOut {
            attendance_id: row.attendance_id,
            user_id: row.user_id,
            check_in: row.check_in,
            check_out: row.check_out,
            total_hours: row.total_hours,
            work_summary: row.work_summary,
            work_report: row.work_report,
            check_in_location,
            check_out_location,
            check_in_selfie: selfies.check_in,
            check_out_selfie: selfies.check_out,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceStatusRow {
    pub attendance_id: u64,
    pub user_id: u64,
    pub employee_code: Option<String>,
    pub name: String,
    pub email: String,
    pub department: Option<String>,
    pub check_in: DateTime<Utc>,
    pub check_out: Option<DateTime<Utc>>,
    pub total_hours: f64,
    #[schema(example = "present")]
    pub status: String,
    #[schema(example = "on_time")]
    pub check_in_status: String,
    #[schema(example = "pending")]
    pub check_out_status: String,
    #[schema(example = "09:00")]
    pub scheduled_start: Option<String>,
    #[schema(example = "18:00")]
    pub scheduled_end: Option<String>,
    pub check_in_location: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceSummary {
    pub total_employees: i64,
    pub present_today: i64,
    pub late_arrivals: i64,
    pub early_departures: i64,
    pub absent_today: i64,
    #[schema(example = 7.8)]
    pub average_work_hours: f64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct DepartmentFilter {
    pub department: Option<String>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct AttendanceWithUser {
    pub(crate) attendance_id: u64,
    pub(crate) user_id: u64,
    pub(crate) check_in: DateTime<Utc>,
    pub(crate) check_out: Option<DateTime<Utc>>,
    pub(crate) total_hours: f64,
    pub(crate) gps_location: Option<String>,
    pub(crate) employee_code: Option<String>,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) department: Option<String>,
}

// ---------------------------------
// Helpers
// ---------------------------------

fn today_bounds() -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc
        .from_utc_datetime(&Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap());
    (start, start + Duration::days(1))
}

fn sanitize_text(value: &str, max_length: usize) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(max_length).collect())
}

/// Convert location details to a concise string for storage.
fn format_location_label(details: &LocationDetails) -> String {
    let mut address = details.address.clone().unwrap_or_default();
    if address.chars().count() > ADDRESS_MAX {
        address = address.chars().take(ADDRESS_MAX - 3).collect::<String>() + "...";
    }

    let coord_text = match (details.latitude, details.longitude) {
        (Some(lat), Some(lon)) => Some(format!("({:.6}, {:.6})", lat, lon)),
        _ => None,
    };

    let mut parts: Vec<String> = Vec::new();
    if !address.is_empty() {
        parts.push(address);
    }
    if let Some(coords) = coord_text {
        parts.push(coords);
    }

    if parts.is_empty() {
        "Location available".to_string()
    } else {
        parts.join(" ")
    }
}

/// Append or replace location information with a labelled entry.
///
/// The stored format is `Check-in: ... | Check-out: ...`; re-checking
/// replaces the segment of the same type instead of stacking duplicates.
fn compose_location_entry(
    existing: Option<&str>,
    entry_type: &str,
    details: &LocationDetails,
) -> String {
    let label = format_location_label(details);
    let raw_entry = format!("{}: {}", entry_type, label);
    let new_entry = sanitize_text(&raw_entry, LOCATION_LABEL_MAX).unwrap_or(raw_entry);

    let existing = match existing {
        Some(e) if !e.trim().is_empty() => e,
        _ => return new_entry,
    };

    let mut segments: Vec<String> = existing
        .split('|')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter(|s| !s.to_lowercase().starts_with(&entry_type.to_lowercase()))
        .map(|s| s.to_string())
        .collect();
    segments.push(new_entry);
    let combined = segments.join(" | ");
    sanitize_text(&combined, LOCATION_FIELD_MAX).unwrap_or(combined)
}

fn split_location_labels(label: Option<&str>) -> (Option<String>, Option<String>) {
    let mut check_in = None;
    let mut check_out = None;

    let Some(label) = label else {
        return (check_in, check_out);
    };

    for segment in label.split('|') {
        let part = segment.trim();
        if part.is_empty() {
            continue;
        }
        let lower = part.to_lowercase();
        let value = part
            .split_once(':')
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty());
        if lower.starts_with("check-in") {
            check_in = value;
        } else if lower.starts_with("check-out") {
            check_out = value;
        }
    }

    (check_in, check_out)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SelfiePaths {
    check_in: Option<String>,
    check_out: Option<String>,
}

fn load_selfie_paths(serialized: Option<&str>) -> SelfiePaths {
    let Some(serialized) = serialized else {
        return SelfiePaths::default();
    };

    match serde_json::from_str::<SelfiePaths>(serialized) {
        Ok(paths) => paths,
        // legacy rows stored a bare check-in path
        Err(_) if !serialized.trim().is_empty() => SelfiePaths {
            check_in: Some(serialized.trim().to_string()),
            check_out: None,
        },
        Err(_) => SelfiePaths::default(),
    }
}

fn merge_selfie_paths(
    existing: Option<&str>,
    check_in: Option<String>,
    check_out: Option<String>,
) -> Option<String> {
    let mut paths = load_selfie_paths(existing);
    if check_in.is_some() {
        paths.check_in = check_in;
    }
    if check_out.is_some() {
        paths.check_out = check_out;
    }

    if paths.check_in.is_none() && paths.check_out.is_none() {
        return None;
    }

    serde_json::to_string(&paths).ok()
}

/// Decode a raw/data-URL base64 payload and persist it under the upload dir.
fn save_base64_file(
    upload_dir: &str,
    subdir: &str,
    user_id: u64,
    tag: &str,
    extension: &str,
    data: &str,
) -> Result<String, String> {
    let encoded = match data.split_once(',') {
        Some((header, body)) if header.starts_with("data:") => body,
        _ => data,
    };

    let raw = BASE64
        .decode(encoded.trim())
        .map_err(|e| format!("invalid base64 payload: {}", e))?;

    let dir = format!("{}/{}", upload_dir, subdir);
    std::fs::create_dir_all(&dir).map_err(|e| format!("failed to create {}: {}", dir, e))?;

    let file_name = format!(
        "{}_{}_{}.{}",
        user_id,
        tag,
        Utc::now().format("%Y%m%d%H%M%S"),
        extension
    );
    let path = format!("{}/{}", dir, file_name);
    std::fs::write(&path, raw).map_err(|e| format!("failed to write {}: {}", path, e))?;

    Ok(path)
}

async fn require_active_user(pool: &MySqlPool, user_id: u64) -> actix_web::Result<()> {
    let active = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE user_id = ? AND is_active = TRUE)",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        error!(error = %e, user_id, "Failed to check user status");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if active {
        Ok(())
    } else {
        Err(actix_web::error::ErrorForbidden(
            "User not found or inactive",
        ))
    }
}

async fn find_open_attendance_today(
    pool: &MySqlPool,
    user_id: u64,
) -> Result<Option<Attendance>, sqlx::Error> {
    let (today_start, _) = today_bounds();
    sqlx::query_as::<_, Attendance>(
        r#"
        SELECT * FROM attendances
        WHERE user_id = ? AND check_in >= ? AND check_out IS NULL
        ORDER BY check_in DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(today_start)
    .fetch_optional(pool)
    .await
}

// ---------------------------------
// Handlers
// ---------------------------------

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Checked in", body = AttendanceOut),
        (status = 200, description = "Already checked in today, existing record returned", body = AttendanceOut),
        (status = 400, description = "Location missing or selfie invalid"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Account inactive"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CheckInRequest>,
) -> actix_web::Result<impl Responder> {
    require_active_user(pool.get_ref(), auth.user_id).await?;

    let location = match payload.gps_location.clone() {
        Some(l) => l,
        None => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Location data is required for check-in"
            })));
        }
    };

    // Idempotent: an open record today is simply returned
    if let Some(existing) = find_open_attendance_today(pool.get_ref(), auth.user_id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = auth.user_id, "Check-in lookup failed");
            ErrorInternalServerError("Internal Server Error")
        })?
    {
        return Ok(HttpResponse::Ok().json(AttendanceOut::from(existing)));
    }

    let selfie_path = match payload.selfie.as_deref() {
        Some(data) if !data.is_empty() => {
            match save_base64_file(&config.upload_dir, "selfies", auth.user_id, "checkin", "jpg", data)
            {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(user_id = auth.user_id, error = %e, "Check-in selfie rejected");
                    return Ok(HttpResponse::BadRequest().json(json!({
                        "message": format!("Invalid selfie payload: {}", e)
                    })));
                }
            }
        }
        _ => None,
    };

    let gps_label = compose_location_entry(None, "Check-in", &location);
    let selfie_json = merge_selfie_paths(None, selfie_path, None);

    let result = sqlx::query(
        r#"
        INSERT INTO attendances (user_id, check_in, gps_location, selfie, total_hours)
        VALUES (?, NOW(), ?, ?, 0)
        "#,
    )
    .bind(auth.user_id)
    .bind(&gps_label)
    .bind(&selfie_json)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Check-in failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let row = sqlx::query_as::<_, Attendance>("SELECT * FROM attendances WHERE attendance_id = ?")
        .bind(result.last_insert_id())
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to reload attendance after check-in");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Created().json(AttendanceOut::from(row)))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-out",
    request_body = CheckOutRequest,
    responses(
        (status = 200, description = "Checked out", body = AttendanceOut),
        (status = 400, description = "No active check-in, or work summary missing"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Account inactive"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CheckOutRequest>,
) -> actix_web::Result<impl Responder> {
    require_active_user(pool.get_ref(), auth.user_id).await?;

    let summary = payload.work_summary.trim();
    if summary.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Work summary is required for check-out"
        })));
    }

    let attendance = match find_open_attendance_today(pool.get_ref(), auth.user_id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = auth.user_id, "Check-out lookup failed");
            ErrorInternalServerError("Internal Server Error")
        })? {
        Some(a) => a,
        None => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "No active check-in found for today"
            })));
        }
    };

    let selfie_path = match payload.selfie.as_deref() {
        Some(data) if !data.is_empty() => {
            match save_base64_file(&config.upload_dir, "selfies", auth.user_id, "checkout", "jpg", data)
            {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(user_id = auth.user_id, error = %e, "Check-out selfie rejected");
                    return Ok(HttpResponse::BadRequest().json(json!({
                        "message": format!("Invalid selfie payload: {}", e)
                    })));
                }
            }
        }
        _ => None,
    };

    let work_report_path = match payload.work_report.as_deref() {
        Some(data) if !data.is_empty() => {
            match save_base64_file(
                &config.upload_dir,
                "work_reports",
                auth.user_id,
                "report",
                "pdf",
                data,
            ) {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(user_id = auth.user_id, error = %e, "Work report rejected");
                    return Ok(HttpResponse::BadRequest().json(json!({
                        "message": format!("Invalid work report payload: {}", e)
                    })));
                }
            }
        }
        _ => None,
    };

    // A missing location is tolerated on the way out
    let location = payload.gps_location.clone().unwrap_or(LocationDetails {
        address: Some("Location not provided".to_string()),
        latitude: None,
        longitude: None,
    });

    let now = Utc::now();
    let gps_label =
        compose_location_entry(attendance.gps_location.as_deref(), "Check-out", &location);
    let selfie_json = merge_selfie_paths(attendance.selfie.as_deref(), None, selfie_path);
    let worked = now - attendance.check_in;
    let total_hours = ((worked.num_seconds() as f64 / 3600.0) * 100.0).round() / 100.0;

    sqlx::query(
        r#"
        UPDATE attendances
        SET check_out = ?, gps_location = ?, selfie = ?, work_summary = ?,
            work_report = COALESCE(?, work_report), total_hours = ?
        WHERE attendance_id = ?
        "#,
    )
    .bind(now)
    .bind(&gps_label)
    .bind(&selfie_json)
    .bind(summary)
    .bind(&work_report_path)
    .bind(total_hours)
    .bind(attendance.attendance_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Check-out failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let row = sqlx::query_as::<_, Attendance>("SELECT * FROM attendances WHERE attendance_id = ?")
        .bind(attendance.attendance_id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to reload attendance after check-out");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(AttendanceOut::from(row)))
}

/// Caller's attendance history for the last six months
#[utoipa::path(
    get,
    path = "/api/v1/attendance/my",
    responses(
        (status = 200, description = "Attendance records, newest first", body = [AttendanceOut])
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let since = Utc::now() - Duration::days(180);

    let rows = sqlx::query_as::<_, Attendance>(
        r#"
        SELECT * FROM attendances
        WHERE user_id = ? AND check_in >= ?
        ORDER BY check_in DESC
        "#,
    )
    .bind(auth.user_id)
    .bind(since)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Failed to fetch attendance history");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let out: Vec<AttendanceOut> = rows.into_iter().map(AttendanceOut::from).collect();
    Ok(HttpResponse::Ok().json(out))
}

pub(crate) async fn fetch_attendance_with_users(
    pool: &MySqlPool,
    department: Option<&str>,
    today_only: bool,
) -> Result<Vec<AttendanceWithUser>, sqlx::Error> {
    let mut sql = String::from(
        r#"
        SELECT a.attendance_id, a.user_id, a.check_in, a.check_out, a.total_hours,
               a.gps_location, u.employee_code, u.name, u.email, u.department
        FROM attendances a
        JOIN users u ON u.user_id = a.user_id
        WHERE 1=1
        "#,
    );
    if today_only {
        sql.push_str(" AND a.check_in >= ? AND a.check_in < ?");
    }
    if department.is_some() {
        sql.push_str(" AND u.department = ?");
    }
    sql.push_str(" ORDER BY a.check_in DESC");

    let mut query = sqlx::query_as::<_, AttendanceWithUser>(&sql);
    if today_only {
        let (start, end) = today_bounds();
        query = query.bind(start).bind(end);
    }
    if let Some(dept) = department {
        query = query.bind(dept);
    }

    query.fetch_all(pool).await
}

fn build_status_rows(
    rows: Vec<AttendanceWithUser>,
    cache: &crate::utils::attendance_status::OfficeTimingCache,
    offset: chrono::FixedOffset,
) -> Vec<AttendanceStatusRow> {
    rows.into_iter()
        .map(|row| {
            let evaluation = evaluate_attendance(
                Some(row.check_in),
                row.check_out,
                cache.resolve(row.department.as_deref()),
                offset,
            );
            let (check_in_location, _) = split_location_labels(row.gps_location.as_deref());

            AttendanceStatusRow {
                attendance_id: row.attendance_id,
                user_id: row.user_id,
                employee_code: row.employee_code,
                name: row.name,
                email: row.email,
                department: row.department,
                check_in: row.check_in,
                check_out: row.check_out,
                total_hours: row.total_hours,
                status: evaluation.status.to_string(),
                check_in_status: evaluation.check_in_status.as_str().to_string(),
                check_out_status: evaluation.check_out_status.as_str().to_string(),
                scheduled_start: evaluation.scheduled_start,
                scheduled_end: evaluation.scheduled_end,
                check_in_location,
            }
        })
        .collect()
}

/// Today's records with evaluated statuses (manager view)
#[utoipa::path(
    get,
    path = "/api/v1/attendance/today",
    params(DepartmentFilter),
    responses(
        (status = 200, description = "Today's evaluated attendance", body = [AttendanceStatusRow])
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<DepartmentFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_up()?;

    let rows = fetch_attendance_with_users(pool.get_ref(), query.department.as_deref(), true)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch today's attendance");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let cache = load_office_timing_cache(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to load office timings");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(build_status_rows(rows, &cache, config.local_offset())))
}

/// Full attendance log with user info (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/v1/attendance/all",
    params(DepartmentFilter),
    responses(
        (status = 200, description = "All evaluated attendance records", body = [AttendanceStatusRow])
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn all_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<DepartmentFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let rows = fetch_attendance_with_users(pool.get_ref(), query.department.as_deref(), false)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch attendance records");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let cache = load_office_timing_cache(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to load office timings");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(build_status_rows(rows, &cache, config.local_offset())))
}

/// Aggregate counters for today
#[utoipa::path(
    get,
    path = "/api/v1/attendance/summary",
    responses(
        (status = 200, description = "Attendance summary", body = AttendanceSummary)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_up()?;

    let total_employees = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count employees");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let rows = fetch_attendance_with_users(pool.get_ref(), None, true)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch today's attendance");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let cache = load_office_timing_cache(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to load office timings");
        ErrorInternalServerError("Internal Server Error")
    })?;
    let offset = config.local_offset();

    let mut present_users = std::collections::HashSet::new();
    let mut late_arrivals = 0i64;
    let mut early_departures = 0i64;
    let mut work_durations: Vec<f64> = Vec::new();

    for row in &rows {
        present_users.insert(row.user_id);
        let evaluation = evaluate_attendance(
            Some(row.check_in),
            row.check_out,
            cache.resolve(row.department.as_deref()),
            offset,
        );
        if evaluation.check_in_status.as_str() == "late" {
            late_arrivals += 1;
        }
        if evaluation.check_out_status.as_str() == "early" {
            early_departures += 1;
        }
        if let Some(out) = row.check_out {
            work_durations.push((out - row.check_in).num_seconds() as f64 / 3600.0);
        }
    }

    let present_today = present_users.len() as i64;
    let absent_today = (total_employees - present_today).max(0);
    let average_work_hours = if work_durations.is_empty() {
        0.0
    } else {
        let avg = work_durations.iter().sum::<f64>() / work_durations.len() as f64;
        (avg * 100.0).round() / 100.0
    };

    Ok(HttpResponse::Ok().json(AttendanceSummary {
        total_employees,
        present_today,
        late_arrivals,
        early_departures,
        absent_today,
        average_work_hours,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(address: &str, lat: f64, lon: f64) -> LocationDetails {
        LocationDetails {
            address: Some(address.to_string()),
            latitude: Some(lat),
            longitude: Some(lon),
        }
    }

    #[test]
    fn composes_first_entry() {
        let label = compose_location_entry(None, "Check-in", &details("HQ", 12.5, 77.6));
        assert_eq!(label, "Check-in: HQ (12.500000, 77.600000)");
    }

    #[test]
    fn appends_check_out_segment() {
        let existing = "Check-in: HQ (12.500000, 77.600000)";
        let label = compose_location_entry(Some(existing), "Check-out", &details("Home", 1.0, 2.0));
        assert!(label.starts_with("Check-in: HQ"));
        assert!(label.contains("| Check-out: Home"));
    }

    #[test]
    fn replaces_segment_of_same_type() {
        let existing = "Check-in: Old office | Check-out: Somewhere";
        let label = compose_location_entry(Some(existing), "Check-in", &details("New office", 3.0, 4.0));
        assert!(!label.contains("Old office"));
        assert!(label.contains("Check-out: Somewhere"));
        assert!(label.contains("Check-in: New office"));
    }

    #[test]
    fn falls_back_when_no_details() {
        let label = format_location_label(&LocationDetails::default());
        assert_eq!(label, "Location available");
    }

    #[test]
    fn splits_composed_labels() {
        let (check_in, check_out) =
            split_location_labels(Some("Check-in: HQ | Check-out: Home (1.000000, 2.000000)"));
        assert_eq!(check_in.as_deref(), Some("HQ"));
        assert_eq!(check_out.as_deref(), Some("Home (1.000000, 2.000000)"));

        let (none_in, none_out) = split_location_labels(None);
        assert!(none_in.is_none() && none_out.is_none());
    }

    #[test]
    fn selfie_merge_keeps_existing_slot() {
        let first = merge_selfie_paths(None, Some("a.jpg".into()), None).unwrap();
        let merged = merge_selfie_paths(Some(&first), None, Some("b.jpg".into())).unwrap();
        let paths = load_selfie_paths(Some(&merged));
        assert_eq!(paths.check_in.as_deref(), Some("a.jpg"));
        assert_eq!(paths.check_out.as_deref(), Some("b.jpg"));
    }

    #[test]
    fn legacy_selfie_string_maps_to_check_in() {
        let paths = load_selfie_paths(Some("uploads/selfies/1.jpg"));
        assert_eq!(paths.check_in.as_deref(), Some("uploads/selfies/1.jpg"));
        assert!(paths.check_out.is_none());
    }

    #[test]
    fn long_addresses_are_truncated() {
        let long = "x".repeat(400);
        let label = format_location_label(&LocationDetails {
            address: Some(long),
            latitude: None,
            longitude: None,
        });
        assert!(label.chars().count() <= ADDRESS_MAX);
        assert!(label.ends_with("..."));
    }
}
