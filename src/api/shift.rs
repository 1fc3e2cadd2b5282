use crate::auth::auth::AuthUser;
use crate::model::notification::ShiftNotification;
use crate::model::shift::{Shift, ShiftAssignment};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

// Upper bound for schedule range queries, one month is plenty for the UI
const MAX_SCHEDULE_RANGE_DAYS: i64 = 31;

#[derive(Deserialize, ToSchema)]
pub struct CreateShift {
    #[schema(example = "Morning Shift")]
    pub name: String,
    #[schema(example = "06:00")]
    pub start_time: String,
    #[schema(example = "14:00")]
    pub end_time: String,
    /// Omit for a global shift
    pub department: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateShift {
    pub name: Option<String>,
    #[schema(example = "06:00")]
    pub start_time: Option<String>,
    #[schema(example = "14:00")]
    pub end_time: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct AssignShift {
    pub user_id: u64,
    pub shift_id: u64,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub assignment_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct BulkAssignShift {
    pub user_ids: Vec<u64>,
    pub shift_id: u64,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub assignment_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateAssignment {
    pub shift_id: Option<u64>,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub assignment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ShiftListQuery {
    pub department: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct MyScheduleQuery {
    #[schema(format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[schema(format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct DepartmentScheduleQuery {
    pub department: String,
    #[schema(format = "date", value_type = String)]
    pub date: NaiveDate,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct DepartmentScheduleRangeQuery {
    pub department: String,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct UserBrief {
    pub user_id: u64,
    pub name: String,
    pub email: String,
    pub department: Option<String>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct AssignmentWithUser {
    pub assignment_id: u64,
    pub user_id: u64,
    pub shift_id: u64,
    #[schema(format = "date", value_type = String)]
    pub assignment_date: NaiveDate,
    pub assigned_by: Option<u64>,
    pub notes: Option<String>,
    pub is_reassigned: bool,
    pub name: String,
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct ShiftScheduleEntry {
    pub shift: Shift,
    pub assignments: Vec<AssignmentWithUser>,
    pub total_assigned: usize,
}

#[derive(Serialize, ToSchema)]
pub struct DepartmentSchedule {
    pub department: String,
    #[schema(format = "date", value_type = String)]
    pub date: NaiveDate,
    pub shifts: Vec<ShiftScheduleEntry>,
    pub users_on_leave: Vec<UserBrief>,
    pub unassigned_users: Vec<UserBrief>,
}

#[derive(Serialize, ToSchema)]
pub struct DepartmentScheduleRange {
    pub department: String,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub days: Vec<DepartmentSchedule>,
}

fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

async fn fetch_shift(pool: &MySqlPool, shift_id: u64) -> Result<Option<Shift>, sqlx::Error> {
    sqlx::query_as::<_, Shift>("SELECT * FROM shifts WHERE shift_id = ?")
        .bind(shift_id)
        .fetch_optional(pool)
        .await
}

async fn fetch_assignment(
    pool: &MySqlPool,
    assignment_id: u64,
) -> Result<Option<ShiftAssignment>, sqlx::Error> {
    sqlx::query_as::<_, ShiftAssignment>(
        "SELECT * FROM shift_assignments WHERE assignment_id = ?",
    )
    .bind(assignment_id)
    .fetch_optional(pool)
    .await
}

/// Shifts visible for a department: its own plus global ones
async fn shifts_for_department(
    pool: &MySqlPool,
    department: Option<&str>,
) -> Result<Vec<Shift>, sqlx::Error> {
    match department {
        Some(dept) => {
            sqlx::query_as::<_, Shift>(
                r#"
                SELECT * FROM shifts
                WHERE is_active = TRUE
                  AND (LOWER(department) = LOWER(?) OR department IS NULL)
                ORDER BY start_time
                "#,
            )
            .bind(dept)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, Shift>(
                r#"
                SELECT * FROM shifts
                WHERE is_active = TRUE AND department IS NULL
                ORDER BY start_time
                "#,
            )
            .fetch_all(pool)
            .await
        }
    }
}

async fn create_shift_notification(
    pool: &MySqlPool,
    user_id: u64,
    assignment_id: u64,
    notification_type: &str,
    title: &str,
    message: &str,
) {
    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO shift_notifications (user_id, shift_assignment_id, notification_type, title, message)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(assignment_id)
    .bind(notification_type)
    .bind(title)
    .bind(message)
    .execute(pool)
    .await
    {
        error!(error = %e, user_id, assignment_id, "Failed to create shift notification");
    }
}

/// Assign or reassign one user for one date; one row per (user, date).
async fn assign_one(
    pool: &MySqlPool,
    user_id: u64,
    shift: &Shift,
    assignment_date: NaiveDate,
    assigned_by: u64,
    notes: Option<&str>,
) -> Result<ShiftAssignment, sqlx::Error> {
    let existing = sqlx::query_as::<_, ShiftAssignment>(
        "SELECT * FROM shift_assignments WHERE user_id = ? AND assignment_date = ?",
    )
    .bind(user_id)
    .bind(assignment_date)
    .fetch_optional(pool)
    .await?;

    let (assignment_id, reassigned) = match existing {
        Some(existing) => {
            sqlx::query(
                r#"
                UPDATE shift_assignments
                SET shift_id = ?, assigned_by = ?, notes = ?, is_reassigned = TRUE
                WHERE assignment_id = ?
                "#,
            )
            .bind(shift.shift_id)
            .bind(assigned_by)
            .bind(notes)
            .bind(existing.assignment_id)
            .execute(pool)
            .await?;
            (existing.assignment_id, true)
        }
        None => {
            let result = sqlx::query(
                r#"
                INSERT INTO shift_assignments (user_id, shift_id, assignment_date, assigned_by, notes)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(user_id)
            .bind(shift.shift_id)
            .bind(assignment_date)
            .bind(assigned_by)
            .bind(notes)
            .execute(pool)
            .await?;
            (result.last_insert_id(), false)
        }
    };

    let (notification_type, title) = if reassigned {
        ("shift_reassigned", "Shift Reassigned")
    } else {
        ("shift_assigned", "Shift Assigned")
    };
    let message = format!(
        "You have been assigned to '{}' ({} - {}) on {}.",
        shift.name,
        shift.start_time.format("%H:%M"),
        shift.end_time.format("%H:%M"),
        assignment_date.format("%d %b %Y"),
    );
    create_shift_notification(pool, user_id, assignment_id, notification_type, title, &message)
        .await;

    sqlx::query_as::<_, ShiftAssignment>(
        "SELECT * FROM shift_assignments WHERE assignment_id = ?",
    )
    .bind(assignment_id)
    .fetch_one(pool)
    .await
}

// ---------------------------------
// Shift CRUD
// ---------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/shifts",
    request_body = CreateShift,
    responses(
        (status = 201, description = "Shift created", body = Shift),
        (status = 400, description = "Bad time format"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn create_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateShift>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_up()?;

    let (Some(start), Some(end)) = (
        parse_hhmm(&payload.start_time),
        parse_hhmm(&payload.end_time),
    ) else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Invalid time format. Use HH:MM"
        })));
    };

    if payload.name.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Shift name must not be empty"
        })));
    }

    let department = payload
        .department
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let result = sqlx::query(
        r#"
        INSERT INTO shifts (name, start_time, end_time, department, description)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(start)
    .bind(end)
    .bind(department)
    .bind(&payload.description)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create shift");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let shift = fetch_shift(pool.get_ref(), result.last_insert_id())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to reload shift");
            ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

    Ok(HttpResponse::Created().json(shift))
}

#[utoipa::path(
    get,
    path = "/api/v1/shifts",
    params(ShiftListQuery),
    responses(
        (status = 200, description = "Active shifts for the department (plus global)", body = [Shift])
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn list_shifts(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ShiftListQuery>,
) -> actix_web::Result<impl Responder> {
    let shifts = shifts_for_department(pool.get_ref(), query.department.as_deref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to list shifts");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(shifts))
}

#[utoipa::path(
    get,
    path = "/api/v1/shifts/{shift_id}",
    params(("shift_id" = u64, Path, description = "Shift ID")),
    responses(
        (status = 200, description = "Shift found", body = Shift),
        (status = 404, description = "Shift not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn get_shift(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let shift = fetch_shift(pool.get_ref(), path.into_inner())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch shift");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match shift {
        Some(s) => Ok(HttpResponse::Ok().json(s)),
        None => Ok(HttpResponse::NotFound().json(json!({ "message": "Shift not found" }))),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/shifts/{shift_id}",
    params(("shift_id" = u64, Path, description = "Shift ID")),
    request_body = UpdateShift,
    responses(
        (status = 200, description = "Shift updated", body = Shift),
        (status = 400, description = "Bad time format"),
        (status = 404, description = "Shift not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn update_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateShift>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_up()?;

    let shift_id = path.into_inner();

    let start = match payload.start_time.as_deref() {
        Some(s) => match parse_hhmm(s) {
            Some(t) => Some(t),
            None => {
                return Ok(HttpResponse::BadRequest().json(json!({
                    "message": "Invalid time format. Use HH:MM"
                })));
            }
        },
        None => None,
    };
    let end = match payload.end_time.as_deref() {
        Some(s) => match parse_hhmm(s) {
            Some(t) => Some(t),
            None => {
                return Ok(HttpResponse::BadRequest().json(json!({
                    "message": "Invalid time format. Use HH:MM"
                })));
            }
        },
        None => None,
    };

    let result = sqlx::query(
        r#"
        UPDATE shifts
        SET name = COALESCE(?, name),
            start_time = COALESCE(?, start_time),
            end_time = COALESCE(?, end_time),
            description = COALESCE(?, description),
            is_active = COALESCE(?, is_active)
        WHERE shift_id = ?
        "#,
    )
    .bind(&payload.name)
    .bind(start)
    .bind(end)
    .bind(&payload.description)
    .bind(payload.is_active)
    .bind(shift_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, shift_id, "Failed to update shift");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Shift not found" })));
    }

    let shift = fetch_shift(pool.get_ref(), shift_id)
        .await
        .map_err(|e| {
            error!(error = %e, shift_id, "Failed to reload shift");
            ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

    Ok(HttpResponse::Ok().json(shift))
}

#[utoipa::path(
    delete,
    path = "/api/v1/shifts/{shift_id}",
    params(("shift_id" = u64, Path, description = "Shift ID")),
    responses(
        (status = 204, description = "Shift deleted with its assignments"),
        (status = 404, description = "Shift not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn delete_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_up()?;

    let shift_id = path.into_inner();

    let result = sqlx::query("DELETE FROM shifts WHERE shift_id = ?")
        .bind(shift_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, shift_id, "Failed to delete shift");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Shift not found" })));
    }

    Ok(HttpResponse::NoContent().finish())
}

// ---------------------------------
// Assignments
// ---------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/shifts/assignment",
    request_body = AssignShift,
    responses(
        (status = 200, description = "Assignment stored (reassigned in place when one existed)", body = ShiftAssignment),
        (status = 400, description = "Shift or user missing"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn assign_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<AssignShift>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_up()?;

    let shift = match fetch_shift(pool.get_ref(), payload.shift_id).await.map_err(|e| {
        error!(error = %e, "Failed to fetch shift");
        ErrorInternalServerError("Internal Server Error")
    })? {
        Some(s) if s.is_active => s,
        _ => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Shift not found or inactive"
            })));
        }
    };

    let user_exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE user_id = ? AND is_active = TRUE)",
    )
    .bind(payload.user_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to check user");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if !user_exists {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "User not found or inactive"
        })));
    }

    let assignment = assign_one(
        pool.get_ref(),
        payload.user_id,
        &shift,
        payload.assignment_date,
        auth.user_id,
        payload.notes.as_deref(),
    )
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to assign shift");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(assignment))
}

#[utoipa::path(
    post,
    path = "/api/v1/shifts/assignment/bulk",
    request_body = BulkAssignShift,
    responses(
        (status = 200, description = "Assignments stored", body = [ShiftAssignment]),
        (status = 400, description = "Shift missing or empty user list"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn bulk_assign_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<BulkAssignShift>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_up()?;

    if payload.user_ids.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "user_ids must not be empty"
        })));
    }

    let shift = match fetch_shift(pool.get_ref(), payload.shift_id).await.map_err(|e| {
        error!(error = %e, "Failed to fetch shift");
        ErrorInternalServerError("Internal Server Error")
    })? {
        Some(s) if s.is_active => s,
        _ => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Shift not found or inactive"
            })));
        }
    };

    let mut assignments = Vec::with_capacity(payload.user_ids.len());
    for user_id in &payload.user_ids {
        let assignment = assign_one(
            pool.get_ref(),
            *user_id,
            &shift,
            payload.assignment_date,
            auth.user_id,
            payload.notes.as_deref(),
        )
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to assign shift");
            ErrorInternalServerError("Internal Server Error")
        })?;
        assignments.push(assignment);
    }

    Ok(HttpResponse::Ok().json(assignments))
}

#[utoipa::path(
    put,
    path = "/api/v1/shifts/assignment/{assignment_id}",
    params(("assignment_id" = u64, Path, description = "Assignment ID")),
    request_body = UpdateAssignment,
    responses(
        (status = 200, description = "Assignment updated", body = ShiftAssignment),
        (status = 404, description = "Assignment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn update_assignment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateAssignment>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_up()?;

    let assignment_id = path.into_inner();

    let existing = match fetch_assignment(pool.get_ref(), assignment_id).await.map_err(|e| {
        error!(error = %e, assignment_id, "Failed to fetch assignment");
        ErrorInternalServerError("Internal Server Error")
    })? {
        Some(a) => a,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Assignment not found"
            })));
        }
    };

    let reassigned = payload
        .shift_id
        .map(|s| s != existing.shift_id)
        .unwrap_or(false);

    sqlx::query(
        r#"
        UPDATE shift_assignments
        SET shift_id = COALESCE(?, shift_id),
            assignment_date = COALESCE(?, assignment_date),
            notes = COALESCE(?, notes),
            is_reassigned = (is_reassigned OR ?)
        WHERE assignment_id = ?
        "#,
    )
    .bind(payload.shift_id)
    .bind(payload.assignment_date)
    .bind(&payload.notes)
    .bind(reassigned)
    .bind(assignment_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, assignment_id, "Failed to update assignment");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let updated = fetch_assignment(pool.get_ref(), assignment_id)
        .await
        .map_err(|e| {
            error!(error = %e, assignment_id, "Failed to reload assignment");
            ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/shifts/assignment/{assignment_id}",
    params(("assignment_id" = u64, Path, description = "Assignment ID")),
    responses(
        (status = 204, description = "Assignment deleted"),
        (status = 404, description = "Assignment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn delete_assignment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_up()?;

    let assignment_id = path.into_inner();

    let result = sqlx::query("DELETE FROM shift_assignments WHERE assignment_id = ?")
        .bind(assignment_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, assignment_id, "Failed to delete assignment");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Assignment not found"
        })));
    }

    Ok(HttpResponse::NoContent().finish())
}

// ---------------------------------
// Schedules
// ---------------------------------

/// Caller's own assignments, optionally windowed
#[utoipa::path(
    get,
    path = "/api/v1/shifts/schedule/my",
    params(MyScheduleQuery),
    responses(
        (status = 200, description = "Own shift assignments, newest first", body = [ShiftAssignment])
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn my_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MyScheduleQuery>,
) -> actix_web::Result<impl Responder> {
    let mut sql =
        String::from("SELECT * FROM shift_assignments WHERE user_id = ?");
    if query.start_date.is_some() {
        sql.push_str(" AND assignment_date >= ?");
    }
    if query.end_date.is_some() {
        sql.push_str(" AND assignment_date <= ?");
    }
    sql.push_str(" ORDER BY assignment_date DESC");

    let mut q = sqlx::query_as::<_, ShiftAssignment>(&sql).bind(auth.user_id);
    if let Some(start) = query.start_date {
        q = q.bind(start);
    }
    if let Some(end) = query.end_date {
        q = q.bind(end);
    }

    let assignments = q.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Failed to fetch schedule");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(assignments))
}

async fn department_schedule_for_date(
    pool: &MySqlPool,
    department: &str,
    date: NaiveDate,
) -> Result<DepartmentSchedule, sqlx::Error> {
    let shifts = shifts_for_department(pool, Some(department)).await?;

    let assignments = sqlx::query_as::<_, AssignmentWithUser>(
        r#"
        SELECT sa.assignment_id, sa.user_id, sa.shift_id, sa.assignment_date,
               sa.assigned_by, sa.notes, sa.is_reassigned, u.name, u.email
        FROM shift_assignments sa
        JOIN users u ON u.user_id = sa.user_id
        WHERE sa.assignment_date = ?
        "#,
    )
    .bind(date)
    .fetch_all(pool)
    .await?;

    let department_users = sqlx::query_as::<_, UserBrief>(
        r#"
        SELECT user_id, name, email, department
        FROM users
        WHERE department = ? AND is_active = TRUE AND role IN ('Employee', 'TeamLead')
        "#,
    )
    .bind(department)
    .fetch_all(pool)
    .await?;

    let users_on_leave = sqlx::query_as::<_, UserBrief>(
        r#"
        SELECT DISTINCT u.user_id, u.name, u.email, u.department
        FROM users u
        JOIN leaves l ON l.user_id = u.user_id
        WHERE u.department = ? AND u.is_active = TRUE
          AND l.status = 'Approved'
          AND DATE(l.start_date) <= ? AND DATE(l.end_date) >= ?
        "#,
    )
    .bind(department)
    .bind(date)
    .bind(date)
    .fetch_all(pool)
    .await?;

    let mut assigned_user_ids = std::collections::HashSet::new();
    let mut entries = Vec::with_capacity(shifts.len());

    for shift in shifts {
        let shift_assignments: Vec<AssignmentWithUser> = assignments
            .iter()
            .filter(|a| a.shift_id == shift.shift_id)
            .map(|a| AssignmentWithUser {
                assignment_id: a.assignment_id,
                user_id: a.user_id,
                shift_id: a.shift_id,
                assignment_date: a.assignment_date,
                assigned_by: a.assigned_by,
                notes: a.notes.clone(),
                is_reassigned: a.is_reassigned,
                name: a.name.clone(),
                email: a.email.clone(),
            })
            .collect();
        assigned_user_ids.extend(shift_assignments.iter().map(|a| a.user_id));
        let total_assigned = shift_assignments.len();

        entries.push(ShiftScheduleEntry {
            shift,
            assignments: shift_assignments,
            total_assigned,
        });
    }

    let unassigned_users = department_users
        .into_iter()
        .filter(|u| !assigned_user_ids.contains(&u.user_id))
        .collect();

    Ok(DepartmentSchedule {
        department: department.to_string(),
        date,
        shifts: entries,
        users_on_leave,
        unassigned_users,
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/shifts/schedule/department",
    params(DepartmentScheduleQuery),
    responses(
        (status = 200, description = "Department schedule for one date", body = DepartmentSchedule),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn department_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<DepartmentScheduleQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_up()?;

    let schedule = department_schedule_for_date(pool.get_ref(), &query.department, query.date)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to build department schedule");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(schedule))
}

#[utoipa::path(
    get,
    path = "/api/v1/shifts/schedule/department/range",
    params(DepartmentScheduleRangeQuery),
    responses(
        (status = 200, description = "Per-day schedules over an inclusive range", body = DepartmentScheduleRange),
        (status = 400, description = "Invalid range"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn department_schedule_range(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<DepartmentScheduleRangeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_up()?;

    if query.end_date < query.start_date {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "end_date must be on or after start_date"
        })));
    }
    if (query.end_date - query.start_date).num_days() >= MAX_SCHEDULE_RANGE_DAYS {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": format!("Range too large, maximum {} days", MAX_SCHEDULE_RANGE_DAYS)
        })));
    }

    let mut days = Vec::new();
    let mut current = query.start_date;
    while current <= query.end_date {
        let day = department_schedule_for_date(pool.get_ref(), &query.department, current)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to build department schedule");
                ErrorInternalServerError("Internal Server Error")
            })?;
        days.push(day);
        current += chrono::Duration::days(1);
    }

    Ok(HttpResponse::Ok().json(DepartmentScheduleRange {
        department: query.department.clone(),
        start_date: query.start_date,
        end_date: query.end_date,
        days,
    }))
}

// ---------------------------------
// Notifications
// ---------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/shifts/notifications",
    responses(
        (status = 200, description = "Shift notifications, newest first", body = [ShiftNotification])
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn shift_notifications(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let rows = sqlx::query_as::<_, ShiftNotification>(
        r#"
        SELECT * FROM shift_notifications
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch shift notifications");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    put,
    path = "/api/v1/shifts/notifications/{notification_id}/read",
    params(("notification_id" = u64, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Marked as read"),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Shifts"
)]
pub async fn mark_shift_notification_read(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let notification_id = path.into_inner();

    let result = sqlx::query(
        "UPDATE shift_notifications SET is_read = TRUE WHERE notification_id = ? AND user_id = ?",
    )
    .bind(notification_id)
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, notification_id, "Failed to mark notification read");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Notification not found"
        })));
    }

    Ok(HttpResponse::NoContent().finish())
}
