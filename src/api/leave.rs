use crate::auth::auth::AuthUser;
use crate::model::leave::{Leave, LeaveStatus};
use crate::model::notification::LeaveNotification;
use crate::model::role::Role;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

const LEAVE_TYPES: &[&str] = &["annual", "sick", "casual", "unpaid"];

const DEFAULT_LEAVE_ALLOWANCES: &[(&str, i64)] = &[("annual", 15), ("sick", 10), ("casual", 5)];

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-04", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family function")]
    pub reason: Option<String>,
    #[schema(example = "annual")]
    pub leave_type: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateLeave {
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-03-04", format = "date", value_type = String)]
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub leave_type: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ApproveBody {
    pub comments: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RejectBody {
    pub rejection_reason: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PeriodQuery {
    /// current_month | last_3_months | last_6_months | last_1_year
    #[schema(example = "current_month")]
    pub period: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by requester user ID
    pub user_id: Option<u64>,
    /// Filter by leave status
    #[schema(example = "Pending")]
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    /// Pagination per page number
    pub per_page: Option<u64>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct LeaveWithUser {
    pub leave_id: u64,
    pub user_id: u64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub reason: Option<String>,
    #[schema(example = "Pending")]
    pub status: String,
    #[schema(example = "annual")]
    pub leave_type: String,
    pub created_at: Option<DateTime<Utc>>,
    pub approved_by: Option<u64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub comments: Option<String>,
    pub name: String,
    pub email: String,
    pub department: Option<String>,
    pub employee_code: Option<String>,
    pub role: String,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveWithUser>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Debug, PartialEq, Serialize, ToSchema)]
pub struct LeaveBalanceItem {
    #[schema(example = "annual")]
    pub leave_type: String,
    #[schema(example = 15)]
    pub allocated: i64,
    #[schema(example = 4)]
    pub used: i64,
    #[schema(example = 11)]
    pub remaining: i64,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
}

fn validate_leave_type(value: &str) -> bool {
    LEAVE_TYPES.contains(&value.to_lowercase().as_str())
}

/// Window boundaries for the `period` filter on leave history.
fn period_range(period: &str, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    match period {
        "last_3_months" => (now - Duration::days(90), now),
        "last_6_months" => (now - Duration::days(180), now),
        "last_1_year" => (now - Duration::days(365), now),
        // default: current month
        _ => {
            let month_start = Utc
                .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
                .unwrap();
            let month_end = if now.month() == 12 {
                Utc.with_ymd_and_hms(now.year() + 1, 1, 1, 0, 0, 0).unwrap()
            } else {
                Utc.with_ymd_and_hms(now.year(), now.month() + 1, 1, 0, 0, 0)
                    .unwrap()
            };
            (month_start, month_end)
        }
    }
}

fn inclusive_day_count(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    ((end.date_naive() - start.date_naive()).num_days() + 1).max(0)
}

fn compute_leave_balance(approved: &[(String, DateTime<Utc>, DateTime<Utc>)]) -> Vec<LeaveBalanceItem> {
    use std::collections::BTreeMap;

    let mut balances: BTreeMap<String, (i64, i64)> = DEFAULT_LEAVE_ALLOWANCES
        .iter()
        .map(|(t, a)| (t.to_string(), (*a, 0)))
        .collect();

    for (leave_type, start, end) in approved {
        let key = if leave_type.trim().is_empty() {
            "annual".to_string()
        } else {
            leave_type.to_lowercase()
        };
        let days = inclusive_day_count(*start, *end);
        let entry = balances.entry(key).or_insert((0, 0));
        entry.1 += days;
    }

    balances
        .into_iter()
        .map(|(leave_type, (allocated, used))| LeaveBalanceItem {
            leave_type,
            allocated,
            used,
            remaining: (allocated - used).max(0),
        })
        .collect()
}

#[derive(sqlx::FromRow)]
struct Requester {
    user_id: u64,
    name: String,
    role: String,
    department: Option<String>,
    employee_code: Option<String>,
}

async fn fetch_requester(pool: &MySqlPool, user_id: u64) -> Result<Option<Requester>, sqlx::Error> {
    sqlx::query_as::<_, Requester>(
        "SELECT user_id, name, role, department, employee_code FROM users WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Who should hear about a new leave request.
///
/// Employee/TeamLead requesters notify Manager + HR of the same department;
/// Manager/HR requesters notify Admins; Admin requesters notify nobody.
async fn notification_recipients(
    pool: &MySqlPool,
    requester: &Requester,
) -> Result<Vec<u64>, sqlx::Error> {
    match Role::from_name(&requester.role) {
        Some(Role::Employee) | Some(Role::TeamLead) => {
            let Some(department) = requester.department.as_deref().map(str::trim) else {
                return Ok(Vec::new());
            };
            if department.is_empty() {
                return Ok(Vec::new());
            }

            sqlx::query_scalar::<_, u64>(
                r#"
                SELECT user_id FROM users
                WHERE is_active = TRUE
                  AND role IN ('Manager', 'HR')
                  AND department IS NOT NULL
                  AND LOWER(TRIM(department)) = LOWER(?)
                  AND user_id <> ?
                "#,
            )
            .bind(department)
            .bind(requester.user_id)
            .fetch_all(pool)
            .await
        }
        Some(Role::Manager) | Some(Role::Hr) => {
            sqlx::query_scalar::<_, u64>(
                r#"
                SELECT user_id FROM users
                WHERE is_active = TRUE AND role = 'Admin' AND user_id <> ?
                "#,
            )
            .bind(requester.user_id)
            .fetch_all(pool)
            .await
        }
        _ => Ok(Vec::new()),
    }
}

async fn insert_leave_notification(
    pool: &MySqlPool,
    user_id: u64,
    leave_id: u64,
    notification_type: &str,
    title: &str,
    message: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO leave_notifications (user_id, leave_id, notification_type, title, message)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(leave_id)
    .bind(notification_type)
    .bind(title)
    .bind(message)
    .execute(pool)
    .await?;
    Ok(())
}

async fn notify_leave_request(pool: &MySqlPool, leave: &Leave, requester: &Requester) {
    let recipients = match notification_recipients(pool, requester).await {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Failed to resolve leave notification recipients");
            return;
        }
    };

    let day_count = inclusive_day_count(leave.start_date, leave.end_date);
    let day_label = if day_count == 1 { "day" } else { "days" };
    let message = format!(
        "{} ({}) from {} department has requested leave from {} to {} ({} {}).",
        requester.name,
        requester.employee_code.as_deref().unwrap_or("N/A"),
        requester.department.as_deref().unwrap_or("N/A"),
        leave.start_date.format("%d %b %Y"),
        leave.end_date.format("%d %b %Y"),
        day_count,
        day_label,
    );

    for recipient in recipients {
        if let Err(e) = insert_leave_notification(
            pool,
            recipient,
            leave.leave_id,
            "Leave Request",
            "Leave Request Submitted",
            &message,
        )
        .await
        {
            error!(error = %e, recipient, "Failed to create leave notification");
        }
    }
}

async fn notify_leave_decision(pool: &MySqlPool, leave: &Leave, approver: &AuthUser, approved: bool) {
    // requester decided their own leave: nothing to say
    if leave.user_id == approver.user_id {
        return;
    }

    let approver_name = sqlx::query_scalar::<_, String>("SELECT name FROM users WHERE user_id = ?")
        .bind(approver.user_id)
        .fetch_optional(pool)
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| "your approver".to_string());

    let decision = if approved { "approved" } else { "rejected" };
    let title = format!(
        "Leave Request {}",
        if approved { "Approved" } else { "Rejected" }
    );
    let message = format!(
        "Your leave request from {} to {} has been {} by {}.",
        leave.start_date.format("%d %b %Y"),
        leave.end_date.format("%d %b %Y"),
        decision,
        approver_name,
    );

    if let Err(e) =
        insert_leave_notification(pool, leave.user_id, leave.leave_id, &title, &title, &message)
            .await
    {
        error!(error = %e, "Failed to create leave decision notification");
    }
}

async fn fetch_leave(pool: &MySqlPool, leave_id: u64) -> Result<Option<Leave>, sqlx::Error> {
    sqlx::query_as::<_, Leave>("SELECT * FROM leaves WHERE leave_id = ?")
        .bind(leave_id)
        .fetch_optional(pool)
        .await
}

/* =========================
Apply for leave
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body = CreateLeave,
    responses(
        (status = 201, description = "Leave request submitted", body = Leave),
        (status = 400, description = "Bad dates or unknown leave type"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    if payload.start_date > payload.end_date {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "start_date cannot be after end_date"
        })));
    }

    let leave_type = payload
        .leave_type
        .as_deref()
        .unwrap_or("annual")
        .to_lowercase();
    if !validate_leave_type(&leave_type) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Invalid leave type. Allowed: annual, sick, casual, unpaid"
        })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO leaves (user_id, start_date, end_date, reason, leave_type)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(day_start(payload.start_date))
    .bind(day_start(payload.end_date))
    .bind(&payload.reason)
    .bind(&leave_type)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Failed to create leave request");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let leave = fetch_leave(pool.get_ref(), result.last_insert_id())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to reload leave request");
            ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

    if let Ok(Some(requester)) = fetch_requester(pool.get_ref(), auth.user_id).await {
        notify_leave_request(pool.get_ref(), &leave, &requester).await;
    }

    Ok(HttpResponse::Created().json(leave))
}

/* =========================
Approve / reject (Manager/HR/Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leave/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "Leave request to approve")),
    request_body = ApproveBody,
    responses(
        (status = 200, description = "Leave approved", body = Leave),
        (status = 400, description = "Not found or already processed"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<ApproveBody>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_up()?;
    decide_leave(
        auth,
        pool,
        path.into_inner(),
        LeaveStatus::Approved,
        body.comments.clone(),
        None,
    )
    .await
}

#[utoipa::path(
    post,
    path = "/api/v1/leave/{leave_id}/reject",
    params(("leave_id" = u64, Path, description = "Leave request to reject")),
    request_body = RejectBody,
    responses(
        (status = 200, description = "Leave rejected", body = Leave),
        (status = 400, description = "Not found or already processed"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<RejectBody>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_up()?;
    decide_leave(
        auth,
        pool,
        path.into_inner(),
        LeaveStatus::Rejected,
        None,
        body.rejection_reason.clone(),
    )
    .await
}

async fn decide_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    leave_id: u64,
    status: LeaveStatus,
    comments: Option<String>,
    rejection_reason: Option<String>,
) -> actix_web::Result<HttpResponse> {
    let result = sqlx::query(
        r#"
        UPDATE leaves
        SET status = ?, approved_by = ?, approved_at = NOW(),
            comments = COALESCE(?, comments),
            rejection_reason = COALESCE(?, rejection_reason)
        WHERE leave_id = ? AND status = 'Pending'
        "#,
    )
    .bind(status.as_str())
    .bind(auth.user_id)
    .bind(&comments)
    .bind(&rejection_reason)
    .bind(leave_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, "Leave decision failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Leave request not found or already processed"
        })));
    }

    let leave = fetch_leave(pool.get_ref(), leave_id)
        .await
        .map_err(|e| {
            error!(error = %e, leave_id, "Failed to reload leave");
            ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

    notify_leave_decision(
        pool.get_ref(),
        &leave,
        &auth,
        status == LeaveStatus::Approved,
    )
    .await;

    Ok(HttpResponse::Ok().json(leave))
}

/* =========================
Own history and balance
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/my",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Caller's leave requests in the period", body = [Leave])
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn my_leaves(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PeriodQuery>,
) -> actix_web::Result<impl Responder> {
    let (start, end) = period_range(query.period.as_deref().unwrap_or("current_month"), Utc::now());

    // include any leave overlapping the window
    let leaves = sqlx::query_as::<_, Leave>(
        r#"
        SELECT * FROM leaves
        WHERE user_id = ?
          AND (
               (start_date >= ? AND start_date < ?)
            OR (end_date >= ? AND end_date < ?)
            OR (start_date <= ? AND end_date >= ?)
          )
        ORDER BY start_date DESC
        "#,
    )
    .bind(auth.user_id)
    .bind(start)
    .bind(end)
    .bind(start)
    .bind(end)
    .bind(start)
    .bind(end)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Failed to fetch leave history");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(leaves))
}

#[utoipa::path(
    get,
    path = "/api/v1/leave/balance",
    responses(
        (status = 200, description = "Per-type allowance usage", body = [LeaveBalanceItem])
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_balance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let approved = sqlx::query_as::<_, (String, DateTime<Utc>, DateTime<Utc>)>(
        r#"
        SELECT leave_type, start_date, end_date
        FROM leaves
        WHERE user_id = ? AND LOWER(status) = 'approved'
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Failed to fetch approved leaves");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(compute_leave_balance(&approved)))
}

/* =========================
Edit / withdraw while pending
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "Own pending leave request")),
    request_body = UpdateLeave,
    responses(
        (status = 200, description = "Leave updated", body = Leave),
        (status = 400, description = "Already processed or invalid payload"),
        (status = 404, description = "Leave not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn update_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateLeave>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let leave = match fetch_leave(pool.get_ref(), leave_id).await.map_err(|e| {
        error!(error = %e, leave_id, "Failed to fetch leave");
        ErrorInternalServerError("Internal Server Error")
    })? {
        Some(l) if l.user_id == auth.user_id => l,
        Some(_) | None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Leave request not found"
            })));
        }
    };

    if leave.status != LeaveStatus::Pending.as_str() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Only pending leave requests can be edited"
        })));
    }

    if let Some(leave_type) = payload.leave_type.as_deref() {
        if !validate_leave_type(leave_type) {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Invalid leave type. Allowed: annual, sick, casual, unpaid"
            })));
        }
    }

    let start_date = payload
        .start_date
        .map(day_start)
        .unwrap_or(leave.start_date);
    let end_date = payload.end_date.map(day_start).unwrap_or(leave.end_date);
    if start_date > end_date {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "start_date cannot be after end_date"
        })));
    }

    sqlx::query(
        r#"
        UPDATE leaves
        SET start_date = ?, end_date = ?,
            reason = COALESCE(?, reason),
            leave_type = COALESCE(?, leave_type)
        WHERE leave_id = ?
        "#,
    )
    .bind(start_date)
    .bind(end_date)
    .bind(&payload.reason)
    .bind(payload.leave_type.as_deref().map(str::to_lowercase))
    .bind(leave_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, "Failed to update leave");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let updated = fetch_leave(pool.get_ref(), leave_id)
        .await
        .map_err(|e| {
            error!(error = %e, leave_id, "Failed to reload leave");
            ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "Own pending leave request")),
    responses(
        (status = 204, description = "Leave withdrawn"),
        (status = 400, description = "Already processed"),
        (status = 404, description = "Leave not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let leave = match fetch_leave(pool.get_ref(), leave_id).await.map_err(|e| {
        error!(error = %e, leave_id, "Failed to fetch leave");
        ErrorInternalServerError("Internal Server Error")
    })? {
        Some(l) if l.user_id == auth.user_id => l,
        Some(_) | None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Leave request not found"
            })));
        }
    };

    if leave.status != LeaveStatus::Pending.as_str() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Only pending leave requests can be withdrawn"
        })));
    }

    sqlx::query("DELETE FROM leaves WHERE leave_id = ?")
        .bind(leave_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, leave_id, "Failed to delete leave");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::NoContent().finish())
}

/* =========================
Admin / approver views
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/all",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list with requester info", body = LeaveListResponse),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn all_leaves(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(user_id) = query.user_id {
        where_sql.push_str(" AND l.user_id = ?");
        args.push(FilterValue::U64(user_id));
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND l.status = ?");
        args.push(FilterValue::Str(status));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leaves l{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count leave requests");
        ErrorInternalServerError("Internal Server Error")
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT l.leave_id, l.user_id, l.start_date, l.end_date, l.reason, l.status,
               l.leave_type, l.created_at, l.approved_by, l.approved_at,
               l.rejection_reason, l.comments,
               u.name, u.email, u.department, u.employee_code, u.role
        FROM leaves l
        JOIN users u ON u.user_id = l.user_id
        {}
        ORDER BY l.created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, LeaveWithUser>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let leaves = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch leave list");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: leaves,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/// Pending requests the caller is responsible for deciding
#[utoipa::path(
    get,
    path = "/api/v1/leave/pending",
    responses(
        (status = 200, description = "Approval queue for the caller's role", body = [LeaveWithUser]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn pending_approvals(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_up()?;

    let base = r#"
        SELECT l.leave_id, l.user_id, l.start_date, l.end_date, l.reason, l.status,
               l.leave_type, l.created_at, l.approved_by, l.approved_at,
               l.rejection_reason, l.comments,
               u.name, u.email, u.department, u.employee_code, u.role
        FROM leaves l
        JOIN users u ON u.user_id = l.user_id
        WHERE l.status = 'Pending' AND u.is_active = TRUE
    "#;

    let rows = match auth.role {
        Role::Admin => {
            let sql = format!("{} AND u.role IN ('Manager', 'HR') ORDER BY l.created_at ASC", base);
            sqlx::query_as::<_, LeaveWithUser>(&sql)
                .fetch_all(pool.get_ref())
                .await
        }
        _ => {
            // Manager / HR queue is scoped to their own department
            let department = sqlx::query_scalar::<_, Option<String>>(
                "SELECT department FROM users WHERE user_id = ?",
            )
            .bind(auth.user_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch approver department");
                ErrorInternalServerError("Internal Server Error")
            })?
            .flatten();

            let Some(department) = department.filter(|d| !d.trim().is_empty()) else {
                return Ok(HttpResponse::BadRequest().json(json!({
                    "message": "Approver must have a department assigned"
                })));
            };

            let sql = format!(
                "{} AND u.role IN ('Employee', 'TeamLead') AND LOWER(TRIM(u.department)) = LOWER(TRIM(?)) ORDER BY l.created_at ASC",
                base
            );
            sqlx::query_as::<_, LeaveWithUser>(&sql)
                .bind(department)
                .fetch_all(pool.get_ref())
                .await
        }
    }
    .map_err(|e| {
        error!(error = %e, "Failed to fetch pending approvals");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}

/* =========================
Notifications
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/notifications",
    responses(
        (status = 200, description = "Leave notifications, newest first", body = [LeaveNotification])
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_notifications(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let rows = sqlx::query_as::<_, LeaveNotification>(
        r#"
        SELECT * FROM leave_notifications
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch leave notifications");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    put,
    path = "/api/v1/leave/notifications/{notification_id}/read",
    params(("notification_id" = u64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as read"),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn mark_leave_notification_read(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let notification_id = path.into_inner();

    let result = sqlx::query(
        "UPDATE leave_notifications SET is_read = TRUE WHERE notification_id = ? AND user_id = ?",
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

    Ok(HttpResponse::Ok().json(json!({ "message": "Notification marked as read" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn current_month_window() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 10, 30, 0).unwrap();
        let (start, end) = period_range("current_month", now);
        assert_eq!(start, ts(2026, 3, 1));
        assert_eq!(end, ts(2026, 4, 1));
    }

    #[test]
    fn december_rolls_into_next_year() {
        let now = Utc.with_ymd_and_hms(2026, 12, 20, 0, 0, 0).unwrap();
        let (start, end) = period_range("anything-else", now);
        assert_eq!(start, ts(2026, 12, 1));
        assert_eq!(end, ts(2027, 1, 1));
    }

    #[test]
    fn rolling_windows() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let (start, end) = period_range("last_3_months", now);
        assert_eq!(end, now);
        assert_eq!((end - start).num_days(), 90);
    }

    #[test]
    fn balance_counts_inclusive_days() {
        let approved = vec![
            ("annual".to_string(), ts(2026, 1, 5), ts(2026, 1, 7)), // 3 days
            ("sick".to_string(), ts(2026, 2, 1), ts(2026, 2, 1)),   // 1 day
        ];
        let balance = compute_leave_balance(&approved);

        let annual = balance.iter().find(|b| b.leave_type == "annual").unwrap();
        assert_eq!(annual.used, 3);
        assert_eq!(annual.remaining, 12);

        let sick = balance.iter().find(|b| b.leave_type == "sick").unwrap();
        assert_eq!(sick.used, 1);

        let casual = balance.iter().find(|b| b.leave_type == "casual").unwrap();
        assert_eq!(casual.used, 0);
        assert_eq!(casual.remaining, 5);
    }

    #[test]
    fn unknown_type_gets_zero_allocation() {
        let approved = vec![("unpaid".to_string(), ts(2026, 1, 1), ts(2026, 1, 2))];
        let balance = compute_leave_balance(&approved);
        let unpaid = balance.iter().find(|b| b.leave_type == "unpaid").unwrap();
        assert_eq!(unpaid.allocated, 0);
        assert_eq!(unpaid.used, 2);
        assert_eq!(unpaid.remaining, 0);
    }

    #[test]
    fn blank_type_counts_as_annual() {
        let approved = vec![("  ".to_string(), ts(2026, 1, 1), ts(2026, 1, 5))];
        let balance = compute_leave_balance(&approved);
        let annual = balance.iter().find(|b| b.leave_type == "annual").unwrap();
        assert_eq!(annual.used, 5);
    }
}
