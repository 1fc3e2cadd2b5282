use crate::api::attendance::fetch_attendance_with_users;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::utils::attendance_status::{CheckStatus, evaluate_attendance, load_office_timing_cache};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct ActivityItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub user: String,
    pub time: DateTime<Utc>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct DepartmentPerformance {
    pub name: String,
    pub employees: i64,
    /// Presence rate today, percent
    pub performance: i64,
}

fn today_bounds() -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap());
    (start, start + Duration::days(1))
}

fn month_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .unwrap();
    let end = if now.month() == 12 {
        Utc.with_ymd_and_hms(now.year() + 1, 1, 1, 0, 0, 0).unwrap()
    } else {
        Utc.with_ymd_and_hms(now.year(), now.month() + 1, 1, 0, 0, 0)
            .unwrap()
    };
    (start, end)
}

fn db_err(e: sqlx::Error) -> actix_web::Error {
    error!(error = %e, "Dashboard query failed");
    ErrorInternalServerError("Internal Server Error")
}

async fn caller_department(
    pool: &MySqlPool,
    user_id: u64,
) -> actix_web::Result<Option<String>> {
    let department =
        sqlx::query_scalar::<_, Option<String>>("SELECT department FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(db_err)?
            .flatten()
            .filter(|d| !d.trim().is_empty());
    Ok(department)
}

async fn on_leave_today(pool: &MySqlPool, department: Option<&str>) -> Result<i64, sqlx::Error> {
    let (today_start, today_end) = today_bounds();
    match department {
        Some(dept) => {
            sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COUNT(*) FROM leaves l
                JOIN users u ON u.user_id = l.user_id
                WHERE u.department = ? AND l.status = 'Approved'
                  AND l.start_date <= ? AND l.end_date >= ?
                "#,
            )
            .bind(dept)
            .bind(today_end)
            .bind(today_start)
            .fetch_one(pool)
            .await
        }
        None => {
            sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COUNT(*) FROM leaves
                WHERE status = 'Approved' AND start_date <= ? AND end_date >= ?
                "#,
            )
            .bind(today_end)
            .bind(today_start)
            .fetch_one(pool)
            .await
        }
    }
}

/// Today's check-ins as an activity feed, lateness grace-aware.
async fn today_activity_feed(
    pool: &MySqlPool,
    config: &Config,
    department: Option<&str>,
    limit: usize,
) -> actix_web::Result<(Vec<ActivityItem>, i64)> {
    let rows = fetch_attendance_with_users(pool, department, true)
        .await
        .map_err(db_err)?;
    let cache = load_office_timing_cache(pool).await.map_err(db_err)?;
    let offset = config.local_offset();

    let mut late = 0i64;
    let mut items = Vec::new();
    for row in &rows {
        let evaluation = evaluate_attendance(
            Some(row.check_in),
            row.check_out,
            cache.resolve(row.department.as_deref()),
            offset,
        );
        if evaluation.check_in_status == CheckStatus::Late {
            late += 1;
        }
        if items.len() < limit {
            items.push(ActivityItem {
                id: format!("attendance-{}", row.attendance_id),
                kind: "check-in".to_string(),
                user: row.name.clone(),
                time: row.check_in,
                status: if evaluation.check_in_status == CheckStatus::Late {
                    "late".to_string()
                } else {
                    "on-time".to_string()
                },
                description: Some("Checked in".to_string()),
            });
        }
    }

    Ok((items, late))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/admin",
    responses(
        (status = 200, description = "Company-wide counters, department performance and activity feed"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn admin_dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let (today_start, today_end) = today_bounds();
    let pool = pool.get_ref();

    let total_employees = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .map_err(db_err)?;

    let present_today = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(DISTINCT user_id) FROM attendances WHERE check_in >= ? AND check_in < ?",
    )
    .bind(today_start)
    .bind(today_end)
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let on_leave = on_leave_today(pool, None).await.map_err(db_err)?;

    // Admin approves Manager/HR leave, so that is the pending count shown here
    let pending_leaves = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM leaves l
        JOIN users u ON u.user_id = l.user_id
        WHERE l.status = 'Pending' AND u.role IN ('Manager', 'HR') AND u.is_active = TRUE
        "#,
    )
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let active_tasks = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM tasks WHERE status IN ('Pending', 'In Progress')",
    )
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let completed_tasks =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tasks WHERE status = 'Completed'")
            .fetch_one(pool)
            .await
            .map_err(db_err)?;

    let performance_rows = sqlx::query_as::<_, (String, i64, i64)>(
        r#"
        SELECT u.department,
               COUNT(DISTINCT u.user_id),
               COUNT(DISTINCT CASE WHEN a.check_in >= ? AND a.check_in < ? THEN a.user_id END)
        FROM users u
        LEFT JOIN attendances a ON a.user_id = u.user_id
        WHERE u.department IS NOT NULL
        GROUP BY u.department
        "#,
    )
    .bind(today_start)
    .bind(today_end)
    .fetch_all(pool)
    .await
    .map_err(db_err)?;

    let departments = performance_rows.len() as i64;
    let department_performance: Vec<DepartmentPerformance> = performance_rows
        .into_iter()
        .map(|(name, employees, present)| DepartmentPerformance {
            name,
            employees,
            performance: (present * 100) / employees.max(1),
        })
        .collect();

    let (recent_activities, late_arrivals) =
        today_activity_feed(pool, config.get_ref(), None, 20).await?;

    Ok(HttpResponse::Ok().json(json!({
        "total_employees": total_employees,
        "present_today": present_today,
        "on_leave": on_leave,
        "late_arrivals": late_arrivals,
        "pending_leaves": pending_leaves,
        "active_tasks": active_tasks,
        "completed_tasks": completed_tasks,
        "departments": departments,
        "department_performance": department_performance,
        "recent_activities": recent_activities,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/hr",
    responses(
        (status = 200, description = "HR counters with joiners/exits and a mixed activity feed"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn hr_dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let (today_start, today_end) = today_bounds();
    let (month_start, month_end) = month_bounds(Utc::now());
    let pool = pool.get_ref();

    let total_employees = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .map_err(db_err)?;

    let present_today = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(DISTINCT user_id) FROM attendances WHERE check_in >= ? AND check_in < ?",
    )
    .bind(today_start)
    .bind(today_end)
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let on_leave = on_leave_today(pool, None).await.map_err(db_err)?;

    let pending_leaves =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leaves WHERE status = 'Pending'")
            .fetch_one(pool)
            .await
            .map_err(db_err)?;

    let new_joiners = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE joining_date >= ? AND joining_date < ?",
    )
    .bind(month_start)
    .bind(month_end)
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let exits = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE resignation_date >= ? AND resignation_date < ?",
    )
    .bind(month_start)
    .bind(month_end)
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let open_positions =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vacancies WHERE status = 'open'")
            .fetch_one(pool)
            .await
            .map_err(db_err)?;

    let (mut activities, late_arrivals) =
        today_activity_feed(pool, config.get_ref(), None, 10).await?;

    let recent_leaves = sqlx::query_as::<_, (u64, String, DateTime<Utc>, String, Option<String>, String)>(
        r#"
        SELECT l.leave_id, u.name, l.start_date, l.status, l.reason, l.leave_type
        FROM leaves l
        JOIN users u ON u.user_id = l.user_id
        ORDER BY l.start_date DESC
        LIMIT 12
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(db_err)?;

    for (leave_id, name, start_date, status, reason, leave_type) in recent_leaves {
        activities.push(ActivityItem {
            id: format!("leave-{}", leave_id),
            kind: "leave".to_string(),
            user: name,
            time: start_date,
            status: status.to_lowercase(),
            description: Some(reason.unwrap_or_else(|| format!("{} leave request", leave_type))),
        });
    }

    let recent_joiners = sqlx::query_as::<_, (u64, String, DateTime<Utc>, Option<String>)>(
        r#"
        SELECT user_id, name, joining_date, department
        FROM users
        WHERE joining_date IS NOT NULL
        ORDER BY joining_date DESC
        LIMIT 8
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(db_err)?;

    for (user_id, name, joining_date, department) in recent_joiners {
        activities.push(ActivityItem {
            id: format!("join-{}", user_id),
            kind: "join".to_string(),
            user: name,
            time: joining_date,
            status: "new-joiner".to_string(),
            description: Some(format!(
                "Joined {}",
                department.unwrap_or_else(|| "company".to_string())
            )),
        });
    }

    activities.sort_by(|a, b| b.time.cmp(&a.time));
    activities.truncate(15);

    Ok(HttpResponse::Ok().json(json!({
        "total_employees": total_employees,
        "present_today": present_today,
        "on_leave": on_leave,
        "late_arrivals": late_arrivals,
        "pending_leaves": pending_leaves,
        "new_joiners_this_month": new_joiners,
        "exiting_this_month": exits,
        "open_positions": open_positions,
        "recent_activities": activities,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/manager",
    responses(
        (status = 200, description = "Department-scoped counters and team activity"),
        (status = 400, description = "Manager has no department"),
        (status = 403, description = "Manager/HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn manager_dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_up()?;

    let pool = pool.get_ref();
    let Some(dept) = caller_department(pool, auth.user_id).await? else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Manager must have a department assigned"
        })));
    };

    let (today_start, today_end) = today_bounds();

    let team_members =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE department = ?")
            .bind(&dept)
            .fetch_one(pool)
            .await
            .map_err(db_err)?;

    let present_today = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(DISTINCT a.user_id) FROM attendances a
        JOIN users u ON u.user_id = a.user_id
        WHERE u.department = ? AND a.check_in >= ? AND a.check_in < ?
        "#,
    )
    .bind(&dept)
    .bind(today_start)
    .bind(today_end)
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let on_leave = on_leave_today(pool, Some(&dept)).await.map_err(db_err)?;

    let active_tasks = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM tasks t
        JOIN users u ON u.user_id = t.assigned_to
        WHERE u.department = ? AND t.status IN ('Pending', 'In Progress')
        "#,
    )
    .bind(&dept)
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let completed_tasks = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM tasks t
        JOIN users u ON u.user_id = t.assigned_to
        WHERE u.department = ? AND t.status = 'Completed'
        "#,
    )
    .bind(&dept)
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let pending_approvals = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM leaves l
        JOIN users u ON u.user_id = l.user_id
        WHERE u.department = ? AND l.status = 'Pending'
          AND u.role IN ('Employee', 'TeamLead') AND u.is_active = TRUE
        "#,
    )
    .bind(&dept)
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let overdue_items = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM tasks t
        JOIN users u ON u.user_id = t.assigned_to
        WHERE u.department = ? AND t.status <> 'Completed'
          AND t.due_date IS NOT NULL AND t.due_date < NOW()
        "#,
    )
    .bind(&dept)
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let total_tasks = active_tasks + completed_tasks;
    let team_performance_percent = (completed_tasks * 100) / total_tasks.max(1);

    let (mut activities, _) =
        today_activity_feed(pool, config.get_ref(), Some(&dept), 20).await?;

    let pending_leave_rows = sqlx::query_as::<_, (u64, String, DateTime<Utc>, String)>(
        r#"
        SELECT l.leave_id, u.name, l.start_date, l.status
        FROM leaves l
        JOIN users u ON u.user_id = l.user_id
        WHERE u.department = ? AND l.status = 'Pending'
          AND u.role IN ('Employee', 'TeamLead') AND u.is_active = TRUE
        ORDER BY l.start_date DESC
        LIMIT 10
        "#,
    )
    .bind(&dept)
    .fetch_all(pool)
    .await
    .map_err(db_err)?;

    for (leave_id, name, start_date, status) in pending_leave_rows {
        activities.push(ActivityItem {
            id: format!("leave-{}", leave_id),
            kind: "leave".to_string(),
            user: name,
            time: start_date,
            status: status.to_lowercase(),
            description: Some("Leave request pending approval".to_string()),
        });
    }

    activities.sort_by(|a, b| b.time.cmp(&a.time));
    activities.truncate(15);

    // per-team-lead completion table
    let team_leads = sqlx::query_as::<_, (u64, String, Option<String>)>(
        "SELECT user_id, name, designation FROM users WHERE department = ? AND role = 'TeamLead'",
    )
    .bind(&dept)
    .fetch_all(pool)
    .await
    .map_err(db_err)?;

    let mut team_performance = Vec::new();
    for (lead_id, lead_name, designation) in team_leads {
        let (lead_total, lead_completed, members) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT COUNT(*),
                   COUNT(CASE WHEN status = 'Completed' THEN 1 END),
                   COUNT(DISTINCT assigned_to)
            FROM tasks WHERE assigned_by = ?
            "#,
        )
        .bind(lead_id)
        .fetch_one(pool)
        .await
        .map_err(db_err)?;

        team_performance.push(json!({
            "team": designation.unwrap_or_else(|| format!("{}'s Team", lead_name)),
            "lead": lead_name,
            "members": members,
            "completion": (lead_completed * 100) / lead_total.max(1),
        }));
    }

    if team_performance.is_empty() {
        team_performance.push(json!({
            "team": format!("{} Team", dept),
            "lead": "N/A",
            "members": team_members,
            "completion": team_performance_percent,
        }));
    }

    Ok(HttpResponse::Ok().json(json!({
        "team_members": team_members,
        "present_today": present_today,
        "on_leave": on_leave,
        "active_tasks": active_tasks,
        "completed_tasks": completed_tasks,
        "pending_approvals": pending_approvals,
        "overdue_items": overdue_items,
        "team_performance_percent": team_performance_percent,
        "team_activities": activities,
        "team_performance": team_performance,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/team-lead",
    responses(
        (status = 200, description = "Department counters and today's check-ins"),
        (status = 400, description = "Team lead has no department")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn team_lead_dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let pool = pool.get_ref();
    let Some(dept) = caller_department(pool, auth.user_id).await? else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Team lead must have a department assigned"
        })));
    };

    let (today_start, today_end) = today_bounds();

    let team_size = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE department = ?")
        .bind(&dept)
        .fetch_one(pool)
        .await
        .map_err(db_err)?;

    let present_today = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(DISTINCT a.user_id) FROM attendances a
        JOIN users u ON u.user_id = a.user_id
        WHERE u.department = ? AND a.check_in >= ? AND a.check_in < ?
        "#,
    )
    .bind(&dept)
    .bind(today_start)
    .bind(today_end)
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let on_leave = on_leave_today(pool, Some(&dept)).await.map_err(db_err)?;

    let tasks_in_progress = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM tasks t
        JOIN users u ON u.user_id = t.assigned_to
        WHERE u.department = ? AND t.status = 'In Progress'
        "#,
    )
    .bind(&dept)
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let completed_tasks = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM tasks t
        JOIN users u ON u.user_id = t.assigned_to
        WHERE u.department = ? AND t.status = 'Completed'
        "#,
    )
    .bind(&dept)
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let (recent_activities, _) =
        today_activity_feed(pool, config.get_ref(), Some(&dept), 20).await?;

    Ok(HttpResponse::Ok().json(json!({
        "team_size": team_size,
        "present_today": present_today,
        "on_leave": on_leave,
        "tasks_in_progress": tasks_in_progress,
        "completed_tasks": completed_tasks,
        "recent_activities": recent_activities,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/employee",
    responses(
        (status = 200, description = "Personal task, leave and hour counters")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn employee_dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let pool = pool.get_ref();
    let (_, today_end) = today_bounds();
    let (month_start, _) = month_bounds(Utc::now());

    let tasks_assigned =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tasks WHERE assigned_to = ?")
            .bind(auth.user_id)
            .fetch_one(pool)
            .await
            .map_err(db_err)?;

    let tasks_completed = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM tasks WHERE assigned_to = ? AND status = 'Completed'",
    )
    .bind(auth.user_id)
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let tasks_pending = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM tasks WHERE assigned_to = ? AND status IN ('Pending', 'In Progress')",
    )
    .bind(auth.user_id)
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let leaves_taken = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM leaves WHERE user_id = ? AND status = 'Approved'",
    )
    .bind(auth.user_id)
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let current_month_hours = sqlx::query_scalar::<_, f64>(
        r#"
        SELECT CAST(COALESCE(SUM(total_hours), 0) AS DOUBLE)
        FROM attendances
        WHERE user_id = ? AND check_in >= ? AND check_in < ?
        "#,
    )
    .bind(auth.user_id)
    .bind(month_start)
    .bind(today_end)
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let days_present = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(DISTINCT DATE(check_in))
        FROM attendances
        WHERE user_id = ? AND check_in >= ? AND check_in < ?
        "#,
    )
    .bind(auth.user_id)
    .bind(month_start)
    .bind(today_end)
    .fetch_one(pool)
    .await
    .map_err(db_err)?;

    let days_elapsed = (today_end - month_start).num_days().max(1);
    let attendance_percentage = (days_present * 100) / days_elapsed;

    Ok(HttpResponse::Ok().json(json!({
        "tasks_assigned": tasks_assigned,
        "tasks_completed": tasks_completed,
        "tasks_pending": tasks_pending,
        "leaves_taken": leaves_taken,
        "attendance_percentage": attendance_percentage,
        "current_month_hours": current_month_hours,
    })))
}
