use crate::auth::auth::AuthUser;
use crate::model::notification::TaskNotification;
use crate::model::role::Role;
use crate::model::task::{Task, TaskAction, TaskHistory, TaskStatus};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateTask {
    #[schema(example = "Prepare Q3 attendance report")]
    pub title: String,
    pub description: Option<String>,
    #[schema(example = 7)]
    pub assigned_to: u64,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateTaskStatus {
    #[schema(example = "In Progress")]
    pub status: TaskStatus,
}

#[derive(Deserialize, ToSchema)]
pub struct PassTask {
    #[schema(example = 9)]
    pub new_assignee_id: u64,
    pub note: Option<String>,
}

async fn fetch_task(pool: &MySqlPool, task_id: u64) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE task_id = ?")
        .bind(task_id)
        .fetch_optional(pool)
        .await
}

async fn record_history(
    pool: &MySqlPool,
    task_id: u64,
    user_id: u64,
    action: TaskAction,
    details: serde_json::Value,
) {
    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO task_history (task_id, user_id, action, details)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(task_id)
    .bind(user_id)
    .bind(action.as_str())
    .bind(details.to_string())
    .execute(pool)
    .await
    {
        error!(error = %e, task_id, "Failed to record task history");
    }
}

async fn create_task_notification(
    pool: &MySqlPool,
    task_id: u64,
    recipient_id: u64,
    notification_type: &str,
    title: &str,
    message: &str,
    pass_details: Option<serde_json::Value>,
) {
    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO task_notifications (user_id, task_id, notification_type, title, message, pass_details)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(recipient_id)
    .bind(task_id)
    .bind(notification_type)
    .bind(title)
    .bind(message)
    .bind(pass_details.map(|d| d.to_string()))
    .execute(pool)
    .await
    {
        error!(error = %e, task_id, recipient_id, "Failed to create task notification");
    }
}

fn can_manage(task: &Task, auth: &AuthUser) -> bool {
    task.assigned_by == auth.user_id || auth.role == Role::Admin
}

fn is_involved(task: &Task, auth: &AuthUser) -> bool {
    task.assigned_to == auth.user_id || can_manage(task, auth)
}

#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    request_body = CreateTask,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Assignee missing or title empty")
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn create_task(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateTask>,
) -> actix_web::Result<impl Responder> {
    if payload.title.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Title must not be empty"
        })));
    }

    let assignee_exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE user_id = ? AND is_active = TRUE)",
    )
    .bind(payload.assigned_to)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to check assignee");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if !assignee_exists {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Assignee not found or inactive"
        })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO tasks (title, description, assigned_by, assigned_to, status, due_date)
        VALUES (?, ?, ?, ?, 'Pending', ?)
        "#,
    )
    .bind(payload.title.trim())
    .bind(&payload.description)
    .bind(auth.user_id)
    .bind(payload.assigned_to)
    .bind(payload.due_date)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create task");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let task_id = result.last_insert_id();

    record_history(
        pool.get_ref(),
        task_id,
        auth.user_id,
        TaskAction::Created,
        json!({ "assigned_to": payload.assigned_to, "status": TaskStatus::Pending.as_str() }),
    )
    .await;

    let task = fetch_task(pool.get_ref(), task_id)
        .await
        .map_err(|e| {
            error!(error = %e, task_id, "Failed to reload task");
            ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

    if payload.assigned_to != auth.user_id {
        create_task_notification(
            pool.get_ref(),
            task_id,
            payload.assigned_to,
            "task_assigned",
            "New Task Assigned",
            &format!("You have been assigned a new task: '{}'.", task.title),
            Some(json!({ "from": auth.user_id, "to": payload.assigned_to })),
        )
        .await;
    }

    Ok(HttpResponse::Created().json(task))
}

/// Tasks the caller created, owns, or has touched
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    responses(
        (status = 200, description = "Visible tasks", body = [Task])
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn list_tasks(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let tasks = sqlx::query_as::<_, Task>(
        r#"
        SELECT DISTINCT t.*
        FROM tasks t
        LEFT JOIN task_history h ON h.task_id = t.task_id
        WHERE t.assigned_to = ? OR t.assigned_by = ? OR h.user_id = ?
        "#,
    )
    .bind(auth.user_id)
    .bind(auth.user_id)
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Failed to list tasks");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// Partial update by the creator (or an admin), change set is recorded
#[utoipa::path(
    put,
    path = "/api/v1/tasks/{task_id}",
    params(("task_id" = u64, Path, description = "Task ID")),
    request_body = UpdateTask,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 403, description = "Not the creator"),
        (status = 404, description = "Task not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn update_task(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateTask>,
) -> actix_web::Result<impl Responder> {
    let task_id = path.into_inner();

    let task = match fetch_task(pool.get_ref(), task_id).await.map_err(|e| {
        error!(error = %e, task_id, "Failed to fetch task");
        ErrorInternalServerError("Internal Server Error")
    })? {
        Some(t) => t,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({ "message": "Task not found" })));
        }
    };

    if !can_manage(&task, &auth) {
        return Err(actix_web::error::ErrorForbidden(
            "Only the creator can edit a task",
        ));
    }

    let mut changes = serde_json::Map::new();
    if let Some(title) = payload.title.as_deref() {
        changes.insert("title".into(), json!({ "from": task.title, "to": title }));
    }
    if let Some(description) = payload.description.as_deref() {
        changes.insert(
            "description".into(),
            json!({ "from": task.description, "to": description }),
        );
    }
    if let Some(due) = payload.due_date {
        changes.insert(
            "due_date".into(),
            json!({ "from": task.due_date, "to": due }),
        );
    }

    if changes.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "No fields provided for update"
        })));
    }

    sqlx::query(
        r#"
        UPDATE tasks
        SET title = COALESCE(?, title),
            description = COALESCE(?, description),
            due_date = COALESCE(?, due_date)
        WHERE task_id = ?
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.due_date)
    .bind(task_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, task_id, "Failed to update task");
        ErrorInternalServerError("Internal Server Error")
    })?;

    record_history(
        pool.get_ref(),
        task_id,
        auth.user_id,
        TaskAction::Updated,
        json!({ "changes": changes }),
    )
    .await;

    let updated = fetch_task(pool.get_ref(), task_id)
        .await
        .map_err(|e| {
            error!(error = %e, task_id, "Failed to reload task");
            ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    put,
    path = "/api/v1/tasks/{task_id}/status",
    params(("task_id" = u64, Path, description = "Task ID")),
    request_body = UpdateTaskStatus,
    responses(
        (status = 200, description = "Status changed", body = Task),
        (status = 403, description = "Not involved in this task"),
        (status = 404, description = "Task not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn update_task_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateTaskStatus>,
) -> actix_web::Result<impl Responder> {
    let task_id = path.into_inner();

    let task = match fetch_task(pool.get_ref(), task_id).await.map_err(|e| {
        error!(error = %e, task_id, "Failed to fetch task");
        ErrorInternalServerError("Internal Server Error")
    })? {
        Some(t) => t,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({ "message": "Task not found" })));
        }
    };

    if !is_involved(&task, &auth) {
        return Err(actix_web::error::ErrorForbidden(
            "Not involved in this task",
        ));
    }

    let new_status = payload.status;

    sqlx::query("UPDATE tasks SET status = ? WHERE task_id = ?")
        .bind(new_status.as_str())
        .bind(task_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, task_id, "Failed to update task status");
            ErrorInternalServerError("Internal Server Error")
        })?;

    record_history(
        pool.get_ref(),
        task_id,
        auth.user_id,
        TaskAction::StatusChanged,
        json!({ "from": task.status, "to": new_status.as_str() }),
    )
    .await;

    let updated = fetch_task(pool.get_ref(), task_id)
        .await
        .map_err(|e| {
            error!(error = %e, task_id, "Failed to reload task");
            ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Hand a task over to another user
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{task_id}/pass",
    params(("task_id" = u64, Path, description = "Task ID")),
    request_body = PassTask,
    responses(
        (status = 200, description = "Task passed", body = Task),
        (status = 400, description = "New assignee missing"),
        (status = 403, description = "Not involved in this task"),
        (status = 404, description = "Task not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn pass_task(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<PassTask>,
) -> actix_web::Result<impl Responder> {
    let task_id = path.into_inner();

    let task = match fetch_task(pool.get_ref(), task_id).await.map_err(|e| {
        error!(error = %e, task_id, "Failed to fetch task");
        ErrorInternalServerError("Internal Server Error")
    })? {
        Some(t) => t,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({ "message": "Task not found" })));
        }
    };

    if !is_involved(&task, &auth) {
        return Err(actix_web::error::ErrorForbidden(
            "Not involved in this task",
        ));
    }

    let new_assignee = sqlx::query_as::<_, (u64, String)>(
        "SELECT user_id, name FROM users WHERE user_id = ? AND is_active = TRUE",
    )
    .bind(payload.new_assignee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to check new assignee");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let Some((new_assignee_id, new_assignee_name)) = new_assignee else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "New assignee not found or inactive"
        })));
    };

    sqlx::query(
        r#"
        UPDATE tasks
        SET assigned_to = ?, last_passed_by = ?, last_passed_to = ?,
            last_pass_note = ?, last_passed_at = NOW()
        WHERE task_id = ?
        "#,
    )
    .bind(new_assignee_id)
    .bind(auth.user_id)
    .bind(new_assignee_id)
    .bind(&payload.note)
    .bind(task_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, task_id, "Failed to pass task");
        ErrorInternalServerError("Internal Server Error")
    })?;

    record_history(
        pool.get_ref(),
        task_id,
        auth.user_id,
        TaskAction::Passed,
        json!({
            "from": task.assigned_to,
            "to": new_assignee_id,
            "to_name": new_assignee_name,
            "note": payload.note,
        }),
    )
    .await;

    if new_assignee_id != auth.user_id {
        create_task_notification(
            pool.get_ref(),
            task_id,
            new_assignee_id,
            "task_pass",
            "Task Passed To You",
            &format!("The task '{}' has been passed to you.", task.title),
            Some(json!({
                "from": auth.user_id,
                "to": new_assignee_id,
                "note": payload.note,
            })),
        )
        .await;
    }

    let updated = fetch_task(pool.get_ref(), task_id)
        .await
        .map_err(|e| {
            error!(error = %e, task_id, "Failed to reload task");
            ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{task_id}",
    params(("task_id" = u64, Path, description = "Task ID")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 403, description = "Not the creator"),
        (status = 404, description = "Task not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn delete_task(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let task_id = path.into_inner();

    let task = match fetch_task(pool.get_ref(), task_id).await.map_err(|e| {
        error!(error = %e, task_id, "Failed to fetch task");
        ErrorInternalServerError("Internal Server Error")
    })? {
        Some(t) => t,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({ "message": "Task not found" })));
        }
    };

    if !can_manage(&task, &auth) {
        return Err(actix_web::error::ErrorForbidden(
            "Only the creator can delete a task",
        ));
    }

    sqlx::query("DELETE FROM tasks WHERE task_id = ?")
        .bind(task_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, task_id, "Failed to delete task");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/tasks/{task_id}/history",
    params(("task_id" = u64, Path, description = "Task ID")),
    responses(
        (status = 200, description = "History entries, newest first", body = [TaskHistory]),
        (status = 404, description = "Task not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn task_history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let task_id = path.into_inner();

    let task = match fetch_task(pool.get_ref(), task_id).await.map_err(|e| {
        error!(error = %e, task_id, "Failed to fetch task");
        ErrorInternalServerError("Internal Server Error")
    })? {
        Some(t) => t,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({ "message": "Task not found" })));
        }
    };

    if !is_involved(&task, &auth) {
        return Err(actix_web::error::ErrorForbidden(
            "Not involved in this task",
        ));
    }

    let entries = sqlx::query_as::<_, TaskHistory>(
        r#"
        SELECT * FROM task_history
        WHERE task_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(task_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, task_id, "Failed to fetch task history");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(entries))
}

#[utoipa::path(
    get,
    path = "/api/v1/tasks/notifications",
    responses(
        (status = 200, description = "Task notifications, newest first", body = [TaskNotification])
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn task_notifications(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let rows = sqlx::query_as::<_, TaskNotification>(
        r#"
        SELECT * FROM task_notifications
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch task notifications");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    put,
    path = "/api/v1/tasks/notifications/{notification_id}/read",
    params(("notification_id" = u64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as read"),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn mark_task_notification_read(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let notification_id = path.into_inner();

    let result = sqlx::query(
        "UPDATE task_notifications SET is_read = TRUE WHERE notification_id = ? AND user_id = ?",
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
