use crate::auth::auth::AuthUser;
use crate::model::department::Department;
use crate::utils::db_utils::{build_update_sql, execute_update};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

const UPDATABLE_COLUMNS: &[&str] = &[
    "name",
    "code",
    "manager_id",
    "description",
    "status",
    "budget",
    "location",
];

#[derive(Deserialize, ToSchema)]
pub struct CreateDepartment {
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = "ENG")]
    pub code: String,
    pub manager_id: Option<u64>,
    pub description: Option<String>,
    #[schema(example = "active")]
    pub status: Option<String>,
    pub budget: Option<f64>,
    pub location: Option<String>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct ManagerOption {
    pub user_id: u64,
    pub name: String,
    pub department: Option<String>,
}

async fn employee_count_for(pool: &MySqlPool, department_name: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE department = ?")
        .bind(department_name)
        .fetch_one(pool)
        .await
}

async fn fetch_department(pool: &MySqlPool, id: u64) -> Result<Option<Department>, sqlx::Error> {
    sqlx::query_as::<_, Department>("SELECT * FROM departments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

#[utoipa::path(
    get,
    path = "/api/v1/departments",
    responses(
        (status = 200, description = "Departments in alphabetical order", body = [Department])
    ),
    security(("bearer_auth" = [])),
    tag = "Departments"
)]
pub async fn list_departments(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let rows = sqlx::query_as::<_, Department>("SELECT * FROM departments ORDER BY name ASC")
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to list departments");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Active managers, for the manager assignment dropdown
#[utoipa::path(
    get,
    path = "/api/v1/departments/managers",
    responses(
        (status = 200, description = "Active manager accounts", body = [ManagerOption])
    ),
    security(("bearer_auth" = [])),
    tag = "Departments"
)]
pub async fn list_managers(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let rows = sqlx::query_as::<_, ManagerOption>(
        r#"
        SELECT user_id, name, department
        FROM users
        WHERE role = 'Manager' AND is_active = TRUE
        ORDER BY name ASC
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to list managers");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    post,
    path = "/api/v1/departments",
    request_body = CreateDepartment,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 409, description = "Duplicate department code"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Departments"
)]
pub async fn create_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateDepartment>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if payload.name.trim().is_empty() || payload.code.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Name and code must not be empty"
        })));
    }

    // employee_count is derived from users, never taken from the client
    let employee_count = employee_count_for(pool.get_ref(), payload.name.trim())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count department members");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let result = sqlx::query(
        r#"
        INSERT INTO departments (name, code, manager_id, description, status, employee_count, budget, location)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.code.trim())
    .bind(payload.manager_id)
    .bind(&payload.description)
    .bind(payload.status.as_deref().unwrap_or("active"))
    .bind(employee_count)
    .bind(payload.budget)
    .bind(&payload.location)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            let department = fetch_department(pool.get_ref(), res.last_insert_id())
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to reload department");
                    ErrorInternalServerError("Internal Server Error")
                })?
                .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

            Ok(HttpResponse::Created().json(department))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Department code already exists"
                    })));
                }
            }

            error!(error = %e, "Failed to create department");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

/// Partial update; employee_count is always re-derived
#[utoipa::path(
    put,
    path = "/api/v1/departments/{dept_id}",
    params(("dept_id", Path, description = "Department ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 400, description = "Empty or invalid payload"),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Departments"
)]
pub async fn update_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let dept_id = path.into_inner();

    let update = build_update_sql("departments", &body, UPDATABLE_COLUMNS, "id", dept_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Department not found"
        })));
    }

    // re-sync employee_count against the possibly renamed department
    sqlx::query(
        r#"
        UPDATE departments d
        SET d.employee_count = (SELECT COUNT(*) FROM users u WHERE u.department = d.name)
        WHERE d.id = ?
        "#,
    )
    .bind(dept_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, dept_id, "Failed to re-sync employee count");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let department = fetch_department(pool.get_ref(), dept_id)
        .await
        .map_err(|e| {
            error!(error = %e, dept_id, "Failed to reload department");
            ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

    Ok(HttpResponse::Ok().json(department))
}

#[utoipa::path(
    delete,
    path = "/api/v1/departments/{dept_id}",
    params(("dept_id", Path, description = "Department ID")),
    responses(
        (status = 204, description = "Department deleted"),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Departments"
)]
pub async fn delete_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let dept_id = path.into_inner();

    let result = sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(dept_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, dept_id, "Failed to delete department");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Department not found"
        })));
    }

    Ok(HttpResponse::NoContent().finish())
}
