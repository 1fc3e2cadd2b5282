use crate::{
    auth::{auth::AuthUser, password::hash_password},
    model::{role::Role, user::User},
    utils::db_utils::{build_update_sql, execute_update},
    utils::{email_cache, email_filter},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

// Columns a PUT /users/{id} payload may touch. Everything else is rejected.
const UPDATABLE_COLUMNS: &[&str] = &[
    "employee_code",
    "name",
    "department",
    "designation",
    "gender",
    "phone",
    "address",
    "pan_card",
    "aadhar_card",
    "shift_type",
    "employee_type",
    "joining_date",
    "resignation_date",
    "profile_photo",
];

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "EMP-001")]
    pub employee_code: Option<String>,
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "john.doe@company.com", format = "email", value_type = String)]
    pub email: String,
    /// Optional initial password; accounts without one cannot log in yet
    pub password: Option<String>,
    #[schema(example = "Employee")]
    pub role: Option<String>,
    #[schema(example = "Engineering")]
    pub department: Option<String>,
    pub designation: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub pan_card: Option<String>,
    pub aadhar_card: Option<String>,
    pub shift_type: Option<String>,
    pub employee_type: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub joining_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Search by name, email or department
    pub search: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(serde::Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<User>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateRole {
    #[schema(example = "Manager")]
    pub role: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStatus {
    pub is_active: bool,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    Str(&'a str),
    Like(String),
    Bool(bool),
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, pool: &MySqlPool) -> bool {
    let email = email.to_lowercase();

    // 1. Cuckoo filter — fast negative
    if !email_filter::might_exist(&email) {
        return true;
    }

    // 2. Moka cache — fast positive
    if email_cache::is_taken(&email).await {
        return false;
    }

    // 3. Database fallback
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = ? LIMIT 1)")
            .bind(&email)
            .fetch_one(pool)
            .await
            .unwrap_or(true); // fail-safe

    !exists
}

/// Create employee record
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = Object, example = json!({
            "message": "User created successfully",
            "user_id": 42
        })),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email or employee code already exists"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let email = payload.email.trim().to_lowercase();
    if payload.name.trim().is_empty() || email.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Name and email must not be empty"
        })));
    }

    let role = payload.role.as_deref().unwrap_or("Employee");
    if Role::from_name(role).is_none() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Unknown role"
        })));
    }

    if !is_email_available(&email, pool.get_ref()).await {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Email already registered"
        })));
    }

    let password_hash = match payload.password.as_deref() {
        Some(p) if !p.is_empty() => Some(hash_password(p).map_err(|e| {
            error!(error = %e, "Password hashing failed");
            ErrorInternalServerError("Internal Server Error")
        })?),
        _ => None,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO users
        (employee_code, name, email, password_hash, role, department, designation, gender,
         phone, address, pan_card, aadhar_card, shift_type, employee_type, joining_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, COALESCE(?, NOW()))
        "#,
    )
    .bind(&payload.employee_code)
    .bind(payload.name.trim())
    .bind(&email)
    .bind(&password_hash)
    .bind(role)
    .bind(&payload.department)
    .bind(&payload.designation)
    .bind(&payload.gender)
    .bind(&payload.phone)
    .bind(&payload.address)
    .bind(&payload.pan_card)
    .bind(&payload.aadhar_card)
    .bind(&payload.shift_type)
    .bind(&payload.employee_type)
    .bind(payload.joining_date)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            // keep the fast availability structures in sync
            email_filter::insert(&email);
            email_cache::mark_taken(&email).await;

            Ok(HttpResponse::Created().json(json!({
                "message": "User created successfully",
                "user_id": res.last_insert_id()
            })))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Email or employee code already exists"
                    })));
                }
            }

            error!(error = %e, "Failed to create user");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Something went wrong, Contact with system admin"
            })))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Paginated user list", body = UserListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(search) = query.search.as_deref() {
        where_sql.push_str(" AND (name LIKE ? OR email LIKE ? OR department LIKE ?)");
        let like = format!("%{}%", search);
        args.push(FilterValue::Like(like.clone()));
        args.push(FilterValue::Like(like.clone()));
        args.push(FilterValue::Like(like));
    }

    if let Some(department) = query.department.as_deref() {
        where_sql.push_str(" AND department = ?");
        args.push(FilterValue::Str(department));
    }

    if let Some(role) = query.role.as_deref() {
        where_sql.push_str(" AND role = ?");
        args.push(FilterValue::Str(role));
    }

    if let Some(is_active) = query.is_active {
        where_sql.push_str(" AND is_active = ?");
        args.push(FilterValue::Bool(is_active));
    }

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM users{}", where_sql);
    debug!(sql = %count_sql, "Counting users");

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::Str(s) => count_q.bind(*s),
            FilterValue::Like(s) => count_q.bind(s.clone()),
            FilterValue::Bool(b) => count_q.bind(*b),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count users");
        ErrorInternalServerError("Database error")
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT * FROM users{} ORDER BY user_id DESC LIMIT ? OFFSET ?",
        where_sql
    );
    debug!(sql = %data_sql, page, per_page, "Fetching users");

    let mut data_q = sqlx::query_as::<_, User>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::Str(s) => data_q.bind(s),
            FilterValue::Like(s) => data_q.bind(s),
            FilterValue::Bool(b) => data_q.bind(b),
        };
    }
    data_q = data_q.bind(per_page as i64).bind(offset as i64);

    let users = data_q.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to fetch users");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data: users,
        page,
        per_page,
        total,
    }))
}

/// Current user's own profile
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Profile of the authenticated user", body = User),
        (status = 404, description = "Profile row missing")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_me(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    fetch_user(pool.get_ref(), auth.user_id).await
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    params(("user_id", Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    fetch_user(pool.get_ref(), path.into_inner()).await
}

async fn fetch_user(pool: &MySqlPool, user_id: u64) -> actix_web::Result<HttpResponse> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to fetch user");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match user {
        Some(u) => Ok(HttpResponse::Ok().json(u)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        }))),
    }
}

/// Partial update of profile fields
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    params(("user_id", Path, description = "User ID")),
    request_body = Object,
    responses(
        (status = 200, description = "User updated"),
        (status = 400, description = "Empty or invalid payload"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let user_id = path.into_inner();

    let update = build_update_sql("users", &body, UPDATABLE_COLUMNS, "user_id", user_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().body("User not found"));
    }

    Ok(HttpResponse::Ok().body("User updated successfully"))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}/role",
    params(("user_id", Path, description = "User ID")),
    request_body = UpdateRole,
    responses(
        (status = 200, description = "Role updated"),
        (status = 400, description = "Unknown role"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user_role(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateRole>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = path.into_inner();

    let role = match Role::from_name(&body.role) {
        Some(r) => r,
        None => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Unknown role"
            })));
        }
    };

    let result = sqlx::query("UPDATE users SET role = ? WHERE user_id = ?")
        .bind(role.as_str())
        .bind(user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to update role");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Role updated"
    })))
}

/// Activate / deactivate an account
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}/status",
    params(("user_id", Path, description = "User ID")),
    request_body = UpdateStatus,
    responses(
        (status = 200, description = "Status updated"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateStatus>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let user_id = path.into_inner();

    let result = sqlx::query("UPDATE users SET is_active = ? WHERE user_id = ?")
        .bind(body.is_active)
        .bind(user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to update status");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        })));
    }

    let message = if body.is_active {
        "User activated"
    } else {
        "User deactivated"
    };
    Ok(HttpResponse::Ok().json(json!({ "message": message })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    params(("user_id", Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = path.into_inner();

    let email = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to fetch user before delete");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let email = match email {
        Some(e) => e,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "User not found"
            })));
        }
    };

    sqlx::query("DELETE FROM users WHERE user_id = ?")
        .bind(user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to delete user");
            ErrorInternalServerError("Internal Server Error")
        })?;

    // the email becomes available again
    email_filter::remove(&email);
    email_cache::invalidate(&email).await;

    Ok(HttpResponse::NoContent().finish())
}
