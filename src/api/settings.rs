use crate::auth::auth::AuthUser;
use crate::model::settings::UserSettings;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

const THEME_MODES: &[&str] = &["light", "dark", "system"];

#[derive(Deserialize, ToSchema)]
pub struct UpdateSettings {
    #[schema(example = "dark")]
    pub theme_mode: Option<String>,
    #[schema(example = "purple")]
    pub color_theme: Option<String>,
    #[schema(example = "en")]
    pub language: Option<String>,
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
    pub two_factor_enabled: Option<bool>,
}

async fn get_or_create_settings(
    pool: &MySqlPool,
    user_id: u64,
) -> Result<UserSettings, sqlx::Error> {
    let existing =
        sqlx::query_as::<_, UserSettings>("SELECT * FROM user_settings WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    if let Some(settings) = existing {
        return Ok(settings);
    }

    sqlx::query("INSERT INTO user_settings (user_id) VALUES (?)")
        .bind(user_id)
        .execute(pool)
        .await?;

    sqlx::query_as::<_, UserSettings>("SELECT * FROM user_settings WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

async fn apply_settings_update(
    pool: &MySqlPool,
    user_id: u64,
    payload: &UpdateSettings,
) -> actix_web::Result<HttpResponse> {
    if let Some(theme_mode) = payload.theme_mode.as_deref() {
        if !THEME_MODES.contains(&theme_mode) {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Invalid theme_mode. Allowed: light, dark, system"
            })));
        }
    }

    // make sure the row exists before the partial update
    get_or_create_settings(pool, user_id).await.map_err(|e| {
        error!(error = %e, user_id, "Failed to load settings");
        ErrorInternalServerError("Internal Server Error")
    })?;

    sqlx::query(
        r#"
        UPDATE user_settings
        SET theme_mode = COALESCE(?, theme_mode),
            color_theme = COALESCE(?, color_theme),
            language = COALESCE(?, language),
            email_notifications = COALESCE(?, email_notifications),
            push_notifications = COALESCE(?, push_notifications),
            two_factor_enabled = COALESCE(?, two_factor_enabled)
        WHERE user_id = ?
        "#,
    )
    .bind(&payload.theme_mode)
    .bind(&payload.color_theme)
    .bind(&payload.language)
    .bind(payload.email_notifications)
    .bind(payload.push_notifications)
    .bind(payload.two_factor_enabled)
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, user_id, "Failed to update settings");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let settings = get_or_create_settings(pool, user_id).await.map_err(|e| {
        error!(error = %e, user_id, "Failed to reload settings");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(settings))
}

/// Current user's settings, created with defaults on first access
#[utoipa::path(
    get,
    path = "/api/v1/settings/me",
    responses(
        (status = 200, description = "Settings for the authenticated user", body = UserSettings)
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn get_my_settings(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let settings = get_or_create_settings(pool.get_ref(), auth.user_id)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to load settings");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(settings))
}

#[utoipa::path(
    put,
    path = "/api/v1/settings/me",
    request_body = UpdateSettings,
    responses(
        (status = 200, description = "Settings updated", body = UserSettings),
        (status = 400, description = "Invalid theme mode")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn update_my_settings(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<UpdateSettings>,
) -> actix_web::Result<impl Responder> {
    apply_settings_update(pool.get_ref(), auth.user_id, &payload).await
}

#[utoipa::path(
    get,
    path = "/api/v1/settings/{user_id}",
    params(("user_id", Path, description = "User ID")),
    responses(
        (status = 200, description = "Settings for the given user", body = UserSettings),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn get_user_settings(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let settings = get_or_create_settings(pool.get_ref(), path.into_inner())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to load settings");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(settings))
}

#[utoipa::path(
    put,
    path = "/api/v1/settings/{user_id}",
    params(("user_id", Path, description = "User ID")),
    request_body = UpdateSettings,
    responses(
        (status = 200, description = "Settings updated", body = UserSettings),
        (status = 400, description = "Invalid theme mode"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn update_user_settings(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateSettings>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    apply_settings_update(pool.get_ref(), path.into_inner(), &payload).await
}
