//! Account handlers: register, login, current user, passwords, and admin user management.

use crate::auth::{hash_password, verify_password, AdminUser, AuthUser, Role, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AuthError};
use crate::handlers::entity::{body_to_map, list_params, parse_id};
use crate::model::{ResolvedEntity, STAFF, USERS};
use crate::response::{created, many, message, ok};
use crate::service::{normalize_body, CrudService, RequestValidator};
use crate::sql::qualified_table;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Fields an admin may change through `PUT /auth/update/:id`.
const UPDATABLE_USER_FIELDS: &[&str] = &["username", "email", "full_name", "role", "is_active"];

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: Value,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct AdminChangePasswordRequest {
    pub new_password: String,
}

fn check_password_length(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn users_entity(state: &AppState) -> Result<Arc<ResolvedEntity>, AppError> {
    state.entity(USERS)
}

async fn user_row(state: &AppState, users: &ResolvedEntity, id: i64) -> Result<Value, AppError> {
    CrudService::read(&state.pool, users, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", id)))
}

async fn set_password(state: &AppState, users: &ResolvedEntity, id: i64, password: &str) -> Result<(), AppError> {
    let hashed = hash_password(password)?;
    let body = HashMap::from([("hashed_password".to_string(), Value::String(hashed))]);
    CrudService::update(&state.pool, users, id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", id)))?;
    Ok(())
}

/// POST /auth/register. The first account becomes admin; later admins can only be created by an admin.
/// The emptiness check and the insert share one transaction holding a table lock, so two
/// concurrent registrations on an empty table cannot both become admin.
pub async fn register(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let users = users_entity(&state)?;
    check_password_length(&req.password)?;
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();

    let mut body = HashMap::from([
        ("username".to_string(), Value::String(username.clone())),
        ("email".to_string(), Value::String(email.clone())),
    ]);
    if let Some(name) = req.full_name {
        body.insert("full_name".into(), Value::String(name));
    }
    RequestValidator::validate_partial(&body, &users)?;
    let hashed = hash_password(&req.password)?;

    let table = qualified_table(&users);
    let mut tx = state.pool.begin().await?;
    sqlx::query(&format!("LOCK TABLE {} IN SHARE ROW EXCLUSIVE MODE", table))
        .execute(&mut *tx)
        .await?;

    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(&mut *tx)
        .await?;
    let role = if count == 0 {
        Role::Admin
    } else {
        let requested = req.role.unwrap_or(Role::Staff);
        if requested == Role::Admin && !caller.as_ref().is_some_and(AuthUser::is_admin) {
            return Err(AuthError::AdminRequired.into());
        }
        requested
    };

    let taken: Option<String> = sqlx::query_scalar(&format!(
        "SELECT username FROM {} WHERE username = $1 OR email = $2 LIMIT 1",
        table
    ))
    .bind(&username)
    .bind(&email)
    .fetch_optional(&mut *tx)
    .await?;
    if taken.is_some() {
        return Err(AppError::Conflict("username or email already registered".into()));
    }

    body.insert("role".into(), Value::String(role.as_str().to_string()));
    body.insert("hashed_password".into(), Value::String(hashed));
    let row = CrudService::create(&mut *tx, &users, &body).await?;
    tx.commit().await?;
    tracing::info!(username = %username, role = %role, "user registered");
    Ok(created(row))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let users = users_entity(&state)?;
    let identifier = req
        .username
        .or(req.email)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("username or email is required".into()))?;

    let sql = format!(
        "SELECT id, username, role, is_active, hashed_password FROM {} \
         WHERE username = $1 OR email = LOWER($1) ORDER BY (username = $1) DESC LIMIT 1",
        qualified_table(&users)
    );
    let found: Option<(i32, String, String, bool, String)> = sqlx::query_as(&sql)
        .bind(&identifier)
        .fetch_optional(&state.pool)
        .await?;
    let Some((id, username, role, is_active, hashed)) = found else {
        tracing::warn!(identifier = %identifier, "login for unknown user");
        return Err(AuthError::InvalidCredentials.into());
    };
    if !verify_password(&req.password, &hashed)? {
        tracing::warn!(user_id = id, "login with wrong password");
        return Err(AuthError::InvalidCredentials.into());
    }
    if !is_active {
        return Err(AuthError::Inactive.into());
    }
    let role = Role::parse(&role).ok_or(AuthError::InvalidCredentials)?;
    let id = i64::from(id);
    let access_token = state.jwt.issue(id, &username, role)?;
    let user = user_row(&state, &users, id).await?;
    tracing::info!(user_id = id, "login");
    Ok(ok(TokenResponse {
        access_token,
        token_type: "bearer",
        user,
    }))
}

/// GET /auth/me
pub async fn me(State(state): State<AppState>, user: AuthUser) -> Result<impl IntoResponse, AppError> {
    let users = users_entity(&state)?;
    Ok(ok(user_row(&state, &users, user.id).await?))
}

/// PUT /auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let users = users_entity(&state)?;
    check_password_length(&req.new_password)?;
    let hashed: String = sqlx::query_scalar(&format!(
        "SELECT hashed_password FROM {} WHERE id = $1",
        qualified_table(&users)
    ))
    .bind(user.id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AuthError::UserNotFound)?;
    if !verify_password(&req.current_password, &hashed)? {
        return Err(AppError::BadRequest("current password is incorrect".into()));
    }
    set_password(&state, &users, user.id, &req.new_password).await?;
    tracing::info!(user_id = user.id, "password changed");
    Ok(message("Password updated successfully"))
}

/// PUT /auth/admin/change-password/:user_id
pub async fn admin_change_password(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id_str): Path<String>,
    Json(req): Json<AdminChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let users = users_entity(&state)?;
    let id = parse_id(&id_str)?;
    check_password_length(&req.new_password)?;
    set_password(&state, &users, id, &req.new_password).await?;
    tracing::info!(admin_id = admin.id, user_id = id, "password reset by admin");
    Ok(message("Password updated successfully"))
}

/// GET /auth/available-staff-users: staff accounts not yet linked to a staff record.
pub async fn available_staff_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let users = users_entity(&state)?;
    let staff = state.entity(STAFF)?;
    let sql = format!(
        "SELECT u.* FROM {} u WHERE u.role = 'staff' AND NOT EXISTS \
         (SELECT 1 FROM {} s WHERE s.user_id = u.id) ORDER BY u.id",
        qualified_table(&users),
        qualified_table(&staff)
    );
    let rows = CrudService::query_rows(&state.pool, &users, &sql, &[]).await?;
    Ok(many(rows))
}

/// GET /auth/
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let users = users_entity(&state)?;
    let (filters, limit, offset) = list_params(&users, params)?;
    let rows = CrudService::list(&state.pool, &users, &filters, limit, offset).await?;
    Ok(many(rows))
}

/// GET /auth/:id
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let users = users_entity(&state)?;
    let id = parse_id(&id_str)?;
    Ok(ok(user_row(&state, &users, id).await?))
}

/// PUT /auth/update/:user_id
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id_str): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let users = users_entity(&state)?;
    let id = parse_id(&id_str)?;
    let mut body = body_to_map(body)?;
    body.retain(|k, _| UPDATABLE_USER_FIELDS.contains(&k.as_str()));
    if body.is_empty() {
        return Err(AppError::BadRequest(format!(
            "nothing to update; allowed fields: {}",
            UPDATABLE_USER_FIELDS.join(", ")
        )));
    }
    let mut body = normalize_body(&users, body);
    if let Some(Value::String(email)) = body.get_mut("email") {
        *email = email.trim().to_lowercase();
    }
    RequestValidator::validate_partial(&body, &users)?;

    if id == admin.id {
        let demoted = body.get("role").and_then(Value::as_str).is_some_and(|r| r != Role::Admin.as_str());
        let deactivated = body.get("is_active") == Some(&Value::Bool(false));
        if demoted || deactivated {
            return Err(AppError::BadRequest("admins cannot demote or deactivate themselves".into()));
        }
    }

    let row = CrudService::update(&state.pool, &users, id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", id)))?;
    tracing::info!(admin_id = admin.id, user_id = id, "user updated");
    Ok(ok(row))
}

/// DELETE /auth/:id
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let users = users_entity(&state)?;
    let id = parse_id(&id_str)?;
    if id == admin.id {
        return Err(AppError::BadRequest("admins cannot delete themselves".into()));
    }
    if !CrudService::delete(&state.pool, &users, id).await? {
        return Err(AppError::NotFound(format!("user {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
