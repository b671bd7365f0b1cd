//! Resource CRUD handlers: list, create, read, replace (PUT), update (PATCH), delete.

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::model::{ColumnInfo, ColumnType, ResolvedEntity};
use crate::response::{created, many, ok};
use crate::service::{normalize_body, CrudService, RequestValidator};
use crate::state::AppState;
use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// State of one resource router: the shared app state plus the entity it serves.
#[derive(Clone)]
pub struct ResourceState {
    pub app: AppState,
    pub entity: Arc<ResolvedEntity>,
}

impl FromRef<ResourceState> for AppState {
    fn from_ref(state: &ResourceState) -> AppState {
        state.app.clone()
    }
}

/// Ids are SERIAL (INTEGER) keys, so anything outside `1..=i32::MAX` is rejected before it reaches SQL.
pub(crate) fn parse_id(id_str: &str) -> Result<i64, AppError> {
    match id_str.parse::<i32>() {
        Ok(n) if n > 0 => Ok(i64::from(n)),
        _ => Err(AppError::BadRequest(format!("invalid id: {}", id_str))),
    }
}

pub(crate) fn body_to_map(value: Value) -> Result<HashMap<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m.into_iter().collect()),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn query_value_for_column(col: &ColumnInfo, s: &str) -> Value {
    if s.eq_ignore_ascii_case("null") && col.nullable {
        return Value::Null;
    }
    match col.column_type {
        ColumnType::Serial | ColumnType::Integer => s.parse::<i64>().map(Value::from).unwrap_or_else(|_| Value::String(s.into())),
        ColumnType::Double => s
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(s.into())),
        ColumnType::Boolean if s.eq_ignore_ascii_case("true") => Value::Bool(true),
        ColumnType::Boolean if s.eq_ignore_ascii_case("false") => Value::Bool(false),
        _ => Value::String(s.to_string()),
    }
}

/// Split query params into (filters, limit, offset). Unknown params are ignored.
pub(crate) fn list_params(
    entity: &ResolvedEntity,
    params: HashMap<String, String>,
) -> Result<(Vec<(String, Value)>, Option<u32>, Option<u32>), AppError> {
    let mut limit = None;
    let mut offset = None;
    let mut filters = Vec::new();
    for (k, v) in params {
        match k.as_str() {
            "limit" => {
                limit = Some(v.parse().map_err(|_| AppError::BadRequest(format!("invalid limit: {}", v)))?);
            }
            "offset" | "skip" => {
                offset = Some(v.parse().map_err(|_| AppError::BadRequest(format!("invalid offset: {}", v)))?);
            }
            _ => {
                if let Some(col) = entity.column(&k) {
                    let val = query_value_for_column(col, &v);
                    filters.push((k, val));
                }
            }
        }
    }
    filters.sort_by(|a, b| a.0.cmp(&b.0));
    Ok((filters, limit, offset))
}

fn require_write(entity: &ResolvedEntity, user: &AuthUser) -> Result<(), AppError> {
    if entity.admin_writes {
        user.require_admin()?;
    }
    Ok(())
}

fn not_found(entity: &ResolvedEntity, id: i64) -> AppError {
    AppError::NotFound(format!("{} {}", entity.label(), id))
}

pub async fn list(
    State(res): State<ResourceState>,
    _user: AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let (filters, limit, offset) = list_params(&res.entity, params)?;
    let rows = CrudService::list(&res.app.pool, &res.entity, &filters, limit, offset).await?;
    Ok(many(rows))
}

pub async fn create(
    State(res): State<ResourceState>,
    user: AuthUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    require_write(&res.entity, &user)?;
    let body = normalize_body(&res.entity, body_to_map(body)?);
    RequestValidator::validate(&body, &res.entity)?;
    let row = CrudService::create(&res.app.pool, &res.entity, &body).await?;
    Ok(created(row))
}

pub async fn read(
    State(res): State<ResourceState>,
    _user: AuthUser,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let row = CrudService::read(&res.app.pool, &res.entity, id)
        .await?
        .ok_or_else(|| not_found(&res.entity, id))?;
    Ok(ok(row))
}

/// PUT: the body must be a complete record.
pub async fn replace(
    State(res): State<ResourceState>,
    user: AuthUser,
    Path(id_str): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    require_write(&res.entity, &user)?;
    let id = parse_id(&id_str)?;
    let body = normalize_body(&res.entity, body_to_map(body)?);
    RequestValidator::validate(&body, &res.entity)?;
    let row = CrudService::update(&res.app.pool, &res.entity, id, &body)
        .await?
        .ok_or_else(|| not_found(&res.entity, id))?;
    Ok(ok(row))
}

/// PATCH: only the fields present are validated and written.
pub async fn update(
    State(res): State<ResourceState>,
    user: AuthUser,
    Path(id_str): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    require_write(&res.entity, &user)?;
    let id = parse_id(&id_str)?;
    let body = normalize_body(&res.entity, body_to_map(body)?);
    RequestValidator::validate_partial(&body, &res.entity)?;
    let row = CrudService::update(&res.app.pool, &res.entity, id, &body)
        .await?
        .ok_or_else(|| not_found(&res.entity, id))?;
    Ok(ok(row))
}

pub async fn delete(
    State(res): State<ResourceState>,
    user: AuthUser,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_write(&res.entity, &user)?;
    let id = parse_id(&id_str)?;
    if !CrudService::delete(&res.app.pool, &res.entity, id).await? {
        return Err(not_found(&res.entity, id));
    }
    Ok(StatusCode::NO_CONTENT)
}
