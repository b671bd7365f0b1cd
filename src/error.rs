//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("duplicate table: {0}")]
    DuplicateTable(String),
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("duplicate column: {table}.{column}")]
    DuplicateColumn { table: String, column: String },
    #[error("missing reference: {table}.{column} -> {target}")]
    MissingReference {
        table: String,
        column: String,
        target: String,
    },
    #[error("invalid pattern for {table}.{column}: {pattern}")]
    InvalidPattern {
        table: String,
        column: String,
        pattern: String,
    },
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("incorrect username or password")]
    InvalidCredentials,
    #[error("user is inactive")]
    Inactive,
    #[error("user not found")]
    UserNotFound,
    #[error("admin role required")]
    AdminRequired,
    #[error("token encoding: {0}")]
    Encoding(String),
    #[error("password hashing: {0}")]
    Hashing(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// SQLSTATE classes that indicate bad input rather than a server fault.
fn db_error_status(e: &sqlx::Error) -> (StatusCode, &'static str) {
    match e {
        sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "not_found"),
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") => (StatusCode::CONFLICT, "conflict"),
            Some("23503") | Some("23502") | Some("23514") => {
                (StatusCode::UNPROCESSABLE_ENTITY, "constraint_violation")
            }
            Some(code) if code.starts_with("22") => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_value"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
        },
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
    }
}

impl AppError {
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Model(_) => (StatusCode::INTERNAL_SERVER_ERROR, "model_error"),
            AppError::Auth(e) => match e {
                AuthError::AdminRequired => (StatusCode::FORBIDDEN, "forbidden"),
                AuthError::Encoding(_) | AuthError::Hashing(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "auth_error")
                }
                _ => (StatusCode::UNAUTHORIZED, "unauthorized"),
            },
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Db(e) => db_error_status(e),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let message = match &self {
            AppError::Db(sqlx::Error::Database(db)) if !status.is_server_error() => db.message().to_string(),
            AppError::Unavailable(m) => m.clone(),
            _ if status.is_server_error() => "internal server error".to_string(),
            _ => self.to_string(),
        };
        let mut response = (
            status,
            Json(ErrorBody {
                error: ErrorDetail {
                    code: code.to_string(),
                    message,
                },
            }),
        )
            .into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}
