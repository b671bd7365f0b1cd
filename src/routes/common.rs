//! Root greeting plus liveness, readiness and version probes.

use crate::error::AppError;
use crate::response::{message, ok};
use crate::sql::qualified_table;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use serde_json::json;

pub const ROOT_MESSAGE: &str = "Child Care Center Management API";

async fn root() -> impl IntoResponse {
    message(ROOT_MESSAGE)
}

async fn health() -> impl IntoResponse {
    ok(json!({ "status": "ok" }))
}

/// 503 until the database answers and every catalog table exists.
/// Startup table creation only logs its failures, so this is where they become visible.
async fn ready(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let mut missing = Vec::new();
    for entity in &state.model.entities {
        let exists: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
            .bind(qualified_table(entity))
            .fetch_one(&state.pool)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "readiness check: database unreachable");
                AppError::Unavailable("database unavailable".into())
            })?;
        if !exists {
            missing.push(entity.table_name.as_str());
        }
    }
    if !missing.is_empty() {
        return Err(AppError::Unavailable(format!("missing tables: {}", missing.join(", "))));
    }
    Ok(ok(json!({ "status": "ok", "database": "ok" })))
}

async fn version() -> impl IntoResponse {
    ok(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .with_state(state)
}
