//! Router assembly: common, auth and resource routes behind body limit, tracing and CORS layers.

pub mod auth;
pub mod common;
pub mod entity;

pub use auth::auth_routes;
pub use common::{common_routes, ROOT_MESSAGE};
pub use entity::{entity_routes, resource_routes};

use crate::settings::Settings;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Request bodies are JSON records; anything larger is rejected with 413.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// CORS for the single configured frontend origin, with credentials.
/// Other origins get no `access-control-allow-origin`.
pub fn cors_layer(settings: &Settings) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list([settings.frontend_origin.clone()]))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// Answers preflights from any origin other than the frontend with 400.
async fn reject_foreign_preflight(State(allowed): State<HeaderValue>, request: Request, next: Next) -> Response {
    let headers = request.headers();
    let is_preflight =
        request.method() == Method::OPTIONS && headers.contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);
    if is_preflight {
        if let Some(origin) = headers.get(header::ORIGIN) {
            if *origin != allowed {
                tracing::warn!(origin = ?origin, "preflight from disallowed origin");
                return (StatusCode::BAD_REQUEST, "Disallowed CORS origin").into_response();
            }
        }
    }
    next.run(request).await
}

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.settings);
    let origin = state.settings.frontend_origin.clone();
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(auth_routes(state.clone()))
        .merge(entity_routes(state))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn_with_state(origin, reject_foreign_preflight))
}
