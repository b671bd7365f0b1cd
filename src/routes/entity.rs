//! One CRUD router per routed catalog table, e.g. `/children` and `/children/:id`.
//! Collection routes are registered with and without the trailing slash.

use crate::handlers::entity::{create, delete, list, read, replace, update, ResourceState};
use crate::model::ResolvedEntity;
use crate::state::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;

pub fn resource_routes(state: AppState, entity: Arc<ResolvedEntity>) -> Router {
    let collection = format!("/{}", entity.label());
    Router::new()
        .route(&collection, get(list).post(create))
        .route(&format!("{}/", collection), get(list).post(create))
        .route(
            &format!("{}/:id", collection),
            get(read).put(replace).patch(update).delete(delete),
        )
        .with_state(ResourceState { app: state, entity })
}

pub fn entity_routes(state: AppState) -> Router {
    let model = state.model.clone();
    model
        .routed()
        .fold(Router::new(), |router, entity| {
            router.merge(resource_routes(state.clone(), entity.clone()))
        })
}
