//! Shared application state for all routes.

use crate::auth::JwtKeys;
use crate::error::{AppError, ModelError};
use crate::model::{catalog, resolve, ResolvedEntity, ResolvedModel};
use crate::settings::Settings;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub model: Arc<ResolvedModel>,
    pub settings: Arc<Settings>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    /// Resolve the built-in catalog into the configured schema.
    pub fn new(pool: PgPool, settings: Settings) -> Result<Self, ModelError> {
        let model = resolve(&catalog(), &settings.db_schema)?;
        let jwt = JwtKeys::new(&settings.jwt_secret, settings.access_token_expire_minutes);
        Ok(AppState {
            pool,
            model: Arc::new(model),
            settings: Arc::new(settings),
            jwt: Arc::new(jwt),
        })
    }

    pub fn entity(&self, table: &str) -> Result<Arc<ResolvedEntity>, AppError> {
        self.model
            .entity(table)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("table {}", table)))
    }
}
