//! Child care center management API: catalog-driven CRUD over PostgreSQL with JWT accounts.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod model;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;

pub use error::{AppError, AuthError, ModelError, SettingsError};
pub use model::{catalog, resolve, ResolvedEntity, ResolvedModel};
pub use routes::{build_app, cors_layer, ROOT_MESSAGE};
pub use schema::{create_all, on_startup};
pub use service::CrudService;
pub use settings::Settings;
pub use state::AppState;
