//! HTTP handlers for accounts and resource CRUD.

pub mod auth;
pub mod entity;
pub use entity::ResourceState;
