//! Extract the authenticated user from `Authorization: Bearer <token>`.

use crate::auth::Role;
use crate::error::{AppError, AuthError};
use crate::model::USERS;
use crate::sql::qualified_table;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

/// A user holding a valid token whose account still exists and is active.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            tracing::warn!(user_id = self.id, "admin role required");
            Err(AuthError::AdminRequired.into())
        }
    }
}

/// Like [`AuthUser`] but rejects non-admins with 403.
#[derive(Clone, Debug)]
pub struct AdminUser(pub AuthUser);

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let claims = state.jwt.verify(token).inspect_err(|e| {
            tracing::warn!(error = %e, "rejected bearer token");
        })?;
        let id = claims.user_id()?;

        let users = state.entity(USERS)?;
        let sql = format!(
            "SELECT username, role, is_active FROM {} WHERE id = $1",
            qualified_table(&users)
        );
        let (username, role, is_active): (String, String, bool) = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !is_active {
            return Err(AuthError::Inactive.into());
        }
        let role = Role::parse(&role).ok_or(AuthError::InvalidToken)?;
        Ok(AuthUser { id, username, role })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        user.require_admin()?;
        Ok(AdminUser(user))
    }
}
