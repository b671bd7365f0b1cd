//! Account routes under `/auth`.

use crate::handlers::auth::{
    admin_change_password, available_staff_users, change_password, delete_user, get_user, list_users, login, me,
    register, update_user,
};
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/auth", get(list_users))
        .route("/auth/", get(list_users))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/change-password", put(change_password))
        .route("/auth/admin/change-password/:user_id", put(admin_change_password))
        .route("/auth/available-staff-users", get(available_staff_users))
        .route("/auth/update/:user_id", put(update_user))
        .route("/auth/:id", get(get_user).delete(delete_user))
        .with_state(state)
}
