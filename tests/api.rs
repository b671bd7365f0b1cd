//! Router tests through `tower::ServiceExt::oneshot`. The pool is lazy, so nothing here
//! touches a database unless `TEST_DATABASE_URL` is set.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use childcare_api::{build_app, create_all, AppState, Settings, ROOT_MESSAGE};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use tower::ServiceExt;

const FRONTEND: &str = "http://localhost:5173";

fn settings(database_url: &str, schema: &str) -> Settings {
    let env: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", database_url.to_string()),
        ("FRONTEND_URL", FRONTEND.to_string()),
        ("JWT_SECRET", "integration-test-secret".to_string()),
        ("DB_SCHEMA", schema.to_string()),
    ]);
    Settings::from_lookup(|k| env.get(k).cloned()).unwrap()
}

fn lazy_state() -> AppState {
    let s = settings("postgres://localhost/unused", "public");
    let pool = PgPoolOptions::new().connect_lazy(&s.database_url).unwrap();
    AppState::new(pool, s).unwrap()
}

fn app() -> Router {
    build_app(lazy_state())
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn root_returns_greeting() {
    let resp = app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "message": ROOT_MESSAGE }));
}

#[tokio::test]
async fn health_is_ok_without_database() {
    let resp = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn preflight_from_frontend_is_allowed() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/children/")
                .header(header::ORIGIN, FRONTEND)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let h = resp.headers();
    assert_eq!(h[header::ACCESS_CONTROL_ALLOW_ORIGIN], FRONTEND);
    assert_eq!(h[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(h[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
    assert_eq!(h[header::ACCESS_CONTROL_ALLOW_HEADERS], "authorization,content-type");
}

#[tokio::test]
async fn preflight_from_other_origin_gets_no_allow_origin() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/children/")
                .header(header::ORIGIN, "http://evil.example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn simple_request_from_other_origin_gets_no_allow_origin() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::ORIGIN, "http://evil.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
}

#[tokio::test]
async fn simple_request_from_frontend_gets_allow_origin() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::ORIGIN, FRONTEND)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], FRONTEND);
}

#[tokio::test]
async fn resources_require_a_token() {
    for uri in ["/children/", "/children", "/billing/3", "/health-records/", "/auth/me", "/auth/"] {
        let resp = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");
        let body = body_json(resp).await;
        assert_eq!(body["error"]["code"], "unauthorized");
    }
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/attendance/")
                .header(header::AUTHORIZATION, "Bearer not.a.jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["error"]["message"], "invalid token");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let resp = app()
        .oneshot(Request::builder().uri("/rooms/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

/// Fresh schema per run on the database named by `TEST_DATABASE_URL`.
async fn db_state() -> Option<AppState> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let schema = format!("care_test_{}", uuid::Uuid::new_v4().simple());
    let s = settings(&url, &schema);
    let pool = PgPoolOptions::new().max_connections(2).connect(&url).await.unwrap();
    Some(AppState::new(pool, s).unwrap())
}

async fn drop_schema(state: &AppState) {
    sqlx::query(&format!("DROP SCHEMA IF EXISTS \"{}\" CASCADE", state.settings.db_schema))
        .execute(&state.pool)
        .await
        .unwrap();
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn table_creation_is_idempotent() {
    let Some(state) = db_state().await else { return };
    let app = build_app(state.clone());
    let (status, body) = send(&app, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "unavailable");

    create_all(&state.pool, &state.model).await.unwrap();
    create_all(&state.pool, &state.model).await.unwrap();
    let (status, _) = send(&app, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let tables: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = $1",
    )
    .bind(&state.settings.db_schema)
    .fetch_one(&state.pool)
    .await
    .unwrap();
    assert_eq!(tables, state.model.entities.len() as i64);
    drop_schema(&state).await;
}

#[tokio::test]
async fn register_login_and_manage_children() {
    let Some(state) = db_state().await else { return };
    create_all(&state.pool, &state.model).await.unwrap();
    let app = build_app(state.clone());

    let (status, admin) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({"username": "director", "email": "Director@Example.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(admin["role"], "admin");
    assert_eq!(admin["email"], "director@example.com");
    assert!(admin.get("hashed_password").is_none());

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({"username": "director", "email": "other@example.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, staff) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({"username": "caregiver", "email": "caregiver@example.com", "password": "secret2", "role": "admin"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{}", staff);

    let (status, login) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"username": "director", "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["token_type"], "bearer");
    let token = login["access_token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"username": "director", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, child) = send(
        &app,
        Method::POST,
        "/children/",
        Some(&token),
        Some(json!({
            "name": "Maya Lopez",
            "dob": "2021-04-12T00:00:00Z",
            "gender": "Female",
            "parent_name": "Rosa Lopez",
            "parent_contact": "+1 555-0100",
            "id": 999
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", child);
    assert_eq!(child["dob"], "2021-04-12");
    let id = child["id"].as_i64().unwrap();
    assert_ne!(id, 999);

    let (status, fetched) = send(&app, Method::GET, &format!("/children/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Maya Lopez");

    let (status, patched) = send(
        &app,
        Method::PATCH,
        &format!("/children/{}", id),
        Some(&token),
        Some(json!({"allergies": "peanuts"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["allergies"], "peanuts");

    let (status, list) = send(&app, Method::GET, "/children?gender=Female", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let attendance = json!({"child_id": id, "date": "2024-03-01", "check_in": "08:05:00"});
    let (status, row) = send(&app, Method::POST, "/attendance/", Some(&token), Some(attendance.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(row["check_in"], "08:05:00");
    let (status, _) = send(&app, Method::POST, "/attendance/", Some(&token), Some(attendance)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, Method::DELETE, &format!("/children/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &format!("/children/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    drop_schema(&state).await;
}

async fn register(app: &Router, username: &str, password: &str, token: Option<&str>) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/auth/register",
        token,
        Some(json!({"username": username, "email": format!("{}@example.com", username), "password": password})),
    )
    .await
}

async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"username": username, "password": password})),
    )
    .await
}

async fn token_for(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = login(app, username, password).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn concurrent_first_registrations_yield_one_admin() {
    let Some(state) = db_state().await else { return };
    create_all(&state.pool, &state.model).await.unwrap();
    let app = build_app(state.clone());

    let (a, b) = tokio::join!(register(&app, "first", "secret1", None), register(&app, "second", "secret2", None));
    assert_eq!(a.0, StatusCode::CREATED);
    assert_eq!(b.0, StatusCode::CREATED);
    let mut roles = vec![a.1["role"].as_str().unwrap().to_string(), b.1["role"].as_str().unwrap().to_string()];
    roles.sort();
    assert_eq!(roles, vec!["admin", "staff"]);

    drop_schema(&state).await;
}

#[tokio::test]
async fn staff_cannot_write_staff_or_billing() {
    let Some(state) = db_state().await else { return };
    create_all(&state.pool, &state.model).await.unwrap();
    let app = build_app(state.clone());

    register(&app, "director", "secret1", None).await;
    let (_, caregiver) = register(&app, "caregiver", "secret2", None).await;
    assert_eq!(caregiver["role"], "staff");
    let admin = token_for(&app, "director", "secret1").await;
    let staff = token_for(&app, "caregiver", "secret2").await;

    let (status, child) = send(
        &app,
        Method::POST,
        "/children/",
        Some(&staff),
        Some(json!({
            "name": "Leo Park",
            "dob": "2020-09-01",
            "gender": "Male",
            "parent_name": "Jin Park",
            "parent_contact": "555-0142"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", child);

    let invoice = json!({"child_id": child["id"], "amount": 420.0, "due_date": "2024-04-01"});
    let (status, body) = send(&app, Method::POST, "/billing/", Some(&staff), Some(invoice.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");
    let (status, _) = send(&app, Method::POST, "/staff/", Some(&staff), Some(json!({"name": "Ana Silva"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, "/billing/", Some(&staff), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, bill) = send(&app, Method::POST, "/billing/", Some(&admin), Some(invoice)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bill["status"], "pending");
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/billing/{}", bill["id"]),
        Some(&staff),
        Some(json!({"status": "paid"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    drop_schema(&state).await;
}

#[tokio::test]
async fn available_staff_users_excludes_linked_accounts() {
    let Some(state) = db_state().await else { return };
    create_all(&state.pool, &state.model).await.unwrap();
    let app = build_app(state.clone());

    register(&app, "director", "secret1", None).await;
    let (_, caregiver) = register(&app, "caregiver", "secret2", None).await;
    register(&app, "assistant", "secret3", None).await;
    let admin = token_for(&app, "director", "secret1").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/staff/",
        Some(&admin),
        Some(json!({"name": "Care Giver", "user_id": caregiver["id"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, users) = send(&app, Method::GET, "/auth/available-staff-users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = users.as_array().unwrap().iter().map(|u| u["username"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["assistant"]);
    assert!(users[0].get("hashed_password").is_none());

    let staff = token_for(&app, "assistant", "secret3").await;
    let (status, _) = send(&app, Method::GET, "/auth/available-staff-users", Some(&staff), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    drop_schema(&state).await;
}

#[tokio::test]
async fn passwords_and_admin_self_guards() {
    let Some(state) = db_state().await else { return };
    create_all(&state.pool, &state.model).await.unwrap();
    let app = build_app(state.clone());

    let (_, director) = register(&app, "director", "secret1", None).await;
    let (_, caregiver) = register(&app, "caregiver", "secret2", None).await;
    let admin = token_for(&app, "director", "secret1").await;
    let staff = token_for(&app, "caregiver", "secret2").await;
    let admin_id = director["id"].as_i64().unwrap();
    let staff_id = caregiver["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::PUT,
        "/auth/change-password",
        Some(&staff),
        Some(json!({"current_password": "wrong1", "new_password": "newpass2"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = send(
        &app,
        Method::PUT,
        "/auth/change-password",
        Some(&staff),
        Some(json!({"current_password": "secret2", "new_password": "newpass2"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password updated successfully");
    assert_eq!(login(&app, "caregiver", "secret2").await.0, StatusCode::UNAUTHORIZED);
    token_for(&app, "caregiver", "newpass2").await;

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/auth/admin/change-password/{}", staff_id),
        Some(&staff),
        Some(json!({"new_password": "hijack1"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/auth/admin/change-password/{}", staff_id),
        Some(&admin),
        Some(json!({"new_password": "reset123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    token_for(&app, "caregiver", "reset123").await;

    let self_update = format!("/auth/update/{}", admin_id);
    let (status, _) = send(&app, Method::PUT, &self_update, Some(&admin), Some(json!({"role": "staff"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, Method::PUT, &self_update, Some(&admin), Some(json!({"is_active": false}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, me) = send(&app, Method::PUT, &self_update, Some(&admin), Some(json!({"full_name": "Dana Director"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["full_name"], "Dana Director");

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/auth/update/{}", staff_id),
        Some(&admin),
        Some(json!({"is_active": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["is_active"], false);
    assert_eq!(login(&app, "caregiver", "reset123").await.0, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::DELETE, &format!("/auth/{}", admin_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, Method::DELETE, &format!("/auth/{}", staff_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &format!("/auth/{}", staff_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    drop_schema(&state).await;
}

#[tokio::test]
async fn put_needs_a_full_record_but_patch_does_not() {
    let Some(state) = db_state().await else { return };
    create_all(&state.pool, &state.model).await.unwrap();
    let app = build_app(state.clone());

    register(&app, "director", "secret1", None).await;
    let token = token_for(&app, "director", "secret1").await;
    let child = json!({
        "name": "Ivy Chen",
        "dob": "2022-01-20",
        "gender": "Female",
        "parent_name": "Mei Chen",
        "parent_contact": "555-0199"
    });
    let (status, created) = send(&app, Method::POST, "/children", Some(&token), Some(child.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/children/{}", created["id"]);

    let (status, body) = send(&app, Method::PUT, &uri, Some(&token), Some(json!({"allergies": "dairy"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, patched) = send(&app, Method::PATCH, &uri, Some(&token), Some(json!({"allergies": "dairy"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["allergies"], "dairy");
    assert_eq!(patched["name"], "Ivy Chen");

    let mut full = child;
    full["name"] = json!("Ivy Chen-Li");
    let (status, replaced) = send(&app, Method::PUT, &uri, Some(&token), Some(full)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["name"], "Ivy Chen-Li");

    let (status, _) = send(&app, Method::GET, "/children/99999999999", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    drop_schema(&state).await;
}

#[tokio::test]
async fn login_prefers_exact_username_over_email() {
    let Some(state) = db_state().await else { return };
    create_all(&state.pool, &state.model).await.unwrap();
    let app = build_app(state.clone());

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({"username": "boss", "email": "boss@x.io", "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({"username": "boss@x.io", "email": "other@x.io", "password": "secret2"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = login(&app, "boss@x.io", "secret2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "boss@x.io");
    let (status, body) = login(&app, "boss", "secret1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "boss");

    drop_schema(&state).await;
}
