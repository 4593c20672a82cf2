#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;

use stockroom_api::bootstrap;
use stockroom_api::config::AppConfig;
use stockroom_api::db::{ensure_schema, establish_connection_with_config, DbConfig};
use stockroom_api::mailer::LogMailer;
use stockroom_api::{app_router, AppState};
use tower::util::ServiceExt;

pub const ADMIN_PASSWORD: &str = "it-test-admin-pw";

/// Fresh in-memory database with the schema and bootstrap data applied.
///
/// A single connection is mandatory: every pooled connection to
/// `sqlite::memory:` would get its own empty database.
pub async fn test_state() -> AppState {
    let db_config = DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let db = establish_connection_with_config(&db_config)
        .await
        .expect("in-memory database should connect");
    ensure_schema(&db).await.expect("schema creation");

    let config = AppConfig::new("sqlite::memory:", "127.0.0.1", 0, "test", ADMIN_PASSWORD);
    bootstrap::seed(&db, &config).await.expect("bootstrap seed");

    AppState::new(Arc::new(db), Arc::new(config), Arc::new(LogMailer))
}

pub async fn test_app() -> (Router, AppState) {
    let state = test_state().await;
    (app_router(state.clone()), state)
}

pub fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .expect("request should build"),
        None => builder.body(Body::empty()).expect("request should build"),
    }
}

/// Sends one request and returns status plus parsed JSON body (Null when the
/// body is empty, e.g. on 204).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should complete");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body should be JSON")
    };
    (status, body)
}

pub async fn login_token(app: &Router, login: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "login": login, "password": password })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"]
        .as_str()
        .expect("login response should carry a token")
        .to_string()
}

pub async fn admin_token(app: &Router) -> String {
    login_token(app, "admin", ADMIN_PASSWORD).await
}

/// Registers a product through the API and returns its ID.
pub async fn create_product(app: &Router, token: &str, name: &str, quantity: i64) -> String {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/api/products",
            Some(token),
            Some(json!({
                "name": name,
                "unit_price": "9.99",
                "quantity_on_hand": quantity,
                "minimum_stock": 2
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "product create failed: {}", body);
    body["id"].as_str().expect("product id").to_string()
}

/// Creates a user through the API and returns its ID.
pub async fn create_user(
    app: &Router,
    token: &str,
    login_name: &str,
    password: &str,
    access_level_id: Option<&str>,
) -> String {
    let mut payload = json!({
        "login_name": login_name,
        "email": format!("{}@example.com", login_name),
        "password": password,
        "display_name": login_name,
    });
    if let Some(level_id) = access_level_id {
        payload["access_level_id"] = json!(level_id);
    }

    let (status, body) = send(
        app,
        json_request(Method::POST, "/api/users", Some(token), Some(payload)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "user create failed: {}", body);
    body["id"].as_str().expect("user id").to_string()
}
