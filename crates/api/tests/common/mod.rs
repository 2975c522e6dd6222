#![allow(dead_code)]

use std::sync::Arc;

use altme_api::auth::jwt::JwtConfig;
use altme_api::bootstrap::{ensure_admin, AdminSeed};
use altme_api::config::ServerConfig;
use altme_api::payments::PayoutGateway;
use altme_api::router::build_app_router;
use altme_api::state::AppState;
use altme_events::EventBus;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct-horse-battery";
pub const ADMIN_EMAIL: &str = "admin@altme.test";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        max_body_bytes: 64 * 1024,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Application state with a fresh event bus and no payout gateway.
pub fn test_state(pool: PgPool) -> AppState {
    AppState {
        pool,
        config: Arc::new(test_config()),
        event_bus: Arc::new(EventBus::default()),
        payout_gateway: None,
    }
}

pub fn with_gateway(mut state: AppState, gateway: Arc<dyn PayoutGateway>) -> AppState {
    state.payout_gateway = Some(gateway);
    state
}

/// The full router, built the same way as `main.rs`.
pub fn app(state: AppState) -> Router {
    build_app_router(state, &test_config())
}

pub fn build_test_app(pool: PgPool) -> Router {
    app(test_state(pool))
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Register a user through the API. Returns `(user_id, access_token)`.
pub async fn register(app: Router, email: &str) -> (i64, String) {
    let response = post_json(
        app,
        "/api/v1/auth/register",
        serde_json::json!({
            "email": email,
            "display_name": email.split('@').next().unwrap(),
            "password": PASSWORD,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    (
        json["user"]["id"].as_i64().unwrap(),
        json["access_token"].as_str().unwrap().to_string(),
    )
}

pub async fn login(app: Router, email: &str) -> Response {
    post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({ "email": email, "password": PASSWORD }),
    )
    .await
}

/// Seed the admin account and log in. Returns `(user_id, access_token)`.
pub async fn admin(state: &AppState) -> (i64, String) {
    let seed = AdminSeed {
        email: ADMIN_EMAIL.to_string(),
        password: PASSWORD.to_string(),
        display_name: "Admin".to_string(),
    };
    ensure_admin(&state.pool, &seed).await.unwrap();
    let response = login(app(state.clone()), ADMIN_EMAIL).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    (
        json["user"]["id"].as_i64().unwrap(),
        json["access_token"].as_str().unwrap().to_string(),
    )
}

/// Send a request and return the status with the parsed body (`Null` when
/// the body is empty).
pub async fn call(
    state: &AppState,
    method: Method,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let response = send(app(state.clone()), method, uri, Some(token), body).await;
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// The caller's current balance as reported by `GET /me`.
pub async fn balance(state: &AppState, token: &str) -> i64 {
    let (status, json) = call(state, Method::GET, "/api/v1/me", token, None).await;
    assert_eq!(status, StatusCode::OK);
    json["data"]["balance"].as_i64().unwrap()
}
