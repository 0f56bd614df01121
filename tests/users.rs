mod common;

use axum::http::{header, Method, Request, StatusCode};
use axum::body::Body;
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use tower::ServiceExt;

use common::TestApp;

#[tokio::test]
async fn register_then_exchange_credentials_for_a_token() {
    let app = TestApp::new();
    let credentials = json!({ "email": "Guest@Theatre.test", "password": "opening-night" });

    let (status, value) = app
        .send(Method::POST, "/api/user/register", None, Some(credentials.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{value}");
    assert_eq!(value["email"], "guest@theatre.test");
    assert_eq!(value["is_staff"], false);
    assert!(value.get("password_hash").is_none());

    let (status, _) = app
        .send(Method::POST, "/api/user/register", None, Some(credentials.clone()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, token) = app
        .send(Method::POST, "/api/user/token", None, Some(credentials))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(token["token_type"], "Bearer");

    let access = token["access"].as_str().unwrap();
    let (status, me) = app.get("/api/user/me", access).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "guest@theatre.test");
}

#[tokio::test]
async fn wrong_password_gets_no_token() {
    let app = TestApp::new();
    app.send(
        Method::POST,
        "/api/user/register",
        None,
        Some(json!({ "email": "guest@theatre.test", "password": "opening-night" })),
    )
    .await;

    let (status, value) = app
        .send(
            Method::POST,
            "/api/user/token",
            None,
            Some(json!({ "email": "guest@theatre.test", "password": "closing-night" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(value["code"], "AUTHENTICATION_REQUIRED");
}

#[tokio::test]
async fn short_password_is_rejected() {
    let app = TestApp::new();
    let (status, value) = app
        .send(
            Method::POST,
            "/api/user/register",
            None,
            Some(json!({ "email": "guest@theatre.test", "password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn basic_auth_is_accepted() {
    let app = TestApp::new();
    app.send(
        Method::POST,
        "/api/user/register",
        None,
        Some(json!({ "email": "guest@theatre.test", "password": "opening-night" })),
    )
    .await;

    let encoded = general_purpose::STANDARD.encode("guest@theatre.test:opening-night");
    let request = Request::builder()
        .uri("/api/genres")
        .header(header::AUTHORIZATION, format!("Basic {encoded}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn garbage_bearer_token_is_unauthorized() {
    let app = TestApp::new();
    let (status, _) = app.get("/api/genres", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_reports_store_status() {
    let app = TestApp::new();
    let (status, value) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["status"], "ok");
}
