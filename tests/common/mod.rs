#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use theatre_booking::config::Config;
use theatre_booking::models::NewUser;
use theatre_booking::services::auth;
use theatre_booking::store::{MemoryStore, Store};
use theatre_booking::{app, AppState};

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::with_store(store.clone(), Config::in_memory(JWT_SECRET));
        TestApp {
            router: app(state.clone()),
            store,
            state,
        }
    }

    /// Creates a user directly in the store and returns a bearer token for it.
    pub async fn user(&self, email: &str, is_staff: bool) -> String {
        let user = self
            .store
            .create_user(NewUser {
                email: email.to_string(),
                password_hash: "unused".to_string(),
                is_staff,
            })
            .await
            .unwrap();
        auth::issue_token(&user, &self.state.config.jwt)
            .unwrap()
            .access
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        send(&self.router, method, uri, token, body).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    /// POSTs as staff and returns the created id.
    pub async fn create(&self, uri: &str, staff: &str, body: Value) -> i64 {
        let (status, value) = self.post(uri, staff, body).await;
        assert_eq!(status, StatusCode::CREATED, "POST {uri} failed: {value}");
        value["id"].as_i64().unwrap()
    }
}

pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}
