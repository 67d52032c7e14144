//! Common test utilities for integration tests.
//!
//! The router runs against the in-memory store, so no database is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use deskrelay_api::{
    app::create_app_with_stores,
    config::{
        Config, CookieConfig, DatabaseConfig, JwtAuthConfig, LoggingConfig, RelayConfig,
        SecurityConfig, ServerConfig,
    },
};
use domain::services::{InMemoryStore, Stores};
use fake::faker::internet::en::Username;
use fake::Fake;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse-battery";

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout_secs: 30,
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig::default(),
        jwt: JwtAuthConfig {
            access_secret: "integration-access-secret".to_string(),
            refresh_secret: "integration-refresh-secret".to_string(),
            access_token_expiry_secs: 900,
            refresh_token_expiry_secs: 3600,
            leeway_secs: 0,
        },
        cookies: CookieConfig {
            secure: false,
            ..CookieConfig::default()
        },
        relay: RelayConfig {
            presence_retry_delay_ms: 1,
            ..RelayConfig::default()
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub backend: Arc<InMemoryStore>,
    pub stores: Stores,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let backend = Arc::new(InMemoryStore::new());
        let stores = Stores::from_backend(backend.clone());
        let router = create_app_with_stores(config, stores.clone(), None).unwrap();
        Self {
            router,
            backend,
            stores,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Helper to create a JSON request.
pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Helper to parse JSON response body.
pub async fn parse_response_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

/// `Set-Cookie` values of a response.
pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect()
}

pub struct RegisteredUser {
    pub user_id: Uuid,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
}

pub fn unique_username() -> String {
    let base: String = Username().fake();
    let suffix = Uuid::new_v4().simple().to_string();
    let mut name: String = base.chars().filter(|c| c.is_ascii_alphanumeric()).take(10).collect();
    name.push_str(&suffix[..8]);
    name
}

pub async fn register_user(app: &TestApp) -> RegisteredUser {
    let username = unique_username();
    let email = format!("{}@example.com", username);
    let response = app
        .send(json_request(
            Method::POST,
            "/auth/register",
            json!({"username": username, "email": email, "password": PASSWORD}),
        ))
        .await;
    let status = response.status();
    let body = parse_response_body(response).await;
    assert!(status.is_success(), "registration failed: {} {}", status, body);

    RegisteredUser {
        user_id: Uuid::parse_str(body["user_id"].as_str().unwrap()).unwrap(),
        email,
        access_token: body["access_token"].as_str().unwrap().to_string(),
        refresh_token: body["refresh_token"].as_str().unwrap().to_string(),
    }
}

/// Desktop login creating a fresh device; returns `(device_id, access_token)`.
pub async fn desktop_login(app: &TestApp, user: &RegisteredUser) -> (Uuid, String) {
    let response = app
        .send(json_request(
            Method::POST,
            "/auth/login",
            json!({
                "email": user.email,
                "password": PASSWORD,
                "role": "desktop",
                "device_name": "workstation"
            }),
        ))
        .await;
    let body = parse_response_body(response).await;
    let device_id = Uuid::parse_str(body["device_id"].as_str().unwrap()).unwrap();
    (device_id, body["access_token"].as_str().unwrap().to_string())
}
