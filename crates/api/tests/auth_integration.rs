//! Integration tests for login, registration, refresh and logout.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{
    desktop_login, json_request, parse_response_body, register_user, set_cookies, TestApp,
    PASSWORD,
};
use serde_json::json;

#[tokio::test]
async fn test_register_returns_tokens_and_cookies() {
    let app = TestApp::new();
    let response = app
        .send(json_request(
            Method::POST,
            "/auth/register",
            json!({"username": "alice", "email": "alice@example.com", "password": PASSWORD}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("access_token=")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=") && c.contains("HttpOnly")));

    let body = parse_response_body(response).await;
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["role"], "client");
    assert!(body["user"].get("password_hash").is_none());
    assert_eq!(body["token_type"], "Bearer");
    assert!(body.get("device_id").is_none());
}

#[tokio::test]
async fn test_register_validation_and_conflict() {
    let app = TestApp::new();

    let response = app
        .send(json_request(
            Method::POST,
            "/auth/register",
            json!({"username": "al", "email": "al@example.com", "password": PASSWORD}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(parse_response_body(response).await["error"], "validation_error");

    let response = app
        .send(json_request(
            Method::POST,
            "/auth/register",
            json!({"username": "bobby", "email": "bob@example.com", "password": "short"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let first = json!({"username": "carol", "email": "carol@example.com", "password": PASSWORD});
    assert_eq!(
        app.send(json_request(Method::POST, "/auth/register", first.clone())).await.status(),
        StatusCode::CREATED
    );
    let response = app
        .send(json_request(Method::POST, "/auth/register", first))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::new();
    let user = register_user(&app).await;

    let wrong_password = app
        .send(json_request(
            Method::POST,
            "/auth/login",
            json!({"email": user.email, "password": "not-the-password"}),
        ))
        .await;
    let unknown = app
        .send(json_request(
            Method::POST,
            "/auth/login",
            json!({"email": "nobody@example.com", "password": PASSWORD}),
        ))
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        parse_response_body(wrong_password).await,
        parse_response_body(unknown).await
    );
}

#[tokio::test]
async fn test_desktop_login_creates_and_reuses_device() {
    let app = TestApp::new();
    let user = register_user(&app).await;
    let (device_id, _) = desktop_login(&app, &user).await;

    let response = app
        .send(json_request(
            Method::POST,
            "/auth/login",
            json!({
                "email": user.email,
                "password": PASSWORD,
                "role": "desktop",
                "device_id": device_id
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_response_body(response).await["device_id"], json!(device_id));
}

#[tokio::test]
async fn test_desktop_login_with_foreign_device_is_forbidden() {
    let app = TestApp::new();
    let owner = register_user(&app).await;
    let other = register_user(&app).await;
    let (device_id, _) = desktop_login(&app, &owner).await;

    let response = app
        .send(json_request(
            Method::POST,
            "/auth/login",
            json!({
                "email": other.email,
                "password": PASSWORD,
                "role": "desktop",
                "device_id": device_id
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_desktop_login_rejects_long_device_name() {
    let app = TestApp::new();
    let user = register_user(&app).await;

    let response = app
        .send(json_request(
            Method::POST,
            "/auth/login",
            json!({
                "email": user.email,
                "password": PASSWORD,
                "role": "desktop",
                "device_name": "x".repeat(33)
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_rotates_and_detects_reuse() {
    let app = TestApp::new();
    let user = register_user(&app).await;

    let response = app
        .send(json_request(
            Method::POST,
            "/auth/refresh",
            json!({"refresh_token": format!("Bearer {}", user.refresh_token)}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = parse_response_body(response).await;
    assert_ne!(rotated["refresh_token"], json!(user.refresh_token));

    // Replaying the old token revokes everything, including the rotated session.
    let replay = app
        .send(json_request(
            Method::POST,
            "/auth/refresh",
            json!({"refresh_token": user.refresh_token}),
        ))
        .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(parse_response_body(replay).await["error"], "session_revoked");

    let response = app
        .send(json_request(
            Method::POST,
            "/auth/refresh",
            json!({"refresh_token": rotated["refresh_token"]}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_from_cookie() {
    let app = TestApp::new();
    let user = register_user(&app).await;

    let response = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/auth/refresh")
                .header(header::COOKIE, format!("refresh_token={}", user.refresh_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).iter().any(|c| c.starts_with("access_token=")));
}

#[tokio::test]
async fn test_blank_body_token_falls_back_to_cookie() {
    let app = TestApp::new();

    for blank in ["", "   ", "Bearer "] {
        // Each successful refresh rotates the session, so use a fresh user.
        let user = register_user(&app).await;
        let mut request = json_request(
            Method::POST,
            "/auth/refresh",
            json!({"refresh_token": blank}),
        );
        request.headers_mut().insert(
            header::COOKIE,
            format!("refresh_token={}", user.refresh_token).parse().unwrap(),
        );

        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::OK, "body token {:?}", blank);
        let body = parse_response_body(response).await;
        assert_eq!(body["user_id"], json!(user.user_id));
    }
}

#[tokio::test]
async fn test_blank_body_token_without_cookie_is_missing() {
    let app = TestApp::new();
    let response = app
        .send(json_request(
            Method::POST,
            "/auth/refresh",
            json!({"refresh_token": "  "}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(parse_response_body(response).await["error"], "missing_token");
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let app = TestApp::new();
    let user = register_user(&app).await;

    let response = app
        .send(json_request(
            Method::POST,
            "/auth/refresh",
            json!({"refresh_token": user.access_token}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_without_token() {
    let app = TestApp::new();
    let response = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/auth/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(parse_response_body(response).await["error"], "missing_token");
}

#[tokio::test]
async fn test_logout_revokes_session_and_clears_cookies() {
    let app = TestApp::new();
    let user = register_user(&app).await;

    let mut request = json_request(Method::POST, "/auth/logout", json!({}));
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", user.access_token).parse().unwrap(),
    );
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).iter().any(|c| c.contains("Max-Age=0")));
    assert_eq!(parse_response_body(response).await["revoked"], 1);

    let mut again = json_request(Method::POST, "/auth/logout", json!({}));
    again.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", user.access_token).parse().unwrap(),
    );
    let response = app.send(again).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(parse_response_body(response).await["error"], "session_not_found");
}

#[tokio::test]
async fn test_logout_all() {
    let app = TestApp::new();
    let user = register_user(&app).await;
    let (_, desktop_token) = desktop_login(&app, &user).await;

    let mut request = json_request(Method::POST, "/auth/logout", json!({"all": true}));
    request.headers_mut().insert(
        header::COOKIE,
        format!("access_token={}", user.access_token).parse().unwrap(),
    );
    let response = app.send(request).await;
    assert_eq!(parse_response_body(response).await["revoked"], 2);

    let response = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri(format!("/auth/logout?access_token={}", desktop_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_requires_token() {
    let app = TestApp::new();
    let response = app
        .send(json_request(Method::POST, "/auth/logout", json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(parse_response_body(response).await["error"], "missing_token");
}
