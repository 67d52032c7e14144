//! Handshake checks on the websocket endpoint.
//!
//! `oneshot` requests cannot be upgraded, so an accepted handshake surfaces
//! as 426 here; rejections must come back before that point.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{desktop_login, parse_response_body, register_user, TestApp};
use domain::models::{Capabilities, Capability, NewDeviceShare, NewPermissionGroup, ShareStatus};
use domain::services::ShareStore;
use uuid::Uuid;

fn cable_request(query: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(format!("/cable{}", query));
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new();
    let response = app.send(cable_request("", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(parse_response_body(response).await["error"], "missing_token");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = TestApp::new();
    let response = app
        .send(cable_request("?access_token=not.a.jwt", None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(parse_response_body(response).await["error"], "token_invalid");
}

#[tokio::test]
async fn test_web_client_needs_device_id() {
    let app = TestApp::new();
    let user = register_user(&app).await;

    let response = app.send(cable_request("", Some(&user.access_token))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(cable_request("?device_id=nope", Some(&user.access_token)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_web_client_without_access_is_forbidden() {
    let app = TestApp::new();
    let owner = register_user(&app).await;
    let stranger = register_user(&app).await;
    let (device_id, _) = desktop_login(&app, &owner).await;

    let response = app
        .send(cable_request(
            &format!("?device_id={}", device_id),
            Some(&stranger.access_token),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(parse_response_body(response).await["error"], "access_denied");

    let response = app
        .send(cable_request(
            &format!("?device_id={}", Uuid::new_v4()),
            Some(&owner.access_token),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(parse_response_body(response).await["error"], "device_not_found");
}

#[tokio::test]
async fn test_owner_and_grantee_are_admitted() {
    let app = TestApp::new();
    let owner = register_user(&app).await;
    let guest = register_user(&app).await;
    let (device_id, desktop_token) = desktop_login(&app, &owner).await;

    let group = app
        .stores
        .shares
        .create_permission_group(NewPermissionGroup {
            user_id: owner.user_id,
            name: None,
            capabilities: Capabilities::none().with(Capability::SeeScreen),
        })
        .await
        .unwrap();
    app.stores
        .shares
        .create_share(NewDeviceShare {
            device_id,
            user_id: guest.user_id,
            permission_group_id: group.id,
            status: ShareStatus::Active,
            expires_at: None,
        })
        .await
        .unwrap();

    let query = format!("?device_id={}", device_id);
    for token in [&owner.access_token, &guest.access_token] {
        let response = app.send(cable_request(&query, Some(token))).await;
        assert_eq!(response.status(), StatusCode::UPGRADE_REQUIRED);
    }

    let response = app
        .send(cable_request(&format!("?access_token={}", desktop_token), None))
        .await;
    assert_eq!(response.status(), StatusCode::UPGRADE_REQUIRED);
}

#[tokio::test]
async fn test_token_from_cookie() {
    let app = TestApp::new();
    let owner = register_user(&app).await;
    let (device_id, _) = desktop_login(&app, &owner).await;

    let request = Request::builder()
        .uri(format!("/cable?device_id={}", device_id))
        .header(header::COOKIE, format!("access_token={}", owner.access_token))
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::UPGRADE_REQUIRED);
}
