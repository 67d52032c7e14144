//! Authentication routes: login, registration, token refresh and logout.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use domain::models::{ClientRole, User};
use serde::{Deserialize, Serialize};
use shared::jwt::strip_bearer;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthenticatedSession;
use crate::services::{AuthCookie, IssuedTokens, LoginCredentials};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(custom(function = "shared::validation::validate_email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// Defaults to `web`
    #[serde(default = "default_role")]
    pub role: ClientRole,

    /// Desktop only: bind to an existing device
    pub device_id: Option<Uuid>,

    /// Desktop only: name for a device created on first login
    pub device_name: Option<String>,
}

fn default_role() -> ClientRole {
    ClientRole::Web
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "shared::validation::validate_username"))]
    pub username: String,

    #[validate(custom(function = "shared::validation::validate_email"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<Uuid>,
}

impl From<&IssuedTokens> for TokenResponse {
    fn from(tokens: &IssuedTokens) -> Self {
        Self {
            user_id: tokens.user_id(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            token_type: "Bearer",
            expires_in: tokens.access_expires_in,
            device_id: tokens.device_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutResponse {
    pub revoked: u64,
}

fn token_cookies(state: &AppState, tokens: &IssuedTokens) -> HeaderMap {
    let mut headers = HeaderMap::new();
    state
        .cookies
        .append_tokens(&mut headers, &tokens.access_token, &tokens.refresh_token);
    headers
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<TokenResponse>), ApiError> {
    request.validate()?;

    let tokens = state
        .auth
        .login(LoginCredentials {
            email: request.email,
            password: request.password,
            role: request.role,
            device_id: request.device_id,
            device_name: request.device_name,
        })
        .await?;

    Ok((token_cookies(&state, &tokens), Json(TokenResponse::from(&tokens))))
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<RegisterResponse>), ApiError> {
    request.validate()?;

    let (user, tokens) = state
        .auth
        .register(&request.username, &request.email, &request.password)
        .await?;

    let headers = token_cookies(&state, &tokens);
    let response = RegisterResponse {
        user,
        tokens: TokenResponse::from(&tokens),
    };
    Ok((StatusCode::CREATED, headers, Json(response)))
}

/// POST /auth/refresh
///
/// A non-blank `refresh_token` in the body wins over the refresh cookie.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<(HeaderMap, Json<TokenResponse>), ApiError> {
    let from_body = body.and_then(|Json(b)| b.refresh_token);
    let token = from_body
        .as_deref()
        .and_then(strip_bearer)
        .or_else(|| state.cookies.read(&headers, AuthCookie::Refresh))
        .ok_or_else(|| ApiError::unauthorized("missing_token", "No refresh token provided"))?;

    let tokens = state.auth.refresh(token).await?;

    Ok((token_cookies(&state, &tokens), Json(TokenResponse::from(&tokens))))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    AuthenticatedSession(session): AuthenticatedSession,
    body: Option<Json<LogoutRequest>>,
) -> Result<(HeaderMap, Json<LogoutResponse>), ApiError> {
    let all = body.map(|Json(b)| b.all).unwrap_or(false);
    let revoked = state.auth.logout(&session, all).await?;

    let mut headers = HeaderMap::new();
    state.cookies.append_clear(&mut headers);
    Ok((headers, Json(LogoutResponse { revoked })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_request(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_register_request_validation() {
        assert!(register_request("alice", "alice@example.com", "longenough").validate().is_ok());
        assert!(register_request("al", "alice@example.com", "longenough").validate().is_err());
        assert!(register_request("alice", "not-an-email", "longenough").validate().is_err());
        assert!(register_request("alice", "alice@example.com", "short").validate().is_err());
    }

    #[test]
    fn test_login_request_defaults_to_web() {
        let request: LoginRequest =
            serde_json::from_str(r#"{"email":"a@example.com","password":"x"}"#).unwrap();
        assert_eq!(request.role, ClientRole::Web);
        assert!(request.device_id.is_none());

        let request: LoginRequest = serde_json::from_str(
            r#"{"email":"a@example.com","password":"x","role":"desktop","device_name":"rig"}"#,
        )
        .unwrap();
        assert_eq!(request.role, ClientRole::Desktop);
        assert_eq!(request.device_name.as_deref(), Some("rig"));
    }

    #[test]
    fn test_logout_request_default() {
        let request: LogoutRequest = serde_json::from_str("{}").unwrap();
        assert!(!request.all);
    }
}
