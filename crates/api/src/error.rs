use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::StoreError;
use serde::Serialize;
use thiserror::Error;

use crate::services::{AuthError, AuthFailure, HandshakeError};

#[derive(Debug, Error)]
pub enum ApiError {
    /// 401 with a machine-readable reason in `error`.
    #[error("Unauthorized ({reason}): {message}")]
    Unauthorized {
        reason: &'static str,
        message: String,
    },

    /// 403 with a machine-readable reason in `error`.
    #[error("Forbidden ({reason}): {message}")]
    Forbidden {
        reason: &'static str,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn unauthorized(reason: &'static str, message: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            reason,
            message: message.into(),
        }
    }

    pub fn forbidden(reason: &'static str, message: impl Into<String>) -> Self {
        ApiError::Forbidden {
            reason,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
}

#[derive(Debug, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Unauthorized { reason, message } => {
                (StatusCode::UNAUTHORIZED, *reason, message.clone())
            }
            ApiError::Forbidden { reason, message } => {
                (StatusCode::FORBIDDEN, *reason, message.clone())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                tracing::error!("Service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "service_unavailable",
                    "Service temporarily unavailable".into(),
                )
            }
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => ApiError::ServiceUnavailable(msg),
            StoreError::Validation(msg) => ApiError::Validation(msg),
            StoreError::NotFound(msg) => ApiError::NotFound(msg),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
        }
    }
}

impl From<AuthFailure> for ApiError {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::Store(err) => err.into(),
            other => ApiError::unauthorized(other.reason(), other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                ApiError::unauthorized("invalid_credentials", "Invalid email or password")
            }
            AuthError::TokenInvalid => ApiError::unauthorized("token_invalid", err.to_string()),
            AuthError::TokenExpired => ApiError::unauthorized("token_expired", err.to_string()),
            AuthError::SessionNotFound => {
                ApiError::unauthorized("session_not_found", err.to_string())
            }
            AuthError::SessionExpired => ApiError::unauthorized("session_expired", err.to_string()),
            AuthError::SessionRevoked => ApiError::unauthorized("session_revoked", err.to_string()),
            AuthError::DeviceMismatch => ApiError::unauthorized("device_mismatch", err.to_string()),
            AuthError::AccessDenied(msg) => ApiError::forbidden("access_denied", msg),
            AuthError::WeakPassword(msg) | AuthError::Validation(msg) => ApiError::Validation(msg),
            AuthError::Store(err) => err.into(),
            AuthError::Password(e) => ApiError::Internal(e.to_string()),
            AuthError::Encoding(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<HandshakeError> for ApiError {
    fn from(err: HandshakeError) -> Self {
        match err {
            HandshakeError::Unauthorized(failure) => failure.into(),
            HandshakeError::DeviceMismatch => {
                ApiError::unauthorized("device_mismatch", err.to_string())
            }
            HandshakeError::MissingDevice => ApiError::Validation(err.to_string()),
            HandshakeError::DeviceNotFound | HandshakeError::AccessDenied => {
                ApiError::forbidden(err.reason(), err.to_string())
            }
            HandshakeError::Store(err) => err.into(),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("23505") => ApiError::Conflict("Resource already exists".into()),
                Some("23503") => ApiError::NotFound("Referenced resource not found".into()),
                _ => ApiError::Internal(format!("Database error: {}", db_err)),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                ApiError::ServiceUnavailable(format!("Database error: {}", err))
            }
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();

        let message = match details.as_slice() {
            [single] => format!("{}: {}", single.field, single.message),
            _ => format!("{} validation errors", details.len()),
        };

        ApiError::Validation(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_unauthorized_carries_reason() {
        let (status, body) = body_of(AuthFailure::TokenExpired.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "token_expired");
    }

    #[tokio::test]
    async fn test_refresh_errors() {
        let (status, body) = body_of(AuthError::SessionRevoked.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "session_revoked");

        let (_, body) = body_of(AuthError::DeviceMismatch.into()).await;
        assert_eq!(body["error"], "device_mismatch");
    }

    #[tokio::test]
    async fn test_access_denied_is_forbidden() {
        let (status, body) = body_of(HandshakeError::AccessDenied.into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "access_denied");

        let (status, body) = body_of(HandshakeError::DeviceNotFound.into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "device_not_found");

        let (status, body) =
            body_of(AuthError::AccessDenied("Device does not belong to user".into()).into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "access_denied");
        assert_eq!(body["message"], "Device does not belong to user");
    }

    #[tokio::test]
    async fn test_store_errors() {
        let (status, body) = body_of(StoreError::Unavailable("pool exhausted".into()).into()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "service_unavailable");
        assert_ne!(body["message"], "pool exhausted");

        let (status, _) = body_of(StoreError::Conflict("username taken".into()).into()).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = body_of(StoreError::Validation("name too long".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_handshake_store_failure_is_not_unauthorized() {
        let err: HandshakeError = AuthFailure::Store(StoreError::Unavailable("down".into())).into();
        let (status, _) = body_of(err.into()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_internal_hides_message() {
        let (status, body) = body_of(ApiError::Internal("secret detail".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "An internal error occurred");
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ApiError::unauthorized("missing_token", "No token provided").to_string(),
            "Unauthorized (missing_token): No token provided"
        );
        assert_eq!(
            ApiError::forbidden("access_denied", "x").to_string(),
            "Forbidden (access_denied): x"
        );
    }

    #[test]
    fn test_from_sqlx_row_not_found() {
        let error: ApiError = sqlx::Error::RowNotFound.into();
        assert!(matches!(error, ApiError::NotFound(msg) if msg == "Resource not found"));
    }
}
