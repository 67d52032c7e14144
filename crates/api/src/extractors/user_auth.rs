//! Session authentication extractor.
//!
//! Accepts the access token from the `Authorization` header, the access
//! token cookie, or the `access_token` query parameter, in that order.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use domain::models::Session;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::{AuthCookie, TokenSources};

/// Query parameters that may carry credentials.
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub access_token: Option<String>,
    pub device_id: Option<String>,
}

impl TokenQuery {
    pub fn from_parts(parts: &Parts) -> Self {
        Query::<TokenQuery>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default()
    }
}

/// Collects every token transport present on a request.
pub fn token_sources<'a>(
    headers: &'a HeaderMap,
    query: &'a TokenQuery,
    state: &AppState,
) -> TokenSources<'a> {
    TokenSources {
        header: headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
        cookie: state.cookies.read(headers, AuthCookie::Access),
        param: query.access_token.as_deref(),
    }
}

/// An active, unexpired session resolved from the request.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession(pub Session);

impl AuthenticatedSession {
    pub fn user_id(&self) -> Uuid {
        self.0.user_id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let query = TokenQuery::from_parts(parts);
        let sources = token_sources(&parts.headers, &query, state);
        let session = state.auth.authorize(&sources).await?;
        Ok(AuthenticatedSession(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(uri: &str) -> Parts {
        Request::builder().uri(uri).body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_token_query_parsed() {
        let device = Uuid::new_v4();
        let query = TokenQuery::from_parts(&parts(&format!(
            "/cable?access_token=abc&device_id={}",
            device
        )));
        assert_eq!(query.access_token.as_deref(), Some("abc"));
        assert_eq!(query.device_id, Some(device.to_string()));
    }

    #[test]
    fn test_token_query_absent() {
        let query = TokenQuery::from_parts(&parts("/cable"));
        assert!(query.access_token.is_none());
        assert!(query.device_id.is_none());
    }
}
