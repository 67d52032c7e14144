//! Websocket endpoint for the relay.

use axum::{
    extract::{ws::WebSocketUpgrade, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::debug;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{token_sources, TokenQuery};
use crate::relay;
use crate::services::HandshakeRequest;

fn parse_device_id(raw: Option<&str>) -> Result<Option<Uuid>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Uuid::parse_str(s)
            .map(Some)
            .map_err(|_| ApiError::Validation("device_id must be a UUID".to_string())),
    }
}

/// GET /cable
///
/// The handshake is checked before the upgrade so a rejected client sees a
/// plain 401/403 response instead of a socket that closes immediately.
pub async fn cable(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
    ws: Option<WebSocketUpgrade>,
) -> Result<Response, ApiError> {
    let device_id = parse_device_id(query.device_id.as_deref())?;
    let admission = state
        .gatekeeper
        .admit(&HandshakeRequest {
            tokens: token_sources(&headers, &query, &state),
            device_id,
        })
        .await?;

    let Some(ws) = ws else {
        debug!(user_id = %admission.identity.user.id, "Admitted handshake without websocket upgrade");
        // Dropping the admission releases presence.
        return Ok((StatusCode::UPGRADE_REQUIRED, "Websocket upgrade required").into_response());
    };

    let relay = state.relay.clone();
    let buffer = state.config.relay.subscriber_buffer;
    Ok(ws.on_upgrade(move |socket| relay::serve(socket, relay, admission, buffer)))
}
