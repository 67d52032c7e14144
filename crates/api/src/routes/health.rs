//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::app::AppState;
use crate::middleware::metrics_handler;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: DatabaseHealth,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    /// `false` when the service runs without a database pool.
    pub configured: bool,
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// GET /up
///
/// Liveness: 200 while the process is serving requests.
pub async fn up() -> Json<StatusResponse> {
    Json(StatusResponse { status: "alive" })
}

/// GET /health
///
/// Readiness, including a database round-trip when a pool is configured.
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let database = match &state.pool {
        Some(pool) => {
            let start = std::time::Instant::now();
            let connected = match persistence::db::ping(pool).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "Health check database ping failed");
                    false
                }
            };
            DatabaseHealth {
                configured: true,
                connected,
                latency_ms: connected.then(|| start.elapsed().as_millis() as u64),
            }
        }
        None => DatabaseHealth {
            configured: false,
            connected: false,
            latency_ms: None,
        },
    };

    let healthy = !database.configured || database.connected;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "healthy" } else { "unhealthy" },
            version: env!("CARGO_PKG_VERSION"),
            database,
        }),
    )
}

/// GET /metrics
///
/// Refreshes the pool gauges before rendering.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.pool {
        persistence::metrics::record_pool_metrics(pool);
    }
    metrics_handler().await
}
