use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::Stores;
use shared::jwt::TokenError;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_middleware, trace_id};
use crate::relay::{Relay, RelayBus};
use crate::routes::{auth, cable, health};
use crate::services::{AuthService, CookieHelper, Gatekeeper};

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub config: Arc<Config>,
    /// Present when backed by PostgreSQL; used by the readiness probe.
    pub pool: Option<PgPool>,
    pub auth: AuthService,
    pub gatekeeper: Gatekeeper,
    pub relay: Relay,
    pub cookies: CookieHelper,
}

impl AppState {
    pub fn new(config: Config, stores: Stores, pool: Option<PgPool>) -> Result<Self, TokenError> {
        let auth = AuthService::new(stores.clone(), &config.jwt)?;
        let gatekeeper = Gatekeeper::new(auth.clone(), &config.relay);
        let relay = Relay::new(
            RelayBus::new(),
            gatekeeper.clone(),
            stores.clone(),
            &config.relay,
        );
        let cookies = CookieHelper::new(
            config.cookies.clone(),
            config.jwt.access_token_expiry_secs,
            config.jwt.refresh_token_expiry_secs,
        );

        Ok(Self {
            stores,
            config: Arc::new(config),
            pool,
            auth,
            gatekeeper,
            relay,
            cookies,
        })
    }
}

/// PostgreSQL-backed application.
pub fn create_app(config: Config, pool: PgPool) -> Result<Router, TokenError> {
    let stores = persistence::stores(pool.clone());
    create_app_with_stores(config, stores, Some(pool))
}

pub fn create_app_with_stores(
    config: Config,
    stores: Stores,
    pool: Option<PgPool>,
) -> Result<Router, TokenError> {
    let state = AppState::new(config, stores, pool)?;
    Ok(router(state))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        // Development: any origin
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Cookies need credentials, which rule out wildcard origins.
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([
                axum::http::header::AUTHORIZATION,
                axum::http::header::CONTENT_TYPE,
            ])
            .allow_credentials(true)
    }
}

pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    let auth_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout));

    let public_routes = Router::new()
        .route("/up", get(health::up))
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics));

    // The socket outlives the upgrade request, so the timeout only bounds
    // the handshake.
    let cable_routes = Router::new().route("/cable", get(cable::cable));

    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(cable_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors_layer(&config.security.cors_origins))
        .with_state(state)
}
