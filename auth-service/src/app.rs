use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use common_auth::{CredentialVerifier, TokenCodec};
use common_observability::{http_error_metrics, metrics_handler, trace_layer, PlatformMetrics};
use common_security::{AccessControl, MembershipStore};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::AuthConfig;
use crate::token_handlers::{create_guest_session, current_session, issue_station_token, login};

pub async fn health() -> &'static str {
    "ok"
}

#[derive(Clone)]
pub struct AppState {
    pub access: Arc<AccessControl>,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub memberships: Arc<dyn MembershipStore>,
    pub config: Arc<AuthConfig>,
    pub metrics: Arc<PlatformMetrics>,
}

impl FromRef<AppState> for Arc<AccessControl> {
    fn from_ref(state: &AppState) -> Self {
        state.access.clone()
    }
}

impl FromRef<AppState> for Arc<PlatformMetrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

impl FromRef<AppState> for Arc<TokenCodec> {
    fn from_ref(state: &AppState) -> Self {
        state.access.codec().clone()
    }
}

pub fn cors_layer() -> CorsLayer {
    let allowed_origins = [
        "http://localhost:3000",
        "http://localhost:3001",
        "http://localhost:5173",
    ];
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            allowed_origins.iter().filter_map(|o| o.parse::<HeaderValue>().ok()).collect::<Vec<_>>(),
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            ACCEPT,
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-restaurant-id"),
            HeaderName::from_static("x-trace-id"),
        ])
}

pub fn build_router(state: AppState) -> Router {
    let metrics = state.metrics.clone();
    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_handler))
        .route("/login", post(login))
        .route("/sessions/guest", post(create_guest_session))
        .route("/sessions/me", get(current_session))
        .route("/stations/tokens", post(issue_station_token))
        .with_state(state)
        .layer(cors_layer())
        .layer(middleware::from_fn_with_state(metrics, http_error_metrics))
        .layer(trace_layer())
}
