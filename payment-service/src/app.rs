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
use common_observability::{http_error_metrics, metrics_handler, trace_layer, PlatformMetrics};
use common_security::AccessControl;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::engine::PaymentAuditEngine;
use crate::payment_handlers::{create_payment, get_audit_trail};

#[derive(Clone)]
pub struct AppState {
    pub access: Arc<AccessControl>,
    pub engine: Arc<PaymentAuditEngine>,
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

pub fn build_router(state: AppState) -> Router {
    let allowed_origins = [
        "http://localhost:3000",
        "http://localhost:3001",
        "http://localhost:5173",
    ];
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            ACCEPT,
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-restaurant-id"),
            HeaderName::from_static("x-trace-id"),
        ]);

    let metrics = state.metrics.clone();
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/metrics", get(metrics_handler))
        .route("/payments", post(create_payment))
        .route("/payments/audit/:order_id", get(get_audit_trail))
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn_with_state(metrics, http_error_metrics))
        .layer(trace_layer())
}
