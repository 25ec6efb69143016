use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tower_http::trace::{HttpMakeClassifier, TraceLayer};
use tracing::Span;

/// Process-wide counters for the ordering core. Each service builds one instance at
/// startup and shares it through its state; nothing here is a global.
#[derive(Clone)]
pub struct PlatformMetrics {
    service: &'static str,
    registry: Registry,
    access_decisions: IntCounterVec,
    payment_attempts: IntCounterVec,
    audit_write_failures: IntCounterVec,
    version_conflicts: IntCounter,
    tokens_issued: IntCounterVec,
    http_errors_total: IntCounterVec,
}

impl PlatformMetrics {
    pub fn new(service: &'static str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let access_decisions = IntCounterVec::new(
            Opts::new("access_decisions_total", "Restaurant access and scope decisions"),
            &["tier", "outcome"],
        )?;
        registry.register(Box::new(access_decisions.clone()))?;

        let payment_attempts = IntCounterVec::new(
            Opts::new("payment_attempts_total", "Payment attempts grouped by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(payment_attempts.clone()))?;

        let audit_write_failures = IntCounterVec::new(
            Opts::new("audit_write_failures_total", "Payment audit entries that could not be written"),
            &["stage"],
        )?;
        registry.register(Box::new(audit_write_failures.clone()))?;

        let version_conflicts = IntCounter::new(
            "order_version_conflicts_total",
            "Order transitions rejected because of a stale version",
        )?;
        registry.register(Box::new(version_conflicts.clone()))?;

        let tokens_issued = IntCounterVec::new(
            Opts::new("tokens_issued_total", "Access tokens minted, by identity tier"),
            &["tier"],
        )?;
        registry.register(Box::new(tokens_issued.clone()))?;

        let http_errors_total = IntCounterVec::new(
            Opts::new("http_errors_total", "Count of HTTP error responses emitted (status >= 400)"),
            &["service", "code", "status"],
        )?;
        registry.register(Box::new(http_errors_total.clone()))?;

        Ok(Self {
            service,
            registry,
            access_decisions,
            payment_attempts,
            audit_write_failures,
            version_conflicts,
            tokens_issued,
            http_errors_total,
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn access_decision(&self, tier: &str, outcome: &str) {
        self.access_decisions.with_label_values(&[tier, outcome]).inc();
    }

    pub fn payment_attempt(&self, outcome: &str) {
        self.payment_attempts.with_label_values(&[outcome]).inc();
    }

    pub fn audit_write_failure(&self, stage: &str) {
        self.audit_write_failures.with_label_values(&[stage]).inc();
    }

    pub fn version_conflict(&self) {
        self.version_conflicts.inc();
    }

    pub fn token_issued(&self, tier: &str) {
        self.tokens_issued.with_label_values(&[tier]).inc();
    }

    pub fn http_error(&self, code: &str, status: StatusCode) {
        self.http_errors_total
            .with_label_values(&[self.service, code, status.as_str()])
            .inc();
    }

    pub fn render(&self) -> Result<Response, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        let mut response = Response::new(Body::from(buffer));
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        );
        Ok(response)
    }
}

/// `GET /metrics` handler for any state that can hand out the shared metrics.
pub async fn metrics_handler(State(metrics): State<Arc<PlatformMetrics>>) -> Response {
    match metrics.render() {
        Ok(response) => response,
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {err}"),
        )
            .into_response(),
    }
}

/// Root span for a request. `restaurant_id` and `trace_id` start empty and are filled
/// in once the caller has been admitted.
pub fn request_span(request: &Request) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        restaurant_id = tracing::field::Empty,
        trace_id = tracing::field::Empty,
    )
}

pub fn trace_layer() -> TraceLayer<HttpMakeClassifier, fn(&Request) -> Span> {
    TraceLayer::new_for_http().make_span_with(request_span as fn(&Request) -> Span)
}

/// Counts every response with status >= 400, labelled by its `X-Error-Code`.
pub async fn http_error_metrics(
    State(metrics): State<Arc<PlatformMetrics>>,
    req: Request,
    next: Next,
) -> Response {
    let resp = next.run(req).await;
    let status = resp.status();
    if status.as_u16() >= 400 {
        let code = resp
            .headers()
            .get("X-Error-Code")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        metrics.http_error(code, status);
    }
    resp
}
