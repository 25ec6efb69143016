#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use common_auth::{ClaimInput, KeySet, Role, TokenCodec, TokenConfig, VerifiedCredential};
use common_observability::PlatformMetrics;
use common_security::{AccessControl, InMemoryMembershipStore, ScopeRegistry};
use order_service::{AppState, InMemoryOrderStore, OrderConcurrencyControl};
use uuid::Uuid;

const SECRET: &[u8] = b"order-service-test-secret-0123456789";

pub struct TestApp {
    pub state: AppState,
    pub memberships: Arc<InMemoryMembershipStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let codec = Arc::new(TokenCodec::new(
            TokenConfig::new("ordering-auth", "ordering"),
            Arc::new(KeySet::hmac("current", SECRET)),
        ));
        let metrics = Arc::new(PlatformMetrics::new("order-service").expect("metrics"));
        let memberships = Arc::new(InMemoryMembershipStore::new());
        let access = Arc::new(AccessControl::new(
            codec,
            memberships.clone(),
            Arc::new(ScopeRegistry::default()),
            metrics.clone(),
        ));
        let orders = Arc::new(OrderConcurrencyControl::new(Arc::new(InMemoryOrderStore::new()), metrics.clone()));
        Self { state: AppState { access, orders, metrics }, memberships }
    }

    fn issue(&self, input: ClaimInput) -> String {
        self.state.access.codec().issue(&input, &BTreeSet::new()).expect("issue").token
    }

    pub fn guest(&self, restaurant_id: Uuid) -> String {
        self.issue(ClaimInput::Ephemeral { restaurant_id })
    }

    pub fn station(&self, role: Role, restaurant_id: Uuid) -> String {
        self.issue(ClaimInput::Station { role, restaurant_id })
    }

    pub fn staff(&self, role: Role, restaurant_id: Uuid) -> String {
        let user_id = Uuid::new_v4();
        self.memberships.grant(user_id, restaurant_id).expect("grant");
        self.issue(ClaimInput::Persistent {
            credential: VerifiedCredential { user_id, role },
            restaurant_id: Some(restaurant_id),
        })
    }
}

pub fn request(method: &str, uri: &str, token: &str, restaurant_id: Uuid, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("x-restaurant-id", restaurant_id.to_string());
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

pub async fn json_body(resp: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn error_code(resp: &Response<Body>) -> Option<&str> {
    resp.headers().get("X-Error-Code").and_then(|v| v.to_str().ok())
}
