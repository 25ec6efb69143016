#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use auth_service::{AppState, AuthConfig};
use axum::body::Body;
use axum::http::{Request, Response};
use common_auth::{
    ClaimInput, CredentialError, CredentialVerifier, KeySet, Role, TokenCodec, TokenConfig,
    VerifiedCredential,
};
use common_observability::PlatformMetrics;
use common_security::{AccessControl, InMemoryMembershipStore, ScopeRegistry};
use http_body_util::BodyExt;
use uuid::Uuid;

const SECRET: &[u8] = b"auth-service-test-secret-0123456789ab";

/// Accepts exactly the email/password pairs it was seeded with.
#[derive(Default)]
pub struct StaticCredentialVerifier {
    accounts: HashMap<String, (String, VerifiedCredential)>,
}

impl StaticCredentialVerifier {
    pub fn with_account(mut self, email: &str, password: &str, role: Role) -> (Self, Uuid) {
        let user_id = Uuid::new_v4();
        self.accounts.insert(
            email.to_ascii_lowercase(),
            (password.to_string(), VerifiedCredential { user_id, role }),
        );
        (self, user_id)
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentialVerifier {
    async fn verify(&self, email: &str, password: &str) -> Result<Option<VerifiedCredential>, CredentialError> {
        Ok(self
            .accounts
            .get(&email.to_ascii_lowercase())
            .filter(|(expected, _)| expected == password)
            .map(|(_, credential)| credential.clone()))
    }
}

pub struct UnavailableCredentials;

#[async_trait]
impl CredentialVerifier for UnavailableCredentials {
    async fn verify(&self, _email: &str, _password: &str) -> Result<Option<VerifiedCredential>, CredentialError> {
        Err(CredentialError::Unavailable("connection refused".into()))
    }
}

pub struct TestApp {
    pub state: AppState,
    pub memberships: Arc<InMemoryMembershipStore>,
}

impl TestApp {
    pub fn new(credentials: Arc<dyn CredentialVerifier>) -> Self {
        Self::with_config(credentials, AuthConfig::default())
    }

    pub fn with_config(credentials: Arc<dyn CredentialVerifier>, config: AuthConfig) -> Self {
        let codec = Arc::new(TokenCodec::new(
            TokenConfig::new("ordering-auth", "ordering"),
            Arc::new(KeySet::hmac("current", SECRET)),
        ));
        let metrics = Arc::new(PlatformMetrics::new("auth-service").expect("metrics"));
        let memberships = Arc::new(InMemoryMembershipStore::new());
        let access = Arc::new(AccessControl::new(
            codec,
            memberships.clone(),
            Arc::new(ScopeRegistry::default()),
            metrics.clone(),
        ));
        let state = AppState {
            access,
            credentials,
            memberships: memberships.clone(),
            config: Arc::new(config),
            metrics,
        };
        Self { state, memberships }
    }

    pub fn codec(&self) -> &TokenCodec {
        self.state.access.codec()
    }

    /// Persistent token for a fresh member of `restaurant_id`.
    pub fn staff(&self, role: Role, restaurant_id: Uuid) -> String {
        let user_id = Uuid::new_v4();
        self.memberships.grant(user_id, restaurant_id).expect("grant");
        self.codec()
            .issue(
                &ClaimInput::Persistent {
                    credential: VerifiedCredential { user_id, role },
                    restaurant_id: Some(restaurant_id),
                },
                &BTreeSet::new(),
            )
            .expect("issue")
            .token
    }
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json_body(resp: Response<Body>) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn error_code(resp: &Response<Body>) -> Option<&str> {
    resp.headers().get("X-Error-Code").and_then(|v| v.to_str().ok())
}
