use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Completed,
    Authorized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayCharge {
    pub payment_id: String,
    pub status: ChargeStatus,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChargeError {
    #[error("charge declined: {code}")]
    Declined { code: String },
    #[error("gateway unreachable: {0}")]
    Unreachable(String),
}

/// External payment processor. Implementations must treat a repeated
/// idempotency key as the same charge.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, amount_cents: i64, idempotency_key: &str) -> Result<GatewayCharge, ChargeError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChargeRequest {
    amount_cents: i64,
}

#[derive(Deserialize)]
struct DeclineBody {
    code: Option<String>,
}

#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpPaymentGateway {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into(), api_key: api_key.into() }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn charge(&self, amount_cents: i64, idempotency_key: &str) -> Result<GatewayCharge, ChargeError> {
        let resp = self
            .client
            .post(format!("{}/charges", self.base_url))
            .bearer_auth(&self.api_key)
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(&ChargeRequest { amount_cents })
            .send()
            .await
            .map_err(|err| ChargeError::Unreachable(err.to_string()))?;

        let status = resp.status();
        debug!(status = status.as_u16(), idempotency_key, "gateway responded");
        if status.is_success() {
            return resp
                .json::<GatewayCharge>()
                .await
                .map_err(|err| ChargeError::Unreachable(format!("unreadable gateway response: {err}")));
        }
        if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
            let code = resp
                .json::<DeclineBody>()
                .await
                .ok()
                .and_then(|b| b.code)
                .unwrap_or_else(|| "card_declined".to_string());
            return Err(ChargeError::Declined { code });
        }
        Err(ChargeError::Unreachable(format!("gateway returned {status}")))
    }
}
