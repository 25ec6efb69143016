use std::sync::Arc;
use std::time::Duration;

use common_audit::{AuditActor, AuditError, AuditStore, PaymentAuditEntry, PaymentAuditStatus};
use common_http_errors::ApiError;
use common_observability::PlatformMetrics;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::gateway::{ChargeError, ChargeStatus, GatewayCharge, PaymentGateway};

pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;
pub const BYPASS_PAYMENT_PREFIX: &str = "bypass_";

#[derive(Debug, Clone)]
pub struct PaymentAttempt {
    pub restaurant_id: Uuid,
    pub order_id: Uuid,
    pub amount_cents: i64,
    pub idempotency_key: String,
    pub actor: AuditActor,
}

impl PaymentAttempt {
    fn validate(&self) -> Result<(), PaymentError> {
        if self.amount_cents <= 0 {
            return Err(PaymentError::InvalidAmount);
        }
        let key = self.idempotency_key.trim();
        if key.is_empty() || self.idempotency_key.chars().count() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(PaymentError::InvalidIdempotencyKey);
        }
        Ok(())
    }

    /// Key presented to the gateway. Bound to the restaurant, order and amount so a
    /// caller key can only ever replay its own charge; the caller's key stays in the audit trail.
    pub fn gateway_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.restaurant_id.as_bytes());
        hasher.update(self.order_id.as_bytes());
        hasher.update(self.amount_cents.to_be_bytes());
        hasher.update(self.idempotency_key.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub payment_id: String,
    pub order_id: Uuid,
    pub amount_cents: i64,
    pub status: ChargeStatus,
    pub synthetic: bool,
    pub idempotency_key: String,
    /// `None` when the success entry could not be written; the initiated entry stands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_entry_id: Option<Uuid>,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("amount must be greater than zero")]
    InvalidAmount,
    #[error("idempotency key must be 1 to 255 characters")]
    InvalidIdempotencyKey,
    #[error("idempotency key already used for a different order or amount")]
    IdempotencyKeyMismatch,
    #[error("payment audit unavailable: {0}")]
    AuditUnavailable(#[source] AuditError),
    #[error("payment declined: {code}")]
    GatewayDeclined { code: String },
    #[error("payment gateway unreachable: {0}")]
    GatewayUnreachable(String),
    #[error("payment outcome unknown")]
    OutcomeUnknown,
}

impl PaymentError {
    pub fn into_api_error(self, trace_id: Option<Uuid>) -> ApiError {
        match self {
            PaymentError::InvalidAmount => ApiError::BadRequest {
                code: "invalid_amount",
                trace_id,
                message: Some("amountCents must be greater than zero".into()),
            },
            PaymentError::InvalidIdempotencyKey => ApiError::BadRequest {
                code: "invalid_idempotency_key",
                trace_id,
                message: Some("idempotencyKey must be 1 to 255 characters".into()),
            },
            PaymentError::IdempotencyKeyMismatch => ApiError::conflict(
                "idempotency_key_mismatch",
                "idempotency key already used for a different order or amount",
                trace_id,
            ),
            PaymentError::AuditUnavailable(_) => ApiError::ServiceUnavailable { code: "audit_unavailable", trace_id },
            PaymentError::GatewayDeclined { code } => ApiError::PaymentRequired {
                code: "payment_declined",
                trace_id,
                message: Some(code),
            },
            PaymentError::GatewayUnreachable(_) => ApiError::BadGateway { code: "gateway_unreachable", trace_id },
            PaymentError::OutcomeUnknown => ApiError::GatewayTimeout { code: "payment_outcome_unknown", trace_id },
        }
    }
}

/// Wraps every gateway call in the audit trail. An attempt that cannot be logged
/// as `initiated` never reaches the gateway.
pub struct PaymentAuditEngine {
    audit: Arc<dyn AuditStore>,
    gateway: Option<Arc<dyn PaymentGateway>>,
    timeout: Duration,
    metrics: Arc<PlatformMetrics>,
}

impl PaymentAuditEngine {
    /// `gateway: None` runs in bypass mode.
    pub fn new(
        audit: Arc<dyn AuditStore>,
        gateway: Option<Arc<dyn PaymentGateway>>,
        timeout: Duration,
        metrics: Arc<PlatformMetrics>,
    ) -> Self {
        Self { audit, gateway, timeout, metrics }
    }

    pub fn is_bypass(&self) -> bool {
        self.gateway.is_none()
    }

    pub async fn attempt_payment(&self, attempt: PaymentAttempt) -> Result<PaymentReceipt, PaymentError> {
        attempt.validate()?;

        let prior = self
            .audit
            .list_for_key(attempt.restaurant_id, &attempt.idempotency_key)
            .await
            .map_err(|err| self.audit_unavailable("precheck", &attempt, err))?;
        if prior
            .iter()
            .any(|e| e.order_id != attempt.order_id || e.amount_cents != attempt.amount_cents)
        {
            self.metrics.payment_attempt("idempotency_mismatch");
            warn!(order_id = %attempt.order_id, idempotency_key = %attempt.idempotency_key, "idempotency key reused");
            return Err(PaymentError::IdempotencyKeyMismatch);
        }

        let synthetic = self.is_bypass();
        let initiated = PaymentAuditEntry::new(
            attempt.restaurant_id,
            attempt.order_id,
            attempt.amount_cents,
            attempt.idempotency_key.clone(),
            attempt.actor.clone(),
            PaymentAuditStatus::Initiated,
        )
        .synthetic(synthetic);
        self.audit
            .append(&initiated)
            .await
            .map_err(|err| self.audit_unavailable("initiated", &attempt, err))?;
        info!(
            order_id = %attempt.order_id,
            idempotency_key = %attempt.idempotency_key,
            entry_id = %initiated.entry_id,
            synthetic,
            "payment initiated"
        );

        let outcome = match &self.gateway {
            None => Ok(GatewayCharge {
                payment_id: prior_synthetic_payment(&prior)
                    .unwrap_or_else(|| format!("{BYPASS_PAYMENT_PREFIX}{}", Uuid::new_v4())),
                status: ChargeStatus::Completed,
            }),
            Some(gateway) => {
                let gateway_key = attempt.gateway_key();
                match timeout(self.timeout, gateway.charge(attempt.amount_cents, &gateway_key)).await {
                    Ok(result) => result,
                    Err(_) => {
                        self.record_outcome(initiated.follow_up(PaymentAuditStatus::Processing)).await;
                        self.metrics.payment_attempt("outcome_unknown");
                        warn!(order_id = %attempt.order_id, idempotency_key = %attempt.idempotency_key, "gateway timed out");
                        return Err(PaymentError::OutcomeUnknown);
                    }
                }
            }
        };

        match outcome {
            Ok(charge) => {
                let entry_id = self
                    .record_outcome(initiated.follow_up(PaymentAuditStatus::Success).with_payment_id(&charge.payment_id))
                    .await;
                self.metrics.payment_attempt(if synthetic { "bypass" } else { "success" });
                Ok(PaymentReceipt {
                    payment_id: charge.payment_id,
                    order_id: attempt.order_id,
                    amount_cents: attempt.amount_cents,
                    status: charge.status,
                    synthetic,
                    idempotency_key: attempt.idempotency_key,
                    audit_entry_id: entry_id,
                })
            }
            Err(ChargeError::Declined { code }) => {
                self.record_outcome(initiated.follow_up(PaymentAuditStatus::Failed).with_error_code(&code))
                    .await;
                self.metrics.payment_attempt("declined");
                Err(PaymentError::GatewayDeclined { code })
            }
            Err(ChargeError::Unreachable(reason)) => {
                self.record_outcome(initiated.follow_up(PaymentAuditStatus::Failed).with_error_code("gateway_unreachable"))
                    .await;
                self.metrics.payment_attempt("unreachable");
                warn!(order_id = %attempt.order_id, %reason, "gateway unreachable");
                Err(PaymentError::GatewayUnreachable(reason))
            }
        }
    }

    /// Entries for an order, oldest first.
    pub async fn audit_trail(&self, restaurant_id: Uuid, order_id: Uuid) -> Result<Vec<PaymentAuditEntry>, PaymentError> {
        self.audit
            .list_for_order(restaurant_id, order_id)
            .await
            .map_err(PaymentError::AuditUnavailable)
    }

    /// A failed write is logged and counted; the caller still gets the gateway's
    /// outcome and the initiated entry stays as the reconciliation anchor.
    async fn record_outcome(&self, entry: PaymentAuditEntry) -> Option<Uuid> {
        match self.audit.append(&entry).await {
            Ok(()) => {
                info!(
                    order_id = %entry.order_id,
                    idempotency_key = %entry.idempotency_key,
                    entry_id = %entry.entry_id,
                    status = entry.status.as_str(),
                    "payment outcome recorded"
                );
                Some(entry.entry_id)
            }
            Err(err) => {
                self.metrics.audit_write_failure("outcome");
                error!(
                    order_id = %entry.order_id,
                    idempotency_key = %entry.idempotency_key,
                    status = entry.status.as_str(),
                    error = %err,
                    "payment outcome entry not written"
                );
                None
            }
        }
    }

    fn audit_unavailable(&self, stage: &'static str, attempt: &PaymentAttempt, err: AuditError) -> PaymentError {
        self.metrics.audit_write_failure(stage);
        self.metrics.payment_attempt("audit_unavailable");
        error!(
            order_id = %attempt.order_id,
            idempotency_key = %attempt.idempotency_key,
            stage,
            error = %err,
            "payment audit unavailable; gateway not called"
        );
        PaymentError::AuditUnavailable(err)
    }
}

/// Bypass retries replay the synthetic charge already recorded for the key.
fn prior_synthetic_payment(prior: &[PaymentAuditEntry]) -> Option<String> {
    prior
        .iter()
        .find(|e| e.synthetic && e.status == PaymentAuditStatus::Success)
        .and_then(|e| e.payment_id.clone())
}
