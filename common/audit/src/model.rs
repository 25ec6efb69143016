use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Who started a payment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditActor {
    pub subject_id: String,
    pub role: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentAuditStatus {
    Initiated,
    Processing,
    Success,
    Failed,
    Refunded,
}

impl PaymentAuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentAuditStatus::Initiated => "initiated",
            PaymentAuditStatus::Processing => "processing",
            PaymentAuditStatus::Success => "success",
            PaymentAuditStatus::Failed => "failed",
            PaymentAuditStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentAuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentAuditStatus {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(Self::Initiated),
            "processing" => Ok(Self::Processing),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(AuditError::Corrupt(format!("unknown audit status '{other}'"))),
        }
    }
}

/// One immutable line of the payment trail. Corrections are new entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAuditEntry {
    pub entry_id: Uuid,
    pub order_id: Uuid,
    pub restaurant_id: Uuid,
    pub amount_cents: i64,
    pub status: PaymentAuditStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub idempotency_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub actor: AuditActor,
    pub synthetic: bool,
    pub created_at: DateTime<Utc>,
}

impl PaymentAuditEntry {
    pub fn new(
        restaurant_id: Uuid,
        order_id: Uuid,
        amount_cents: i64,
        idempotency_key: impl Into<String>,
        actor: AuditActor,
        status: PaymentAuditStatus,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            order_id,
            restaurant_id,
            amount_cents,
            status,
            error_code: None,
            idempotency_key: idempotency_key.into(),
            payment_id: None,
            actor,
            synthetic: false,
            created_at: Utc::now(),
        }
    }

    /// Same attempt, next step: fresh entry id and timestamp, payload carried over.
    pub fn follow_up(&self, status: PaymentAuditStatus) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            status,
            error_code: None,
            payment_id: None,
            created_at: Utc::now(),
            ..self.clone()
        }
    }

    pub fn with_payment_id(mut self, payment_id: impl Into<String>) -> Self {
        self.payment_id = Some(payment_id.into());
        self
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn synthetic(mut self, synthetic: bool) -> Self {
        self.synthetic = synthetic;
        self
    }
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
    #[error("audit entry {0} already recorded")]
    Duplicate(Uuid),
    #[error("audit row corrupt: {0}")]
    Corrupt(String),
}

pub type AuditResult<T> = Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> AuditActor {
        AuditActor { subject_id: "guest:1".into(), role: "customer".into() }
    }

    #[test]
    fn follow_up_keeps_attempt_and_clears_outcome() {
        let initiated = PaymentAuditEntry::new(Uuid::new_v4(), Uuid::new_v4(), 1080, "k1", actor(), PaymentAuditStatus::Initiated)
            .with_error_code("stale");
        let success = initiated.follow_up(PaymentAuditStatus::Success).with_payment_id("pay_1");

        assert_ne!(initiated.entry_id, success.entry_id);
        assert_eq!(success.order_id, initiated.order_id);
        assert_eq!(success.amount_cents, 1080);
        assert_eq!(success.idempotency_key, "k1");
        assert_eq!(success.error_code, None);
        assert_eq!(success.payment_id.as_deref(), Some("pay_1"));
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            PaymentAuditStatus::Initiated,
            PaymentAuditStatus::Processing,
            PaymentAuditStatus::Success,
            PaymentAuditStatus::Failed,
            PaymentAuditStatus::Refunded,
        ] {
            assert_eq!(status.as_str().parse::<PaymentAuditStatus>().unwrap(), status);
        }
        assert!("settled".parse::<PaymentAuditStatus>().is_err());
    }
}
