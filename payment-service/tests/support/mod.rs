#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common_audit::{AuditActor, AuditError, AuditResult, AuditStore, InMemoryAuditStore, PaymentAuditEntry};
use common_observability::PlatformMetrics;
use payment_service::{ChargeError, ChargeStatus, GatewayCharge, PaymentAttempt, PaymentAuditEngine, PaymentGateway};
use uuid::Uuid;

/// Audit store whose appends start failing after `healthy_appends` successful writes.
pub struct FlakyAuditStore {
    pub inner: InMemoryAuditStore,
    healthy_appends: usize,
    appends: AtomicUsize,
}

impl FlakyAuditStore {
    pub fn failing() -> Self {
        Self::after(0)
    }

    pub fn after(healthy_appends: usize) -> Self {
        Self { inner: InMemoryAuditStore::new(), healthy_appends, appends: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl AuditStore for FlakyAuditStore {
    async fn append(&self, entry: &PaymentAuditEntry) -> AuditResult<()> {
        if self.appends.fetch_add(1, Ordering::SeqCst) >= self.healthy_appends {
            return Err(AuditError::Unavailable("disk full".into()));
        }
        self.inner.append(entry).await
    }

    async fn list_for_order(&self, restaurant_id: Uuid, order_id: Uuid) -> AuditResult<Vec<PaymentAuditEntry>> {
        self.inner.list_for_order(restaurant_id, order_id).await
    }

    async fn list_for_key(&self, restaurant_id: Uuid, idempotency_key: &str) -> AuditResult<Vec<PaymentAuditEntry>> {
        self.inner.list_for_key(restaurant_id, idempotency_key).await
    }
}

/// Gateway that charges once per idempotency key and replays the charge for repeats.
#[derive(Default)]
pub struct KeyTrackingGateway {
    charges: Mutex<HashMap<String, GatewayCharge>>,
    pub calls: AtomicUsize,
}

impl KeyTrackingGateway {
    pub fn distinct_charges(&self) -> usize {
        self.charges.lock().unwrap().len()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn keys(&self) -> Vec<String> {
        self.charges.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl PaymentGateway for KeyTrackingGateway {
    async fn charge(&self, _amount_cents: i64, idempotency_key: &str) -> Result<GatewayCharge, ChargeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut charges = self.charges.lock().unwrap();
        let charge = charges
            .entry(idempotency_key.to_string())
            .or_insert_with(|| GatewayCharge { payment_id: format!("ch_{}", Uuid::new_v4()), status: ChargeStatus::Completed });
        Ok(charge.clone())
    }
}

/// Gateway that always answers with the same failure.
pub struct FailingGateway(pub ChargeError);

#[async_trait]
impl PaymentGateway for FailingGateway {
    async fn charge(&self, _amount_cents: i64, _idempotency_key: &str) -> Result<GatewayCharge, ChargeError> {
        Err(self.0.clone())
    }
}

pub struct SlowGateway(pub Duration);

#[async_trait]
impl PaymentGateway for SlowGateway {
    async fn charge(&self, _amount_cents: i64, _idempotency_key: &str) -> Result<GatewayCharge, ChargeError> {
        tokio::time::sleep(self.0).await;
        Ok(GatewayCharge { payment_id: "ch_late".into(), status: ChargeStatus::Completed })
    }
}

pub fn metrics() -> Arc<PlatformMetrics> {
    Arc::new(PlatformMetrics::new("payment-service").unwrap())
}

pub fn live(audit: Arc<dyn AuditStore>, gateway: Arc<dyn PaymentGateway>) -> PaymentAuditEngine {
    PaymentAuditEngine::new(audit, Some(gateway), Duration::from_millis(200), metrics())
}

pub fn bypass(audit: Arc<dyn AuditStore>) -> PaymentAuditEngine {
    PaymentAuditEngine::new(audit, None, Duration::from_millis(200), metrics())
}

pub fn attempt(restaurant_id: Uuid, order_id: Uuid, amount_cents: i64, key: &str) -> PaymentAttempt {
    PaymentAttempt {
        restaurant_id,
        order_id,
        amount_cents,
        idempotency_key: key.to_string(),
        actor: AuditActor { subject_id: "guest:test".into(), role: "customer".into() },
    }
}
