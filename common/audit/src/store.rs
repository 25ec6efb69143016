use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{AuditError, AuditResult, PaymentAuditEntry};

/// Append-only persistence for the payment trail. Entries cannot be changed or
/// removed through this trait.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: &PaymentAuditEntry) -> AuditResult<()>;

    /// Entries for an order, oldest first.
    async fn list_for_order(&self, restaurant_id: Uuid, order_id: Uuid) -> AuditResult<Vec<PaymentAuditEntry>>;

    async fn list_for_key(&self, restaurant_id: Uuid, idempotency_key: &str) -> AuditResult<Vec<PaymentAuditEntry>>;
}

#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    entries: RwLock<Vec<PaymentAuditEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<PaymentAuditEntry> {
        self.entries.read().map(|e| e.clone()).unwrap_or_default()
    }

    fn filtered(&self, keep: impl Fn(&PaymentAuditEntry) -> bool) -> AuditResult<Vec<PaymentAuditEntry>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.iter().filter(|e| keep(e)).cloned().collect())
    }
}

fn poisoned() -> AuditError {
    AuditError::Unavailable("audit lock poisoned".into())
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: &PaymentAuditEntry) -> AuditResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        if entries.iter().any(|e| e.entry_id == entry.entry_id) {
            return Err(AuditError::Duplicate(entry.entry_id));
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn list_for_order(&self, restaurant_id: Uuid, order_id: Uuid) -> AuditResult<Vec<PaymentAuditEntry>> {
        self.filtered(|e| e.restaurant_id == restaurant_id && e.order_id == order_id)
    }

    async fn list_for_key(&self, restaurant_id: Uuid, idempotency_key: &str) -> AuditResult<Vec<PaymentAuditEntry>> {
        self.filtered(|e| e.restaurant_id == restaurant_id && e.idempotency_key == idempotency_key)
    }
}
