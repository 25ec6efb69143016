use std::sync::Arc;

use common_http_errors::ApiError;
use common_observability::PlatformMetrics;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::model::{Order, OrderStatus};
use crate::store::{OrderStore, OrderStoreError};

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("order not found")]
    NotFound,
    #[error("order is at version {current_version}")]
    VersionConflict { current_version: i64 },
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error(transparent)]
    Store(#[from] OrderStoreError),
}

impl TransitionError {
    pub fn into_api_error(self, trace_id: Option<Uuid>) -> ApiError {
        match self {
            TransitionError::NotFound => ApiError::NotFound { code: "order_not_found", trace_id },
            TransitionError::VersionConflict { current_version } => ApiError::conflict(
                "version_conflict",
                format!("order is at version {current_version}"),
                trace_id,
            ),
            err @ TransitionError::InvalidTransition { .. } => {
                ApiError::conflict("invalid_transition", err.to_string(), trace_id)
            }
            TransitionError::Store(err) => store_error(err, trace_id),
        }
    }
}

#[derive(Debug, Error)]
pub enum CreateOrderError {
    #[error("{0}")]
    InvalidTotals(&'static str),
    #[error(transparent)]
    Store(#[from] OrderStoreError),
}

impl CreateOrderError {
    pub fn into_api_error(self, trace_id: Option<Uuid>) -> ApiError {
        match self {
            CreateOrderError::InvalidTotals(message) => ApiError::BadRequest {
                code: "invalid_order_totals",
                trace_id,
                message: Some(message.into()),
            },
            CreateOrderError::Store(err) => store_error(err, trace_id),
        }
    }
}

pub(crate) fn store_error(err: OrderStoreError, trace_id: Option<Uuid>) -> ApiError {
    match err {
        OrderStoreError::Unavailable(_) => ApiError::ServiceUnavailable { code: "order_store_unavailable", trace_id },
        other => ApiError::internal(other, trace_id),
    }
}

/// Guards every order mutation with the version the caller read.
pub struct OrderConcurrencyControl {
    store: Arc<dyn OrderStore>,
    metrics: Arc<PlatformMetrics>,
}

impl OrderConcurrencyControl {
    pub fn new(store: Arc<dyn OrderStore>, metrics: Arc<PlatformMetrics>) -> Self {
        Self { store, metrics }
    }

    pub async fn create(
        &self,
        restaurant_id: Uuid,
        created_by: &str,
        total_cents: i64,
        tax_cents: i64,
    ) -> Result<Order, CreateOrderError> {
        if total_cents < 0 || tax_cents < 0 {
            return Err(CreateOrderError::InvalidTotals("totals must be non-negative"));
        }
        if tax_cents > total_cents {
            return Err(CreateOrderError::InvalidTotals("tax cannot exceed the order total"));
        }
        let order = Order::new(restaurant_id, created_by, total_cents, tax_cents);
        self.store.insert(&order).await?;
        info!(order_id = %order.order_id, %restaurant_id, created_by, "order created");
        Ok(order)
    }

    pub async fn get(&self, restaurant_id: Uuid, order_id: Uuid) -> Result<Order, TransitionError> {
        self.store
            .get(restaurant_id, order_id)
            .await?
            .ok_or(TransitionError::NotFound)
    }

    /// Moves the order to `next` if the caller's `expected_version` is still current.
    /// Conflicts are returned as-is; the caller re-reads and decides.
    pub async fn transition(
        &self,
        restaurant_id: Uuid,
        order_id: Uuid,
        expected_version: i64,
        next: OrderStatus,
    ) -> Result<Order, TransitionError> {
        let stored = self.get(restaurant_id, order_id).await?;
        if stored.version != expected_version {
            return Err(self.conflict(order_id, expected_version, stored.version));
        }
        if !stored.status.can_transition_to(next) {
            return Err(TransitionError::InvalidTransition { from: stored.status, to: next });
        }

        match self
            .store
            .update_status_if_version(restaurant_id, order_id, expected_version, next)
            .await?
        {
            Some(updated) => {
                info!(%order_id, from = %stored.status, to = %next, version = updated.version, "order transitioned");
                Ok(updated)
            }
            None => {
                // lost the race between read and write
                let current = self.get(restaurant_id, order_id).await?;
                Err(self.conflict(order_id, expected_version, current.version))
            }
        }
    }

    fn conflict(&self, order_id: Uuid, expected_version: i64, current_version: i64) -> TransitionError {
        self.metrics.version_conflict();
        warn!(%order_id, expected_version, current_version, "order version conflict");
        TransitionError::VersionConflict { current_version }
    }
}
