use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Order, OrderStatus};

#[derive(Debug, Error)]
pub enum OrderStoreError {
    #[error("order store unavailable: {0}")]
    Unavailable(String),
    #[error("order {0} already exists")]
    Duplicate(Uuid),
    #[error("order row corrupt: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(err: sqlx::Error) -> Self {
        OrderStoreError::Unavailable(err.to_string())
    }
}

/// Persistence for orders. Every call is scoped to one restaurant.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<(), OrderStoreError>;

    async fn get(&self, restaurant_id: Uuid, order_id: Uuid) -> Result<Option<Order>, OrderStoreError>;

    /// Sets `status` and bumps the version by one, but only while the stored version
    /// still equals `expected_version`. `None` means no row matched.
    async fn update_status_if_version(
        &self,
        restaurant_id: Uuid,
        order_id: Uuid,
        expected_version: i64,
        status: OrderStatus,
    ) -> Result<Option<Order>, OrderStoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<(Uuid, Uuid), Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> OrderStoreError {
    OrderStoreError::Unavailable("order lock poisoned".into())
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), OrderStoreError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        let key = (order.restaurant_id, order.order_id);
        if orders.contains_key(&key) {
            return Err(OrderStoreError::Duplicate(order.order_id));
        }
        orders.insert(key, order.clone());
        Ok(())
    }

    async fn get(&self, restaurant_id: Uuid, order_id: Uuid) -> Result<Option<Order>, OrderStoreError> {
        let orders = self.orders.read().map_err(|_| poisoned())?;
        Ok(orders.get(&(restaurant_id, order_id)).cloned())
    }

    async fn update_status_if_version(
        &self,
        restaurant_id: Uuid,
        order_id: Uuid,
        expected_version: i64,
        status: OrderStatus,
    ) -> Result<Option<Order>, OrderStoreError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        match orders.get_mut(&(restaurant_id, order_id)) {
            Some(order) if order.version == expected_version => {
                order.status = status;
                order.version += 1;
                order.updated_at = Utc::now();
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }
}
