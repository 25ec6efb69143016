use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common_security::tenancy::begin_tenant_scope;
use sqlx::PgPool;
use uuid::Uuid;

use crate::model::{Order, OrderStatus};
use crate::store::{OrderStore, OrderStoreError};

const ORDER_COLUMNS: &str =
    "order_id, restaurant_id, status, version, total_cents, tax_cents, created_by, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    order_id: Uuid,
    restaurant_id: Uuid,
    status: String,
    version: i64,
    total_cents: i64,
    tax_cents: i64,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = OrderStoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<OrderStatus>().map_err(OrderStoreError::Corrupt)?;
        Ok(Order {
            order_id: row.order_id,
            restaurant_id: row.restaurant_id,
            status,
            version: row.version,
            total_cents: row.total_cents,
            tax_cents: row.tax_cents,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Orders in Postgres under row-level security on `restaurant_id`.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), OrderStoreError> {
        let mut tx = begin_tenant_scope(&self.pool, order.restaurant_id).await?;
        sqlx::query(
            r#"INSERT INTO orders (order_id, restaurant_id, status, version, total_cents, tax_cents, created_by, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(order.order_id)
        .bind(order.restaurant_id)
        .bind(order.status.as_str())
        .bind(order.version)
        .bind(order.total_cents)
        .bind(order.tax_cents)
        .bind(&order.created_by)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            if matches!(&err, sqlx::Error::Database(db) if db.is_unique_violation()) {
                return OrderStoreError::Duplicate(order.order_id);
            }
            OrderStoreError::from(err)
        })?;
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, restaurant_id: Uuid, order_id: Uuid) -> Result<Option<Order>, OrderStoreError> {
        let mut tx = begin_tenant_scope(&self.pool, restaurant_id).await?;
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE restaurant_id = $1 AND order_id = $2"
        ))
        .bind(restaurant_id)
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        row.map(Order::try_from).transpose()
    }

    async fn update_status_if_version(
        &self,
        restaurant_id: Uuid,
        order_id: Uuid,
        expected_version: i64,
        status: OrderStatus,
    ) -> Result<Option<Order>, OrderStoreError> {
        let mut tx = begin_tenant_scope(&self.pool, restaurant_id).await?;
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"UPDATE orders SET status = $4, version = version + 1, updated_at = now()
               WHERE restaurant_id = $1 AND order_id = $2 AND version = $3
               RETURNING {ORDER_COLUMNS}"#
        ))
        .bind(restaurant_id)
        .bind(order_id)
        .bind(expected_version)
        .bind(status.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        row.map(Order::try_from).transpose()
    }
}
