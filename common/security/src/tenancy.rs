//! Row-level security plumbing. Every tenant-scoped table carries a policy on
//! `current_setting('app.restaurant_id')`, so queries must run inside a transaction
//! that has pinned the restaurant first.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

pub async fn begin_tenant_scope(
    pool: &PgPool,
    restaurant_id: Uuid,
) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("SELECT set_config('app.restaurant_id', $1, true)")
        .bind(restaurant_id.to_string())
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}
