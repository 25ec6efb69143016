use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::tenancy::begin_tenant_scope;

#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("membership store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for MembershipError {
    fn from(err: sqlx::Error) -> Self {
        MembershipError::Unavailable(err.to_string())
    }
}

/// Source of truth for which persistent users may act on which restaurant.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn exists(&self, user_id: Uuid, restaurant_id: Uuid) -> Result<bool, MembershipError>;
}

#[derive(Debug, Default)]
pub struct InMemoryMembershipStore {
    rows: RwLock<HashSet<(Uuid, Uuid)>>,
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memberships(rows: impl IntoIterator<Item = (Uuid, Uuid)>) -> Self {
        Self { rows: RwLock::new(rows.into_iter().collect()) }
    }

    pub fn grant(&self, user_id: Uuid, restaurant_id: Uuid) -> Result<(), MembershipError> {
        self.rows
            .write()
            .map_err(|_| MembershipError::Unavailable("membership lock poisoned".into()))?
            .insert((user_id, restaurant_id));
        Ok(())
    }
}

#[async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn exists(&self, user_id: Uuid, restaurant_id: Uuid) -> Result<bool, MembershipError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| MembershipError::Unavailable("membership lock poisoned".into()))?;
        Ok(rows.contains(&(user_id, restaurant_id)))
    }
}

#[derive(Clone)]
pub struct PgMembershipStore {
    pool: PgPool,
}

impl PgMembershipStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipStore for PgMembershipStore {
    async fn exists(&self, user_id: Uuid, restaurant_id: Uuid) -> Result<bool, MembershipError> {
        let mut tx = begin_tenant_scope(&self.pool, restaurant_id).await?;
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM restaurant_memberships WHERE user_id = $1 AND restaurant_id = $2)",
        )
        .bind(user_id)
        .bind(restaurant_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(found)
    }
}
