use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common_audit::{AuditActor, AuditError, AuditResult, AuditStore, PaymentAuditEntry, PaymentAuditStatus};
use common_security::tenancy::begin_tenant_scope;
use sqlx::PgPool;
use uuid::Uuid;

const ENTRY_COLUMNS: &str = "entry_id, order_id, restaurant_id, amount_cents, status, error_code, idempotency_key, \
     payment_id, actor_subject, actor_role, synthetic, created_at";

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    entry_id: Uuid,
    order_id: Uuid,
    restaurant_id: Uuid,
    amount_cents: i64,
    status: String,
    error_code: Option<String>,
    idempotency_key: String,
    payment_id: Option<String>,
    actor_subject: String,
    actor_role: String,
    synthetic: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<EntryRow> for PaymentAuditEntry {
    type Error = AuditError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(PaymentAuditEntry {
            entry_id: row.entry_id,
            order_id: row.order_id,
            restaurant_id: row.restaurant_id,
            amount_cents: row.amount_cents,
            status: row.status.parse::<PaymentAuditStatus>()?,
            error_code: row.error_code,
            idempotency_key: row.idempotency_key,
            payment_id: row.payment_id,
            actor: AuditActor { subject_id: row.actor_subject, role: row.actor_role },
            synthetic: row.synthetic,
            created_at: row.created_at,
        })
    }
}

fn unavailable(err: sqlx::Error) -> AuditError {
    AuditError::Unavailable(err.to_string())
}

/// `payment_audit_entries` is insert-only; a trigger rejects UPDATE and DELETE.
#[derive(Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_where(&self, restaurant_id: Uuid, clause: &str, bind: ListBind<'_>) -> AuditResult<Vec<PaymentAuditEntry>> {
        let mut tx = begin_tenant_scope(&self.pool, restaurant_id).await.map_err(unavailable)?;
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM payment_audit_entries WHERE restaurant_id = $1 AND {clause} ORDER BY seq"
        );
        let query = sqlx::query_as::<_, EntryRow>(&sql).bind(restaurant_id);
        let query = match bind {
            ListBind::Order(order_id) => query.bind(order_id),
            ListBind::Key(key) => query.bind(key),
        };
        let rows = query.fetch_all(&mut *tx).await.map_err(unavailable)?;
        tx.commit().await.map_err(unavailable)?;
        rows.into_iter().map(PaymentAuditEntry::try_from).collect()
    }
}

enum ListBind<'a> {
    Order(Uuid),
    Key(&'a str),
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append(&self, entry: &PaymentAuditEntry) -> AuditResult<()> {
        let mut tx = begin_tenant_scope(&self.pool, entry.restaurant_id).await.map_err(unavailable)?;
        sqlx::query(
            r#"INSERT INTO payment_audit_entries
                 (entry_id, order_id, restaurant_id, amount_cents, status, error_code, idempotency_key,
                  payment_id, actor_subject, actor_role, synthetic, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
        )
        .bind(entry.entry_id)
        .bind(entry.order_id)
        .bind(entry.restaurant_id)
        .bind(entry.amount_cents)
        .bind(entry.status.as_str())
        .bind(entry.error_code.as_deref())
        .bind(&entry.idempotency_key)
        .bind(entry.payment_id.as_deref())
        .bind(&entry.actor.subject_id)
        .bind(&entry.actor.role)
        .bind(entry.synthetic)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            if matches!(&err, sqlx::Error::Database(db) if db.is_unique_violation()) {
                return AuditError::Duplicate(entry.entry_id);
            }
            unavailable(err)
        })?;
        tx.commit().await.map_err(unavailable)?;
        Ok(())
    }

    async fn list_for_order(&self, restaurant_id: Uuid, order_id: Uuid) -> AuditResult<Vec<PaymentAuditEntry>> {
        self.list_where(restaurant_id, "order_id = $2", ListBind::Order(order_id)).await
    }

    async fn list_for_key(&self, restaurant_id: Uuid, idempotency_key: &str) -> AuditResult<Vec<PaymentAuditEntry>> {
        self.list_where(restaurant_id, "idempotency_key = $2", ListBind::Key(idempotency_key)).await
    }
}
