use axum::extract::{Path, State};
use axum::Json;
use common_audit::{AuditActor, PaymentAuditEntry};
use common_http_errors::ApiResult;
use common_security::{scope, SecurityContext};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::engine::{PaymentAttempt, PaymentReceipt};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub order_id: Uuid,
    pub amount_cents: i64,
    pub idempotency_key: String,
}

pub async fn create_payment(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Json(req): Json<PaymentRequest>,
) -> ApiResult<Json<PaymentReceipt>> {
    ctx.require(&[scope::PAYMENTS_CREATE])?;
    let attempt = PaymentAttempt {
        restaurant_id: ctx.restaurant_id,
        order_id: req.order_id,
        amount_cents: req.amount_cents,
        idempotency_key: req.idempotency_key,
        actor: AuditActor {
            subject_id: ctx.subject_id(),
            role: ctx.identity.role().as_str().to_string(),
        },
    };
    let receipt = state
        .engine
        .attempt_payment(attempt)
        .await
        .map_err(|err| err.into_api_error(Some(ctx.trace_id)))?;
    Ok(Json(receipt))
}

pub async fn get_audit_trail(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<Vec<PaymentAuditEntry>>> {
    ctx.require(&[scope::PAYMENTS_READ_AUDIT])?;
    let entries = state
        .engine
        .audit_trail(ctx.restaurant_id, order_id)
        .await
        .map_err(|err| err.into_api_error(Some(ctx.trace_id)))?;
    Ok(Json(entries))
}
