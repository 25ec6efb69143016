use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use common_http_errors::{ApiError, ApiResult};
use common_security::{scope, SecurityContext};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::model::{Order, OrderStatus};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub total_cents: i64,
    #[serde(default)]
    pub tax_cents: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub expected_version: i64,
    pub status: OrderStatus,
}

pub async fn create_order(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Json(new_order): Json<NewOrder>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    ctx.require(&[scope::ORDERS_CREATE])?;
    let order = state
        .orders
        .create(ctx.restaurant_id, &ctx.subject_id(), new_order.total_cents, new_order.tax_cents)
        .await
        .map_err(|err| err.into_api_error(Some(ctx.trace_id)))?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Staff with `orders:read` see any order in the restaurant; holders of
/// `orders:read_own` only see orders they created.
pub async fn get_order(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<Order>> {
    let own_only = !ctx.allows(&[scope::ORDERS_READ]);
    if own_only {
        ctx.require(&[scope::ORDERS_READ_OWN])?;
    }
    let order = state
        .orders
        .get(ctx.restaurant_id, order_id)
        .await
        .map_err(|err| err.into_api_error(Some(ctx.trace_id)))?;
    if own_only && order.created_by != ctx.subject_id() {
        return Err(ApiError::NotFound { code: "order_not_found", trace_id: Some(ctx.trace_id) });
    }
    Ok(Json(order))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Path(order_id): Path<Uuid>,
    Json(change): Json<StatusChange>,
) -> ApiResult<Json<Order>> {
    ctx.require(&[scope::ORDERS_UPDATE_STATUS])?;
    let order = state
        .orders
        .transition(ctx.restaurant_id, order_id, change.expected_version, change.status)
        .await
        .map_err(|err| err.into_api_error(Some(ctx.trace_id)))?;
    Ok(Json(order))
}
