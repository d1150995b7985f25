use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AuthUser, Permission};
use crate::ledger::{OrderBookSnapshot, PlaceOrder, PlacedOrder};
use crate::models::{Order, OrderSide, Transaction};
use crate::AppState;

use super::{ok, require, require_owner, ApiResult, Paging};

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub property_token_id: Uuid,
    pub side: OrderSide,
    pub price: Decimal,
    pub token_amount: i64,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookQuery {
    pub property_token_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub order: Order,
    pub fills: Vec<Transaction>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /order-book: place an order and match it immediately
pub async fn place(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> ApiResult<PlacedOrder> {
    require(&user, Permission::Trade)?;
    let Json(body) = body?;

    let placed = state
        .ledger
        .orders
        .place_order(PlaceOrder {
            user_id: user.user_id,
            property_token_id: body.property_token_id,
            side: body.side,
            price: body.price,
            token_amount: body.token_amount,
            expires_at: body.expires_at,
        })
        .await?;

    ok(placed)
}

/// PATCH /order-book/:id: cancel a live order
pub async fn cancel(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Order> {
    require(&user, Permission::Trade)?;

    let order = state.ledger.orders.get(id).await?;
    require_owner(&user, order.user_id, "order")?;

    let cancelled = state.ledger.orders.cancel_order(id).await?;
    ok(cancelled)
}

/// GET /order-book?propertyTokenId=: live book with price levels
pub async fn book(
    State(state): State<AppState>,
    query: Result<Query<BookQuery>, QueryRejection>,
) -> ApiResult<OrderBookSnapshot> {
    let Query(query) = query?;
    let snapshot = state.ledger.orders.snapshot(query.property_token_id).await?;
    ok(snapshot)
}

/// GET /order-book/me: caller's orders, newest first
pub async fn mine(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    paging: Result<Query<Paging>, QueryRejection>,
) -> ApiResult<Vec<Order>> {
    let Query(paging) = paging?;
    let orders = state
        .ledger
        .orders
        .list_for_user(user.user_id, paging.limit())
        .await?;
    ok(orders)
}

/// GET /order-book/:id: one order with its fills
pub async fn detail(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderDetail> {
    let order = state.ledger.orders.get(id).await?;
    require_owner(&user, order.user_id, "order")?;

    let fills = state.ledger.orders.fills_for_order(id).await?;
    ok(OrderDetail { order, fills })
}
