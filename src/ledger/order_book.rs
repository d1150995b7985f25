use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{Connection, PgConnection, PgPool};
use uuid::Uuid;

use crate::db::{investment_repo, order_repo, token_repo, transaction_repo};
use crate::models::{Order, OrderSide, OrderStatus, Transaction};

use super::investments::{consume_holdings_in, record_in};
use super::matching::{self, PriceLevel};
use super::retry::with_retry;
use super::supply::lock_token;
use super::{
    begin_bounded, ensure_notional_fits, ensure_positive_amount, ensure_valid_price, LedgerError,
    LedgerSettings,
};

/// A new order request.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub user_id: Uuid,
    pub property_token_id: Uuid,
    pub side: OrderSide,
    pub price: Decimal,
    pub token_amount: i64,
    pub expires_at: Option<DateTime<Utc>>,
}

/// The stored order after matching, with the fills it produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order: Order,
    pub fills: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookSnapshot {
    pub property_token_id: Uuid,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub orders: Vec<Order>,
}

struct Settlement {
    incoming: Order,
    transaction: Transaction,
}

/// Open buy/sell interest per token and its settlement.
#[derive(Clone)]
pub struct OrderBook {
    pool: PgPool,
    settings: LedgerSettings,
}

impl OrderBook {
    pub fn new(pool: PgPool, settings: LedgerSettings) -> Self {
        Self { pool, settings }
    }

    /// Validate, store and immediately match an order against the book.
    pub async fn place_order(&self, request: PlaceOrder) -> Result<PlacedOrder, LedgerError> {
        ensure_valid_price(request.price)?;
        ensure_positive_amount(request.token_amount)?;
        ensure_notional_fits(request.token_amount, request.price)?;
        if request.expires_at.is_some_and(|at| at <= Utc::now()) {
            return Err(LedgerError::Validation("expiresAt must be in the future".into()));
        }

        let started = Instant::now();
        let placed =
            with_retry(self.settings.retry, "place_order", || self.place_once(&request)).await?;
        histogram!("order_match_seconds").record(started.elapsed().as_secs_f64());
        counter!("orders_placed_total", "side" => request.side.as_str()).increment(1);

        tracing::info!(
            order_id = %placed.order.id,
            user_id = %request.user_id,
            token_id = %request.property_token_id,
            side = %request.side,
            price = %request.price,
            token_amount = request.token_amount,
            filled = placed.order.filled_amount,
            fills = placed.fills.len(),
            "Order placed"
        );

        Ok(placed)
    }

    /// Cancel a live order. Terminal orders are left untouched.
    pub async fn cancel_order(&self, order_id: Uuid) -> Result<Order, LedgerError> {
        let existing = order_repo::get_order(&self.pool, order_id)
            .await?
            .ok_or(LedgerError::NotFound("order"))?;

        let cancelled = with_retry(self.settings.retry, "cancel_order", || {
            self.cancel_once(existing.property_token_id, order_id)
        })
        .await?;

        counter!("orders_cancelled_total").increment(1);
        tracing::info!(
            order_id = %order_id,
            filled = cancelled.filled_amount,
            released = cancelled.remaining(),
            "Order cancelled"
        );

        Ok(cancelled)
    }

    /// Persist expiry for every live order past `expires_at`.
    pub async fn expire_orders(&self, now: DateTime<Utc>) -> Result<u64, LedgerError> {
        let expired = with_retry(self.settings.retry, "expire_orders", || async {
            Ok::<_, LedgerError>(order_repo::expire_due(&self.pool, now).await?)
        })
        .await?;

        if expired > 0 {
            counter!("orders_expired_total").increment(expired);
        }
        Ok(expired)
    }

    pub async fn get(&self, order_id: Uuid) -> Result<Order, LedgerError> {
        let mut order = order_repo::get_order(&self.pool, order_id)
            .await?
            .ok_or(LedgerError::NotFound("order"))?;
        order.status = order.effective_status(Utc::now());
        Ok(order)
    }

    /// Live orders of a token plus aggregated price levels.
    pub async fn snapshot(&self, token_id: Uuid) -> Result<OrderBookSnapshot, LedgerError> {
        token_repo::get_token(&self.pool, token_id)
            .await?
            .ok_or(LedgerError::NotFound("property token"))?;

        let now = Utc::now();
        let orders = order_repo::live_orders_for_token(&self.pool, token_id, now).await?;
        let (bids, asks) = matching::aggregate_levels(&orders, now);

        Ok(OrderBookSnapshot {
            property_token_id: token_id,
            bids,
            asks,
            orders,
        })
    }

    /// A user's orders, most recent first, with expiry applied.
    pub async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<Order>, LedgerError> {
        let now = Utc::now();
        let mut orders = order_repo::list_by_user(&self.pool, user_id, limit).await?;
        for order in &mut orders {
            order.status = order.effective_status(now);
        }
        Ok(orders)
    }

    pub async fn transactions(&self, token_id: Uuid, limit: i64) -> Result<Vec<Transaction>, LedgerError> {
        Ok(transaction_repo::list_by_token(&self.pool, token_id, limit).await?)
    }

    pub async fn fills_for_order(&self, order_id: Uuid) -> Result<Vec<Transaction>, LedgerError> {
        Ok(transaction_repo::list_by_order(&self.pool, order_id).await?)
    }

    async fn place_once(&self, request: &PlaceOrder) -> Result<PlacedOrder, LedgerError> {
        let now = Utc::now();
        let mut tx = begin_bounded(&self.pool, self.settings.lock_timeout).await?;
        let token = lock_token(&mut tx, request.property_token_id).await?;

        let expired = order_repo::expire_due_for_token(&mut *tx, token.id, now).await?;
        if expired > 0 {
            counter!("orders_expired_total").increment(expired);
            tracing::debug!(token_id = %token.id, expired, "Expired stale orders before matching");
        }

        if request.side == OrderSide::Sell {
            let held = investment_repo::held_amount(&mut *tx, request.user_id, token.id).await?;
            let locked =
                order_repo::locked_sell_amount(&mut *tx, request.user_id, token.id, now).await?;
            let free = (held - locked).max(0);
            if request.token_amount > free {
                return Err(LedgerError::InsufficientHoldings {
                    requested: request.token_amount,
                    available: free,
                });
            }
        }

        let order = order_repo::insert_order(
            &mut *tx,
            request.user_id,
            token.id,
            request.side,
            request.price,
            request.token_amount,
            request.expires_at,
        )
        .await?;

        let (order, fills) = match_order(&mut tx, order, now).await?;
        tx.commit().await?;

        Ok(PlacedOrder { order, fills })
    }

    async fn cancel_once(&self, token_id: Uuid, order_id: Uuid) -> Result<Order, LedgerError> {
        let now = Utc::now();
        let mut tx = begin_bounded(&self.pool, self.settings.lock_timeout).await?;
        lock_token(&mut tx, token_id).await?;

        let order = order_repo::get_order_for_update(&mut tx, order_id)
            .await?
            .ok_or(LedgerError::NotFound("order"))?;

        if order.effective_status(now) == OrderStatus::Expired && order.status.is_live() {
            order_repo::close_order(&mut *tx, order_id, OrderStatus::Expired).await?;
            tx.commit().await?;
            counter!("orders_expired_total").increment(1);
            return Err(LedgerError::InvalidState("order has expired".into()));
        }

        if !order.status.is_live() {
            return Err(LedgerError::InvalidState(format!("order is {}", order.status)));
        }

        let cancelled = order_repo::close_order(&mut *tx, order_id, OrderStatus::Cancelled)
            .await?
            .ok_or_else(|| LedgerError::InvalidState("order is no longer live".into()))?;
        tx.commit().await?;

        Ok(cancelled)
    }
}

/// Walk the opposite side in priority order, settling each crossing order
/// until `incoming` is filled. A candidate whose settlement breaks a ledger
/// rule is rolled back to its savepoint and skipped.
async fn match_order(
    conn: &mut PgConnection,
    incoming: Order,
    now: DateTime<Utc>,
) -> Result<(Order, Vec<Transaction>), LedgerError> {
    let candidates = order_repo::matching_candidates(
        &mut *conn,
        incoming.property_token_id,
        incoming.side,
        incoming.price,
        incoming.user_id,
        now,
    )
    .await?;
    let candidates = matching::prioritize(&incoming, candidates, now);

    let mut incoming = incoming;
    let mut fills = Vec::new();

    for resting in candidates {
        if incoming.remaining() == 0 {
            break;
        }
        let quantity = matching::fill_quantity(&incoming, &resting);
        if quantity == 0 {
            continue;
        }

        match settle_fill(conn, &incoming, &resting, quantity).await {
            Ok(settlement) => {
                counter!("order_fills_total").increment(1);
                incoming = settlement.incoming;
                fills.push(settlement.transaction);
            }
            Err(e) if e.is_rule_violation() => {
                counter!("order_fills_skipped_total").increment(1);
                tracing::warn!(
                    incoming_id = %incoming.id,
                    resting_id = %resting.id,
                    quantity,
                    error = %e,
                    "Fill rolled back, trying next candidate"
                );
            }
            Err(e) => return Err(e),
        }
    }

    Ok((incoming, fills))
}

/// Apply one fill inside a savepoint: both fill counters, the seller's
/// holdings, the buyer's investment and the audit row.
async fn settle_fill(
    conn: &mut PgConnection,
    incoming: &Order,
    resting: &Order,
    quantity: i64,
) -> Result<Settlement, LedgerError> {
    let mut savepoint = conn.begin().await?;
    let price = resting.price;

    let incoming_after = apply_fill(&mut savepoint, incoming, quantity).await?;
    let resting_after = apply_fill(&mut savepoint, resting, quantity).await?;
    let (buy, sell) = match incoming.side {
        OrderSide::Buy => (&incoming_after, &resting_after),
        OrderSide::Sell => (&resting_after, &incoming_after),
    };

    consume_holdings_in(&mut savepoint, sell.user_id, sell.property_token_id, quantity).await?;
    record_in(&mut savepoint, buy.property_token_id, buy.user_id, quantity, price, Utc::now()).await?;
    let transaction = transaction_repo::insert_fill(&mut *savepoint, buy, sell, quantity, price).await?;

    savepoint.commit().await?;

    tracing::debug!(
        transaction_id = %transaction.id,
        buy_order_id = %buy.id,
        sell_order_id = %sell.id,
        quantity,
        price = %price,
        "Fill settled"
    );

    Ok(Settlement {
        incoming: incoming_after,
        transaction,
    })
}

async fn apply_fill(conn: &mut PgConnection, order: &Order, quantity: i64) -> Result<Order, LedgerError> {
    let status = matching::status_after_fill(order.token_amount, order.filled_amount + quantity);
    order_repo::apply_fill(conn, order.id, order.filled_amount, quantity, status)
        .await?
        .ok_or_else(|| LedgerError::InvalidState(format!("order {} changed during matching", order.id)))
}
