use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::models::{Order, OrderSide, OrderStatus};

/// Insert a new open order.
pub async fn insert_order<'e, E>(
    executor: E,
    user_id: Uuid,
    property_token_id: Uuid,
    side: OrderSide,
    price: Decimal,
    token_amount: i64,
    expires_at: Option<DateTime<Utc>>,
) -> sqlx::Result<Order>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (user_id, property_token_id, side, price, token_amount, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(property_token_id)
    .bind(side)
    .bind(price)
    .bind(token_amount)
    .bind(expires_at)
    .fetch_one(executor)
    .await
}

pub async fn get_order<'e, E>(executor: E, id: Uuid) -> sqlx::Result<Option<Order>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn get_order_for_update(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<Option<Order>> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Live, unexpired orders on the opposite side that cross `price`, in
/// price-time priority. Orders placed by `exclude_user` are skipped.
pub async fn matching_candidates<'e, E>(
    executor: E,
    property_token_id: Uuid,
    incoming_side: OrderSide,
    price: Decimal,
    exclude_user: Uuid,
    now: DateTime<Utc>,
) -> sqlx::Result<Vec<Order>>
where
    E: PgExecutor<'e>,
{
    let sql = match incoming_side {
        OrderSide::Buy => {
            r#"
            SELECT * FROM orders
            WHERE property_token_id = $1 AND side = 'sell'
              AND status IN ('open', 'partially_filled')
              AND (expires_at IS NULL OR expires_at > $4)
              AND price <= $2 AND user_id <> $3
            ORDER BY price ASC, created_at ASC, seq ASC
            FOR UPDATE
            "#
        }
        OrderSide::Sell => {
            r#"
            SELECT * FROM orders
            WHERE property_token_id = $1 AND side = 'buy'
              AND status IN ('open', 'partially_filled')
              AND (expires_at IS NULL OR expires_at > $4)
              AND price >= $2 AND user_id <> $3
            ORDER BY price DESC, created_at ASC, seq ASC
            FOR UPDATE
            "#
        }
    };

    sqlx::query_as::<_, Order>(sql)
        .bind(property_token_id)
        .bind(price)
        .bind(exclude_user)
        .bind(now)
        .fetch_all(executor)
        .await
}

/// Add `quantity` to an order's fill. Guarded on the previously observed
/// `filled_amount` so a stale view never double-applies.
pub async fn apply_fill<'e, E>(
    executor: E,
    id: Uuid,
    expected_filled: i64,
    quantity: i64,
    status: OrderStatus,
) -> sqlx::Result<Option<Order>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders
        SET filled_amount = filled_amount + $3, status = $4, updated_at = NOW()
        WHERE id = $1 AND filled_amount = $2
          AND status IN ('open', 'partially_filled')
          AND filled_amount + $3 <= token_amount
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(expected_filled)
    .bind(quantity)
    .bind(status)
    .fetch_optional(executor)
    .await
}

/// Move a live order to a terminal status (cancelled/expired).
pub async fn close_order<'e, E>(
    executor: E,
    id: Uuid,
    status: OrderStatus,
) -> sqlx::Result<Option<Order>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders
        SET status = $2, updated_at = NOW()
        WHERE id = $1 AND status IN ('open', 'partially_filled')
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status)
    .fetch_optional(executor)
    .await
}

/// Persist expiry for one token's live orders past `expires_at`.
pub async fn expire_due_for_token<'e, E>(
    executor: E,
    property_token_id: Uuid,
    now: DateTime<Utc>,
) -> sqlx::Result<u64>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = 'expired', updated_at = NOW()
        WHERE property_token_id = $1
          AND status IN ('open', 'partially_filled')
          AND expires_at <= $2
        "#,
    )
    .bind(property_token_id)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Persist expiry across all tokens.
pub async fn expire_due<'e, E>(executor: E, now: DateTime<Utc>) -> sqlx::Result<u64>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = 'expired', updated_at = NOW()
        WHERE status IN ('open', 'partially_filled') AND expires_at <= $1
        "#,
    )
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Tokens a seller has committed to live, unexpired sell orders.
pub async fn locked_sell_amount<'e, E>(
    executor: E,
    user_id: Uuid,
    property_token_id: Uuid,
    now: DateTime<Utc>,
) -> sqlx::Result<i64>
where
    E: PgExecutor<'e>,
{
    let row: (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(token_amount - filled_amount), 0)::BIGINT FROM orders
        WHERE user_id = $1 AND property_token_id = $2 AND side = 'sell'
          AND status IN ('open', 'partially_filled')
          AND (expires_at IS NULL OR expires_at > $3)
        "#,
    )
    .bind(user_id)
    .bind(property_token_id)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(row.0)
}

/// Live, unexpired orders of a token (read path, no locks).
pub async fn live_orders_for_token<'e, E>(
    executor: E,
    property_token_id: Uuid,
    now: DateTime<Utc>,
) -> sqlx::Result<Vec<Order>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Order>(
        r#"
        SELECT * FROM orders
        WHERE property_token_id = $1
          AND status IN ('open', 'partially_filled')
          AND (expires_at IS NULL OR expires_at > $2)
        ORDER BY side, price, created_at, seq
        "#,
    )
    .bind(property_token_id)
    .bind(now)
    .fetch_all(executor)
    .await
}

pub async fn list_by_user<'e, E>(executor: E, user_id: Uuid, limit: i64) -> sqlx::Result<Vec<Order>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, seq DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(executor)
    .await
}
