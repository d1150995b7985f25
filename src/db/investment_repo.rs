use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::models::{Holding, Investment, InvestmentStatus};

/// Insert an active investment. `investment_amount` is derived from the
/// amount and the per-token price at purchase time.
pub async fn insert_investment<'e, E>(
    executor: E,
    user_id: Uuid,
    property_token_id: Uuid,
    token_amount: i64,
    price_per_token: Decimal,
    purchase_date: DateTime<Utc>,
) -> sqlx::Result<Investment>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Investment>(
        r#"
        INSERT INTO investments
            (user_id, property_token_id, token_amount, price_per_token, investment_amount, purchase_date)
        VALUES ($1, $2, $3, $4, $4 * $3, $5)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(property_token_id)
    .bind(token_amount)
    .bind(price_per_token)
    .bind(purchase_date)
    .fetch_one(executor)
    .await
}

pub async fn get_investment<'e, E>(executor: E, id: Uuid) -> sqlx::Result<Option<Investment>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Investment>("SELECT * FROM investments WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn get_investment_for_update(
    conn: &mut PgConnection,
    id: Uuid,
) -> sqlx::Result<Option<Investment>> {
    sqlx::query_as::<_, Investment>("SELECT * FROM investments WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Move an active investment to a terminal status.
pub async fn close_investment<'e, E>(
    executor: E,
    id: Uuid,
    status: InvestmentStatus,
) -> sqlx::Result<Option<Investment>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Investment>(
        r#"
        UPDATE investments
        SET status = $2, closed_at = NOW()
        WHERE id = $1 AND status = 'active'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status)
    .fetch_optional(executor)
    .await
}

/// Active holdings of a user in one token, oldest first, row-locked.
pub async fn active_holdings_for_update(
    conn: &mut PgConnection,
    user_id: Uuid,
    property_token_id: Uuid,
) -> sqlx::Result<Vec<Investment>> {
    sqlx::query_as::<_, Investment>(
        r#"
        SELECT * FROM investments
        WHERE user_id = $1 AND property_token_id = $2 AND status = 'active'
        ORDER BY purchase_date ASC, id ASC
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .bind(property_token_id)
    .fetch_all(conn)
    .await
}

/// Sum of active token amounts a user holds in one token.
pub async fn held_amount<'e, E>(
    executor: E,
    user_id: Uuid,
    property_token_id: Uuid,
) -> sqlx::Result<i64>
where
    E: PgExecutor<'e>,
{
    let row: (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(token_amount), 0)::BIGINT FROM investments
        WHERE user_id = $1 AND property_token_id = $2 AND status = 'active'
        "#,
    )
    .bind(user_id)
    .bind(property_token_id)
    .fetch_one(executor)
    .await?;

    Ok(row.0)
}

/// Sum of all active token amounts for a token.
pub async fn active_supply<'e, E>(executor: E, property_token_id: Uuid) -> sqlx::Result<i64>
where
    E: PgExecutor<'e>,
{
    let row: (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(token_amount), 0)::BIGINT FROM investments
        WHERE property_token_id = $1 AND status = 'active'
        "#,
    )
    .bind(property_token_id)
    .fetch_one(executor)
    .await?;

    Ok(row.0)
}

pub async fn list_by_user<'e, E>(executor: E, user_id: Uuid) -> sqlx::Result<Vec<Investment>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Investment>(
        "SELECT * FROM investments WHERE user_id = $1 ORDER BY purchase_date DESC, id",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

pub async fn holdings_by_user<'e, E>(executor: E, user_id: Uuid) -> sqlx::Result<Vec<Holding>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Holding>(
        r#"
        SELECT property_token_id,
               SUM(token_amount)::BIGINT AS token_amount,
               SUM(investment_amount) AS invested_amount
        FROM investments
        WHERE user_id = $1 AND status = 'active'
        GROUP BY property_token_id
        ORDER BY property_token_id
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

/// Dividend snapshot: investments that were active at `as_of`, oldest first.
///
/// A row counts when it existed at `as_of` and had not yet been closed, so
/// sales and cancellations after the record date do not move the payout.
pub async fn snapshot_for_dividend<'e, E>(
    executor: E,
    property_token_id: Uuid,
    as_of: DateTime<Utc>,
) -> sqlx::Result<Vec<Investment>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Investment>(
        r#"
        SELECT * FROM investments
        WHERE property_token_id = $1
          AND created_at <= $2
          AND purchase_date <= $2
          AND (status = 'active' OR closed_at > $2)
        ORDER BY purchase_date ASC, created_at ASC, id ASC
        "#,
    )
    .bind(property_token_id)
    .bind(as_of)
    .fetch_all(executor)
    .await
}
