use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::models::{Dividend, DividendPayment};

pub async fn insert_dividend<'e, E>(
    executor: E,
    property_token_id: Uuid,
    amount: Decimal,
    distribution_date: DateTime<Utc>,
    declared_by: Uuid,
) -> sqlx::Result<Dividend>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Dividend>(
        r#"
        INSERT INTO dividends (property_token_id, amount, distribution_date, declared_by)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(property_token_id)
    .bind(amount)
    .bind(distribution_date)
    .bind(declared_by)
    .fetch_one(executor)
    .await
}

pub async fn get_dividend<'e, E>(executor: E, id: Uuid) -> sqlx::Result<Option<Dividend>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Dividend>("SELECT * FROM dividends WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn get_dividend_for_update(
    conn: &mut PgConnection,
    id: Uuid,
) -> sqlx::Result<Option<Dividend>> {
    sqlx::query_as::<_, Dividend>("SELECT * FROM dividends WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn mark_distributed<'e, E>(
    executor: E,
    id: Uuid,
    retained_amount: Decimal,
    distributed_at: DateTime<Utc>,
) -> sqlx::Result<Dividend>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Dividend>(
        r#"
        UPDATE dividends
        SET status = 'distributed', retained_amount = $2, distributed_at = $3
        WHERE id = $1 AND status = 'scheduled'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(retained_amount)
    .bind(distributed_at)
    .fetch_one(executor)
    .await
}

pub async fn mark_cancelled<'e, E>(executor: E, id: Uuid) -> sqlx::Result<Option<Dividend>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Dividend>(
        r#"
        UPDATE dividends
        SET status = 'cancelled'
        WHERE id = $1 AND status = 'scheduled'
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn insert_payment<'e, E>(
    executor: E,
    dividend_id: Uuid,
    user_id: Uuid,
    investment_id: Uuid,
    amount: Decimal,
    paid_at: DateTime<Utc>,
) -> sqlx::Result<DividendPayment>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, DividendPayment>(
        r#"
        INSERT INTO dividend_payments (dividend_id, user_id, investment_id, amount, paid_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(dividend_id)
    .bind(user_id)
    .bind(investment_id)
    .bind(amount)
    .bind(paid_at)
    .fetch_one(executor)
    .await
}

pub async fn payments_for_dividend<'e, E>(
    executor: E,
    dividend_id: Uuid,
) -> sqlx::Result<Vec<DividendPayment>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, DividendPayment>(
        "SELECT * FROM dividend_payments WHERE dividend_id = $1 ORDER BY amount DESC, id",
    )
    .bind(dividend_id)
    .fetch_all(executor)
    .await
}

pub async fn payments_for_user<'e, E>(
    executor: E,
    user_id: Uuid,
) -> sqlx::Result<Vec<DividendPayment>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, DividendPayment>(
        "SELECT * FROM dividend_payments WHERE user_id = $1 ORDER BY paid_at DESC, id",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}
