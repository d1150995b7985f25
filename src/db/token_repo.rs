use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgConnection};
use uuid::Uuid;

use crate::models::PropertyToken;

/// Insert a freshly tokenized supply; everything starts available.
pub async fn insert_token(
    conn: &mut PgConnection,
    property_id: Uuid,
    total_supply: i64,
    token_price: Decimal,
    min_investment: i64,
    contract_address: Option<&str>,
) -> sqlx::Result<PropertyToken> {
    sqlx::query_as::<_, PropertyToken>(
        r#"
        INSERT INTO property_tokens
            (property_id, total_supply, available_supply, token_price, min_investment, contract_address)
        VALUES ($1, $2, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(property_id)
    .bind(total_supply)
    .bind(token_price)
    .bind(min_investment)
    .bind(contract_address)
    .fetch_one(conn)
    .await
}

pub async fn get_token<'e, E>(executor: E, id: Uuid) -> sqlx::Result<Option<PropertyToken>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, PropertyToken>("SELECT * FROM property_tokens WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn get_token_by_property<'e, E>(
    executor: E,
    property_id: Uuid,
) -> sqlx::Result<Option<PropertyToken>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, PropertyToken>("SELECT * FROM property_tokens WHERE property_id = $1")
        .bind(property_id)
        .fetch_optional(executor)
        .await
}

/// Take the row lock that serializes every mutation on this token.
pub async fn lock_token(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<Option<PropertyToken>> {
    sqlx::query_as::<_, PropertyToken>("SELECT * FROM property_tokens WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Atomically take `amount` out of available supply. Returns `None` when the
/// token is missing or does not have enough available.
pub async fn decrement_available<'e, E>(
    executor: E,
    id: Uuid,
    amount: i64,
) -> sqlx::Result<Option<PropertyToken>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, PropertyToken>(
        r#"
        UPDATE property_tokens
        SET available_supply = available_supply - $2
        WHERE id = $1 AND available_supply >= $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(amount)
    .fetch_optional(executor)
    .await
}

/// Atomically return `amount` to available supply, never past total supply.
pub async fn increment_available<'e, E>(
    executor: E,
    id: Uuid,
    amount: i64,
) -> sqlx::Result<Option<PropertyToken>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, PropertyToken>(
        r#"
        UPDATE property_tokens
        SET available_supply = available_supply + $2
        WHERE id = $1 AND available_supply + $2 <= total_supply
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(amount)
    .fetch_optional(executor)
    .await
}
