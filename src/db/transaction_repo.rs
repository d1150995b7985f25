use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{Order, Transaction};

/// Record one fill. The buyer/seller ids are taken from the orders so the
/// audit row can never disagree with them.
pub async fn insert_fill<'e, E>(
    executor: E,
    buy: &Order,
    sell: &Order,
    token_amount: i64,
    price: Decimal,
) -> sqlx::Result<Transaction>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions
            (property_token_id, buy_order_id, sell_order_id, buyer_id, seller_id,
             token_amount, price, total_amount)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7 * $6)
        RETURNING *
        "#,
    )
    .bind(buy.property_token_id)
    .bind(buy.id)
    .bind(sell.id)
    .bind(buy.user_id)
    .bind(sell.user_id)
    .bind(token_amount)
    .bind(price)
    .fetch_one(executor)
    .await
}

pub async fn list_by_token<'e, E>(
    executor: E,
    property_token_id: Uuid,
    limit: i64,
) -> sqlx::Result<Vec<Transaction>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE property_token_id = $1
        ORDER BY created_at DESC, id
        LIMIT $2
        "#,
    )
    .bind(property_token_id)
    .bind(limit)
    .fetch_all(executor)
    .await
}

pub async fn list_by_order<'e, E>(executor: E, order_id: Uuid) -> sqlx::Result<Vec<Transaction>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE buy_order_id = $1 OR sell_order_id = $1
        ORDER BY created_at ASC, id
        "#,
    )
    .bind(order_id)
    .fetch_all(executor)
    .await
}
