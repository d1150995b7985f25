use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::models::{Property, PropertyStatus};

pub async fn insert_property<'e, E>(
    executor: E,
    title: &str,
    description: Option<&str>,
    location: Option<&str>,
    valuation: Decimal,
    created_by: Uuid,
) -> sqlx::Result<Property>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Property>(
        r#"
        INSERT INTO properties (title, description, location, valuation, created_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(location)
    .bind(valuation)
    .bind(created_by)
    .fetch_one(executor)
    .await
}

pub async fn get_property<'e, E>(executor: E, id: Uuid) -> sqlx::Result<Option<Property>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn get_property_for_update(
    conn: &mut PgConnection,
    id: Uuid,
) -> sqlx::Result<Option<Property>> {
    sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Most recent properties first, optionally filtered by status.
pub async fn list_properties<'e, E>(
    executor: E,
    status: Option<PropertyStatus>,
    limit: i64,
) -> sqlx::Result<Vec<Property>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Property>(
        r#"
        SELECT * FROM properties
        WHERE ($1::TEXT IS NULL OR status = $1)
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(status)
    .bind(limit)
    .fetch_all(executor)
    .await
}

pub async fn mark_tokenized<'e, E>(
    executor: E,
    id: Uuid,
    contract_address: Option<&str>,
) -> sqlx::Result<Property>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Property>(
        r#"
        UPDATE properties
        SET status = 'tokenized',
            contract_address = COALESCE($2, contract_address),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(contract_address)
    .fetch_one(executor)
    .await
}
