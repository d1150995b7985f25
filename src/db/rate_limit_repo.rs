use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

/// Count one hit against `key` in the current one-minute window and return
/// the window's total so far.
pub async fn hit<'e, E>(executor: E, key: &str) -> sqlx::Result<i32>
where
    E: PgExecutor<'e>,
{
    let row: (i32,) = sqlx::query_as(
        r#"
        INSERT INTO rate_limits (key, window_start, hits)
        VALUES ($1, date_trunc('minute', NOW()), 1)
        ON CONFLICT (key, window_start)
        DO UPDATE SET hits = rate_limits.hits + 1
        RETURNING hits
        "#,
    )
    .bind(key)
    .fetch_one(executor)
    .await?;

    Ok(row.0)
}

/// Drop windows that started before `before`.
pub async fn prune<'e, E>(executor: E, before: DateTime<Utc>) -> sqlx::Result<u64>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM rate_limits WHERE window_start < $1")
        .bind(before)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}
