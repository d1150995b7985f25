use chrono::{Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use tokio::time::{interval, Duration};

use crate::db::rate_limit_repo;
use crate::ledger::OrderBook;

/// Rate-limit windows older than this are dropped.
const RATE_LIMIT_RETENTION_MINUTES: i64 = 10;

/// Run the expiry sweep loop. Persists `expired` for live orders past their
/// `expires_at` and prunes stale rate-limit windows.
///
/// Matching and cancellation already treat past-due orders as expired, so the
/// sweep only keeps stored statuses honest for readers.
pub async fn run_order_expiry_sweep(orders: OrderBook, pool: PgPool, interval_secs: u64) {
    let mut ticker = interval(Duration::from_secs(interval_secs));
    tracing::info!(interval_secs, "Order expiry sweep started");

    loop {
        ticker.tick().await;
        sweep_once(&orders, &pool).await;
    }
}

async fn sweep_once(orders: &OrderBook, pool: &PgPool) {
    let now = Utc::now();

    match orders.expire_orders(now).await {
        Ok(0) => tracing::debug!("Expiry sweep: nothing due"),
        Ok(expired) => tracing::info!(expired, "Expiry sweep: orders expired"),
        Err(e) => tracing::error!(error = %e, "Expiry sweep: failed to expire orders"),
    }

    let cutoff = now - ChronoDuration::minutes(RATE_LIMIT_RETENTION_MINUTES);
    match rate_limit_repo::prune(pool, cutoff).await {
        Ok(pruned) if pruned > 0 => tracing::debug!(pruned, "Expiry sweep: rate-limit windows pruned"),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Expiry sweep: failed to prune rate-limit windows"),
    }
}
