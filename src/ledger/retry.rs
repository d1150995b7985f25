use std::future::Future;
use std::time::Duration;

use metrics::counter;

use super::LedgerError;

/// How transient storage failures are retried before surfacing.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    /// Base delay; attempt `n` waits `n * backoff`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Run `op`, retrying only errors classified as transient.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    operation: &'static str,
    mut op: F,
) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_transient() && attempt < policy.attempts => {
                tracing::warn!(
                    operation,
                    attempt,
                    error = %e,
                    "Transient ledger failure, retrying"
                );
                counter!("ledger_retries_total", "operation" => operation).increment(1);
                tokio::time::sleep(policy.backoff * attempt).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
