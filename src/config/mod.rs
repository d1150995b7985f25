use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::ledger::{LedgerSettings, RetryPolicy};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,

    // Session tokens are HS256-signed with this secret
    pub jwt_secret: String,

    // Ledger
    pub lock_timeout_ms: u64,
    pub retry_backoff_ms: u64,

    // Background sweep (0 disables)
    pub order_expiry_sweep_secs: u64,

    // Mutating requests per user per minute (0 disables)
    pub rate_limit_per_minute: u32,

    pub log_json: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_or("PORT", env::var("PORT").ok(), 8080)?,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", env::var("DB_MAX_CONNECTIONS").ok(), 10)?,

            jwt_secret: env::var("JWT_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set"))?,

            lock_timeout_ms: parse_or("LOCK_TIMEOUT_MS", env::var("LOCK_TIMEOUT_MS").ok(), 2_000)?,
            retry_backoff_ms: parse_or("RETRY_BACKOFF_MS", env::var("RETRY_BACKOFF_MS").ok(), 50)?,

            order_expiry_sweep_secs: parse_or(
                "ORDER_EXPIRY_SWEEP_SECS",
                env::var("ORDER_EXPIRY_SWEEP_SECS").ok(),
                60,
            )?,
            rate_limit_per_minute: parse_or(
                "RATE_LIMIT_PER_MINUTE",
                env::var("RATE_LIMIT_PER_MINUTE").ok(),
                120,
            )?,

            log_json: is_json_format(env::var("LOG_FORMAT").ok().as_deref()),
        })
    }

    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            retry: RetryPolicy {
                backoff: Duration::from_millis(self.retry_backoff_ms),
                ..RetryPolicy::default()
            },
        }
    }
}

/// Parse an optional raw value, falling back to `default` when unset or blank.
fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|e| anyhow::anyhow!("{name} has invalid value {value:?}: {e}")),
    }
}

fn is_json_format(raw: Option<&str>) -> bool {
    raw.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"))
}
