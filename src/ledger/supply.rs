use metrics::counter;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::db::token_repo;
use crate::models::PropertyToken;

use super::retry::with_retry;
use super::{begin_bounded, ensure_positive_amount, LedgerError, LedgerSettings};

/// Confirmation of a committed supply movement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub property_token_id: Uuid,
    pub amount: i64,
    pub available_supply: i64,
    pub total_supply: i64,
}

impl Reservation {
    fn after(token: &PropertyToken, amount: i64) -> Self {
        Self {
            property_token_id: token.id,
            amount,
            available_supply: token.available_supply,
            total_supply: token.total_supply,
        }
    }
}

/// Single source of truth for `available_supply`.
///
/// `reserve`/`release` commit on their own; they move supply without touching
/// investments, so callers that use them directly own the matching holding
/// record. The recorder and the order book use the `*_in` variants inside
/// their own transactions instead.
#[derive(Clone)]
pub struct TokenSupplyLedger {
    pool: PgPool,
    settings: LedgerSettings,
}

impl TokenSupplyLedger {
    pub fn new(pool: PgPool, settings: LedgerSettings) -> Self {
        Self { pool, settings }
    }

    pub async fn reserve(&self, token_id: Uuid, amount: i64) -> Result<Reservation, LedgerError> {
        ensure_positive_amount(amount)?;
        with_retry(self.settings.retry, "reserve", || self.reserve_once(token_id, amount)).await
    }

    pub async fn release(&self, token_id: Uuid, amount: i64) -> Result<Reservation, LedgerError> {
        ensure_positive_amount(amount)?;
        with_retry(self.settings.retry, "release", || self.release_once(token_id, amount)).await
    }

    pub async fn get(&self, token_id: Uuid) -> Result<PropertyToken, LedgerError> {
        token_repo::get_token(&self.pool, token_id)
            .await?
            .ok_or(LedgerError::NotFound("property token"))
    }

    async fn reserve_once(&self, token_id: Uuid, amount: i64) -> Result<Reservation, LedgerError> {
        let mut tx = begin_bounded(&self.pool, self.settings.lock_timeout).await?;
        let reservation = reserve_in(&mut tx, token_id, amount).await?;
        tx.commit().await?;
        Ok(reservation)
    }

    async fn release_once(&self, token_id: Uuid, amount: i64) -> Result<Reservation, LedgerError> {
        let mut tx = begin_bounded(&self.pool, self.settings.lock_timeout).await?;
        let reservation = release_in(&mut tx, token_id, amount).await?;
        tx.commit().await?;
        Ok(reservation)
    }
}

/// Lock the token row for the rest of the enclosing transaction.
pub(crate) async fn lock_token(
    conn: &mut PgConnection,
    token_id: Uuid,
) -> Result<PropertyToken, LedgerError> {
    token_repo::lock_token(conn, token_id)
        .await?
        .ok_or(LedgerError::NotFound("property token"))
}

/// Conditional decrement inside the caller's transaction.
pub(crate) async fn reserve_in(
    conn: &mut PgConnection,
    token_id: Uuid,
    amount: i64,
) -> Result<Reservation, LedgerError> {
    ensure_positive_amount(amount)?;

    if let Some(token) = token_repo::decrement_available(&mut *conn, token_id, amount).await? {
        tracing::debug!(
            token_id = %token_id,
            amount,
            available = token.available_supply,
            "Supply reserved"
        );
        return Ok(Reservation::after(&token, amount));
    }

    let token = token_repo::get_token(&mut *conn, token_id)
        .await?
        .ok_or(LedgerError::NotFound("property token"))?;

    counter!("supply_reservations_rejected_total").increment(1);
    tracing::warn!(
        token_id = %token_id,
        requested = amount,
        available = token.available_supply,
        "Supply reservation rejected"
    );

    Err(LedgerError::InsufficientSupply {
        requested: amount,
        available: token.available_supply,
    })
}

/// Conditional increment inside the caller's transaction.
pub(crate) async fn release_in(
    conn: &mut PgConnection,
    token_id: Uuid,
    amount: i64,
) -> Result<Reservation, LedgerError> {
    ensure_positive_amount(amount)?;

    if let Some(token) = token_repo::increment_available(&mut *conn, token_id, amount).await? {
        tracing::debug!(
            token_id = %token_id,
            amount,
            available = token.available_supply,
            "Supply released"
        );
        return Ok(Reservation::after(&token, amount));
    }

    let token = token_repo::get_token(&mut *conn, token_id)
        .await?
        .ok_or(LedgerError::NotFound("property token"))?;

    Err(LedgerError::InvalidState(format!(
        "releasing {amount} would exceed total supply {} (available {})",
        token.total_supply, token.available_supply
    )))
}
