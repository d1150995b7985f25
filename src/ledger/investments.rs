use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::db::{investment_repo, order_repo};
use crate::models::{Holding, Investment, InvestmentStatus};

use super::retry::with_retry;
use super::supply::{self, lock_token};
use super::{
    begin_bounded, ensure_notional_fits, ensure_positive_amount, ensure_valid_price, LedgerError,
    LedgerSettings,
};

/// Turns purchase intents into investments backed by a supply reservation.
#[derive(Clone)]
pub struct InvestmentRecorder {
    pool: PgPool,
    settings: LedgerSettings,
}

impl InvestmentRecorder {
    pub fn new(pool: PgPool, settings: LedgerSettings) -> Self {
        Self { pool, settings }
    }

    /// Reserve supply and persist the investment in one transaction.
    ///
    /// Primary purchases always settle at the token's issue price;
    /// `price_per_token` is the caller's quote and must match it.
    pub async fn record_investment(
        &self,
        user_id: Uuid,
        token_id: Uuid,
        token_amount: i64,
        price_per_token: Decimal,
    ) -> Result<Investment, LedgerError> {
        ensure_positive_amount(token_amount)?;
        ensure_valid_price(price_per_token)?;
        ensure_notional_fits(token_amount, price_per_token)?;

        let investment = with_retry(self.settings.retry, "record_investment", || {
            self.record_once(user_id, token_id, token_amount, price_per_token)
        })
        .await?;

        counter!("investments_recorded_total").increment(1);
        tracing::info!(
            investment_id = %investment.id,
            user_id = %user_id,
            token_id = %token_id,
            token_amount,
            amount = %investment.investment_amount,
            "Investment recorded"
        );

        Ok(investment)
    }

    /// Cancel an active investment and return its tokens to supply.
    pub async fn cancel_investment(&self, investment_id: Uuid) -> Result<Investment, LedgerError> {
        let existing = investment_repo::get_investment(&self.pool, investment_id)
            .await?
            .ok_or(LedgerError::NotFound("investment"))?;

        let cancelled = with_retry(self.settings.retry, "cancel_investment", || {
            self.cancel_once(existing.property_token_id, investment_id)
        })
        .await?;

        counter!("investments_cancelled_total").increment(1);
        tracing::info!(
            investment_id = %investment_id,
            token_id = %cancelled.property_token_id,
            token_amount = cancelled.token_amount,
            "Investment cancelled"
        );

        Ok(cancelled)
    }

    pub async fn get(&self, investment_id: Uuid) -> Result<Investment, LedgerError> {
        investment_repo::get_investment(&self.pool, investment_id)
            .await?
            .ok_or(LedgerError::NotFound("investment"))
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Investment>, LedgerError> {
        Ok(investment_repo::list_by_user(&self.pool, user_id).await?)
    }

    pub async fn holdings(&self, user_id: Uuid) -> Result<Vec<Holding>, LedgerError> {
        Ok(investment_repo::holdings_by_user(&self.pool, user_id).await?)
    }

    async fn record_once(
        &self,
        user_id: Uuid,
        token_id: Uuid,
        token_amount: i64,
        price_per_token: Decimal,
    ) -> Result<Investment, LedgerError> {
        let mut tx = begin_bounded(&self.pool, self.settings.lock_timeout).await?;
        let token = lock_token(&mut tx, token_id).await?;

        if price_per_token != token.token_price {
            return Err(LedgerError::Validation(format!(
                "pricePerToken must equal the token price of {}",
                token.token_price
            )));
        }
        if token_amount < token.min_investment {
            return Err(LedgerError::BelowMinimum {
                requested: token_amount,
                minimum: token.min_investment,
            });
        }

        let investment =
            record_in(&mut tx, token_id, user_id, token_amount, token.token_price, Utc::now()).await?;
        tx.commit().await?;

        Ok(investment)
    }

    async fn cancel_once(&self, token_id: Uuid, investment_id: Uuid) -> Result<Investment, LedgerError> {
        let mut tx = begin_bounded(&self.pool, self.settings.lock_timeout).await?;
        lock_token(&mut tx, token_id).await?;

        let investment = investment_repo::get_investment_for_update(&mut tx, investment_id)
            .await?
            .ok_or(LedgerError::NotFound("investment"))?;

        match investment.status {
            InvestmentStatus::Active => {}
            InvestmentStatus::Cancelled => return Err(LedgerError::AlreadyCancelled),
            InvestmentStatus::Transferred => {
                return Err(LedgerError::InvalidState(
                    "investment was transferred through the order book".into(),
                ))
            }
        }

        // Tokens backing the owner's live sell orders cannot be withdrawn.
        let held = investment_repo::held_amount(&mut *tx, investment.user_id, token_id).await?;
        let locked =
            order_repo::locked_sell_amount(&mut *tx, investment.user_id, token_id, Utc::now()).await?;
        if held - investment.token_amount < locked {
            return Err(LedgerError::InvalidState(format!(
                "{locked} tokens are committed to open sell orders"
            )));
        }

        let cancelled =
            investment_repo::close_investment(&mut *tx, investment_id, InvestmentStatus::Cancelled)
                .await?
                .ok_or_else(|| LedgerError::InvalidState("investment is no longer active".into()))?;
        supply::release_in(&mut tx, token_id, cancelled.token_amount).await?;
        tx.commit().await?;

        Ok(cancelled)
    }
}

/// Reserve `token_amount` and insert the backing investment inside the
/// caller's transaction. Minimum-investment rules are the caller's concern.
pub(crate) async fn record_in(
    conn: &mut PgConnection,
    token_id: Uuid,
    user_id: Uuid,
    token_amount: i64,
    price_per_token: Decimal,
    purchase_date: DateTime<Utc>,
) -> Result<Investment, LedgerError> {
    supply::reserve_in(conn, token_id, token_amount).await?;
    let investment = investment_repo::insert_investment(
        &mut *conn,
        user_id,
        token_id,
        token_amount,
        price_per_token,
        purchase_date,
    )
    .await?;
    Ok(investment)
}

/// Consume `token_amount` of a seller's active holdings, oldest first, and
/// return the tokens to supply. Consumed rows become `transferred`; a partly
/// consumed row is replaced by a residual holding with the original price and
/// purchase date.
pub(crate) async fn consume_holdings_in(
    conn: &mut PgConnection,
    user_id: Uuid,
    token_id: Uuid,
    token_amount: i64,
) -> Result<(), LedgerError> {
    ensure_positive_amount(token_amount)?;

    let holdings = investment_repo::active_holdings_for_update(&mut *conn, user_id, token_id).await?;
    let held: i64 = holdings.iter().map(|h| h.token_amount).sum();
    if held < token_amount {
        return Err(LedgerError::InsufficientHoldings {
            requested: token_amount,
            available: held,
        });
    }

    let mut remaining = token_amount;
    for holding in holdings {
        if remaining == 0 {
            break;
        }

        investment_repo::close_investment(&mut *conn, holding.id, InvestmentStatus::Transferred)
            .await?
            .ok_or_else(|| LedgerError::InvalidState("holding is no longer active".into()))?;

        let take = remaining.min(holding.token_amount);
        if take < holding.token_amount {
            investment_repo::insert_investment(
                &mut *conn,
                holding.user_id,
                token_id,
                holding.token_amount - take,
                holding.price_per_token,
                holding.purchase_date,
            )
            .await?;
        }
        remaining -= take;
    }

    supply::release_in(conn, token_id, token_amount).await?;
    Ok(())
}
