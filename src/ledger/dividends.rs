use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{dividend_repo, investment_repo, token_repo};
use crate::models::{Dividend, DividendPayment, DividendStatus};

use super::allocation;
use super::retry::with_retry;
use super::supply::lock_token;
use super::{begin_bounded, ensure_currency_amount, LedgerError, LedgerSettings};

#[derive(Debug, Clone)]
pub struct DeclareDividend {
    pub property_token_id: Uuid,
    pub amount: Decimal,
    pub distribution_date: DateTime<Utc>,
    pub declared_by: Uuid,
}

/// A distributed dividend together with its payment batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    pub dividend: Dividend,
    pub payments: Vec<DividendPayment>,
}

/// Converts declared dividend pools into per-investment payments.
#[derive(Clone)]
pub struct DividendDistributor {
    pool: PgPool,
    settings: LedgerSettings,
}

impl DividendDistributor {
    pub fn new(pool: PgPool, settings: LedgerSettings) -> Self {
        Self { pool, settings }
    }

    pub async fn declare(&self, request: DeclareDividend) -> Result<Dividend, LedgerError> {
        ensure_currency_amount("dividend amount", request.amount)?;

        token_repo::get_token(&self.pool, request.property_token_id)
            .await?
            .ok_or(LedgerError::NotFound("property token"))?;

        let dividend = dividend_repo::insert_dividend(
            &self.pool,
            request.property_token_id,
            request.amount,
            request.distribution_date,
            request.declared_by,
        )
        .await?;

        tracing::info!(
            dividend_id = %dividend.id,
            token_id = %dividend.property_token_id,
            amount = %dividend.amount,
            distribution_date = %dividend.distribution_date,
            "Dividend declared"
        );

        Ok(dividend)
    }

    /// Pay out a scheduled dividend. The payment batch and the status change
    /// commit together or not at all.
    pub async fn distribute(&self, dividend_id: Uuid) -> Result<Distribution, LedgerError> {
        let existing = self.get(dividend_id).await?;

        let distribution = with_retry(self.settings.retry, "distribute_dividend", || {
            self.distribute_once(existing.property_token_id, dividend_id)
        })
        .await?;

        counter!("dividends_distributed_total").increment(1);
        tracing::info!(
            dividend_id = %dividend_id,
            payments = distribution.payments.len(),
            amount = %distribution.dividend.amount,
            retained = ?distribution.dividend.retained_amount,
            "Dividend distributed"
        );

        Ok(distribution)
    }

    pub async fn cancel(&self, dividend_id: Uuid) -> Result<Dividend, LedgerError> {
        let existing = self.get(dividend_id).await?;

        with_retry(self.settings.retry, "cancel_dividend", || {
            self.cancel_once(existing.property_token_id, dividend_id)
        })
        .await
    }

    pub async fn get(&self, dividend_id: Uuid) -> Result<Dividend, LedgerError> {
        dividend_repo::get_dividend(&self.pool, dividend_id)
            .await?
            .ok_or(LedgerError::NotFound("dividend"))
    }

    pub async fn payments(&self, dividend_id: Uuid) -> Result<Vec<DividendPayment>, LedgerError> {
        self.get(dividend_id).await?;
        Ok(dividend_repo::payments_for_dividend(&self.pool, dividend_id).await?)
    }

    pub async fn payments_for_user(&self, user_id: Uuid) -> Result<Vec<DividendPayment>, LedgerError> {
        Ok(dividend_repo::payments_for_user(&self.pool, user_id).await?)
    }

    async fn distribute_once(&self, token_id: Uuid, dividend_id: Uuid) -> Result<Distribution, LedgerError> {
        let mut tx = begin_bounded(&self.pool, self.settings.lock_timeout).await?;
        // Holds supply still while the snapshot is read.
        let token = lock_token(&mut tx, token_id).await?;

        let dividend = dividend_repo::get_dividend_for_update(&mut tx, dividend_id)
            .await?
            .ok_or(LedgerError::NotFound("dividend"))?;
        match dividend.status {
            DividendStatus::Scheduled => {}
            DividendStatus::Distributed => return Err(LedgerError::AlreadyDistributed),
            DividendStatus::Cancelled => {
                return Err(LedgerError::InvalidState("dividend was cancelled".into()))
            }
        }

        let snapshot =
            investment_repo::snapshot_for_dividend(&mut *tx, token.id, dividend.distribution_date)
                .await?;
        let amounts: Vec<i64> = snapshot.iter().map(|i| i.token_amount).collect();
        let allocation = allocation::allocate(dividend.amount, token.total_supply, &amounts)?;

        let paid_at = Utc::now();
        let mut payments = Vec::with_capacity(snapshot.len());
        for (investment, share) in snapshot.iter().zip(&allocation.shares) {
            let payment = dividend_repo::insert_payment(
                &mut *tx,
                dividend.id,
                investment.user_id,
                investment.id,
                *share,
                paid_at,
            )
            .await?;
            payments.push(payment);
        }

        let dividend =
            dividend_repo::mark_distributed(&mut *tx, dividend.id, allocation.retained, paid_at).await?;
        tx.commit().await?;

        Ok(Distribution { dividend, payments })
    }

    async fn cancel_once(&self, token_id: Uuid, dividend_id: Uuid) -> Result<Dividend, LedgerError> {
        let mut tx = begin_bounded(&self.pool, self.settings.lock_timeout).await?;
        lock_token(&mut tx, token_id).await?;

        let dividend = dividend_repo::get_dividend_for_update(&mut tx, dividend_id)
            .await?
            .ok_or(LedgerError::NotFound("dividend"))?;
        match dividend.status {
            DividendStatus::Scheduled => {}
            DividendStatus::Distributed => return Err(LedgerError::AlreadyDistributed),
            DividendStatus::Cancelled => {
                return Err(LedgerError::InvalidState("dividend is already cancelled".into()))
            }
        }

        let cancelled = dividend_repo::mark_cancelled(&mut *tx, dividend_id)
            .await?
            .ok_or_else(|| LedgerError::InvalidState("dividend is no longer scheduled".into()))?;
        tx.commit().await?;

        tracing::info!(dividend_id = %dividend_id, "Dividend cancelled");
        Ok(cancelled)
    }
}
