use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DividendStatus {
    Scheduled,
    Distributed,
    Cancelled,
}

/// Database row for dividends table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Dividend {
    pub id: Uuid,
    pub property_token_id: Uuid,
    /// Total pool declared for the whole supply.
    pub amount: Decimal,
    pub distribution_date: DateTime<Utc>,
    pub status: DividendStatus,
    /// Share of the pool attributable to unsold supply; set on distribution.
    pub retained_amount: Option<Decimal>,
    pub declared_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub distributed_at: Option<DateTime<Utc>>,
}

/// One payment per (dividend, investment) pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DividendPayment {
    pub id: Uuid,
    pub dividend_id: Uuid,
    pub user_id: Uuid,
    pub investment_id: Uuid,
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
}
