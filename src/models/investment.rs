use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvestmentStatus {
    Active,
    Cancelled,
    /// Consumed by a sell-side fill on the order book.
    Transferred,
}

/// Database row for investments table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub property_token_id: Uuid,
    pub token_amount: i64,
    pub price_per_token: Decimal,
    pub investment_amount: Decimal,
    pub status: InvestmentStatus,
    pub purchase_date: DateTime<Utc>,
    /// When this row was written. Residual rows left by a partial sale keep the
    /// original `purchase_date` but get a fresh `created_at`.
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Net active holding of one user in one token.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub property_token_id: Uuid,
    pub token_amount: i64,
    pub invested_amount: Decimal,
}
