use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row for property_tokens table.
///
/// `total_supply` is fixed at tokenization; `available_supply` only moves
/// through the supply ledger and always stays within `0..=total_supply`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PropertyToken {
    pub id: Uuid,
    pub property_id: Uuid,
    pub total_supply: i64,
    pub available_supply: i64,
    pub token_price: Decimal,
    pub min_investment: i64,
    pub contract_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PropertyToken {
    /// Tokens currently held by investors.
    pub fn held_supply(&self) -> i64 {
        self.total_supply - self.available_supply
    }
}
