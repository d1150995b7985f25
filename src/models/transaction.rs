use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Immutable record of one fill between a buy and a sell order.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub property_token_id: Uuid,
    pub buy_order_id: Uuid,
    pub sell_order_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub token_amount: i64,
    pub price: Decimal,
    pub total_amount: Decimal,
    /// Opaque hash from the settlement chain, if any.
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}
