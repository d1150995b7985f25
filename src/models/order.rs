use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Expired,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::PartiallyFilled => "partially_filled",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        }
    }

    /// Open and partially filled orders still rest on the book.
    pub fn is_live(self) -> bool {
        matches!(self, OrderStatus::Open | OrderStatus::PartiallyFilled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Order row
// ---------------------------------------------------------------------------

/// Database row for orders table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    /// Insertion sequence; breaks `created_at` ties in time priority.
    pub seq: i64,
    pub user_id: Uuid,
    pub property_token_id: Uuid,
    pub side: OrderSide,
    pub price: Decimal,
    pub token_amount: i64,
    pub filled_amount: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn remaining(&self) -> i64 {
        self.token_amount - self.filled_amount
    }

    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Status as seen at `now`: a live order past its expiry reads as expired
    /// even before the sweep has persisted it.
    pub fn effective_status(&self, now: DateTime<Utc>) -> OrderStatus {
        if self.status.is_live() && self.is_past_expiry(now) {
            OrderStatus::Expired
        } else {
            self.status
        }
    }

    pub fn is_matchable(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now).is_live() && self.remaining() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn order(status: OrderStatus, expires_at: Option<DateTime<Utc>>) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            seq: 1,
            user_id: Uuid::new_v4(),
            property_token_id: Uuid::new_v4(),
            side: OrderSide::Buy,
            price: Decimal::from(10),
            token_amount: 100,
            filled_amount: 40,
            status,
            created_at: now,
            updated_at: now,
            expires_at,
        }
    }

    #[test]
    fn test_live_order_past_expiry_reads_expired() {
        let now = Utc::now();
        let o = order(OrderStatus::PartiallyFilled, Some(now - Duration::seconds(1)));
        assert_eq!(o.effective_status(now), OrderStatus::Expired);
        assert!(!o.is_matchable(now));
    }

    #[test]
    fn test_terminal_status_is_not_rewritten_by_expiry() {
        let now = Utc::now();
        let o = order(OrderStatus::Filled, Some(now - Duration::hours(1)));
        assert_eq!(o.effective_status(now), OrderStatus::Filled);
    }

    #[test]
    fn test_remaining_and_matchable() {
        let now = Utc::now();
        let o = order(OrderStatus::Open, Some(now + Duration::hours(1)));
        assert_eq!(o.remaining(), 60);
        assert!(o.is_matchable(now));
    }
}
