//! Pure price-time priority rules used by the order book.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Order, OrderSide, OrderStatus};

/// Whether a resting order's price is acceptable to an incoming order.
pub fn crosses(incoming_side: OrderSide, incoming_price: Decimal, resting_price: Decimal) -> bool {
    match incoming_side {
        OrderSide::Buy => resting_price <= incoming_price,
        OrderSide::Sell => resting_price >= incoming_price,
    }
}

/// Priority among resting orders on one side: best price first (lowest ask,
/// highest bid), then earliest `created_at`, then insertion sequence.
pub fn compare_priority(resting_side: OrderSide, a: &Order, b: &Order) -> Ordering {
    let by_price = match resting_side {
        OrderSide::Sell => a.price.cmp(&b.price),
        OrderSide::Buy => b.price.cmp(&a.price),
    };
    by_price
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.seq.cmp(&b.seq))
}

/// Filter `candidates` down to the orders `incoming` may trade with and sort
/// them in the order they should be tried.
pub fn prioritize(incoming: &Order, candidates: Vec<Order>, now: DateTime<Utc>) -> Vec<Order> {
    let resting_side = incoming.side.opposite();
    let mut eligible: Vec<Order> = candidates
        .into_iter()
        .filter(|o| {
            o.side == resting_side
                && o.id != incoming.id
                && o.user_id != incoming.user_id
                && o.property_token_id == incoming.property_token_id
                && o.is_matchable(now)
                && crosses(incoming.side, incoming.price, o.price)
        })
        .collect();
    eligible.sort_by(|a, b| compare_priority(resting_side, a, b));
    eligible
}

/// Quantity exchanged when two orders meet.
pub fn fill_quantity(a: &Order, b: &Order) -> i64 {
    a.remaining().min(b.remaining()).max(0)
}

/// Status after an order's fill reaches `filled_amount`.
pub fn status_after_fill(token_amount: i64, filled_amount: i64) -> OrderStatus {
    if filled_amount >= token_amount {
        OrderStatus::Filled
    } else if filled_amount > 0 {
        OrderStatus::PartiallyFilled
    } else {
        OrderStatus::Open
    }
}

/// Aggregated remaining quantity at one price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceLevel {
    pub price: Decimal,
    pub token_amount: i64,
    pub order_count: usize,
}

/// Bids (highest first) and asks (lowest first) of the matchable orders.
pub fn aggregate_levels(orders: &[Order], now: DateTime<Utc>) -> (Vec<PriceLevel>, Vec<PriceLevel>) {
    let mut bids: BTreeMap<Decimal, PriceLevel> = BTreeMap::new();
    let mut asks: BTreeMap<Decimal, PriceLevel> = BTreeMap::new();

    for order in orders.iter().filter(|o| o.is_matchable(now)) {
        let book = match order.side {
            OrderSide::Buy => &mut bids,
            OrderSide::Sell => &mut asks,
        };
        let level = book.entry(order.price).or_insert_with(|| PriceLevel {
            price: order.price,
            token_amount: 0,
            order_count: 0,
        });
        level.token_amount += order.remaining();
        level.order_count += 1;
    }

    (bids.into_values().rev().collect(), asks.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn at(second: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(second)
    }

    fn order(side: OrderSide, price: i64, created: i64, amount: i64) -> Order {
        Order {
            id: Uuid::new_v4(),
            seq: created,
            user_id: Uuid::new_v4(),
            property_token_id: Uuid::nil(),
            side,
            price: Decimal::from(price),
            token_amount: amount,
            filled_amount: 0,
            status: OrderStatus::Open,
            created_at: at(created),
            updated_at: at(created),
            expires_at: None,
        }
    }

    #[test]
    fn test_sell_matches_highest_crossing_bid_first() {
        let b1 = order(OrderSide::Buy, 10, 1, 50);
        let b2 = order(OrderSide::Buy, 12, 2, 50);
        let s1 = order(OrderSide::Sell, 11, 3, 50);

        let ranked = prioritize(&s1, vec![b1.clone(), b2.clone()], at(10));

        // B1 at 10 is below the ask of 11 and never crosses.
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, b2.id);
    }

    #[test]
    fn test_equal_price_prefers_earliest() {
        let early = order(OrderSide::Sell, 10, 1, 5);
        let late = order(OrderSide::Sell, 10, 2, 5);
        let cheaper_late = order(OrderSide::Sell, 9, 3, 5);
        let buy = order(OrderSide::Buy, 10, 4, 20);

        let ranked = prioritize(&buy, vec![late.clone(), early.clone(), cheaper_late.clone()], at(10));
        let ids: Vec<_> = ranked.iter().map(|o| o.id).collect();

        assert_eq!(ids, vec![cheaper_late.id, early.id, late.id]);
    }

    #[test]
    fn test_same_timestamp_falls_back_to_sequence() {
        let mut first = order(OrderSide::Buy, 10, 1, 5);
        let mut second = order(OrderSide::Buy, 10, 1, 5);
        first.seq = 7;
        second.seq = 8;
        let sell = order(OrderSide::Sell, 10, 2, 5);

        let ranked = prioritize(&sell, vec![second.clone(), first.clone()], at(10));
        assert_eq!(ranked[0].id, first.id);
    }

    #[test]
    fn test_expired_and_own_orders_are_skipped() {
        let buy = order(OrderSide::Buy, 10, 5, 5);
        let mut expired = order(OrderSide::Sell, 9, 1, 5);
        expired.expires_at = Some(at(4));
        let mut own = order(OrderSide::Sell, 9, 2, 5);
        own.user_id = buy.user_id;
        let ok = order(OrderSide::Sell, 10, 3, 5);

        let ranked = prioritize(&buy, vec![expired, own, ok.clone()], at(6));
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, ok.id);
    }

    #[test]
    fn test_fill_quantity_uses_smaller_remainder() {
        let mut sell = order(OrderSide::Sell, 10, 1, 100);
        sell.filled_amount = 40;
        let buy = order(OrderSide::Buy, 10, 2, 80);
        assert_eq!(fill_quantity(&buy, &sell), 60);
    }

    #[test]
    fn test_status_after_fill() {
        assert_eq!(status_after_fill(100, 40), OrderStatus::PartiallyFilled);
        assert_eq!(status_after_fill(100, 100), OrderStatus::Filled);
        assert_eq!(status_after_fill(100, 0), OrderStatus::Open);
    }

    #[test]
    fn test_aggregate_levels_orders_sides() {
        let mut partly = order(OrderSide::Buy, 10, 1, 30);
        partly.filled_amount = 10;
        partly.status = OrderStatus::PartiallyFilled;
        let orders = vec![
            partly,
            order(OrderSide::Buy, 10, 2, 5),
            order(OrderSide::Buy, 12, 3, 1),
            order(OrderSide::Sell, 15, 4, 7),
            order(OrderSide::Sell, 14, 5, 3),
        ];

        let (bids, asks) = aggregate_levels(&orders, at(10));

        assert_eq!(bids[0].price, Decimal::from(12));
        assert_eq!(bids[1], PriceLevel { price: Decimal::from(10), token_amount: 25, order_count: 2 });
        assert_eq!(asks[0].price, Decimal::from(14));
        assert_eq!(asks[1].token_amount, 7);
    }
}
