//! Consistency core: token supply, investments, order book and dividends.
//!
//! Every mutating operation runs in one Postgres transaction that first
//! takes the row lock on its `property_tokens` row, so all mutations of one
//! token are serialized. The invariant kept by every operation:
//! `sum(active investments) + available_supply == total_supply`.

pub mod allocation;
pub mod dividends;
pub mod error;
pub mod investments;
pub mod matching;
pub mod order_book;
pub mod retry;
pub mod supply;
pub mod tokenization;

use std::time::Duration;

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

pub use dividends::{DeclareDividend, Distribution, DividendDistributor};
pub use error::LedgerError;
pub use investments::InvestmentRecorder;
pub use order_book::{OrderBook, OrderBookSnapshot, PlaceOrder, PlacedOrder};
pub use retry::RetryPolicy;
pub use supply::{Reservation, TokenSupplyLedger};
pub use tokenization::{NewProperty, TokenizeProperty, TokenizedProperty, Tokenization};

/// Tuning shared by all ledger components.
#[derive(Debug, Clone, Copy)]
pub struct LedgerSettings {
    /// Upper bound on waiting for a token row lock.
    pub lock_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(2_000),
            retry: RetryPolicy::default(),
        }
    }
}

/// All ledger components over one pool.
#[derive(Clone)]
pub struct Ledger {
    pub supply: TokenSupplyLedger,
    pub investments: InvestmentRecorder,
    pub orders: OrderBook,
    pub dividends: DividendDistributor,
    pub tokenization: Tokenization,
}

impl Ledger {
    pub fn new(pool: PgPool, settings: LedgerSettings) -> Self {
        Self {
            supply: TokenSupplyLedger::new(pool.clone(), settings),
            investments: InvestmentRecorder::new(pool.clone(), settings),
            orders: OrderBook::new(pool.clone(), settings),
            dividends: DividendDistributor::new(pool.clone(), settings),
            tokenization: Tokenization::new(pool),
        }
    }
}

/// Open a transaction whose lock waits give up after `lock_timeout`.
pub(crate) async fn begin_bounded(
    pool: &PgPool,
    lock_timeout: Duration,
) -> Result<Transaction<'static, Postgres>, LedgerError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SELECT set_config('lock_timeout', $1, true)")
        .bind(format!("{}ms", lock_timeout.as_millis()))
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

pub(crate) fn ensure_positive_amount(amount: i64) -> Result<(), LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}

/// Prices are stored as `NUMERIC(20, 8)`.
pub const PRICE_SCALE: u32 = 8;
const PRICE_INTEGER_DIGITS: u32 = 12;
/// Investment and trade totals are stored as `NUMERIC(28, 8)`.
const NOTIONAL_INTEGER_DIGITS: u32 = 20;
/// Valuations and dividend amounts are stored as `NUMERIC(20, 2)`.
const CURRENCY_INTEGER_DIGITS: u32 = 18;

fn power_of_ten(exp: u32) -> Decimal {
    Decimal::from_i128_with_scale(10i128.pow(exp), 0)
}

/// A price must be positive and fit the stored column exactly.
pub(crate) fn ensure_valid_price(price: Decimal) -> Result<(), LedgerError> {
    if price <= Decimal::ZERO {
        return Err(LedgerError::InvalidPrice(price));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(LedgerError::Validation(format!(
            "price allows at most {PRICE_SCALE} decimal places"
        )));
    }
    if price >= power_of_ten(PRICE_INTEGER_DIGITS) {
        return Err(LedgerError::Validation(format!(
            "price must be below 10^{PRICE_INTEGER_DIGITS}"
        )));
    }
    Ok(())
}

/// `token_amount * price` must fit a stored total.
pub(crate) fn ensure_notional_fits(token_amount: i64, price: Decimal) -> Result<(), LedgerError> {
    let fits = Decimal::from(token_amount)
        .checked_mul(price)
        .is_some_and(|total| total < power_of_ten(NOTIONAL_INTEGER_DIGITS));
    if !fits {
        return Err(LedgerError::Validation(format!(
            "tokenAmount x price must be below 10^{NOTIONAL_INTEGER_DIGITS}"
        )));
    }
    Ok(())
}

/// Positive, in cents, and within the stored column.
pub(crate) fn ensure_currency_amount(field: &str, amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::Validation(format!("{field} must be positive")));
    }
    if amount.normalize().scale() > allocation::CURRENCY_SCALE {
        return Err(LedgerError::Validation(format!(
            "{field} allows at most {} decimal places",
            allocation::CURRENCY_SCALE
        )));
    }
    if amount >= power_of_ten(CURRENCY_INTEGER_DIGITS) {
        return Err(LedgerError::Validation(format!(
            "{field} must be below 10^{CURRENCY_INTEGER_DIGITS}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_price_scale_and_magnitude() {
        assert!(ensure_valid_price(dec("0.00000001")).is_ok());
        assert!(ensure_valid_price(dec("12.500000000")).is_ok());
        assert!(ensure_valid_price(dec("999999999999.99999999")).is_ok());

        assert!(matches!(ensure_valid_price(Decimal::ZERO), Err(LedgerError::InvalidPrice(_))));
        assert!(matches!(
            ensure_valid_price(dec("0.000000001")),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ensure_valid_price(dec("1000000000000")),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_notional_bound() {
        assert!(ensure_notional_fits(1_000_000, dec("99999999999999.99")).is_ok());
        assert!(matches!(
            ensure_notional_fits(1_000_000_000, dec("100000000000")),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ensure_notional_fits(i64::MAX, dec("999999999999.99999999")),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_currency_amount() {
        assert!(ensure_currency_amount("amount", dec("1000.10")).is_ok());
        assert!(ensure_currency_amount("amount", dec("0.001")).is_err());
        assert!(ensure_currency_amount("amount", dec("-5")).is_err());
        assert!(ensure_currency_amount("amount", dec("1000000000000000000")).is_err());
    }
}
