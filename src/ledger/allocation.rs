//! Pro-rata split of a dividend pool across holdings.

use rust_decimal::{Decimal, RoundingStrategy};

use super::LedgerError;

/// Payments are made in cents.
pub const CURRENCY_SCALE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// One share per input holding, in input order.
    pub shares: Vec<Decimal>,
    /// Pro-rata share of supply nobody holds.
    pub retained: Decimal,
}

/// Split `pool` so holding `i` receives `pool * holdings[i] / total_supply`,
/// rounded down to cents.
///
/// The holders' pool is `pool * sum(holdings) / total_supply` rounded down to
/// cents; whatever the per-holding rounding leaves over goes to the largest
/// holding (the earliest one on ties, so callers should pass holdings oldest
/// first). `sum(shares) + retained == pool` always holds.
pub fn allocate(pool: Decimal, total_supply: i64, holdings: &[i64]) -> Result<Allocation, LedgerError> {
    if pool <= Decimal::ZERO {
        return Err(LedgerError::Validation("dividend amount must be positive".into()));
    }
    if total_supply <= 0 {
        return Err(LedgerError::InvalidAmount(total_supply));
    }
    if let Some(bad) = holdings.iter().copied().find(|h| *h <= 0) {
        return Err(LedgerError::InvalidAmount(bad));
    }
    let held: i64 = holdings.iter().sum();
    if held > total_supply {
        return Err(LedgerError::InvalidState(format!(
            "holdings {held} exceed total supply {total_supply}"
        )));
    }

    let holders_pool = pro_rata(pool, held, total_supply)?;
    let mut shares = holdings
        .iter()
        .map(|h| pro_rata(pool, *h, total_supply))
        .collect::<Result<Vec<_>, _>>()?;

    let residue = holders_pool - shares.iter().copied().sum::<Decimal>();
    if residue > Decimal::ZERO {
        if let Some(largest) = largest_index(holdings) {
            shares[largest] += residue;
        }
    }

    Ok(Allocation {
        shares,
        retained: pool - holders_pool,
    })
}

fn pro_rata(pool: Decimal, amount: i64, total_supply: i64) -> Result<Decimal, LedgerError> {
    pool.checked_mul(Decimal::from(amount))
        .and_then(|scaled| scaled.checked_div(Decimal::from(total_supply)))
        .map(|share| share.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::ToZero))
        .ok_or_else(|| LedgerError::Validation("dividend amount is too large".into()))
}

fn largest_index(holdings: &[i64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, h) in holdings.iter().enumerate() {
        match best {
            Some(b) if holdings[b] >= *h => {}
            _ => best = Some(i),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(v: i64) -> Decimal {
        Decimal::new(v, 2)
    }

    #[test]
    fn test_fully_held_supply_splits_exactly() {
        let a = allocate(cents(100_000), 1000, &[300, 700]).unwrap();
        assert_eq!(a.shares, vec![cents(30_000), cents(70_000)]);
        assert_eq!(a.shares.iter().copied().sum::<Decimal>(), cents(100_000));
        assert_eq!(a.retained, Decimal::ZERO);
    }

    #[test]
    fn test_rounding_residue_goes_to_largest_holder() {
        let a = allocate(cents(10_000), 7, &[2, 3, 2]).unwrap();
        // 100 * 2/7 = 28.571.. -> 28.57, 100 * 3/7 = 42.857.. -> 42.85
        assert_eq!(a.shares, vec![cents(2857), cents(4286), cents(2857)]);
        assert_eq!(a.shares.iter().copied().sum::<Decimal>(), cents(10_000));
    }

    #[test]
    fn test_equal_holders_tie_goes_to_first() {
        let a = allocate(cents(10_000), 3, &[1, 1, 1]).unwrap();
        assert_eq!(a.shares, vec![cents(3334), cents(3333), cents(3333)]);
    }

    #[test]
    fn test_unsold_supply_is_retained() {
        let a = allocate(cents(100_000), 1000, &[300]).unwrap();
        assert_eq!(a.shares, vec![cents(30_000)]);
        assert_eq!(a.retained, cents(70_000));
    }

    #[test]
    fn test_no_holders_retains_everything() {
        let a = allocate(cents(5_000), 10, &[]).unwrap();
        assert!(a.shares.is_empty());
        assert_eq!(a.retained, cents(5_000));
    }

    #[test]
    fn test_shares_and_retained_always_sum_to_pool() {
        let pool = cents(123_457);
        let a = allocate(pool, 997, &[13, 401, 89, 250]).unwrap();
        let paid: Decimal = a.shares.iter().copied().sum();
        assert_eq!(paid + a.retained, pool);
    }

    #[test]
    fn test_rejects_holdings_above_supply() {
        assert!(matches!(
            allocate(cents(100), 10, &[6, 5]),
            Err(LedgerError::InvalidState(_))
        ));
    }
}
