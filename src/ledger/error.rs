use rust_decimal::Decimal;
use thiserror::Error;

/// Typed failure raised by every ledger component.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("token amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("price must be positive, got {0}")]
    InvalidPrice(Decimal),

    #[error("{0}")]
    Validation(String),

    #[error("token amount {requested} is below the minimum investment of {minimum}")]
    BelowMinimum { requested: i64, minimum: i64 },

    #[error("insufficient supply: requested {requested}, available {available}")]
    InsufficientSupply { requested: i64, available: i64 },

    #[error("insufficient holdings: requested {requested}, free {available}")]
    InsufficientHoldings { requested: i64, available: i64 },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("investment is already cancelled")]
    AlreadyCancelled,

    #[error("dividend is already distributed")]
    AlreadyDistributed,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

impl LedgerError {
    /// Lock waits, serialization failures and lost connections are safe to
    /// retry; business rule failures are deterministic and never are.
    pub fn is_transient(&self) -> bool {
        match self {
            LedgerError::Storage(e) => is_transient_storage_error(e),
            _ => false,
        }
    }

    /// Business rule failures (everything but storage errors).
    pub fn is_rule_violation(&self) -> bool {
        !matches!(self, LedgerError::Storage(_))
    }
}

/// SQLSTATEs: lock_not_available, serialization_failure, deadlock_detected.
const TRANSIENT_SQLSTATES: &[&str] = &["55P03", "40001", "40P01"];

fn is_transient_storage_error(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db
            .code()
            .is_some_and(|code| TRANSIENT_SQLSTATES.contains(&&*code)),
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_errors_are_not_transient() {
        let e = LedgerError::InsufficientSupply {
            requested: 10,
            available: 5,
        };
        assert!(!e.is_transient());
        assert!(e.is_rule_violation());
        assert!(!LedgerError::AlreadyDistributed.is_transient());
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        let e = LedgerError::Storage(sqlx::Error::PoolTimedOut);
        assert!(e.is_transient());
        assert!(!e.is_rule_violation());
    }

    #[test]
    fn test_row_not_found_is_not_transient() {
        assert!(!LedgerError::Storage(sqlx::Error::RowNotFound).is_transient());
    }
}
