//! Domain error model.

use thiserror::Error;

/// Result type used across the ledger domain.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// A transition rejected by ledger policy.
///
/// Every variant leaves the ledger untouched. None of them is audit-logged.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    /// An absolute balance above the ceiling.
    #[error("amount {0} exceeds limit")]
    AmountAboveMax(i32),

    /// A single spend larger than the per-transaction cap (either sign).
    #[error("transaction of {0} is too large")]
    SpendOutOfRange(i32),

    /// A budget outside `0..=MAX_BALANCE`.
    #[error("invalid budget amount {0}")]
    BudgetOutOfRange(i32),

    /// The resulting balance would wrap or exceed the ceiling.
    #[error("resulting balance out of range")]
    BalanceOverflow,
}
