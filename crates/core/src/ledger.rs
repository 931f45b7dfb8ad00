//! The balance/budget pair and its transitions.
//!
//! Transitions are pure: they take the current state and return the next one, or a
//! [`LedgerError`] when the result would break an invariant. Callers persist the
//! returned state before adopting it.

use crate::audit::Action;
use crate::error::{LedgerError, LedgerResult};

/// Ceiling for both the balance and the budget, in minor units (about £20m).
///
/// Keeps every sum of two in-range values representable in an `i32`.
pub const MAX_BALANCE: i32 = 2_000_000_000;

/// Largest magnitude a single spend may carry, in minor units (about £1m).
pub const SPEND_LIMIT: i32 = 100_000_000;

/// The ledger: one balance and one budget for the whole deployment.
///
/// Invariants after any accepted transition:
/// - `balance <= MAX_BALANCE` (may be negative)
/// - `0 <= budget <= MAX_BALANCE`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerState {
    pub balance: i32,
    pub budget: i32,
}

impl LedgerState {
    pub fn new(balance: i32, budget: i32) -> Self {
        Self { balance, budget }
    }

    /// Empty ledger used when nothing has been persisted yet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compute the state that results from `mutation`.
    ///
    /// Range checks that don't depend on state are repeated here so the method is
    /// safe to call on unvalidated input.
    pub fn apply(&self, mutation: Mutation) -> LedgerResult<LedgerState> {
        let mutation = mutation.validate()?;
        match mutation {
            Mutation::Set { amount } => Ok(Self {
                balance: amount,
                budget: self.budget,
            }),
            Mutation::Spend { amount } => {
                let balance = self
                    .balance
                    .checked_sub(amount)
                    .filter(|b| *b <= MAX_BALANCE)
                    .ok_or(LedgerError::BalanceOverflow)?;
                Ok(Self {
                    balance,
                    budget: self.budget,
                })
            }
            Mutation::SetBudget { budget } => {
                // Raising the budget credits the difference, lowering it debits.
                let diff = budget
                    .checked_sub(self.budget)
                    .ok_or(LedgerError::BalanceOverflow)?;
                let balance = self
                    .balance
                    .checked_add(diff)
                    .filter(|b| *b <= MAX_BALANCE)
                    .ok_or(LedgerError::BalanceOverflow)?;
                Ok(Self { balance, budget })
            }
        }
    }
}

/// A requested change to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Replace the balance with an absolute value.
    Set { amount: i32 },
    /// Subtract a delta from the balance. Negative deltas are refunds.
    Spend { amount: i32 },
    /// Move the budget, shifting the balance by the same difference.
    SetBudget { budget: i32 },
}

impl Mutation {
    /// Check the request against policy ranges that don't depend on current state.
    pub fn validate(self) -> LedgerResult<Self> {
        match self {
            Mutation::Set { amount } if amount > MAX_BALANCE => {
                Err(LedgerError::AmountAboveMax(amount))
            }
            Mutation::Spend { amount } if !(-SPEND_LIMIT..=SPEND_LIMIT).contains(&amount) => {
                Err(LedgerError::SpendOutOfRange(amount))
            }
            Mutation::SetBudget { budget } if !(0..=MAX_BALANCE).contains(&budget) => {
                Err(LedgerError::BudgetOutOfRange(budget))
            }
            other => Ok(other),
        }
    }

    pub fn action(&self) -> Action {
        match self {
            Mutation::Set { .. } => Action::Set,
            Mutation::Spend { .. } => Action::Spend,
            Mutation::SetBudget { .. } => Action::BudgetChange,
        }
    }

    /// The figure recorded in the transaction log for this mutation.
    pub fn amount(&self) -> i32 {
        match *self {
            Mutation::Set { amount } | Mutation::Spend { amount } => amount,
            Mutation::SetBudget { budget } => budget,
        }
    }
}
