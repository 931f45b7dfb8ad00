//! `pennywise-core` — ledger domain primitives.
//!
//! This crate contains the **pure domain**: the balance/budget pair, the rules that
//! guard every transition, and the shape of audit records. No IO lives here.

pub mod audit;
pub mod error;
pub mod ledger;

pub use audit::{Action, TransactionRecord, UnauthorizedRecord};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{LedgerState, Mutation, MAX_BALANCE, SPEND_LIMIT};
