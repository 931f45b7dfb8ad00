//! Infrastructure layer: durable state file, ledger store, audit log sinks.

pub mod audit_log;
pub mod ledger_store;
pub mod state_file;

pub use audit_log::{AuditLog, AuditLogError};
pub use ledger_store::{CorruptStatePolicy, LedgerStore, StoreError};
pub use state_file::{LoadOutcome, StateFile, StateFileError};
