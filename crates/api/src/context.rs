//! Process-wide application context handed to every handler.
//!
//! Constructed once at startup and shared behind an `Arc`; there is no global state.

use std::sync::Arc;

use anyhow::Context as _;

use pennywise_auth::{AccessGate, AllowList, Identity};
use pennywise_core::{Mutation, TransactionRecord};
use pennywise_infra::{AuditLog, LedgerStore, LoadOutcome, StateFile};

use crate::config::Config;

#[derive(Debug)]
pub struct AppContext {
    pub ledger: LedgerStore,
    pub gate: AccessGate,
    transactions: Arc<AuditLog>,
    unauthorized: Arc<AuditLog>,
}

impl AppContext {
    pub fn new(
        ledger: LedgerStore,
        allowlist: AllowList,
        transactions: AuditLog,
        unauthorized: AuditLog,
    ) -> Self {
        let unauthorized = Arc::new(unauthorized);
        Self {
            ledger,
            gate: AccessGate::new(allowlist, Arc::clone(&unauthorized)),
            transactions: Arc::new(transactions),
            unauthorized,
        }
    }

    /// Open the audit trail, the allowlist and the ledger, in that order.
    ///
    /// Any failure here is fatal: the service never runs without its audit logs.
    pub fn bootstrap(config: &Config) -> anyhow::Result<Self> {
        let transactions = AuditLog::open(config.transaction_log_path())
            .context("failed to open transaction log")?;
        let unauthorized = AuditLog::open(config.unauthorized_log_path())
            .context("failed to open unauthorized log")?;

        let allowlist = AllowList::load(&config.users_file).context("failed to load users")?;
        if allowlist.is_empty() {
            tracing::warn!(path = %config.users_file.display(), "allowlist is empty; every request will be rejected");
        }

        let (ledger, outcome) =
            LedgerStore::open(StateFile::new(&config.state_file), config.on_corrupt_state)
                .context("failed to load ledger state")?;
        let state = outcome.state();
        match outcome {
            LoadOutcome::Fresh(_) => tracing::info!("no state file found; starting from zero"),
            LoadOutcome::Migrated(_) => tracing::info!("state file migrated to current layout"),
            LoadOutcome::Loaded(_) | LoadOutcome::Reset(_) => {}
        }
        tracing::info!(
            balance = state.balance,
            budget = state.budget,
            users = allowlist.len(),
            "ledger ready"
        );

        Ok(Self::new(ledger, allowlist, transactions, unauthorized))
    }

    /// Append a transaction line for an accepted mutation.
    ///
    /// Failures are logged and swallowed; the mutation is already durable.
    pub fn record_transaction(&self, identity: &Identity, mutation: Mutation) {
        let record = TransactionRecord::now(identity.as_str(), mutation.action(), mutation.amount());
        if let Err(e) = self.transactions.record_transaction(&record) {
            tracing::error!(error = %e, "failed to write transaction record");
        }
    }

    /// Flush and close both audit logs.
    pub fn shutdown(&self) {
        for log in [&self.transactions, &self.unauthorized] {
            if let Err(e) = log.close() {
                tracing::error!(error = %e, path = %log.path().display(), "failed to close audit log");
            }
        }
    }
}
