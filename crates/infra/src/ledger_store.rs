//! The ledger's single exclusive-access domain.
//!
//! One mutex covers the balance/budget pair *and* the persistence step. Every
//! mutation runs state-dependent validation, writes the candidate state to disk and
//! only then adopts it in memory, all while holding the lock.

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use pennywise_core::{LedgerError, LedgerState, Mutation};

use crate::state_file::{LoadOutcome, StateFile, StateFileError};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Policy rejected the mutation; nothing changed.
    #[error(transparent)]
    Rejected(#[from] LedgerError),

    /// The candidate state could not be persisted; nothing changed.
    #[error(transparent)]
    Persistence(#[from] StateFileError),
}

/// What to do when the state file exists but has an unknown shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CorruptStatePolicy {
    /// Refuse to start.
    #[default]
    Fail,
    /// Move the file aside, start from an empty ledger and persist it.
    StartEmpty,
}

#[derive(Debug)]
pub struct LedgerStore {
    file: StateFile,
    state: Mutex<LedgerState>,
}

impl LedgerStore {
    /// Wrap an already-loaded state.
    pub fn new(file: StateFile, state: LedgerState) -> Self {
        Self {
            file,
            state: Mutex::new(state),
        }
    }

    /// Load the ledger from `file`, applying `policy` to a corrupt file.
    pub fn open(
        file: StateFile,
        policy: CorruptStatePolicy,
    ) -> Result<(Self, LoadOutcome), StateFileError> {
        let outcome = match file.load() {
            Ok(outcome) => outcome,
            Err(err @ StateFileError::Corrupt { .. }) if policy == CorruptStatePolicy::StartEmpty => {
                let moved = file.quarantine()?;
                let state = LedgerState::empty();
                file.save(&state)?;
                tracing::warn!(
                    error = %err,
                    quarantined = %moved.display(),
                    "state file unreadable; starting from an empty ledger"
                );
                LoadOutcome::Reset(state)
            }
            Err(err) => return Err(err),
        };

        Ok((Self::new(file, outcome.state()), outcome))
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // Memory is only written after a successful save, so a poisoned guard still
        // holds a committed state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state, read under the lock.
    pub fn snapshot(&self) -> LedgerState {
        *self.lock()
    }

    /// Validate, persist and commit `mutation` as one unit.
    pub fn apply(&self, mutation: Mutation) -> Result<LedgerState, StoreError> {
        let mutation = mutation.validate()?;

        let mut state = self.lock();
        let next = state.apply(mutation)?;
        self.file.save(&next)?;
        *state = next;
        Ok(next)
    }

    pub fn state_file(&self) -> &StateFile {
        &self.file
    }
}
