//! Fixed-layout binary persistence for the ledger.
//!
//! Current layout is 8 bytes: little-endian `i32` balance, then little-endian `i32`
//! budget. The legacy layout is 4 bytes holding only the balance; it is rewritten in
//! the current layout the first time it is loaded.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use pennywise_core::LedgerState;

/// Size of a current-format state file.
pub const STATE_LEN: usize = 8;

/// Size of a legacy (balance-only) state file.
pub const LEGACY_STATE_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum StateFileError {
    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} has invalid length {len}")]
    Corrupt { path: PathBuf, len: usize },
}

/// How the ledger came to be in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No state file existed.
    Fresh(LedgerState),
    /// Read from a current-format file.
    Loaded(LedgerState),
    /// Read from a legacy file and rewritten in the current format.
    Migrated(LedgerState),
    /// The file was unreadable; it was moved aside and the ledger started empty.
    Reset(LedgerState),
}

impl LoadOutcome {
    pub fn state(&self) -> LedgerState {
        match *self {
            LoadOutcome::Fresh(s)
            | LoadOutcome::Loaded(s)
            | LoadOutcome::Migrated(s)
            | LoadOutcome::Reset(s) => s,
        }
    }
}

pub fn encode(state: &LedgerState) -> [u8; STATE_LEN] {
    let mut out = [0u8; STATE_LEN];
    out[..4].copy_from_slice(&state.balance.to_le_bytes());
    out[4..].copy_from_slice(&state.budget.to_le_bytes());
    out
}

fn read_i32(bytes: &[u8]) -> i32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    i32::from_le_bytes(word)
}

/// Location of the ledger's state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StateFileError {
        StateFileError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Read the ledger from disk, migrating a legacy file in place.
    pub fn load(&self) -> Result<LoadOutcome, StateFileError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LoadOutcome::Fresh(LedgerState::empty()));
            }
            Err(e) => return Err(self.io_err(e)),
        };

        match bytes.len() {
            STATE_LEN => Ok(LoadOutcome::Loaded(LedgerState::new(
                read_i32(&bytes[..4]),
                read_i32(&bytes[4..]),
            ))),
            LEGACY_STATE_LEN => {
                let state = LedgerState::new(read_i32(&bytes), 0);
                self.save(&state)?;
                tracing::info!(
                    path = %self.path.display(),
                    balance = state.balance,
                    "migrated state file from 4-byte to 8-byte layout"
                );
                Ok(LoadOutcome::Migrated(state))
            }
            len => Err(StateFileError::Corrupt {
                path: self.path.clone(),
                len,
            }),
        }
    }

    /// Durably replace the state file with `state`.
    ///
    /// Writes a temp file in the same directory, syncs it, renames it over the
    /// target and syncs the directory, so a crash leaves either the old or the new
    /// contents on disk.
    pub fn save(&self, state: &LedgerState) -> Result<(), StateFileError> {
        let dir = self.parent_dir();

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.io_err(e))?;
        tmp.as_file_mut()
            .write_all(&encode(state))
            .map_err(|e| self.io_err(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_err(e.error))?;

        sync_dir(&dir).map_err(|e| self.io_err(e))
    }

    /// Move an unreadable state file out of the way, returning where it went.
    ///
    /// The first free name of `<state>.corrupt`, `<state>.corrupt.1`, ... is used;
    /// earlier quarantined files are never replaced.
    pub fn quarantine(&self) -> Result<PathBuf, StateFileError> {
        let mut attempt = 0u32;
        let target = loop {
            let mut name = self.path.clone().into_os_string();
            name.push(".corrupt");
            if attempt > 0 {
                name.push(format!(".{attempt}"));
            }
            let candidate = PathBuf::from(name);

            // hard_link refuses an existing destination, unlike rename.
            match std::fs::hard_link(&self.path, &candidate) {
                Ok(()) => break candidate,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(self.io_err(e)),
            }
        };

        std::fs::remove_file(&self.path).map_err(|e| self.io_err(e))?;
        sync_dir(&self.parent_dir()).map_err(|e| self.io_err(e))?;
        Ok(target)
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
