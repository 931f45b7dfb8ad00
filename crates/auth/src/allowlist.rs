//! Static allowlist of user identifiers.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AllowListError {
    #[error("failed to read allowlist {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Identifiers permitted to call the ledger API.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    users: HashSet<String>,
}

impl AllowList {
    /// Parse newline-delimited identifiers. Lines are trimmed; blank lines are skipped.
    pub fn parse(source: &str) -> Self {
        let users = source
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        Self { users }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AllowListError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| AllowListError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&source))
    }

    pub fn contains(&self, user: &str) -> bool {
        !user.is_empty() && self.users.contains(user)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
