//! Append-only audit log sink.
//!
//! One instance per log stream. A single mutex guards the file handle for the whole
//! write so concurrent callers never interleave lines.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use pennywise_auth::DenialRecorder;
use pennywise_core::{TransactionRecord, UnauthorizedRecord};

#[derive(Debug, Error)]
pub enum AuditLogError {
    #[error("audit log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Write attempted after [`AuditLog::close`]. This is a caller bug.
    #[error("audit log {0} is closed")]
    Closed(PathBuf),
}

#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl AuditLog {
    /// Open `path` for appending, creating it if needed. Existing content is kept.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditLogError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditLogError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line. A trailing newline is added.
    pub fn write_line(&self, line: &str) -> Result<(), AuditLogError> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let file = guard
            .as_mut()
            .ok_or_else(|| AuditLogError::Closed(self.path.clone()))?;
        file.write_all(buf.as_bytes()).map_err(|source| AuditLogError::Io {
            path: self.path.clone(),
            source,
        })
    }

    pub fn record_transaction(&self, record: &TransactionRecord) -> Result<(), AuditLogError> {
        self.write_line(&record.to_string())
    }

    /// Flush and sync, then release the handle. Closing twice is a no-op.
    pub fn close(&self) -> Result<(), AuditLogError> {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(mut file) = guard.take() else {
            return Ok(());
        };
        file.flush()
            .and_then(|()| file.sync_all())
            .map_err(|source| AuditLogError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

impl DenialRecorder for AuditLog {
    fn record_denial(&self, record: &UnauthorizedRecord) {
        if let Err(e) = self.write_line(&record.to_string()) {
            tracing::error!(error = %e, "failed to write unauthorized record");
        }
    }
}
