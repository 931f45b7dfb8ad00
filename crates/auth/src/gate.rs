//! Access control gate: classifies a request credential against the allowlist.

use std::sync::Arc;

use thiserror::Error;

use pennywise_core::UnauthorizedRecord;

use crate::AllowList;

/// Authenticated caller. Carries the credential unchanged for attribution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthzError {
    #[error("missing credential")]
    MissingCredential,

    #[error("unknown credential")]
    UnknownCredential,
}

/// Destination for unauthorized-access records.
///
/// Implementations must not fail the request: errors are theirs to report.
pub trait DenialRecorder: Send + Sync {
    fn record_denial(&self, record: &UnauthorizedRecord);
}

impl<T: DenialRecorder + ?Sized> DenialRecorder for Arc<T> {
    fn record_denial(&self, record: &UnauthorizedRecord) {
        (**self).record_denial(record)
    }
}

/// Allowlist check plus denial journaling.
pub struct AccessGate {
    allowlist: AllowList,
    recorder: Box<dyn DenialRecorder>,
}

impl AccessGate {
    pub fn new(allowlist: AllowList, recorder: impl DenialRecorder + 'static) -> Self {
        Self {
            allowlist,
            recorder: Box::new(recorder),
        }
    }

    /// Authorize `token` coming from `remote_addr`.
    ///
    /// A denial is recorded before it is returned, with the token exactly as
    /// supplied (empty when absent).
    pub fn authorize(&self, token: Option<&str>, remote_addr: &str) -> Result<Identity, AuthzError> {
        let supplied = token.unwrap_or_default();

        let outcome = if supplied.is_empty() {
            Err(AuthzError::MissingCredential)
        } else if !self.allowlist.contains(supplied) {
            Err(AuthzError::UnknownCredential)
        } else {
            Ok(Identity(supplied.to_owned()))
        };

        if let Err(reason) = &outcome {
            tracing::warn!(user = supplied, remote = remote_addr, %reason, "access denied");
            self.recorder
                .record_denial(&UnauthorizedRecord::now(supplied, remote_addr));
        }

        outcome
    }
}

impl core::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessGate")
            .field("allowlist_len", &self.allowlist.len())
            .finish_non_exhaustive()
    }
}
