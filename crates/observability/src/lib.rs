//! Process-wide tracing setup.
//!
//! Operational logs only. Audit records have their own sinks in `pennywise-infra`.

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber configuration (filters, formatting).
pub mod tracing;
