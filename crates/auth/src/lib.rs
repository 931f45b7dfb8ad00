//! `pennywise-auth` — allowlist-based access control.
//!
//! This crate is intentionally decoupled from HTTP and storage: the gate reports
//! denials through [`DenialRecorder`], and callers decide what a denial looks like
//! on the wire.

pub mod allowlist;
pub mod gate;

pub use allowlist::{AllowList, AllowListError};
pub use gate::{AccessGate, AuthzError, DenialRecorder, Identity};
