//! Append-only, hash-chained audit log for Warden (C4): tolerates process
//! crash without losing entries already `fsync`'d, and never stores
//! plaintext secret values.

#![forbid(unsafe_code)]

mod error;
mod log;
mod record;

pub use error::AuditError;
pub use log::{AuditLog, EpochHeader};
pub use record::{compute_hash, genesis_hash, AlertSeverity, AuditKind, AuditRecord};
