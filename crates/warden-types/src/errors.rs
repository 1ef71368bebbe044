//! The error taxonomy shared by every Warden crate (spec.md §7).
//!
//! Each crate defines its own `thiserror` enum for its own failure modes;
//! this type is the common classification every one of those enums maps into
//! via a `kind()` accessor, so the composition root can aggregate them into
//! one `WardenError` without losing the distinction callers actually care
//! about (retry? auth failure? bug?).

use serde::{Deserialize, Serialize};

/// Coarse classification of a failure, stable across crate boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller-supplied input failed validation.
    InputError,
    /// Token missing, expired, revoked, or signature invalid.
    AuthError,
    /// Referenced project, secret, or version does not exist.
    NotFound,
    /// The requested mutation conflicts with the current state.
    Conflict,
    /// On-disk or in-transit data failed an integrity check.
    IntegrityError,
    /// A filesystem or OS-level operation failed.
    IOError,
    /// The operation did not complete within its deadline.
    DeadlineExceeded,
    /// An invariant was violated that indicates a bug rather than bad input.
    InternalError,
}

/// Outcome recorded for an access attempt, independent of which specific
/// error (if any) produced it. Used by the audit log and the event bus so
/// both can describe "what happened" without depending on every crate's
/// concrete error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The operation completed as requested.
    Success,
    /// The operation was refused by policy (auth, rate limit, classification).
    Denied,
    /// The operation failed for a reason other than policy refusal.
    Error,
}
