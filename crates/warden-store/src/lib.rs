//! Vault store for Warden (C3): owns the in-memory `VaultDocument`, enforces
//! every mutation invariant (version retention, grace windows, rotation
//! policy bounds), and coordinates with `warden-codec` for durable,
//! crash-safe persistence.
//!
//! Callers never see ciphertext: `VaultHandle` applies the per-secret inner
//! encryption layer around every save/load so the rest of the system only
//! ever holds plaintext `SecretBytes` or a `StoreError`.

#![forbid(unsafe_code)]

mod error;
mod handle;
mod inner;
mod kek;
mod retention;

pub use error::StoreError;
pub use handle::{RetentionConfig, VaultHandle};
pub use kek::{KekRecipient, PassphraseRecipient};
