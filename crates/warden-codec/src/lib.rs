//! Vault file codec for Warden (C2): canonicalize, encrypt, and durably
//! write the in-memory document; conversely, decrypt, verify, and parse.
//!
//! `warden-store` is the only expected caller: it owns the in-memory
//! `VaultDocument` and the unlock material, and calls through to this crate
//! for everything that touches disk or the outer AEAD layer.

#![forbid(unsafe_code)]

mod canonical;
mod envelope;
mod error;
mod file;
mod header;
mod lock;

pub use canonical::{canonicalize, compute_fingerprint, fingerprint};
pub use envelope::{decode, encode};
pub use error::CodecError;
pub use file::{read_vault_file, write_vault_file};
pub use header::{Header, PassphraseKdf, Recipient};
pub use lock::{acquire_exclusive, acquire_shared, VaultLock};
