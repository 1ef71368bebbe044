//! Cryptographic primitives for Warden (C1): authenticated encryption for
//! the vault file envelope and per-secret inner layer, passphrase-based key
//! derivation, token signing, secure RNG, and constant-time comparison.
//!
//! This crate has no knowledge of the vault's data model or file format; it
//! only provides the primitives `warden-codec` and `warden-token` compose.

#![forbid(unsafe_code)]

mod aead;
mod ct;
mod error;
mod kdf;
mod rng;
mod signing;

pub use aead::{derive_inner_key, open, seal, wrap_dek, unwrap_dek, Key, WrappedDek};
pub use ct::ct_eq;
pub use error::CryptoError;
pub use kdf::{derive_kek, KdfParams};
pub use rng::{random_bytes, random_key, random_nonce, random_salt};
pub use signing::{TokenSigningKey, TokenVerifyingKey};
