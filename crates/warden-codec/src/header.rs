//! The vault file header (spec.md §6): authenticated alongside the
//! ciphertext as AEAD associated data, so tampering with either is detected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_crypto::{KdfParams, WrappedDek};

/// One party able to unwrap the DEK: either a passphrase recipient (whose
/// KEK is re-derived from the passphrase and this recipient's `kdf`/`salt`)
/// or an external key recipient (whose KEK is supplied out of band).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    /// Opaque identifier for this recipient, used as AEAD associated data
    /// when wrapping/unwrapping its DEK copy.
    pub id: String,
    /// The DEK, wrapped under this recipient's KEK.
    pub wrapped_dek: WrappedDek,
    /// KDF parameters and salt, present only for passphrase recipients.
    pub kdf: Option<PassphraseKdf>,
}

/// KDF parameters needed to re-derive a passphrase recipient's KEK.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassphraseKdf {
    /// Argon2id cost parameters used at wrap time.
    pub params: KdfParams,
    /// Salt used at wrap time.
    pub salt: [u8; 16],
}

/// The vault file header, serialized as JSON between the fixed-size magic
/// framing and the ciphertext (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    /// Full schema version of the *document* this file encodes. The file
    /// format itself is versioned by `algo`.
    pub schema_version: u32,
    /// Algorithm identifier for the outer AEAD layer, e.g. `"AEAD-v1"`.
    pub algo: String,
    /// One entry per party that can unwrap the DEK.
    pub recipients: Vec<Recipient>,
    /// Nonce used to seal the ciphertext under the DEK.
    pub nonce: [u8; 12],
    /// When this file was first created (carried across rewrites).
    pub created_at: DateTime<Utc>,
    /// Identifier of the hash function used for `VaultMetadata::fingerprint`.
    pub fingerprint_algo: String,
}

impl Header {
    /// Algorithm identifier this build writes.
    pub const ALGO_V1: &'static str = "AEAD-v1";
    /// Fingerprint algorithm identifier this build writes.
    pub const FINGERPRINT_BLAKE3: &'static str = "blake3";
    /// Highest document schema version this build understands.
    pub const SUPPORTED_SCHEMA_VERSION: u32 = 1;
}
