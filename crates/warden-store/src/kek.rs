//! Pluggable KEK recipients (spec.md §4.1, §4.2): "Multiple recipients are
//! supported by storing multiple wrapped DEK blobs." Expressed as a small
//! capability interface so an external key recipient (an HSM, a KMS) can be
//! registered at the composition root without this crate knowing about it
//! (spec.md §"Dynamic dispatch and pluggable behaviors").

use warden_crypto::{CryptoError, Key};
use warden_codec::{PassphraseKdf, Recipient};

/// A party capable of wrapping and unwrapping a DEK.
pub trait KekRecipient: Send + Sync {
    /// Stable identifier for this recipient, stored in the header and used
    /// as AEAD associated data.
    fn id(&self) -> &str;

    /// Derive (or otherwise obtain) this recipient's KEK and wrap `dek`
    /// under it, producing the header entry to persist.
    fn wrap(&self, dek: &Key) -> Result<Recipient, CryptoError>;

    /// Recover the DEK from a header entry this recipient previously wrote
    /// (by `id`).
    fn unwrap(&self, recipient: &Recipient) -> Result<Key, CryptoError>;
}

/// A recipient whose KEK is derived from a passphrase via Argon2id.
pub struct PassphraseRecipient {
    id: String,
    passphrase: String,
    params: warden_crypto::KdfParams,
}

impl PassphraseRecipient {
    /// Construct a passphrase recipient. `id` should be stable across
    /// open/close cycles (e.g. `"default"` for a single-operator vault).
    pub fn new(id: impl Into<String>, passphrase: impl Into<String>, params: warden_crypto::KdfParams) -> Self {
        Self { id: id.into(), passphrase: passphrase.into(), params }
    }
}

impl KekRecipient for PassphraseRecipient {
    fn id(&self) -> &str {
        &self.id
    }

    fn wrap(&self, dek: &Key) -> Result<Recipient, CryptoError> {
        let salt = warden_crypto::random_salt();
        let kek = warden_crypto::derive_kek(&self.passphrase, &salt, self.params)?;
        let wrapped_dek = warden_crypto::wrap_dek(&kek, dek, self.id.as_bytes())?;
        Ok(Recipient { id: self.id.clone(), wrapped_dek, kdf: Some(PassphraseKdf { params: self.params, salt }) })
    }

    fn unwrap(&self, recipient: &Recipient) -> Result<Key, CryptoError> {
        let kdf = recipient
            .kdf
            .as_ref()
            .ok_or_else(|| CryptoError::Kdf("recipient has no passphrase KDF parameters".into()))?;
        let kek = warden_crypto::derive_kek(&self.passphrase, &kdf.salt, kdf.params)?;
        warden_crypto::unwrap_dek(&kek, &recipient.wrapped_dek, recipient.id.as_bytes())
    }
}
