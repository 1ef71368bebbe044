//! AES-256-GCM authenticated encryption, used both for the vault file
//! envelope (`warden-codec`) and the per-secret inner encryption layer
//! (spec.md §4.1, §4.2).

use aes_gcm::aead::{generic_array::GenericArray, Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::rng::random_key;

/// A 256-bit symmetric key, zeroized on drop. Used as a DEK, a KEK, or a
/// per-secret inner key.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Key([u8; 32]);

impl Key {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh random key.
    pub fn generate() -> Self {
        Self(random_key())
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Key(<redacted>)")
    }
}

/// Seal `plaintext` under `key`/`nonce`, authenticating `aad` alongside it.
/// The returned buffer is ciphertext with the GCM tag appended, matching the
/// layout `aes-gcm` produces natively.
pub fn seal(key: &Key, nonce: &[u8; 12], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(GenericArray::from_slice(&key.0));
    let payload = aes_gcm::aead::Payload { msg: plaintext, aad };
    cipher
        .encrypt(GenericArray::from_slice(nonce), payload)
        .map_err(|_| CryptoError::Aead)
}

/// Open a buffer produced by [`seal`]. Fails if `key`, `nonce`, or `aad`
/// don't match, or if the ciphertext was tampered with.
pub fn open(key: &Key, nonce: &[u8; 12], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(GenericArray::from_slice(&key.0));
    let payload = aes_gcm::aead::Payload { msg: ciphertext, aad };
    cipher
        .decrypt(GenericArray::from_slice(nonce), payload)
        .map_err(|_| CryptoError::Aead)
}

/// A data encryption key wrapped under a key encryption key, ready to be
/// stored in a vault file's header alongside its recipient identifier
/// (spec.md §6, `recipients[]`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WrappedDek {
    /// Nonce used to wrap the DEK.
    pub nonce: [u8; 12],
    /// `seal(kek, nonce, recipient_id, dek_bytes)`.
    pub ciphertext: Vec<u8>,
}

/// Wrap `dek` under `kek`, binding `recipient_id` as associated data so a
/// wrapped blob cannot be silently relabeled to a different recipient.
pub fn wrap_dek(kek: &Key, dek: &Key, recipient_id: &[u8]) -> Result<WrappedDek, CryptoError> {
    let nonce = crate::rng::random_nonce();
    let ciphertext = seal(kek, &nonce, recipient_id, dek.as_bytes())?;
    Ok(WrappedDek { nonce, ciphertext })
}

/// Recover the DEK wrapped in `wrapped`, given the unwrapping `kek` and the
/// same `recipient_id` used at wrap time.
pub fn unwrap_dek(kek: &Key, wrapped: &WrappedDek, recipient_id: &[u8]) -> Result<Key, CryptoError> {
    let raw = open(kek, &wrapped.nonce, recipient_id, &wrapped.ciphertext)?;
    let bytes: [u8; 32] = raw
        .try_into()
        .map_err(|v: Vec<u8>| CryptoError::BadLength { expected: 32, got: v.len() })?;
    Ok(Key(bytes))
}

/// Derive a per-secret inner encryption key from the DEK and a per-version
/// salt (spec.md §4.1's optional inner layer: "so that an audit of the file
/// cannot reveal values without the DEK and salts").
pub fn derive_inner_key(dek: &Key, salt: &[u8; 16]) -> Key {
    let mut material = Vec::with_capacity(32 + 16);
    material.extend_from_slice(&dek.0);
    material.extend_from_slice(salt);
    Key(blake3::derive_key("warden secret inner key v1", &material))
}

impl Drop for WrappedDek {
    fn drop(&mut self) {
        self.ciphertext.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let key = Key::generate();
        let nonce = crate::rng::random_nonce();
        let ct = seal(&key, &nonce, b"aad", b"hello").unwrap();
        let pt = open(&key, &nonce, b"aad", &ct).unwrap();
        assert_eq!(pt, b"hello");
    }

    #[test]
    fn tampered_aad_fails_to_open() {
        let key = Key::generate();
        let nonce = crate::rng::random_nonce();
        let ct = seal(&key, &nonce, b"aad-one", b"hello").unwrap();
        assert!(open(&key, &nonce, b"aad-two", &ct).is_err());
    }

    #[test]
    fn wrap_unwrap_dek_roundtrip() {
        let kek = Key::generate();
        let dek = Key::generate();
        let wrapped = wrap_dek(&kek, &dek, b"recipient-1").unwrap();
        let recovered = unwrap_dek(&kek, &wrapped, b"recipient-1").unwrap();
        assert_eq!(recovered.as_bytes(), dek.as_bytes());
    }

    #[test]
    fn unwrap_dek_fails_for_wrong_recipient() {
        let kek = Key::generate();
        let dek = Key::generate();
        let wrapped = wrap_dek(&kek, &dek, b"recipient-1").unwrap();
        assert!(unwrap_dek(&kek, &wrapped, b"recipient-2").is_err());
    }
}
