//! Per-secret inner encryption layer (spec.md §4.1, §4.2): every
//! `SecretVersion` value is sealed under a key derived from the DEK and a
//! salt unique to that version, in addition to the outer AEAD layer
//! `warden-codec` applies to the whole document. This means a leak of the
//! DEK alone (without the per-version salts, which live only in the already
//! outer-encrypted document) is insufficient to recover any value, and a
//! compromised outer layer does not expose every secret through one key.
//!
//! This module is applied by `VaultHandle` immediately before
//! `warden_codec::encode` and immediately after `warden_codec::decode`, so
//! every other part of the store only ever sees plaintext `SecretBytes`.

use warden_types::{SecretBytes, VaultDocument};

use crate::error::StoreError;

fn version_aad(project: &str, key: &str, version: u64) -> Vec<u8> {
    format!("{project}\0{key}\0{version}").into_bytes()
}

/// Seal every version's value in place under its own inner key, ready for
/// the resulting document to be passed to `warden_codec::encode`. Draws a
/// fresh nonce for every version on every save, so ciphertext never repeats
/// across saves even when a value is unchanged.
pub fn seal_versions(doc: &mut VaultDocument, dek: &warden_crypto::Key) -> Result<(), StoreError> {
    for project in doc.projects.values_mut() {
        for secret in project.secrets.values_mut() {
            for version in secret.versions.iter_mut() {
                let inner_key = warden_crypto::derive_inner_key(dek, &version.inner_salt);
                let nonce = warden_crypto::random_nonce();
                let aad = version_aad(project.name.as_str(), secret.key.as_str(), version.version);
                let ciphertext = warden_crypto::seal(&inner_key, &nonce, &aad, version.value.expose())
                    .map_err(|_| StoreError::NotDecryptable)?;
                version.inner_nonce = nonce;
                version.value = SecretBytes::new(ciphertext);
            }
        }
    }
    Ok(())
}

/// Reverse [`seal_versions`] on a document freshly returned by
/// `warden_codec::decode`, restoring every version's value to plaintext.
pub fn open_versions(doc: &mut VaultDocument, dek: &warden_crypto::Key) -> Result<(), StoreError> {
    for project in doc.projects.values_mut() {
        for secret in project.secrets.values_mut() {
            for version in secret.versions.iter_mut() {
                let inner_key = warden_crypto::derive_inner_key(dek, &version.inner_salt);
                let aad = version_aad(project.name.as_str(), secret.key.as_str(), version.version);
                let plaintext = warden_crypto::open(&inner_key, &version.inner_nonce, &aad, version.value.expose())
                    .map_err(|_| StoreError::NotDecryptable)?;
                version.value = SecretBytes::new(plaintext);
            }
        }
    }
    Ok(())
}
