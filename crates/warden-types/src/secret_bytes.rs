//! Plaintext byte buffer that is wiped when dropped.
//!
//! spec.md §5 ("Memory hygiene") requires that plaintext values and derived
//! keys are overwritten with zeros when their owning scope ends. [`SecretBytes`]
//! is the one place in the data model where plaintext is ever held; everywhere
//! else (on disk, in the audit log, in events) only ciphertext or a checksum
//! travels.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A plaintext byte buffer, zeroized on drop. `Debug` never prints the
/// contents; `Serialize`/`Deserialize` are provided so the type can flow
/// through the transient in-memory load/save path (spec.md §4.2) without
/// every call site manually unwrapping it, but callers persisting a
/// `VaultDocument` must route through `warden-codec`, which encrypts before
/// any byte of this type reaches disk.
#[derive(Clone, Serialize, Deserialize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    /// Wrap a plaintext buffer.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Borrow the plaintext bytes.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Explicitly overwrite the buffer with zeros without waiting for drop.
    pub fn wipe(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretBytes").field(&"<redacted>").finish()
    }
}

impl PartialEq for SecretBytes {
    fn eq(&self, other: &Self) -> bool {
        // Not constant-time: this is a value-equality check for tests and
        // application logic, not a MAC/signature comparison. Use
        // `warden_crypto::ct_eq` when comparing attacker-observable secrets.
        self.0 == other.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_contents() {
        let s = SecretBytes::new(b"p@ss-1".to_vec());
        assert!(!format!("{s:?}").contains("p@ss-1"));
    }

    #[test]
    fn wipe_zeroes_in_place() {
        let mut s = SecretBytes::new(vec![1, 2, 3]);
        s.wipe();
        assert_eq!(s.expose(), &[0, 0, 0]);
    }
}
