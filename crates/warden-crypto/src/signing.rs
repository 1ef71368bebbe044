//! Token signing (spec.md §4.1: "asymmetric signature (Ed25519-class) over a
//! canonical token payload"). The key used here is the token authority key,
//! distinct from any vault encryption key (`warden-token` owns that
//! distinction; this module only wraps the primitive).

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::error::CryptoError;

/// An Ed25519 keypair used to sign bearer tokens.
pub struct TokenSigningKey(SigningKey);

impl TokenSigningKey {
    /// Generate a fresh signing key.
    pub fn generate() -> Self {
        Self(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Reconstruct a signing key from its 32-byte seed.
    pub fn from_bytes(seed: &[u8; 32]) -> Self {
        Self(SigningKey::from_bytes(seed))
    }

    /// The 32-byte seed, for persisting this key at rest.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Derive the corresponding public verifying key.
    pub fn verifying_key(&self) -> TokenVerifyingKey {
        TokenVerifyingKey(self.0.verifying_key())
    }

    /// Sign `payload`, returning a 64-byte detached signature.
    pub fn sign(&self, payload: &[u8]) -> [u8; 64] {
        self.0.sign(payload).to_bytes()
    }
}

/// The public half of a [`TokenSigningKey`], used to verify token signatures.
#[derive(Clone, Copy)]
pub struct TokenVerifyingKey(VerifyingKey);

impl TokenVerifyingKey {
    /// Reconstruct a verifying key from its 32-byte encoding.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::BadLength { expected: 32, got: bytes.len() })
    }

    /// The 32-byte encoding of this key, for embedding in a token header.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Verify that `signature` over `payload` was produced by the matching
    /// [`TokenSigningKey`].
    pub fn verify(&self, payload: &[u8], signature: &[u8; 64]) -> Result<(), CryptoError> {
        let sig = Signature::from_bytes(signature);
        self.0.verify(payload, &sig).map_err(|_| CryptoError::BadSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let key = TokenSigningKey::generate();
        let sig = key.sign(b"payload");
        assert!(key.verifying_key().verify(b"payload", &sig).is_ok());
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let key = TokenSigningKey::generate();
        let sig = key.sign(b"payload");
        assert!(key.verifying_key().verify(b"other-payload", &sig).is_err());
    }

    #[test]
    fn verifying_key_survives_byte_roundtrip() {
        let key = TokenSigningKey::generate();
        let vk_bytes = key.verifying_key().to_bytes();
        let vk = TokenVerifyingKey::from_bytes(&vk_bytes).unwrap();
        let sig = key.sign(b"payload");
        assert!(vk.verify(b"payload", &sig).is_ok());
    }
}
