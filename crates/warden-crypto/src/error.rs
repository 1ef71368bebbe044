use warden_types::ErrorKind;

/// Failures raised by the crypto primitives (spec.md §4.1).
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AEAD seal or open failed (wrong key, tampered ciphertext, or bad nonce).
    #[error("authenticated encryption failure")]
    Aead,
    /// A key, nonce, or salt had the wrong length for the algorithm.
    #[error("bad key material length: expected {expected}, got {got}")]
    BadLength {
        /// Length required by the algorithm.
        expected: usize,
        /// Length actually supplied.
        got: usize,
    },
    /// Signature verification failed.
    #[error("signature verification failed")]
    BadSignature,
    /// KDF parameters were rejected by the underlying implementation.
    #[error("key derivation failed: {0}")]
    Kdf(String),
}

impl CryptoError {
    /// Maps this error onto the shared taxonomy (spec.md §7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            CryptoError::Aead | CryptoError::BadSignature => ErrorKind::IntegrityError,
            CryptoError::BadLength { .. } => ErrorKind::InputError,
            CryptoError::Kdf(_) => ErrorKind::InternalError,
        }
    }
}
