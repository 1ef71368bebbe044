//! Secure random generation (spec.md §4.1): every nonce, salt, and token id
//! in the system is minted here so there is exactly one place that touches
//! the OS RNG.

use rand::RngCore;

/// Fill a freshly allocated buffer of `n` bytes from the OS RNG.
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}

/// A fresh 96-bit AES-GCM nonce. Never reused for the same key: callers that
/// need nonce-misuse resistance beyond "don't reuse by chance" should key
/// each encryption uniquely rather than relying on this alone.
pub fn random_nonce() -> [u8; 12] {
    let mut buf = [0u8; 12];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}

/// A fresh 128-bit salt, used for per-secret KDF inputs and KEK derivation.
pub fn random_salt() -> [u8; 16] {
    let mut buf = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}

/// A fresh 256-bit symmetric key (DEK, inner-layer key, etc.).
pub fn random_key() -> [u8; 32] {
    let mut buf = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonces_are_not_trivially_repeated() {
        let a = random_nonce();
        let b = random_nonce();
        assert_ne!(a, b);
    }
}
