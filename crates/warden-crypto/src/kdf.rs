//! Passphrase-derived key encryption keys (spec.md §4.1: "a KEK may be a
//! passphrase-derived key (KDF with tunable cost)").

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use crate::aead::Key;
use crate::error::CryptoError;

/// Tunable Argon2id cost parameters, persisted in the vault file header
/// (spec.md §6 `kdf`) so a vault opened later re-derives the same KEK.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of iterations.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for KdfParams {
    /// Conservative interactive-use defaults; callers storing many vaults or
    /// running on constrained hardware may dial these down, but never below
    /// the OWASP-recommended floor for Argon2id.
    fn default() -> Self {
        Self { memory_kib: 19 * 1024, iterations: 2, parallelism: 1 }
    }
}

/// Derive a 256-bit KEK from `passphrase` and `salt` using Argon2id.
pub fn derive_kek(passphrase: &str, salt: &[u8; 16], params: KdfParams) -> Result<Key, CryptoError> {
    let argon2_params = Params::new(params.memory_kib, params.iterations, params.parallelism, Some(32))
        .map_err(|e| CryptoError::Kdf(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);
    let mut out = [0u8; 32];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut out)
        .map_err(|e| CryptoError::Kdf(e.to_string()))?;
    Ok(Key::from_bytes(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Cheap params so the test suite stays fast; production callers use
    // `KdfParams::default()`.
    fn test_params() -> KdfParams {
        KdfParams { memory_kib: 8 * 1024, iterations: 1, parallelism: 1 }
    }

    #[test]
    fn same_passphrase_and_salt_derive_the_same_kek() {
        let salt = [7u8; 16];
        let a = derive_kek("hunter2", &salt, test_params()).unwrap();
        let b = derive_kek("hunter2", &salt, test_params()).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_salts_derive_different_keks() {
        let a = derive_kek("hunter2", &[1u8; 16], test_params()).unwrap();
        let b = derive_kek("hunter2", &[2u8; 16], test_params()).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }
}
