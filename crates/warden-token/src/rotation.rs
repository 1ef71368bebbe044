//! Signing-key rotation (supplementing spec.md §4.1's "the signing key is
//! the token authority key, distinct from vault encryption keys"): this key
//! has its own rotation lifecycle, independent of the secret-value rotation
//! C9 runs. Grounded on `toka-key-rotation`'s active-key-plus-overlap-window
//! pattern, narrowed to the one thing a token authority needs: keep
//! accepting signatures from the previous key for a grace window so tokens
//! issued just before a rotation don't instantly stop validating.

use std::time::Duration;

use chrono::{DateTime, Utc};
use warden_crypto::{TokenSigningKey, TokenVerifyingKey};

struct RetainedKey {
    verifying_key: TokenVerifyingKey,
    retired_at: DateTime<Utc>,
    valid_until: DateTime<Utc>,
}

/// Holds the active token-signing key and any still-trusted previous keys.
pub struct SigningKeyRing {
    active: parking_lot::RwLock<TokenSigningKey>,
    retained: parking_lot::RwLock<Vec<RetainedKey>>,
}

impl SigningKeyRing {
    /// Start with a freshly generated signing key.
    pub fn new() -> Self {
        Self::from_key(TokenSigningKey::generate())
    }

    /// Start from a specific signing key (e.g. loaded from the vault's
    /// `policies` section at startup).
    pub fn from_key(key: TokenSigningKey) -> Self {
        Self { active: parking_lot::RwLock::new(key), retained: parking_lot::RwLock::new(Vec::new()) }
    }

    /// The key currently used to sign newly issued tokens.
    pub fn signing_key(&self) -> parking_lot::RwLockReadGuard<'_, TokenSigningKey> {
        self.active.read()
    }

    /// Every verifying key a presented token may validate under right now:
    /// the active key, plus any retired key still inside its overlap
    /// window.
    pub fn verifying_keys(&self) -> Vec<TokenVerifyingKey> {
        let now = Utc::now();
        let mut keys = vec![self.active.read().verifying_key()];
        keys.extend(self.retained.read().iter().filter(|k| k.valid_until > now).map(|k| k.verifying_key));
        keys
    }

    /// Replace the active key with a fresh one, retaining the old one's
    /// verifying key as trusted for `overlap`.
    pub fn rotate(&self, overlap: Duration) {
        let now = Utc::now();
        let valid_until = now + chrono::Duration::from_std(overlap).unwrap_or(chrono::Duration::zero());
        let new_key = TokenSigningKey::generate();
        let old_key = std::mem::replace(&mut *self.active.write(), new_key);
        self.retained.write().push(RetainedKey { verifying_key: old_key.verifying_key(), retired_at: now, valid_until });
        tracing::info!(retired_at = %now, valid_until = %valid_until, "rotated token signing key");
    }

    /// Drop retained keys whose overlap window has elapsed.
    pub fn prune(&self) {
        let now = Utc::now();
        self.retained.write().retain(|k| k.valid_until > now);
    }

    /// How many retired keys are still held (active or expired), for tests
    /// and diagnostics.
    pub fn retained_count(&self) -> usize {
        self.retained.read().len()
    }
}

impl Default for SigningKeyRing {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotated_key_still_verifies_within_overlap() {
        let ring = SigningKeyRing::new();
        let old_verifying = ring.signing_key().verifying_key();
        ring.rotate(Duration::from_secs(60));
        let keys = ring.verifying_keys();
        assert!(keys.iter().any(|k| k.to_bytes() == old_verifying.to_bytes()));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn prune_drops_keys_past_their_overlap_window() {
        let ring = SigningKeyRing::new();
        ring.rotate(Duration::from_secs(0));
        std::thread::sleep(std::time::Duration::from_millis(5));
        ring.prune();
        assert_eq!(ring.retained_count(), 0);
    }
}
