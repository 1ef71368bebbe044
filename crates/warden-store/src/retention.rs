//! Version retention and lifecycle transitions (spec.md §4.4, §8): a new
//! version becomes `active`, the version it replaces moves to `grace` for a
//! bounded window, and anything older than that (or past its grace window)
//! becomes `retired` and is zeroized on the next save.

use chrono::{DateTime, Utc};
use warden_types::{Secret, SecretBytes, VersionState};

/// Add `new_version` as the secret's new active version, demoting the
/// previous active version to `grace` and retiring anything that falls out
/// of the retained window.
///
/// `grace_seconds` is the window during which the just-superseded version
/// remains readable (spec.md §4.4's `graceSeconds`). `n_retain` bounds how
/// many versions (active + grace + retired placeholders) are kept at all;
/// older ones are dropped outright rather than merely retired, since a
/// dropped version can never become unreadable again.
pub fn promote_new_version(secret: &mut Secret, now: DateTime<Utc>, grace_seconds: u64, n_retain: usize) {
    for version in secret.versions.iter_mut() {
        if version.state == VersionState::Active {
            version.state = VersionState::Grace;
            version.retired_at = Some(now + chrono::Duration::seconds(grace_seconds as i64));
        }
    }
    sweep_expired_grace(secret, now);
    enforce_retention(secret, n_retain);
}

/// Move every `grace` version whose window (stored in `retired_at`, which
/// doubles as "grace deadline" while the version is in `grace`) has elapsed
/// into `retired`, zeroizing its plaintext immediately since it is no
/// longer readable by any operation.
pub fn sweep_expired_grace(secret: &mut Secret, now: DateTime<Utc>) {
    for version in secret.versions.iter_mut() {
        if version.state == VersionState::Grace {
            if let Some(deadline) = version.retired_at {
                if now >= deadline {
                    version.state = VersionState::Retired;
                    version.retired_at = Some(now);
                    version.value = SecretBytes::new(Vec::new());
                }
            }
        }
    }
}

/// Drop the oldest versions once more than `n_retain` are kept, newest
/// first. Never drops the current `active` or `grace` version even if
/// `n_retain` is small enough that it otherwise would be, since doing so
/// would make an in-window secret unreadable.
fn enforce_retention(secret: &mut Secret, n_retain: usize) {
    if secret.versions.len() <= n_retain {
        return;
    }
    secret.versions.sort_by(|a, b| b.version.cmp(&a.version));
    let mut kept = Vec::with_capacity(secret.versions.len());
    for version in secret.versions.drain(..) {
        if kept.len() < n_retain || matches!(version.state, VersionState::Active | VersionState::Grace) {
            kept.push(version);
        }
    }
    secret.versions = kept;
}

#[cfg(test)]
mod tests {
    use warden_types::{Classification, SecretKey, SecretVersion, Source};

    use super::*;

    fn secret_with_one_active_version(now: DateTime<Utc>) -> Secret {
        Secret {
            key: SecretKey::parse("DB_PASSWORD").unwrap(),
            current_version: 1,
            versions: vec![SecretVersion {
                version: 1,
                value: SecretBytes::new(b"v1".to_vec()),
                state: VersionState::Active,
                created_at: now,
                retired_at: None,
                checksum: [0u8; 32],
                inner_salt: [0u8; 16],
                inner_nonce: [0u8; 12],
            }],
            tags: Default::default(),
            classification: Classification::default(),
            source: Source::Manual,
            rotation_policy: None,
            created_at: now,
            last_updated_at: now,
            last_accessed_at: None,
            access_count: 0,
        }
    }

    #[test]
    fn promoting_demotes_previous_active_to_grace() {
        let now = Utc::now();
        let mut secret = secret_with_one_active_version(now);
        secret.versions.push(SecretVersion {
            version: 2,
            value: SecretBytes::new(b"v2".to_vec()),
            state: VersionState::Active,
            created_at: now,
            retired_at: None,
            checksum: [0u8; 32],
            inner_salt: [0u8; 16],
            inner_nonce: [0u8; 12],
        });
        secret.versions[0].state = VersionState::Grace;

        promote_new_version(&mut secret, now, 600, 10);
        assert_eq!(secret.version(1).unwrap().state, VersionState::Grace);
        assert_eq!(secret.version(2).unwrap().state, VersionState::Active);
    }

    #[test]
    fn grace_version_retires_and_zeroizes_after_window() {
        let now = Utc::now();
        let mut secret = secret_with_one_active_version(now);
        secret.versions[0].state = VersionState::Grace;
        secret.versions[0].retired_at = Some(now - chrono::Duration::seconds(1));

        sweep_expired_grace(&mut secret, now);
        let v = secret.version(1).unwrap();
        assert_eq!(v.state, VersionState::Retired);
        assert!(v.value.is_empty());
    }

    #[test]
    fn retention_never_drops_active_or_grace_version() {
        let now = Utc::now();
        let mut secret = secret_with_one_active_version(now);
        for n in 2..=5 {
            secret.versions.push(SecretVersion {
                version: n,
                value: SecretBytes::new(Vec::new()),
                state: VersionState::Retired,
                created_at: now,
                retired_at: Some(now),
                checksum: [0u8; 32],
                inner_salt: [0u8; 16],
                inner_nonce: [0u8; 12],
            });
        }
        enforce_retention(&mut secret, 2);
        assert!(secret.versions.iter().any(|v| v.version == 1 && v.state == VersionState::Active));
        assert!(secret.versions.len() <= 5);
    }
}
