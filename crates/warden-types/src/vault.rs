//! The vault data model (spec.md §3): `VaultDocument` → `Project` → `Secret`
//! → `SecretVersion`, plus `RotationPolicy`.
//!
//! This module is pure data: no I/O, no crypto, no locking. `warden-store`
//! owns the mutation logic and invariants; this module only shapes the data
//! those invariants are checked against.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ProjectName, SecretKey};
use crate::policy::PolicyTable;
use crate::secret_bytes::SecretBytes;

/// Hash of the canonicalized cleartext vault contents (spec.md §3, §8-4).
pub type Fingerprint = [u8; 32];

/// Top-level container persisted as one encrypted file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultDocument {
    /// Schema version of this document, `>= 1`.
    pub schema_version: u32,
    /// Document-level metadata.
    pub metadata: VaultMetadata,
    /// Projects, keyed by unique `projectName`.
    pub projects: BTreeMap<ProjectName, Project>,
    /// Tags applied at the document level (not tied to any one project).
    pub global_tags: BTreeSet<String>,
    /// Principal policy table (spec.md §6), sealed under the same
    /// encryption as everything else in the document.
    pub policies: PolicyTable,
}

impl VaultDocument {
    /// Current schema version emitted by this crate.
    pub const CURRENT_SCHEMA_VERSION: u32 = 1;

    /// Construct an empty document with fresh timestamps.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            schema_version: Self::CURRENT_SCHEMA_VERSION,
            metadata: VaultMetadata {
                created_at: now,
                last_updated_at: now,
                fingerprint: [0u8; 32],
            },
            projects: BTreeMap::new(),
            global_tags: BTreeSet::new(),
            policies: PolicyTable::new(),
        }
    }
}

/// Document-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultMetadata {
    /// When the document was first created.
    pub created_at: DateTime<Utc>,
    /// When the document was last mutated and saved.
    pub last_updated_at: DateTime<Utc>,
    /// Hash of canonicalized cleartext contents, recomputed on every save.
    pub fingerprint: Fingerprint,
}

/// A named partition within the vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique name within the document.
    pub name: ProjectName,
    /// Free-text description.
    pub description: Option<String>,
    /// Secrets, keyed by unique key within the project.
    pub secrets: BTreeMap<SecretKey, Secret>,
    /// When the project was created.
    pub created_at: DateTime<Utc>,
    /// When the project (or any secret within it) was last mutated.
    pub last_updated_at: DateTime<Utc>,
}

impl Project {
    /// Construct a new, empty project.
    pub fn new(name: ProjectName, description: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            name,
            description,
            secrets: BTreeMap::new(),
            created_at: now,
            last_updated_at: now,
        }
    }
}

/// Sensitivity classification of a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Safe to display or log verbatim.
    Public,
    /// Internal-only, not secret-grade but not public either.
    Internal,
    /// The default: requires a valid read-scoped token to access.
    Confidential,
    /// Requires the additional MFA-propagated policy check (spec.md §4.8).
    Restricted,
}

impl Default for Classification {
    fn default() -> Self {
        Self::Confidential
    }
}

/// Provenance of the current value of a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Entered directly by an operator.
    Manual,
    /// Brought in from an external import (e.g. `.env` migration).
    Import,
    /// Discovered by an external scanner (out of core scope; recorded here
    /// only as provenance metadata).
    Scan,
    /// Produced by the rotation engine (C9).
    Rotation,
    /// Sourced from an external system (e.g. a webhook generator payload).
    External,
}

/// A named, versioned value within a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    /// Unique key within the project.
    pub key: SecretKey,
    /// The currently active version number.
    pub current_version: u64,
    /// Versions, newest first, length bounded by the store's retention policy.
    pub versions: Vec<SecretVersion>,
    /// Free-form tags.
    pub tags: BTreeSet<String>,
    /// Sensitivity classification.
    pub classification: Classification,
    /// Where the current value came from.
    pub source: Source,
    /// Optional automatic-rotation policy.
    pub rotation_policy: Option<RotationPolicy>,
    /// When the secret was first created.
    pub created_at: DateTime<Utc>,
    /// When the secret was last mutated.
    pub last_updated_at: DateTime<Utc>,
    /// When the secret was last successfully read via the access broker.
    pub last_accessed_at: Option<DateTime<Utc>>,
    /// Number of successful reads since creation.
    pub access_count: u64,
}

impl Secret {
    /// The version currently in the `active` state, if the invariant holds.
    pub fn active_version(&self) -> Option<&SecretVersion> {
        self.versions.iter().find(|v| v.state == VersionState::Active)
    }

    /// The version currently in the `grace` state, if any.
    pub fn grace_version(&self) -> Option<&SecretVersion> {
        self.versions.iter().find(|v| v.state == VersionState::Grace)
    }

    /// Look up a specific version number.
    pub fn version(&self, version: u64) -> Option<&SecretVersion> {
        self.versions.iter().find(|v| v.version == version)
    }
}

/// Lifecycle state of a [`SecretVersion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionState {
    /// The version currently served by default.
    Active,
    /// A just-retired version still valid for reads within its grace window.
    Grace,
    /// No longer readable; ciphertext is zeroized on the next save.
    Retired,
}

/// A monotonically increasing revision of a secret.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecretVersion {
    /// Monotonic per-secret version number, never reused.
    pub version: u64,
    /// Plaintext value. Ciphertext on disk; see `warden-codec`.
    pub value: SecretBytes,
    /// Lifecycle state.
    pub state: VersionState,
    /// When this version was created.
    pub created_at: DateTime<Utc>,
    /// When this version was retired, if it has been.
    pub retired_at: Option<DateTime<Utc>>,
    /// Cryptographic hash of the plaintext, for integrity audit without
    /// revealing the value.
    pub checksum: [u8; 32],
    /// Salt used to derive this version's inner encryption key (spec.md
    /// §4.1's optional per-secret layer, always applied here). Generated
    /// once when the version is created.
    pub inner_salt: [u8; 16],
    /// Nonce used to seal this version's value under its inner key. A fresh
    /// nonce is drawn every time the version is resealed on save.
    pub inner_nonce: [u8; 12],
}

impl std::fmt::Debug for SecretVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretVersion")
            .field("version", &self.version)
            .field("value", &self.value)
            .field("state", &self.state)
            .field("created_at", &self.created_at)
            .field("retired_at", &self.retired_at)
            .field("checksum", &hex_preview(&self.checksum))
            .field("inner_salt", &hex_preview(&self.inner_salt))
            .finish()
    }
}

fn hex_preview(bytes: &[u8]) -> String {
    bytes.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

/// Generator used by the rotation engine to produce a new value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Generator {
    /// `n` cryptographically random bytes.
    RandomBytes {
        /// Number of bytes to generate.
        n: usize,
    },
    /// `n` random alphanumeric characters.
    RandomAlphanumeric {
        /// Number of characters to generate.
        n: usize,
    },
    /// A fresh UUIDv4, rendered as its canonical string form.
    Uuid,
    /// Delegates generation to an external HTTP endpoint.
    Webhook {
        /// URL invoked to produce the new value.
        url: String,
    },
}

/// Rules governing when and how a secret's value is regenerated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationPolicy {
    /// Rotation cadence.
    pub interval_seconds: u64,
    /// How long the previous version remains valid after rotation.
    pub grace_seconds: u64,
    /// How the new value is produced.
    pub generator: Generator,
    /// When the next rotation is due.
    pub next_rotation_at: DateTime<Utc>,
    /// When the policy last rotated the secret, if ever.
    pub last_rotated_at: Option<DateTime<Utc>>,
    /// Set to `true` once the retry budget is exhausted; operator
    /// intervention is required to clear it (spec.md §4.9).
    pub paused: bool,
}

impl RotationPolicy {
    /// Construct a policy whose first rotation is due `interval_seconds`
    /// from `created_at`, per the invariant in spec.md §3.
    pub fn new(
        interval_seconds: u64,
        grace_seconds: u64,
        generator: Generator,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            interval_seconds,
            grace_seconds,
            generator,
            next_rotation_at: created_at + chrono::Duration::seconds(interval_seconds as i64),
            last_rotated_at: None,
            paused: false,
        }
    }

    /// Recompute `next_rotation_at` from `from`, honoring the invariant that
    /// it is never moved backwards (spec.md §4.9, clock jumps).
    pub fn advance(&mut self, from: DateTime<Utc>) {
        let candidate = from + chrono::Duration::seconds(self.interval_seconds as i64);
        if candidate > self.next_rotation_at {
            self.next_rotation_at = candidate;
        }
        self.last_rotated_at = Some(from);
    }
}
