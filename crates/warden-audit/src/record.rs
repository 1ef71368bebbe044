//! The audit record and its hash chaining (spec.md §4.4, §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_types::{Action, Outcome, Subject};

/// What operation an audit record describes. Deliberately its own type
/// rather than reusing `warden_bus::EventKind`: the audit log's subject
/// vocabulary is operation-shaped (`Access { action }`) where the bus's is
/// kind-shaped, and the two evolve independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditKind {
    /// A read or rotate request reached the access broker.
    Access {
        /// Which action was attempted.
        action: Action,
    },
    /// A bearer token was issued.
    TokenIssued,
    /// A bearer token was revoked.
    TokenRevoked,
    /// Token validation failed (expired, bad signature, out of scope, ...).
    TokenValidationFailed,
    /// A project was created.
    ProjectCreated,
    /// A project was deleted.
    ProjectDeleted,
    /// A secret's value was created or updated.
    SecretUpserted,
    /// A secret was rotated by the rotation engine.
    SecretRotated,
    /// The vault file was saved.
    VaultSaved,
    /// The vault file failed to load.
    VaultLoadFailed,
}

/// One entry in the hash-chained log (spec.md §6 "Audit log format").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Monotonic sequence number, unique within an epoch.
    pub seq: u64,
    /// When the record was appended.
    pub ts: DateTime<Utc>,
    /// What happened.
    pub kind: AuditKind,
    /// What it happened to. Never contains plaintext; only `checksum(value)`
    /// travels here, via `Subject`.
    pub subject: Subject,
    /// Whether the operation succeeded, was denied, or errored.
    pub outcome: Outcome,
    /// Hash of the previous record in the chain (or the epoch's genesis
    /// hash, for the first record).
    pub prev_hash: [u8; 32],
    /// Hash of this record, computed over every field above.
    pub hash: [u8; 32],
}

/// Fields that go into a record's hash, everything except the hash itself.
#[derive(Serialize)]
struct Hashed<'a> {
    seq: u64,
    ts: DateTime<Utc>,
    kind: &'a AuditKind,
    subject: &'a Subject,
    outcome: Outcome,
    prev_hash: [u8; 32],
}

/// Compute the hash a record with these fields must carry.
pub fn compute_hash(seq: u64, ts: DateTime<Utc>, kind: &AuditKind, subject: &Subject, outcome: Outcome, prev_hash: [u8; 32]) -> [u8; 32] {
    let hashed = Hashed { seq, ts, kind, subject, outcome, prev_hash };
    let bytes = serde_json::to_vec(&hashed).expect("Hashed always serializes");
    *blake3::hash(&bytes).as_bytes()
}

/// The hash a fresh epoch's chain starts from, derived from its id so two
/// different epochs never coincidentally share a starting hash.
pub fn genesis_hash(epoch_id: u64) -> [u8; 32] {
    *blake3::hash(&epoch_id.to_be_bytes()).as_bytes()
}

impl AuditRecord {
    /// Build the next record in the chain.
    pub fn next(seq: u64, kind: AuditKind, subject: Subject, outcome: Outcome, prev_hash: [u8; 32]) -> Self {
        let ts = Utc::now();
        let hash = compute_hash(seq, ts, &kind, &subject, outcome, prev_hash);
        Self { seq, ts, kind, subject, outcome, prev_hash, hash }
    }

    /// Whether this record's stored hash matches what its fields hash to.
    pub fn is_internally_consistent(&self) -> bool {
        self.hash == compute_hash(self.seq, self.ts, &self.kind, &self.subject, self.outcome, self.prev_hash)
    }

    /// How urgently this record deserves an operator's attention, derived
    /// from its kind and outcome rather than stored separately - there is
    /// only ever one true severity for a given (kind, outcome) pair.
    pub fn severity(&self) -> AlertSeverity {
        match (&self.kind, self.outcome) {
            (AuditKind::VaultLoadFailed, _) => AlertSeverity::Critical,
            (AuditKind::TokenValidationFailed, _) => AlertSeverity::Medium,
            (_, Outcome::Denied) => AlertSeverity::Medium,
            (_, Outcome::Error) => AlertSeverity::High,
            (_, Outcome::Success) => AlertSeverity::Low,
        }
    }
}

/// Severity levels for audit-log queries (supplementing spec.md §4.4's bare
/// `Append`/`Verify` with the range-query and alert-filtering surface
/// `toka-key-rotation`'s audit handler already exposes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}
