//! The event envelope published on the bus (spec.md §4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_types::{Outcome, Principal, Subject};

/// One of the fixed event kinds Warden publishes. `#[non_exhaustive]` so a
/// future kind doesn't break downstream `match`es compiled against an older
/// version of this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum EventKind {
    SecretCreated,
    SecretUpdated,
    SecretRotated,
    SecretAccessed,
    SecretRevealedFailed,
    TokenIssued,
    TokenRevoked,
    TokenValidatedFailed,
    ProjectCreated,
    ProjectDeleted,
    VaultSaved,
    VaultLoadFailed,
}

/// A published domain event (spec.md §4.5): "timestamp, actor, subject,
/// outcome, and a correlation id".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Which kind of event this is.
    pub kind: EventKind,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Who triggered the event, if the action was attributable to a
    /// principal (background rotation, for instance, has none).
    pub actor: Option<Principal>,
    /// What the event is about.
    pub subject: Subject,
    /// What happened.
    pub outcome: Outcome,
    /// Correlates this event with the audit entry and broker call that
    /// produced it.
    pub correlation_id: Uuid,
}

impl DomainEvent {
    /// Construct an event stamped with the current time and a fresh
    /// correlation id.
    pub fn new(kind: EventKind, actor: Option<Principal>, subject: Subject, outcome: Outcome) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            actor,
            subject,
            outcome,
            correlation_id: Uuid::new_v4(),
        }
    }

    /// Construct an event carrying an explicit correlation id, so a caller
    /// that already minted one (e.g. the access broker, correlating with an
    /// audit entry) can thread it through instead of getting a new one.
    pub fn with_correlation_id(
        kind: EventKind,
        actor: Option<Principal>,
        subject: Subject,
        outcome: Outcome,
        correlation_id: Uuid,
    ) -> Self {
        Self { kind, timestamp: Utc::now(), actor, subject, outcome, correlation_id }
    }
}
