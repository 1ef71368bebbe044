//! The rotation scheduler (spec.md §4.9): a min-heap keyed by
//! `nextRotationAt`, a bounded worker pool, and the retry/backoff/pause
//! dance for transient and persistent generator failures.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use warden_audit::{AuditKind, AuditLog};
use warden_bus::{DomainEvent, EventBus, EventKind};
use warden_store::VaultHandle;
use warden_types::{Outcome, ProjectName, SecretKey, Subject};

use crate::backoff::{backoff_for_attempt, DEFAULT_MAX_ATTEMPTS};
use crate::engine::{RotateOutcome, RotationEngine};
use crate::error::RotationError;
use crate::generators::generate;

/// Tunables for the background scheduler (spec.md §6 `ROTATION_WORKERS`).
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Size of the bounded worker pool; rotations for distinct keys run in
    /// parallel up to this many at once.
    pub workers: usize,
    /// Attempts before a policy is paused (spec.md §4.9 "default 5").
    pub max_attempts: u32,
    /// Per-call timeout passed to `webhook` generators.
    pub webhook_timeout: Duration,
    /// How often the scheduler rescans the vault for due policies.
    pub poll_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            webhook_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// The rotation engine (C9): owns the worker pool that executes rotations
/// popped, in `nextRotationAt` order, off a heap rebuilt each tick from the
/// vault's current policies.
pub struct Scheduler {
    vault: Arc<VaultHandle>,
    bus: Arc<dyn EventBus>,
    audit: Arc<AuditLog>,
    http: reqwest::Client,
    semaphore: Arc<Semaphore>,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Build a scheduler over `vault`, publishing to `bus` and `audit`.
    pub fn new(vault: Arc<VaultHandle>, bus: Arc<dyn EventBus>, audit: Arc<AuditLog>, config: SchedulerConfig) -> Self {
        Self {
            vault,
            bus,
            audit,
            http: reqwest::Client::new(),
            semaphore: Arc::new(Semaphore::new(config.workers.max(1))),
            config,
        }
    }

    /// Run the scheduler loop until `shutdown` is cancelled. Rotations
    /// already in flight when cancellation arrives are allowed to finish;
    /// no new ones are started afterwards.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        loop {
            let due = self.vault.due_rotations(Utc::now());
            let mut heap: BinaryHeap<Reverse<(DateTime<Utc>, ProjectName, SecretKey)>> = due
                .into_iter()
                .map(|(project, key, policy)| Reverse((policy.next_rotation_at, project, key)))
                .collect();

            let mut handles = Vec::new();
            while let Some(Reverse((_, project, key))) = heap.pop() {
                let permit = self.semaphore.clone().acquire_owned().await.expect("semaphore is never closed");
                let this = self.clone();
                handles.push(tokio::spawn(async move {
                    let _permit = permit;
                    this.rotate_with_retry(&project, &key).await;
                }));
            }
            for handle in handles {
                let _ = handle.await;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = shutdown.cancelled() => return,
            }
        }
    }

    /// Run one scheduled rotation cycle for `(project, key)`: retry with
    /// backoff on transient failure, pause the policy once the retry budget
    /// is exhausted (spec.md §4.9).
    async fn rotate_with_retry(&self, project: &ProjectName, key: &SecretKey) {
        for attempt in 1..=self.config.max_attempts {
            match self.attempt_rotation(project, key).await {
                Ok(outcome) => {
                    tracing::info!(%project, %key, new_version = outcome.new_version, "secret rotated");
                    self.publish_rotated(project, key, Outcome::Success).await;
                    return;
                }
                Err(e) if attempt < self.config.max_attempts => {
                    tracing::warn!(%project, %key, attempt, error = %e, "rotation attempt failed, retrying with backoff");
                    self.publish_rotated(project, key, Outcome::Error).await;
                    tokio::time::sleep(backoff_for_attempt(attempt)).await;
                }
                Err(e) => {
                    tracing::error!(%project, %key, error = %e, "rotation retry budget exhausted, pausing policy");
                    let _ = self.vault.pause_rotation_policy(project, key);
                    self.publish_rotated(project, key, Outcome::Error).await;
                    return;
                }
            }
        }
    }

    async fn publish_rotated(&self, project: &ProjectName, key: &SecretKey, outcome: Outcome) {
        let subject = Subject::secret(project.clone(), key.clone(), None);
        let _ = self.audit.append(AuditKind::SecretRotated, subject.clone(), outcome).await;
        let _ = self.bus.publish(DomainEvent::new(EventKind::SecretRotated, None, subject, outcome)).await;
    }

    async fn attempt_rotation(&self, project: &ProjectName, key: &SecretKey) -> Result<RotateOutcome, RotationError> {
        let description = self.vault.describe_secret(project, key)?;
        let policy = description.rotation_policy.as_ref().ok_or(RotationError::NoPolicy)?;
        if policy.paused {
            return Err(RotationError::Paused);
        }

        let deadline = Duration::from_secs(5).max(Duration::from_secs(policy.interval_seconds / 10));
        let value = tokio::time::timeout(deadline, generate(&policy.generator, &self.http, self.config.webhook_timeout))
            .await
            .map_err(|_| RotationError::GeneratorFailed("generator call exceeded its per-job deadline".into()))??;

        let (new_version, retires_previous_at) = self.vault.rotate_secret(project, key, value)?;
        Ok(RotateOutcome { new_version, retires_previous_at })
    }
}

#[async_trait]
impl RotationEngine for Scheduler {
    async fn rotate_now(&self, project: &ProjectName, key: &SecretKey) -> Result<RotateOutcome, RotationError> {
        let outcome = self.attempt_rotation(project, key).await?;
        self.publish_rotated(project, key, Outcome::Success).await;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use warden_bus::InMemoryBus;
    use warden_store::{KekRecipient, PassphraseRecipient, RetentionConfig, VaultHandle};
    use warden_types::{Classification, Generator, ProjectName, RotationPolicy, SecretKey, Source};

    use super::*;

    async fn setup() -> (Arc<VaultHandle>, ProjectName, SecretKey) {
        let params = warden_crypto::KdfParams { memory_kib: 8 * 1024, iterations: 1, parallelism: 1 };
        let recipients: Vec<Box<dyn KekRecipient>> = vec![Box::new(PassphraseRecipient::new("default", "hunter2", params))];
        let bus = Arc::new(InMemoryBus::new());
        let vault = Arc::new(VaultHandle::create(
            std::path::PathBuf::from("unused"),
            recipients,
            bus,
            RetentionConfig::default(),
        ));

        let project = ProjectName::parse("svcA").unwrap();
        vault.create_project(project.clone(), None).unwrap();
        let key = SecretKey::parse("DB_PASSWORD").unwrap();
        vault
            .upsert_secret(&project, &key, b"p@ss-1".to_vec(), Classification::default(), Source::Manual, BTreeSet::new())
            .unwrap();
        vault
            .attach_rotation_policy(&project, &key, RotationPolicy::new(3600, 60, Generator::RandomAlphanumeric { n: 16 }, Utc::now()))
            .unwrap();
        (vault, project, key)
    }

    #[tokio::test]
    async fn rotate_now_writes_a_new_version_and_sets_a_grace_deadline() {
        let (vault, project, key) = setup().await;
        let audit_dir = tempfile::tempdir().unwrap();
        let audit = Arc::new(AuditLog::open(audit_dir.path()).await.unwrap());
        let bus = Arc::new(InMemoryBus::new());
        let scheduler = Scheduler::new(vault.clone(), bus, audit, SchedulerConfig::default());

        let outcome = scheduler.rotate_now(&project, &key).await.unwrap();
        assert_eq!(outcome.new_version, 2);
        assert!(outcome.retires_previous_at.is_some());

        let previous = vault.reveal_secret(&project, &key, Some(1)).unwrap();
        assert_eq!(previous.expose(), b"p@ss-1");
    }

    #[tokio::test]
    async fn rotate_now_without_a_policy_fails() {
        let bus = Arc::new(InMemoryBus::new());
        let params = warden_crypto::KdfParams { memory_kib: 8 * 1024, iterations: 1, parallelism: 1 };
        let recipients: Vec<Box<dyn KekRecipient>> = vec![Box::new(PassphraseRecipient::new("default", "hunter2", params))];
        let vault = Arc::new(VaultHandle::create(std::path::PathBuf::from("unused"), recipients, bus.clone(), RetentionConfig::default()));
        let project = ProjectName::parse("svcA").unwrap();
        vault.create_project(project.clone(), None).unwrap();
        let key = SecretKey::parse("DB_PASSWORD").unwrap();
        vault
            .upsert_secret(&project, &key, b"p@ss-1".to_vec(), Classification::default(), Source::Manual, BTreeSet::new())
            .unwrap();

        let audit_dir = tempfile::tempdir().unwrap();
        let audit = Arc::new(AuditLog::open(audit_dir.path()).await.unwrap());
        let scheduler = Scheduler::new(vault, bus, audit, SchedulerConfig::default());

        let err = scheduler.rotate_now(&project, &key).await.unwrap_err();
        assert!(matches!(err, RotationError::NoPolicy));
    }
}
