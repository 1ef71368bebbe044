//! `AccessBroker`: the single entry point for the read and rotate paths
//! (spec.md §4.8). Binds token validation, policy checks, decryption (or
//! rotation), audit emission, and event publication into one contract.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use warden_audit::{AuditKind, AuditLog};
use warden_bus::{DomainEvent, EventBus, EventKind};
use warden_revocation::RevocationStore;
use warden_rotation::RotationEngine;
use warden_store::VaultHandle;
use warden_token::{validate, SigningKeyRing, Want};
use warden_types::{Action, Classification, Outcome, ProjectName, SecretBytes, SecretKey, Subject};

use crate::error::BrokerError;
use crate::flight::SingleFlight;
use crate::rate_limit::PrincipalRateLimiter;

/// What an external caller asks the broker to do (spec.md §4.8).
pub struct AccessRequest<'a> {
    /// The bearer token presented by the caller.
    pub bearer: &'a str,
    /// Project the request targets.
    pub project: ProjectName,
    /// Secret key the request targets.
    pub key: SecretKey,
    /// Which action is being requested.
    pub action: Action,
    /// Specific version to read, or `None` for the active version.
    pub version: Option<u64>,
    /// Whether the external identity provider has propagated a verified
    /// MFA assertion for this call (spec.md §4.8 step 2). Warden never
    /// performs MFA itself; this is supplied by the caller.
    pub mfa_verified: bool,
    /// Deadline for the whole call, including any single-flight wait.
    pub deadline: Duration,
}

/// Result of a successful read (spec.md §4.8 step 7).
#[derive(Debug, Clone)]
pub struct ReadResponse {
    /// The secret's plaintext value.
    pub value: SecretBytes,
    /// Which version was returned.
    pub version: u64,
}

/// Result of a successful rotation (spec.md §4.8 step 7).
#[derive(Debug, Clone, Copy)]
pub struct RotateResponse {
    /// The newly written version number.
    pub new_version: u64,
    /// When the previous version's grace window expires, if it had one.
    pub retires_previous_at: Option<DateTime<Utc>>,
}

/// Either outcome of `AccessBroker::access`.
#[derive(Debug, Clone)]
pub enum AccessResponse {
    /// `action = read` succeeded.
    Read(ReadResponse),
    /// `action = rotate` succeeded.
    Rotate(RotateResponse),
}

/// The access broker (C8): one instance per vault, shared across callers.
pub struct AccessBroker {
    vault: Arc<VaultHandle>,
    signing_keys: Arc<SigningKeyRing>,
    revocations: Arc<dyn RevocationStore>,
    rotation: Arc<dyn RotationEngine>,
    audit: Arc<AuditLog>,
    bus: Arc<dyn EventBus>,
    rate_limiter: PrincipalRateLimiter,
    flight: SingleFlight,
}

impl AccessBroker {
    /// Wire together a broker from its dependencies. `rate_limit_capacity`
    /// and `rate_limit_refill_per_second` configure the per-principal
    /// token bucket (spec.md §4.8 step 2).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vault: Arc<VaultHandle>,
        signing_keys: Arc<SigningKeyRing>,
        revocations: Arc<dyn RevocationStore>,
        rotation: Arc<dyn RotationEngine>,
        audit: Arc<AuditLog>,
        bus: Arc<dyn EventBus>,
        rate_limit_capacity: u32,
        rate_limit_refill_per_second: f64,
    ) -> Self {
        Self {
            vault,
            signing_keys,
            revocations,
            rotation,
            audit,
            bus,
            rate_limiter: PrincipalRateLimiter::new(rate_limit_capacity, rate_limit_refill_per_second),
            flight: SingleFlight::new(),
        }
    }

    /// The single entry point for the read and rotate paths (spec.md §4.8).
    pub async fn access(&self, req: AccessRequest<'_>) -> Result<AccessResponse, BrokerError> {
        match tokio::time::timeout(req.deadline, self.access_inner(&req)).await {
            Ok(result) => result,
            Err(_) => Err(BrokerError::DeadlineExceeded),
        }
    }

    async fn access_inner(&self, req: &AccessRequest<'_>) -> Result<AccessResponse, BrokerError> {
        let correlation_id = Uuid::new_v4();
        let subject = Subject::secret(req.project.clone(), req.key.clone(), req.version);

        let want = Want { project: &req.project, key: &req.key, action: req.action };
        let claims = match validate(req.bearer, want, &self.signing_keys, self.revocations.as_ref(), Utc::now()).await {
            Ok(claims) => claims,
            Err(e) => {
                let _ = self.audit.append(AuditKind::TokenValidationFailed, subject.clone(), Outcome::Denied).await;
                let _ = self
                    .bus
                    .publish(DomainEvent::with_correlation_id(EventKind::TokenValidatedFailed, None, subject, Outcome::Denied, correlation_id))
                    .await;
                return Err(e.into());
            }
        };

        if !self.rate_limiter.allow(&claims.sub, Utc::now()) {
            self.record_denied(subject, &claims.sub, correlation_id).await;
            return Err(BrokerError::RateLimited);
        }

        if req.action == Action::Read {
            let description = self.vault.describe_secret(&req.project, &req.key)?;
            if description.classification == Classification::Restricted && !req.mfa_verified {
                self.record_denied(subject, &claims.sub, correlation_id).await;
                return Err(BrokerError::MfaRequired);
            }
        }

        match req.action {
            Action::Read => self.read(req, claims.sub, subject, correlation_id).await,
            Action::ManageRotation => self.rotate(req, claims.sub, subject, correlation_id).await,
            _ => Err(BrokerError::Store(warden_store::StoreError::InvalidPolicy(
                "access broker only serves read and rotate actions directly",
            ))),
        }
    }

    async fn record_denied(&self, subject: Subject, principal: &warden_types::Principal, correlation_id: Uuid) {
        let _ = self.audit.append(AuditKind::Access { action: Action::Read }, subject.clone(), Outcome::Denied).await;
        let _ = self
            .bus
            .publish(DomainEvent::with_correlation_id(
                EventKind::SecretRevealedFailed,
                Some(principal.clone()),
                subject,
                Outcome::Denied,
                correlation_id,
            ))
            .await;
    }

    async fn read(
        &self,
        req: &AccessRequest<'_>,
        principal: warden_types::Principal,
        subject: Subject,
        correlation_id: Uuid,
    ) -> Result<AccessResponse, BrokerError> {
        let vault = self.vault.clone();
        let project = req.project.clone();
        let key = req.key.clone();
        let version = req.version;

        let outcome = self
            .flight
            .run(req.project.clone(), req.key.clone(), req.version, move || {
                let vault = vault.clone();
                async move { vault.reveal_secret(&project, &key, version).map_err(|e| e.to_string()) }
            })
            .await;

        match outcome {
            Ok(value) => {
                let resolved_version = match req.version {
                    Some(v) => v,
                    None => self
                        .vault
                        .describe_secret(&req.project, &req.key)?
                        .active_version()
                        .map(|v| v.version)
                        .unwrap_or_default(),
                };
                let _ = self
                    .audit
                    .append(AuditKind::Access { action: Action::Read }, subject.clone(), Outcome::Success)
                    .await;
                let _ = self
                    .bus
                    .publish(DomainEvent::with_correlation_id(EventKind::SecretAccessed, Some(principal), subject, Outcome::Success, correlation_id))
                    .await;
                Ok(AccessResponse::Read(ReadResponse { value, version: resolved_version }))
            }
            Err(message) => {
                let _ = self.audit.append(AuditKind::Access { action: Action::Read }, subject.clone(), Outcome::Error).await;
                let _ = self
                    .bus
                    .publish(DomainEvent::with_correlation_id(EventKind::SecretRevealedFailed, Some(principal), subject, Outcome::Error, correlation_id))
                    .await;
                Err(BrokerError::Store(reveal_error_from_message(&message)))
            }
        }
    }

    async fn rotate(
        &self,
        req: &AccessRequest<'_>,
        principal: warden_types::Principal,
        subject: Subject,
        correlation_id: Uuid,
    ) -> Result<AccessResponse, BrokerError> {
        match self.rotation.rotate_now(&req.project, &req.key).await {
            Ok(outcome) => {
                let _ = self.audit.append(AuditKind::SecretRotated, subject.clone(), Outcome::Success).await;
                let _ = self
                    .bus
                    .publish(DomainEvent::with_correlation_id(EventKind::SecretRotated, Some(principal), subject, Outcome::Success, correlation_id))
                    .await;
                Ok(AccessResponse::Rotate(RotateResponse {
                    new_version: outcome.new_version,
                    retires_previous_at: outcome.retires_previous_at,
                }))
            }
            Err(e) => {
                let _ = self.audit.append(AuditKind::SecretRotated, subject.clone(), Outcome::Error).await;
                let _ = self
                    .bus
                    .publish(DomainEvent::with_correlation_id(EventKind::SecretRotated, Some(principal), subject, Outcome::Error, correlation_id))
                    .await;
                Err(e.into())
            }
        }
    }
}

/// The single-flight result channel only carries a display string, not the
/// original `StoreError`, since followers run on a different task than the
/// leader that produced it. Reconstructs a reasonable approximation for
/// callers that match on error kind.
fn reveal_error_from_message(message: &str) -> warden_store::StoreError {
    if message.contains("retired") {
        warden_store::StoreError::NotDecryptable
    } else if message.contains("version") {
        warden_store::StoreError::VersionNotFound
    } else if message.contains("secret") {
        warden_store::StoreError::SecretNotFound
    } else if message.contains("project") {
        warden_store::StoreError::ProjectNotFound
    } else {
        warden_store::StoreError::InvalidPolicy("single-flight leader reported an unrecognized failure")
    }
}
