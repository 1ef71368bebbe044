//! Warden: a local-first, project-scoped secrets vault with token-mediated
//! access. This crate is the composition root - it wires C1-C9 behind one
//! facade and is the only crate collaborators (CLIs, servers) depend on
//! directly.

#![forbid(unsafe_code)]

mod error;

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use warden_audit::{AuditKind, AuditLog};
use warden_broker::{AccessBroker, AccessRequest, AccessResponse};
use warden_bus::{BackpressurePolicy, EventBus, InMemoryBus, Subscription};
use warden_config::WardenConfig;
use warden_rotation::{Scheduler, SchedulerConfig};
use warden_store::{KekRecipient, RetentionConfig, VaultHandle};
use warden_token::{issue, SigningKeyRing, SystemTtlDefaults, TokenScope};
use warden_types::{
    Action, Classification, Outcome, Principal, ProjectName, RotationPolicy, Secret, SecretBytes,
    SecretKey, Source, Subject, TokenId,
};

pub use error::WardenError;

/// Outcome of a successful `IssueToken` call, enriching spec.md §6's
/// minimal `{token string, expiresAt}` with the token id so the caller can
/// later present it to `RevokeToken` without having to decode the token
/// itself.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The signed, wire-encoded token.
    pub token: String,
    /// Unique id of this token, usable with `revoke_token`.
    pub token_id: TokenId,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

enum Mode {
    Open { vault: Arc<VaultHandle>, scheduler: Arc<Scheduler> },
    SafeMode,
}

/// The facade wiring every component together (spec.md §6 "Internal API
/// boundary"): `IssueToken`/`RevokeToken`/`Access`/`Admin.*`.
pub struct Warden {
    mode: Mode,
    signing_keys: Arc<SigningKeyRing>,
    revocations: Arc<dyn warden_revocation::RevocationStore>,
    system_ttl_defaults: SystemTtlDefaults,
    issued: Mutex<HashMap<TokenId, DateTime<Utc>>>,
    audit: Arc<AuditLog>,
    bus: Arc<dyn EventBus>,
    broker: Option<AccessBroker>,
    event_queue_depth: usize,
    event_overflow: BackpressurePolicy,
}

impl Warden {
    /// Open (or create) the vault using the environment-driven
    /// configuration table (spec.md §6): `WardenConfig::load()` supplies the
    /// vault/audit paths, TTL ceilings, retention window, rotation worker
    /// count, and event-bus queue depth/overflow policy. A vault integrity
    /// failure on load does not fail construction: it transitions this
    /// instance into read-only safe mode instead (spec.md §9), so
    /// `Admin.*`/`Access` calls return `WardenError::ReadOnlySafeMode` rather
    /// than repeating the raw integrity error on every call.
    pub async fn open(config: WardenConfig, recipients: Vec<Box<dyn KekRecipient>>) -> Result<Self, WardenError> {
        let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new());
        let audit = Arc::new(AuditLog::open(&config.audit_dir).await.map_err(|e| {
            tracing::error!(error = %e, "failed to open audit log");
            WardenError::ReadOnlySafeMode
        })?);

        let retention = RetentionConfig { n_retain: config.n_retain, default_grace_seconds: config.grace_default_seconds };
        let system_ttl_defaults = SystemTtlDefaults {
            read: config.t_max_read(),
            rotate: config.t_max_rotate(),
            other: config.t_max_rotate(),
        };
        let event_queue_depth = config.event_queue_depth;
        let event_overflow: BackpressurePolicy = config.event_overflow.into();

        let path = config.vault_path.clone();
        let opened = if path.exists() {
            VaultHandle::open(path.clone(), recipients, bus.clone(), retention).await
        } else {
            Ok(VaultHandle::create(path.clone(), recipients, bus.clone(), retention))
        };

        let signing_keys = Arc::new(SigningKeyRing::new());
        let revocations: Arc<dyn warden_revocation::RevocationStore> = Arc::new(warden_revocation::MemoryStore::new());

        let vault = match opened {
            Ok(vault) => Arc::new(vault),
            Err(e) if e.kind() == warden_types::ErrorKind::IntegrityError => {
                let _ = audit.append(AuditKind::VaultLoadFailed, Subject::none(), Outcome::Error).await;
                tracing::error!(error = %e, "vault failed its integrity check; entering read-only safe mode");
                return Ok(Self {
                    mode: Mode::SafeMode,
                    signing_keys,
                    revocations,
                    system_ttl_defaults,
                    issued: Mutex::new(HashMap::new()),
                    audit,
                    bus,
                    broker: None,
                    event_queue_depth,
                    event_overflow,
                });
            }
            Err(e) => return Err(WardenError::Store(e)),
        };

        let rotation = Arc::new(Scheduler::new(
            vault.clone(),
            bus.clone(),
            audit.clone(),
            SchedulerConfig { workers: config.rotation_workers.max(1), ..SchedulerConfig::default() },
        ));

        let broker = AccessBroker::new(
            vault.clone(),
            signing_keys.clone(),
            revocations.clone(),
            rotation.clone(),
            audit.clone(),
            bus.clone(),
            64,
            10.0,
        );

        Ok(Self {
            mode: Mode::Open { vault, scheduler: rotation },
            signing_keys,
            revocations,
            system_ttl_defaults,
            issued: Mutex::new(HashMap::new()),
            audit,
            bus,
            broker: Some(broker),
            event_queue_depth,
            event_overflow,
        })
    }

    /// Whether this instance is serving in read-only safe mode.
    pub fn is_safe_mode(&self) -> bool {
        matches!(self.mode, Mode::SafeMode)
    }

    fn vault(&self) -> Result<&Arc<VaultHandle>, WardenError> {
        match &self.mode {
            Mode::Open { vault, .. } => Ok(vault),
            Mode::SafeMode => Err(WardenError::ReadOnlySafeMode),
        }
    }

    fn broker(&self) -> Result<&AccessBroker, WardenError> {
        self.broker.as_ref().ok_or(WardenError::ReadOnlySafeMode)
    }

    /// Run the background rotation scheduler until `shutdown` is cancelled.
    /// A no-op in safe mode, since there is no vault to rotate against.
    pub async fn run_rotation_scheduler(&self, shutdown: tokio_util::sync::CancellationToken) {
        if let Mode::Open { scheduler, .. } = &self.mode {
            scheduler.clone().run(shutdown).await;
        }
    }

    /// Register or replace a principal's policy entry (spec.md §6
    /// "Principal policy table"). Persisted inside the vault document, so it
    /// survives a restart alongside everything else `save` covers. Requires
    /// an admin-scoped caller in a full deployment; enforcing that is left
    /// to the collaborator wiring this facade behind a transport.
    pub fn set_principal_policy(&self, principal: Principal, policy: warden_token::PrincipalPolicy) -> Result<(), WardenError> {
        self.vault()?.set_principal_policy(principal, policy);
        Ok(())
    }

    /// `IssueToken(principal, scope, ttl) -> token string, expiresAt`
    /// (spec.md §6).
    pub fn issue_token(
        &self,
        principal: &Principal,
        scope: TokenScope,
        ttl: Duration,
    ) -> Result<IssuedToken, WardenError> {
        let policies = self.vault()?.policy_table();
        let signing_key = self.signing_keys.signing_key();
        let (token, expires_at) = issue(principal, scope, ttl, None, &policies, &signing_key, &self.system_ttl_defaults)?;
        drop(signing_key);

        let claims = warden_token::decode_and_verify(&token, &self.signing_keys.signing_key().verifying_key())
            .map_err(|_| WardenError::Issue(warden_token::IssueError::PrincipalUnknown))?;
        self.issued.lock().insert(claims.tid, expires_at);
        Ok(IssuedToken { token, token_id: claims.tid, expires_at })
    }

    /// `RevokeToken(tokenId) -> ok | error{NotFound}` (spec.md §6).
    pub async fn revoke_token(&self, token_id: TokenId) -> Result<(), WardenError> {
        let expires_at = self.issued.lock().get(&token_id).copied().ok_or(WardenError::TokenNotFound)?;
        self.revocations.revoke(token_id, expires_at).await;
        Ok(())
    }

    /// `Access(bearer, {project,key,action,version?}) -> value|rotateResult`
    /// (spec.md §4.8, §6).
    pub async fn access(
        &self,
        bearer: &str,
        project: ProjectName,
        key: SecretKey,
        action: Action,
        version: Option<u64>,
        mfa_verified: bool,
        deadline: Duration,
    ) -> Result<AccessResponse, WardenError> {
        let response = self
            .broker()?
            .access(AccessRequest { bearer, project, key, action, version, mfa_verified, deadline })
            .await?;
        Ok(response)
    }

    /// `Admin.Create(project, description)` (spec.md §4.3).
    pub fn admin_create_project(&self, name: ProjectName, description: Option<String>) -> Result<(), WardenError> {
        Ok(self.vault()?.create_project(name, description)?)
    }

    /// `Admin.Delete(project, force)` (spec.md §4.3).
    pub fn admin_delete_project(&self, name: &ProjectName, force: bool) -> Result<(), WardenError> {
        Ok(self.vault()?.delete_project(name, force)?)
    }

    /// `Admin.Upsert(project, key, plaintext, metadata)` (spec.md §4.3).
    #[allow(clippy::too_many_arguments)]
    pub fn admin_upsert_secret(
        &self,
        project: &ProjectName,
        key: &SecretKey,
        value: Vec<u8>,
        classification: Classification,
        source: Source,
        tags: BTreeSet<String>,
    ) -> Result<u64, WardenError> {
        Ok(self.vault()?.upsert_secret(project, key, value, classification, source, tags)?)
    }

    /// `Admin.Describe(project, key)` (spec.md §4.3).
    pub fn admin_describe_secret(&self, project: &ProjectName, key: &SecretKey) -> Result<Secret, WardenError> {
        Ok(self.vault()?.describe_secret(project, key)?)
    }

    /// `Admin.DeleteSecret(project, key)` (spec.md §4.3): moves a secret to
    /// `absent`, with every version zeroized.
    pub fn admin_delete_secret(&self, project: &ProjectName, key: &SecretKey) -> Result<(), WardenError> {
        Ok(self.vault()?.delete_secret(project, key)?)
    }

    /// Attach or replace a secret's rotation policy (spec.md §4.3
    /// `AttachRotationPolicy`).
    pub fn admin_attach_rotation_policy(
        &self,
        project: &ProjectName,
        key: &SecretKey,
        policy: RotationPolicy,
    ) -> Result<(), WardenError> {
        Ok(self.vault()?.attach_rotation_policy(project, key, policy)?)
    }

    /// Persist the in-memory vault document (spec.md §4.2 step 3).
    pub async fn save(&self) -> Result<(), WardenError> {
        Ok(self.vault()?.save().await?)
    }

    /// Subscribe to every domain event this instance publishes, with an
    /// explicit queue capacity and overflow policy.
    pub fn subscribe(&self, capacity: usize, policy: BackpressurePolicy) -> Subscription {
        self.bus.subscribe(capacity, policy)
    }

    /// Subscribe using this instance's configured defaults (`EVENT_QUEUE_DEPTH`,
    /// `EVENT_OVERFLOW` - spec.md §6), for collaborators that don't need a
    /// per-subscriber override.
    pub fn subscribe_default(&self) -> Subscription {
        self.bus.subscribe(self.event_queue_depth, self.event_overflow)
    }

    /// Reveal a secret outside the token-mediated `Access` path, for tests
    /// and administrative tooling that already hold an out-of-band
    /// authorization decision. Unlike `access`, this bypasses single-flight
    /// coalescing and the rate limiter; prefer `access` for anything a
    /// bearer token fronts.
    pub fn admin_reveal_secret(&self, project: &ProjectName, key: &SecretKey, version: Option<u64>) -> Result<SecretBytes, WardenError> {
        Ok(self.vault()?.reveal_secret(project, key, version)?)
    }

    /// Access to the underlying audit log, for verification tooling
    /// (spec.md §8 testable property "Tamper-evidence").
    pub fn audit_log(&self) -> &Arc<AuditLog> {
        &self.audit
    }
}
