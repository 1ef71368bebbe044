//! `VaultHandle`: the facade `warden-store` exposes (spec.md §4.2, §4.3).
//! Owns the in-memory `VaultDocument`, the unwrapped DEK, and every
//! invariant a mutation must uphold; delegates persistence to
//! `warden-codec` and announces mutations on the event bus.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use warden_bus::{BackpressurePolicy, DomainEvent, EventBus, EventKind, Subscription};
use warden_codec::Header;
use warden_crypto::Key;
use warden_types::{
    Classification, Outcome, PolicyTable, PrincipalPolicy, Principal, Project, ProjectName,
    RotationPolicy, Secret, SecretBytes, SecretKey, SecretVersion, Source, Subject, VaultDocument,
    VersionState,
};

use crate::error::StoreError;
use crate::inner::{open_versions, seal_versions};
use crate::kek::KekRecipient;
use crate::retention::{promote_new_version, sweep_expired_grace};

/// Tunables that would otherwise be scattered across call sites; mirrors the
/// environment-variable table (`N_RETAIN`, `GRACE_DEFAULT`).
#[derive(Debug, Clone, Copy)]
pub struct RetentionConfig {
    /// Maximum versions kept per secret, including retired placeholders.
    pub n_retain: usize,
    /// Default grace window applied when a secret has no rotation policy of
    /// its own to supply one.
    pub default_grace_seconds: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { n_retain: 3, default_grace_seconds: 600 }
    }
}

/// The vault store. One instance owns one vault file's worth of state.
pub struct VaultHandle {
    path: PathBuf,
    recipients: Vec<Box<dyn KekRecipient>>,
    dek: Key,
    doc: RwLock<VaultDocument>,
    last_saved: RwLock<VaultDocument>,
    dirty: AtomicBool,
    bus: Arc<dyn EventBus>,
    retention: RetentionConfig,
}

impl VaultHandle {
    /// Create a brand new, empty vault, wrapping a fresh DEK under every
    /// recipient. Callers still need to `save` before anything is durable.
    pub fn create(
        path: PathBuf,
        recipients: Vec<Box<dyn KekRecipient>>,
        bus: Arc<dyn EventBus>,
        retention: RetentionConfig,
    ) -> Self {
        let now = Utc::now();
        let doc = VaultDocument::new(now);
        Self {
            path,
            recipients,
            dek: Key::generate(),
            doc: RwLock::new(doc.clone()),
            last_saved: RwLock::new(doc),
            dirty: AtomicBool::new(true),
            bus,
            retention,
        }
    }

    /// Open an existing vault file, unwrapping the DEK with whichever
    /// registered recipient matches a `Recipient` entry in its header.
    pub async fn open(
        path: PathBuf,
        recipients: Vec<Box<dyn KekRecipient>>,
        bus: Arc<dyn EventBus>,
        retention: RetentionConfig,
    ) -> Result<Self, StoreError> {
        let _lock = warden_codec::acquire_shared(&path).await.map_err(StoreError::Codec)?;
        let (header, header_bytes, ciphertext) = warden_codec::read_vault_file(&path)
            .await
            .map_err(StoreError::Codec)?;

        let dek = unwrap_dek_with_any_recipient(&header, &recipients)?;

        let mut doc = warden_codec::decode(&header, &header_bytes, &ciphertext, &dek).map_err(StoreError::Codec)?;
        open_versions(&mut doc, &dek)?;

        Ok(Self {
            path,
            recipients,
            dek,
            doc: RwLock::new(doc.clone()),
            last_saved: RwLock::new(doc),
            dirty: AtomicBool::new(false),
            bus,
            retention,
        })
    }

    /// Durably persist the current in-memory document (spec.md §4.2 step
    /// 3). Copy-on-write: the working document is cloned, sealed, and
    /// written; only on success does `last_saved` advance and `dirty` clear.
    /// On failure the working document is left exactly as the caller made
    /// it, since the on-disk file still reflects the previous `last_saved`.
    pub async fn save(&self) -> Result<(), StoreError> {
        if !self.dirty.load(Ordering::SeqCst) {
            return Ok(());
        }

        let _lock = warden_codec::acquire_exclusive(&self.path).await.map_err(StoreError::Codec)?;

        let mut to_write = self.doc.read().clone();
        to_write.metadata.last_updated_at = Utc::now();
        seal_versions(&mut to_write, &self.dek)?;

        let recipient_entries = self
            .recipients
            .iter()
            .map(|r| r.wrap(&self.dek))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| StoreError::AuthFailed)?;

        let (header, ciphertext) = warden_codec::encode(&to_write, &self.dek, recipient_entries).map_err(StoreError::Codec)?;
        warden_codec::write_vault_file(&self.path, &header, &ciphertext).await.map_err(StoreError::Codec)?;

        let mut saved_plaintext = to_write;
        open_versions(&mut saved_plaintext, &self.dek)?;
        *self.last_saved.write() = saved_plaintext;
        self.dirty.store(false, Ordering::SeqCst);

        let _ = self.bus.publish(DomainEvent::new(EventKind::VaultSaved, None, Subject::none(), Outcome::Success)).await;
        Ok(())
    }

    /// Whether the in-memory document has unsaved mutations.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Create a new, empty project.
    pub fn create_project(&self, name: ProjectName, description: Option<String>) -> Result<(), StoreError> {
        let mut doc = self.doc.write();
        if doc.projects.contains_key(&name) {
            return Err(StoreError::AlreadyExists);
        }
        let now = Utc::now();
        doc.projects.insert(name.clone(), Project::new(name, description, now));
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Delete a project. Refuses non-empty projects unless `force` is set
    /// (spec.md §4.3 `DeleteProject`).
    pub fn delete_project(&self, name: &ProjectName, force: bool) -> Result<(), StoreError> {
        let mut doc = self.doc.write();
        let project = doc.projects.get(name).ok_or(StoreError::ProjectNotFound)?;
        if !force && !project.secrets.is_empty() {
            return Err(StoreError::NotEmpty);
        }
        doc.projects.remove(name);
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// List every project name.
    pub fn list_projects(&self) -> Vec<ProjectName> {
        self.doc.read().projects.keys().cloned().collect()
    }

    /// List every secret key within a project.
    pub fn list_secrets(&self, project: &ProjectName) -> Result<Vec<SecretKey>, StoreError> {
        let doc = self.doc.read();
        let project = doc.projects.get(project).ok_or(StoreError::ProjectNotFound)?;
        Ok(project.secrets.keys().cloned().collect())
    }

    /// Create a secret or append a new version to an existing one.
    #[allow(clippy::too_many_arguments)]
    pub fn upsert_secret(
        &self,
        project: &ProjectName,
        key: &SecretKey,
        value: Vec<u8>,
        classification: Classification,
        source: Source,
        tags: std::collections::BTreeSet<String>,
    ) -> Result<u64, StoreError> {
        let mut doc = self.doc.write();
        let project_entry = doc.projects.get_mut(project).ok_or(StoreError::ProjectNotFound)?;
        let now = Utc::now();
        let grace_seconds = self.retention.default_grace_seconds;
        let n_retain = self.retention.n_retain;

        let new_version_number = project_entry
            .secrets
            .get(key)
            .map(|s| s.current_version + 1)
            .unwrap_or(1);

        let new_version = SecretVersion {
            version: new_version_number,
            value: SecretBytes::new(value.clone()),
            state: VersionState::Active,
            created_at: now,
            retired_at: None,
            checksum: blake3::hash(&value).into(),
            inner_salt: warden_crypto::random_salt(),
            inner_nonce: [0u8; 12],
        };

        let secret = project_entry.secrets.entry(key.clone()).or_insert_with(|| Secret {
            key: key.clone(),
            current_version: 0,
            versions: Vec::new(),
            tags: tags.clone(),
            classification,
            source,
            rotation_policy: None,
            created_at: now,
            last_updated_at: now,
            last_accessed_at: None,
            access_count: 0,
        });

        secret.versions.push(new_version);
        secret.current_version = new_version_number;
        secret.last_updated_at = now;
        secret.tags = tags;
        secret.classification = classification;
        secret.source = source;
        promote_new_version(secret, now, grace_seconds, n_retain);
        project_entry.last_updated_at = now;

        self.dirty.store(true, Ordering::SeqCst);
        Ok(new_version_number)
    }

    /// Reveal a secret's plaintext value. `version` defaults to the active
    /// version when `None`. Refuses to reveal a `retired` version, whose
    /// plaintext has already been zeroized.
    pub fn reveal_secret(
        &self,
        project: &ProjectName,
        key: &SecretKey,
        version: Option<u64>,
    ) -> Result<SecretBytes, StoreError> {
        let mut doc = self.doc.write();
        let now = Utc::now();
        let project_entry = doc.projects.get_mut(project).ok_or(StoreError::ProjectNotFound)?;
        let secret = project_entry.secrets.get_mut(key).ok_or(StoreError::SecretNotFound)?;
        sweep_expired_grace(secret, now);

        let found = match version {
            Some(v) => secret.version(v).ok_or(StoreError::VersionNotFound)?,
            None => secret.active_version().ok_or(StoreError::VersionNotFound)?,
        };
        if found.state == VersionState::Retired {
            return Err(StoreError::NotDecryptable);
        }
        let value = found.value.clone();
        secret.last_accessed_at = Some(now);
        secret.access_count += 1;
        Ok(value)
    }

    /// Write a new version produced by the rotation engine (C9), honoring
    /// the secret's own `rotationPolicy.graceSeconds` rather than the
    /// store-wide default, and advancing the policy's `nextRotationAt`.
    /// Returns the new version number and when the previous version's grace
    /// window expires, if it had one.
    pub fn rotate_secret(
        &self,
        project: &ProjectName,
        key: &SecretKey,
        new_value: Vec<u8>,
    ) -> Result<(u64, Option<chrono::DateTime<Utc>>), StoreError> {
        let mut doc = self.doc.write();
        let project_entry = doc.projects.get_mut(project).ok_or(StoreError::ProjectNotFound)?;
        let secret = project_entry.secrets.get_mut(key).ok_or(StoreError::SecretNotFound)?;
        let policy = secret.rotation_policy.as_mut().ok_or(StoreError::InvalidPolicy("secret has no rotation policy"))?;

        let now = Utc::now();
        let grace_seconds = policy.grace_seconds;
        let n_retain = self.retention.n_retain;
        policy.advance(now);

        let new_version_number = secret.current_version + 1;
        let new_version = SecretVersion {
            version: new_version_number,
            value: SecretBytes::new(new_value.clone()),
            state: VersionState::Active,
            created_at: now,
            retired_at: None,
            checksum: blake3::hash(&new_value).into(),
            inner_salt: warden_crypto::random_salt(),
            inner_nonce: [0u8; 12],
        };

        secret.versions.push(new_version);
        secret.current_version = new_version_number;
        secret.last_updated_at = now;
        secret.source = Source::Rotation;
        promote_new_version(secret, now, grace_seconds, n_retain);
        let retires_previous_at = secret
            .versions
            .iter()
            .find(|v| v.version == new_version_number - 1)
            .and_then(|v| v.retired_at);
        project_entry.last_updated_at = now;

        self.dirty.store(true, Ordering::SeqCst);
        Ok((new_version_number, retires_previous_at))
    }

    /// Mark a secret's rotation policy `paused` after its retry budget is
    /// exhausted (spec.md §4.9). Operator intervention clears this by
    /// calling `attach_rotation_policy` again.
    pub fn pause_rotation_policy(&self, project: &ProjectName, key: &SecretKey) -> Result<(), StoreError> {
        let mut doc = self.doc.write();
        let project_entry = doc.projects.get_mut(project).ok_or(StoreError::ProjectNotFound)?;
        let secret = project_entry.secrets.get_mut(key).ok_or(StoreError::SecretNotFound)?;
        let policy = secret.rotation_policy.as_mut().ok_or(StoreError::InvalidPolicy("secret has no rotation policy"))?;
        policy.paused = true;
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Every `(project, key)` whose rotation policy is due (`nextRotationAt
    /// <= now`) and not paused. Used by the scheduler's min-heap refill.
    pub fn due_rotations(&self, now: chrono::DateTime<Utc>) -> Vec<(ProjectName, SecretKey, RotationPolicy)> {
        let doc = self.doc.read();
        let mut due = Vec::new();
        for project in doc.projects.values() {
            for secret in project.secrets.values() {
                if let Some(policy) = &secret.rotation_policy {
                    if !policy.paused && policy.next_rotation_at <= now {
                        due.push((project.name.clone(), secret.key.clone(), policy.clone()));
                    }
                }
            }
        }
        due
    }

    /// Attach or replace a secret's rotation policy.
    pub fn attach_rotation_policy(
        &self,
        project: &ProjectName,
        key: &SecretKey,
        policy: RotationPolicy,
    ) -> Result<(), StoreError> {
        if policy.interval_seconds == 0 {
            return Err(StoreError::InvalidPolicy("interval_seconds must be greater than zero"));
        }
        let mut doc = self.doc.write();
        let project_entry = doc.projects.get_mut(project).ok_or(StoreError::ProjectNotFound)?;
        let secret = project_entry.secrets.get_mut(key).ok_or(StoreError::SecretNotFound)?;
        secret.rotation_policy = Some(policy);
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Delete a secret outright (spec.md §4.3 `DeleteSecret`): every version
    /// is zeroized in place before the entry is dropped from the project, so
    /// no plaintext survives even transiently in the working document.
    pub fn delete_secret(&self, project: &ProjectName, key: &SecretKey) -> Result<(), StoreError> {
        let mut doc = self.doc.write();
        let project_entry = doc.projects.get_mut(project).ok_or(StoreError::ProjectNotFound)?;
        let mut secret = project_entry.secrets.remove(key).ok_or(StoreError::SecretNotFound)?;
        for v in secret.versions.iter_mut() {
            v.value = SecretBytes::new(Vec::new());
        }
        project_entry.last_updated_at = Utc::now();
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Describe a secret's metadata (no plaintext) for listing/audit UIs.
    pub fn describe_secret(&self, project: &ProjectName, key: &SecretKey) -> Result<Secret, StoreError> {
        let doc = self.doc.read();
        let project_entry = doc.projects.get(project).ok_or(StoreError::ProjectNotFound)?;
        let secret = project_entry.secrets.get(key).ok_or(StoreError::SecretNotFound)?;
        let mut redacted = secret.clone();
        for v in redacted.versions.iter_mut() {
            v.value = SecretBytes::new(Vec::new());
        }
        Ok(redacted)
    }

    /// Snapshot of the current principal policy table, sealed inside the
    /// vault document alongside everything else (spec.md §6).
    pub fn policy_table(&self) -> PolicyTable {
        self.doc.read().policies.clone()
    }

    /// Register or replace a principal's policy entry.
    pub fn set_principal_policy(&self, principal: Principal, policy: PrincipalPolicy) {
        self.doc.write().policies.set(principal, policy);
        self.dirty.store(true, Ordering::SeqCst);
    }

    /// Subscribe to domain events published by this store (and, by sharing
    /// the same bus, any other component publishing to it).
    pub fn subscribe(&self, capacity: usize, policy: BackpressurePolicy) -> Subscription {
        self.bus.subscribe(capacity, policy)
    }

    /// Current document fingerprint, for out-of-band integrity comparisons.
    pub fn fingerprint(&self) -> warden_types::Fingerprint {
        self.doc.read().metadata.fingerprint
    }
}

fn unwrap_dek_with_any_recipient(header: &Header, recipients: &[Box<dyn KekRecipient>]) -> Result<Key, StoreError> {
    for entry in &header.recipients {
        if let Some(recipient) = recipients.iter().find(|r| r.id() == entry.id) {
            if let Ok(dek) = recipient.unwrap(entry) {
                return Ok(dek);
            }
        }
    }
    Err(StoreError::AuthFailed)
}
