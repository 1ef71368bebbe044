use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use warden::{AccessResponse, Warden};
use warden_config::WardenConfig;
use warden_store::{KekRecipient, PassphraseRecipient};
use warden_token::{KeySelector, PrincipalPolicy, TokenScope, WildcardMarker};
use warden_types::{Action, Classification, Principal, ProjectName, RotationPolicy, SecretKey, Source};

fn recipients() -> Vec<Box<dyn KekRecipient>> {
    vec![Box::new(PassphraseRecipient::new(
        "default",
        "correct horse battery staple",
        warden_crypto::KdfParams { memory_kib: 8 * 1024, iterations: 1, parallelism: 1 },
    ))]
}

fn test_config(dir: &tempfile::TempDir) -> WardenConfig {
    WardenConfig {
        vault_path: dir.path().join("vault.bin"),
        audit_dir: dir.path().join("audit"),
        rotation_workers: 2,
        ..WardenConfig::load().expect("built-in defaults always load")
    }
}

async fn open_vault(dir: &tempfile::TempDir) -> Warden {
    Warden::open(test_config(dir), recipients()).await.unwrap()
}

fn grant(warden: &Warden, principal: &Principal, project: &ProjectName, actions: Vec<Action>) {
    warden
        .set_principal_policy(
            principal.clone(),
            PrincipalPolicy {
                projects: vec![project.clone()],
                max_keys_per_token: 10,
                max_actions: actions.clone(),
                max_ttl: HashMap::from_iter(actions.into_iter().map(|a| (a, Duration::from_secs(3600)))),
            },
        )
        .unwrap();
}

/// S1: create a project, write a secret, read it back through a
/// token-mediated access call, then rotate it out-of-band.
#[tokio::test]
async fn create_write_read_rotate_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let warden = open_vault(&dir).await;

    let project = ProjectName::parse("payments").unwrap();
    let key = SecretKey::parse("DB_PASSWORD").unwrap();
    let principal = Principal::new("svc-payments");

    warden.admin_create_project(project.clone(), Some("payments service".into())).unwrap();
    warden
        .admin_upsert_secret(
            &project,
            &key,
            b"s3cr3t".to_vec(),
            Classification::Confidential,
            Source::Manual,
            BTreeSet::new(),
        )
        .unwrap();
    warden
        .admin_attach_rotation_policy(
            &project,
            &key,
            RotationPolicy::new(3600, 60, warden_types::Generator::RandomAlphanumeric { n: 16 }, chrono::Utc::now()),
        )
        .unwrap();

    grant(&warden, &principal, &project, vec![Action::Read, Action::ManageRotation]);
    let read_token = warden
        .issue_token(
            &principal,
            TokenScope { prj: project.clone(), keys: KeySelector::Wildcard(WildcardMarker), act: vec![Action::Read] },
            Duration::from_secs(60),
        )
        .unwrap();

    let response = warden
        .access(&read_token.token, project.clone(), key.clone(), Action::Read, None, false, Duration::from_secs(5))
        .await
        .unwrap();
    match response {
        AccessResponse::Read(read) => {
            assert_eq!(read.value.expose(), b"s3cr3t");
            assert_eq!(read.version, 1);
        }
        AccessResponse::Rotate(_) => panic!("expected a read response"),
    }

    let rotate_token = warden
        .issue_token(
            &principal,
            TokenScope { prj: project.clone(), keys: KeySelector::Wildcard(WildcardMarker), act: vec![Action::ManageRotation] },
            Duration::from_secs(60),
        )
        .unwrap();
    let response = warden
        .access(&rotate_token.token, project.clone(), key.clone(), Action::ManageRotation, None, false, Duration::from_secs(5))
        .await
        .unwrap();
    match response {
        AccessResponse::Rotate(rotate) => assert_eq!(rotate.new_version, 2),
        AccessResponse::Read(_) => panic!("expected a rotate response"),
    }

    // The previous version is still readable until its grace window lapses.
    let old_value = warden.admin_reveal_secret(&project, &key, Some(1)).unwrap();
    assert_eq!(old_value.expose(), b"s3cr3t");
}

/// S2: a token scoped to a different project is rejected and never reaches
/// the vault.
#[tokio::test]
async fn out_of_scope_access_is_denied() {
    let dir = tempfile::tempdir().unwrap();
    let warden = open_vault(&dir).await;

    let project_a = ProjectName::parse("payments").unwrap();
    let project_b = ProjectName::parse("billing").unwrap();
    let key = SecretKey::parse("DB_PASSWORD").unwrap();
    let principal = Principal::new("svc-payments");

    warden.admin_create_project(project_a.clone(), None).unwrap();
    warden.admin_create_project(project_b.clone(), None).unwrap();
    warden
        .admin_upsert_secret(&project_b, &key, b"other-secret".to_vec(), Classification::Confidential, Source::Manual, BTreeSet::new())
        .unwrap();

    grant(&warden, &principal, &project_a, vec![Action::Read]);
    let token = warden
        .issue_token(
            &principal,
            TokenScope { prj: project_a.clone(), keys: KeySelector::Wildcard(WildcardMarker), act: vec![Action::Read] },
            Duration::from_secs(60),
        )
        .unwrap();

    let result = warden
        .access(&token.token, project_b.clone(), key.clone(), Action::Read, None, false, Duration::from_secs(5))
        .await;
    assert!(result.is_err());
}

/// A secret marked `restricted` cannot be read without a verified MFA
/// assertion, even with an otherwise valid token.
#[tokio::test]
async fn restricted_secret_requires_mfa() {
    let dir = tempfile::tempdir().unwrap();
    let warden = open_vault(&dir).await;

    let project = ProjectName::parse("payments").unwrap();
    let key = SecretKey::parse("SIGNING_KEY").unwrap();
    let principal = Principal::new("svc-payments");

    warden.admin_create_project(project.clone(), None).unwrap();
    warden
        .admin_upsert_secret(&project, &key, b"top-secret".to_vec(), Classification::Restricted, Source::Manual, BTreeSet::new())
        .unwrap();

    grant(&warden, &principal, &project, vec![Action::Read]);
    let token = warden
        .issue_token(
            &principal,
            TokenScope { prj: project.clone(), keys: KeySelector::Wildcard(WildcardMarker), act: vec![Action::Read] },
            Duration::from_secs(60),
        )
        .unwrap();

    let without_mfa = warden
        .access(&token.token, project.clone(), key.clone(), Action::Read, None, false, Duration::from_secs(5))
        .await;
    assert!(without_mfa.is_err());

    let with_mfa = warden
        .access(&token.token, project.clone(), key.clone(), Action::Read, None, true, Duration::from_secs(5))
        .await;
    assert!(with_mfa.is_ok());
}

/// A revoked token is rejected on its next use even though it has not
/// expired.
#[tokio::test]
async fn revoked_token_is_rejected_on_next_use() {
    let dir = tempfile::tempdir().unwrap();
    let warden = open_vault(&dir).await;

    let project = ProjectName::parse("payments").unwrap();
    let key = SecretKey::parse("DB_PASSWORD").unwrap();
    let principal = Principal::new("svc-payments");

    warden.admin_create_project(project.clone(), None).unwrap();
    warden
        .admin_upsert_secret(&project, &key, b"s3cr3t".to_vec(), Classification::Confidential, Source::Manual, BTreeSet::new())
        .unwrap();

    grant(&warden, &principal, &project, vec![Action::Read]);
    let token = warden
        .issue_token(
            &principal,
            TokenScope { prj: project.clone(), keys: KeySelector::Wildcard(WildcardMarker), act: vec![Action::Read] },
            Duration::from_secs(60),
        )
        .unwrap();

    warden
        .access(&token.token, project.clone(), key.clone(), Action::Read, None, false, Duration::from_secs(5))
        .await
        .unwrap();

    warden.revoke_token(token.token_id).await.unwrap();

    let result = warden
        .access(&token.token, project.clone(), key.clone(), Action::Read, None, false, Duration::from_secs(5))
        .await;
    assert!(result.is_err());
}

/// Revoking an unknown token id is reported rather than silently accepted.
#[tokio::test]
async fn revoking_an_unknown_token_id_fails() {
    let dir = tempfile::tempdir().unwrap();
    let warden = open_vault(&dir).await;
    let result = warden.revoke_token(warden_types::TokenId::generate()).await;
    assert!(matches!(result, Err(warden::WardenError::TokenNotFound)));
}

/// S4: many concurrent reads of the same version are coalesced by the
/// broker's single-flight layer; every caller still sees the correct value.
#[tokio::test]
async fn concurrent_reads_of_the_same_secret_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let warden = Arc::new(open_vault(&dir).await);

    let project = ProjectName::parse("payments").unwrap();
    let key = SecretKey::parse("DB_PASSWORD").unwrap();
    let principal = Principal::new("svc-payments");

    warden.admin_create_project(project.clone(), None).unwrap();
    warden
        .admin_upsert_secret(&project, &key, b"s3cr3t".to_vec(), Classification::Confidential, Source::Manual, BTreeSet::new())
        .unwrap();
    grant(&warden, &principal, &project, vec![Action::Read]);
    let token = warden
        .issue_token(
            &principal,
            TokenScope { prj: project.clone(), keys: KeySelector::Wildcard(WildcardMarker), act: vec![Action::Read] },
            Duration::from_secs(60),
        )
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..100 {
        let warden = warden.clone();
        let token = token.token.clone();
        let project = project.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            warden.access(&token, project, key, Action::Read, None, false, Duration::from_secs(5)).await
        }));
    }

    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        match response {
            AccessResponse::Read(read) => assert_eq!(read.value.expose(), b"s3cr3t"),
            AccessResponse::Rotate(_) => panic!("expected a read response"),
        }
    }
}

/// Reopening a vault after a tamper to its on-disk bytes puts the instance
/// into read-only safe mode instead of failing to construct at all.
#[tokio::test]
async fn tampered_vault_reopens_in_safe_mode() {
    let dir = tempfile::tempdir().unwrap();
    {
        let warden = open_vault(&dir).await;
        let project = ProjectName::parse("payments").unwrap();
        warden.admin_create_project(project, None).unwrap();
        warden.save().await.unwrap();
    }

    let vault_path = dir.path().join("vault.bin");
    let mut bytes = std::fs::read(&vault_path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&vault_path, bytes).unwrap();

    let warden = open_vault(&dir).await;
    assert!(warden.is_safe_mode());

    let project = ProjectName::parse("payments").unwrap();
    let result = warden.admin_create_project(project, None);
    assert!(matches!(result, Err(warden::WardenError::ReadOnlySafeMode)));
}

/// A freshly issued token can be traced through the policy table: an
/// unknown principal cannot obtain a token at all.
#[tokio::test]
async fn unknown_principal_cannot_issue_a_token() {
    let dir = tempfile::tempdir().unwrap();
    let warden = open_vault(&dir).await;
    let project = ProjectName::parse("payments").unwrap();
    let principal = Principal::new("stranger");

    let result = warden.issue_token(
        &principal,
        TokenScope { prj: project, keys: KeySelector::Wildcard(WildcardMarker), act: vec![Action::Read] },
        Duration::from_secs(60),
    );
    assert!(result.is_err());
}

/// Deleting a secret zeroizes every version and makes it unreadable and
/// undescribable; an unrelated secret in the same project is unaffected.
#[tokio::test]
async fn deleted_secret_is_absent_and_unrecoverable() {
    let dir = tempfile::tempdir().unwrap();
    let warden = open_vault(&dir).await;

    let project = ProjectName::parse("payments").unwrap();
    let key = SecretKey::parse("DB_PASSWORD").unwrap();
    let other_key = SecretKey::parse("API_KEY").unwrap();

    warden.admin_create_project(project.clone(), None).unwrap();
    warden
        .admin_upsert_secret(&project, &key, b"s3cr3t".to_vec(), Classification::Confidential, Source::Manual, BTreeSet::new())
        .unwrap();
    warden
        .admin_upsert_secret(&project, &other_key, b"other".to_vec(), Classification::Confidential, Source::Manual, BTreeSet::new())
        .unwrap();

    warden.admin_delete_secret(&project, &key).unwrap();

    assert!(warden.admin_reveal_secret(&project, &key, None).is_err());
    assert!(warden.admin_describe_secret(&project, &key).is_err());
    assert_eq!(warden.admin_reveal_secret(&project, &other_key, None).unwrap().expose(), b"other");

    assert!(matches!(warden.admin_delete_secret(&project, &key), Err(warden::WardenError::Store(_))));
}

