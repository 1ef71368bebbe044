//! Token validation (spec.md §4.7).

use chrono::Utc;
use warden_types::{Action, ProjectName, SecretKey};

use crate::claims::Claims;
use crate::error::ValidateError;
use crate::rotation::SigningKeyRing;
use warden_revocation::RevocationStore;

/// What the caller is asking to do, used to check the token's scope against
/// the requested resource (spec.md §4.7 "Authorize").
pub struct Want<'a> {
    /// Project the caller wants to touch.
    pub project: &'a ProjectName,
    /// Key the caller wants to touch.
    pub key: &'a SecretKey,
    /// Action the caller wants to perform.
    pub action: Action,
}

/// Parse, verify, and authorize a bearer token against `want`.
///
/// Tries every currently-trusted verifying key in `keys` (the active key
/// plus any still in its overlap window after a signing-key rotation)
/// before giving up with `BadSignature`.
pub async fn validate(
    token: &str,
    want: Want<'_>,
    keys: &SigningKeyRing,
    revocations: &dyn RevocationStore,
    now: chrono::DateTime<Utc>,
) -> Result<Claims, ValidateError> {
    let claims = keys
        .verifying_keys()
        .iter()
        .find_map(|vk| crate::wire::decode_and_verify(token, vk).ok())
        .ok_or(ValidateError::BadSignature)?;

    claims.check_time_bounds(now)?;

    if revocations.is_revoked(claims.tid).await {
        return Err(ValidateError::Revoked);
    }

    if !claims.scp.authorizes(want.action, want.project, want.key) {
        return Err(ValidateError::OutOfScope);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{KeySelector, TokenScope, WildcardMarker};
    use crate::issuer::{issue, SystemTtlDefaults};
    use crate::policy::{PolicyTable, PrincipalPolicy};
    use std::collections::HashMap;
    use std::time::Duration as StdDuration;
    use warden_revocation::MemoryStore;
    use warden_types::Principal;

    fn setup() -> (SigningKeyRing, PolicyTable, Principal) {
        let ring = SigningKeyRing::new();
        let mut table = PolicyTable::new();
        let principal = Principal::new("svc-a");
        table.set(
            principal.clone(),
            PrincipalPolicy {
                projects: vec![ProjectName::parse("svcA").unwrap()],
                max_keys_per_token: 5,
                max_actions: vec![Action::Read],
                max_ttl: HashMap::from([(Action::Read, StdDuration::from_secs(3600))]),
            },
        );
        (ring, table, principal)
    }

    #[tokio::test]
    async fn valid_token_in_scope_is_accepted() {
        let (ring, table, principal) = setup();
        let scope = TokenScope { prj: ProjectName::parse("svcA").unwrap(), keys: KeySelector::Wildcard(WildcardMarker), act: vec![Action::Read] };
        let (token, _) = issue(&principal, scope, StdDuration::from_secs(60), None, &table, &ring.signing_key(), &SystemTtlDefaults::default()).unwrap();

        let revocations = MemoryStore::new();
        let key = SecretKey::parse("DB_PASSWORD").unwrap();
        let project = ProjectName::parse("svcA").unwrap();
        let want = Want { project: &project, key: &key, action: Action::Read };
        assert!(validate(&token, want, &ring, &revocations, Utc::now()).await.is_ok());
    }

    #[tokio::test]
    async fn out_of_scope_project_is_rejected() {
        let (ring, table, principal) = setup();
        let scope = TokenScope { prj: ProjectName::parse("svcA").unwrap(), keys: KeySelector::Wildcard(WildcardMarker), act: vec![Action::Read] };
        let (token, _) = issue(&principal, scope, StdDuration::from_secs(60), None, &table, &ring.signing_key(), &SystemTtlDefaults::default()).unwrap();

        let revocations = MemoryStore::new();
        let key = SecretKey::parse("DB_PASSWORD").unwrap();
        let other_project = ProjectName::parse("svcB").unwrap();
        let want = Want { project: &other_project, key: &key, action: Action::Read };
        assert!(matches!(validate(&token, want, &ring, &revocations, Utc::now()).await, Err(ValidateError::OutOfScope)));
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let (ring, table, principal) = setup();
        let scope = TokenScope { prj: ProjectName::parse("svcA").unwrap(), keys: KeySelector::Wildcard(WildcardMarker), act: vec![Action::Read] };
        let (token, _) = issue(&principal, scope, StdDuration::from_secs(60), None, &table, &ring.signing_key(), &SystemTtlDefaults::default()).unwrap();
        let claims = crate::wire::decode_and_verify(&token, &ring.signing_key().verifying_key()).unwrap();

        let revocations = MemoryStore::new();
        revocations.revoke(claims.tid, claims.exp).await;

        let key = SecretKey::parse("DB_PASSWORD").unwrap();
        let project = ProjectName::parse("svcA").unwrap();
        let want = Want { project: &project, key: &key, action: Action::Read };
        assert!(matches!(validate(&token, want, &ring, &revocations, Utc::now()).await, Err(ValidateError::Revoked)));
    }
}
