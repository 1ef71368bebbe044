//! Token issuance (spec.md §4.6).

use std::time::Duration as StdDuration;

use chrono::Utc;
use warden_crypto::TokenSigningKey;
use warden_types::{Action, Principal, TokenId};

use crate::claims::{Claims, TokenScope};
use crate::error::IssueError;
use crate::policy::PolicyTable;
use crate::wire::encode;

/// System-wide ceiling TTLs (spec.md §4.6), applied whenever a principal's
/// policy has no `max_ttl` entry for the requested action. A policy entry,
/// when present, may only tighten this ceiling, never loosen it.
#[derive(Debug, Clone, Copy)]
pub struct SystemTtlDefaults {
    /// Ceiling for a `read` action.
    pub read: StdDuration,
    /// Ceiling for a `rotate` (`ManageRotation`) action.
    pub rotate: StdDuration,
    /// Ceiling for any other action.
    pub other: StdDuration,
}

impl Default for SystemTtlDefaults {
    fn default() -> Self {
        Self {
            read: StdDuration::from_secs(3600),
            rotate: StdDuration::from_secs(300),
            other: StdDuration::from_secs(300),
        }
    }
}

impl SystemTtlDefaults {
    /// The system ceiling that applies to `action`.
    pub fn for_action(&self, action: Action) -> StdDuration {
        match action {
            Action::Read => self.read,
            Action::ManageRotation => self.rotate,
            _ => self.other,
        }
    }
}

/// Issue a signed token to `principal` for `scope`, valid for `ttl`.
///
/// Checks the principal's policy entry, that every requested action and the
/// project are permitted, that the key count is within bounds, and that
/// `ttl` does not exceed the policy's (or the system default's) maximum.
/// Does not record the token record or publish `token.issued`; callers
/// (`warden-broker`/the composition root) own that side effect so this
/// function stays a pure, easily tested computation.
pub fn issue(
    principal: &Principal,
    scope: TokenScope,
    ttl: StdDuration,
    not_before: Option<chrono::DateTime<Utc>>,
    policies: &PolicyTable,
    signing_key: &TokenSigningKey,
    system_ttl_defaults: &SystemTtlDefaults,
) -> Result<(String, chrono::DateTime<Utc>), IssueError> {
    let policy = policies.get(principal).ok_or(IssueError::PrincipalUnknown)?;

    if !policy.projects.contains(&scope.prj) {
        return Err(IssueError::ScopeTooBroad);
    }
    if let crate::claims::KeySelector::Keys(keys) = &scope.keys {
        if keys.len() > policy.max_keys_per_token {
            return Err(IssueError::ScopeTooBroad);
        }
    }
    if scope.act.iter().any(|action| !policy.max_actions.contains(action)) {
        return Err(IssueError::ScopeTooBroad);
    }

    for action in &scope.act {
        let ceiling = policy.max_ttl.get(action).copied().unwrap_or_else(|| system_ttl_defaults.for_action(*action));
        if ttl > ceiling {
            return Err(IssueError::TtlTooLong);
        }
    }

    let iat = Utc::now();
    let exp = iat + chrono::Duration::from_std(ttl).map_err(|_| IssueError::TtlTooLong)?;
    let claims = Claims { tid: TokenId::generate(), sub: principal.clone(), scp: scope, iat, nbf: not_before, exp };
    let token = encode(&claims, signing_key);
    Ok((token, exp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{KeySelector, WildcardMarker};
    use crate::policy::PrincipalPolicy;
    use std::collections::HashMap;
    use warden_types::{Action, ProjectName};

    fn policy_table() -> (PolicyTable, Principal) {
        let mut table = PolicyTable::new();
        let principal = Principal::new("svc-a");
        table.set(
            principal.clone(),
            PrincipalPolicy {
                projects: vec![ProjectName::parse("svcA").unwrap()],
                max_keys_per_token: 5,
                max_actions: vec![Action::Read, Action::ManageRotation],
                max_ttl: HashMap::from([(Action::Read, StdDuration::from_secs(3600))]),
            },
        );
        (table, principal)
    }

    #[test]
    fn issues_a_token_within_policy() {
        let (table, principal) = policy_table();
        let key = TokenSigningKey::generate();
        let scope = TokenScope { prj: ProjectName::parse("svcA").unwrap(), keys: KeySelector::Wildcard(WildcardMarker), act: vec![Action::Read] };
        let (token, _exp) = issue(&principal, scope, StdDuration::from_secs(60), None, &table, &key, &SystemTtlDefaults::default()).unwrap();
        assert!(token.starts_with("v1."));
    }

    #[test]
    fn rejects_scope_outside_policy_projects() {
        let (table, principal) = policy_table();
        let key = TokenSigningKey::generate();
        let scope = TokenScope { prj: ProjectName::parse("svcB").unwrap(), keys: KeySelector::Wildcard(WildcardMarker), act: vec![Action::Read] };
        assert!(matches!(issue(&principal, scope, StdDuration::from_secs(60), None, &table, &key, &SystemTtlDefaults::default()), Err(IssueError::ScopeTooBroad)));
    }

    #[test]
    fn rejects_ttl_over_policy_maximum() {
        let (table, principal) = policy_table();
        let key = TokenSigningKey::generate();
        let scope = TokenScope { prj: ProjectName::parse("svcA").unwrap(), keys: KeySelector::Wildcard(WildcardMarker), act: vec![Action::Read] };
        assert!(matches!(
            issue(&principal, scope, StdDuration::from_secs(7200), None, &table, &key, &SystemTtlDefaults::default()),
            Err(IssueError::TtlTooLong)
        ));
    }

    #[test]
    fn rejects_unknown_principal() {
        let (table, _principal) = policy_table();
        let key = TokenSigningKey::generate();
        let scope = TokenScope { prj: ProjectName::parse("svcA").unwrap(), keys: KeySelector::Wildcard(WildcardMarker), act: vec![Action::Read] };
        assert!(matches!(
            issue(&Principal::new("ghost"), scope, StdDuration::from_secs(60), None, &table, &key, &SystemTtlDefaults::default()),
            Err(IssueError::PrincipalUnknown)
        ));
    }
}
