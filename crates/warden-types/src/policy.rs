//! The principal policy table (spec.md §6: "Maps `principal → allowed{projects,
//! maxKeysPerToken, maxActions, maxTtl}`"). Lives here, rather than in
//! `warden-token`, so `VaultDocument` can carry a `policies` section sealed
//! under the same encryption as the rest of the document (spec.md §6:
//! "Policy is part of the persisted vault document").

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ids::{Principal, ProjectName};
use crate::scope::Action;

/// What one principal is permitted to request in a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalPolicy {
    /// Projects this principal may request scope over.
    pub projects: Vec<ProjectName>,
    /// Upper bound on how many distinct keys a single token may name.
    pub max_keys_per_token: usize,
    /// Actions this principal may ever request.
    pub max_actions: Vec<Action>,
    /// Upper bound on requested TTL, per action (spec.md §4.6: "default 1h
    /// for `read`, 5m for `rotate`" is the *system* default; a principal's
    /// policy may only ever tighten it further).
    pub max_ttl: HashMap<Action, Duration>,
}

/// The full table, keyed by principal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyTable {
    entries: HashMap<Principal, PrincipalPolicy>,
}

impl PolicyTable {
    /// Construct an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a principal's policy.
    pub fn set(&mut self, principal: Principal, policy: PrincipalPolicy) {
        self.entries.insert(principal, policy);
    }

    /// Remove a principal's policy entirely.
    pub fn remove(&mut self, principal: &Principal) -> Option<PrincipalPolicy> {
        self.entries.remove(principal)
    }

    /// Look up a principal's policy.
    pub fn get(&self, principal: &Principal) -> Option<&PrincipalPolicy> {
        self.entries.get(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_principal_has_no_policy() {
        let table = PolicyTable::new();
        assert!(table.get(&Principal::new("ghost")).is_none());
    }

    #[test]
    fn set_then_get_roundtrips() {
        let mut table = PolicyTable::new();
        let principal = Principal::new("svc-a");
        table.set(
            principal.clone(),
            PrincipalPolicy {
                projects: vec![ProjectName::parse("svcA").unwrap()],
                max_keys_per_token: 10,
                max_actions: vec![Action::Read],
                max_ttl: HashMap::from([(Action::Read, Duration::from_secs(3600))]),
            },
        );
        assert_eq!(table.get(&principal).unwrap().max_keys_per_token, 10);
    }
}
