//! Token claims: the scope a bearer token authorizes and the actions it may
//! perform (spec.md §4.6, §4.7).

use serde::{Deserialize, Serialize};

use crate::ids::{ProjectName, SecretKey};

/// An action a token may be authorized to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Read the current (or a historical) value of a secret.
    Read,
    /// Create or update a secret's value.
    Write,
    /// Attach, detach, or modify a rotation policy.
    ManageRotation,
    /// Create or delete a project.
    ManageProject,
    /// Read audit log entries.
    AuditRead,
}

/// The resource a [`Scope`] grants access to, expressed as a project and an
/// optional secret key within it. `key: None` means "every secret in this
/// project", matching spec.md §4.6's wildcard rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resource {
    /// Project the scope applies to.
    pub project: ProjectName,
    /// Secret key the scope applies to, or `None` for every secret.
    pub key: Option<SecretKey>,
}

impl Resource {
    /// Scope covering every secret in `project`.
    pub fn whole_project(project: ProjectName) -> Self {
        Self { project, key: None }
    }

    /// Scope covering exactly one secret.
    pub fn single_secret(project: ProjectName, key: SecretKey) -> Self {
        Self { project, key: Some(key) }
    }

    /// Whether this scope's resource covers `project`/`key`.
    pub fn covers(&self, project: &ProjectName, key: &SecretKey) -> bool {
        &self.project == project
            && match &self.key {
                Some(k) => k == key,
                None => true,
            }
    }
}

/// One grant within a token's claim set: an action over a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// Action permitted by this grant.
    pub action: Action,
    /// Resource the action is permitted over.
    pub resource: Resource,
}

impl Scope {
    /// Whether this grant authorizes `action` over `project`/`key`.
    pub fn authorizes(&self, action: Action, project: &ProjectName, key: &SecretKey) -> bool {
        self.action == action && self.resource.covers(project, key)
    }
}
