//! What an event or audit entry is about (spec.md §4.4, §4.5): shared
//! between the event bus and the audit log so neither has to depend on the
//! other just to describe the same subject.

use serde::{Deserialize, Serialize};

use crate::ids::{ProjectName, SecretKey};

/// At most a project, a secret within it, and a version within that secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Project the event concerns, if any.
    pub project: Option<ProjectName>,
    /// Secret key the event concerns, if any.
    pub key: Option<SecretKey>,
    /// Secret version the event concerns, if any.
    pub version: Option<u64>,
}

impl Subject {
    /// No subject at all (e.g. `vault.load_failed` before any project is
    /// known).
    pub fn none() -> Self {
        Self::default()
    }

    /// About an entire project.
    pub fn project(project: ProjectName) -> Self {
        Self { project: Some(project), key: None, version: None }
    }

    /// About a specific secret, optionally a specific version.
    pub fn secret(project: ProjectName, key: SecretKey, version: Option<u64>) -> Self {
        Self { project: Some(project), key: Some(key), version }
    }
}
