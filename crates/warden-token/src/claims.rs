//! The token payload (spec.md §6: "payload is a canonical JSON object with
//! fields `tid, sub, scp:{prj,keys,act}, iat, nbf?, exp`").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_types::{Action, ProjectName, Resource, Scope, SecretKey, TokenId};

/// Which keys within a project a token's scope covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySelector {
    /// Every key in the project (wire form: the literal string `"*"`).
    Wildcard(WildcardMarker),
    /// Exactly these keys.
    Keys(Vec<SecretKey>),
}

/// Serializes/deserializes as the single-character string `"*"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WildcardMarker;

impl Serialize for WildcardMarker {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("*")
    }
}

impl<'de> Deserialize<'de> for WildcardMarker {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == "*" {
            Ok(WildcardMarker)
        } else {
            Err(serde::de::Error::custom("expected \"*\""))
        }
    }
}

impl KeySelector {
    /// Whether this selector covers `key`.
    pub fn covers(&self, key: &SecretKey) -> bool {
        match self {
            KeySelector::Wildcard(_) => true,
            KeySelector::Keys(keys) => keys.contains(key),
        }
    }
}

/// The compact scope a token carries, covering a single project (spec.md
/// §4.8 step 2: `want.project == scope.project`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenScope {
    /// Project this token's scope applies to.
    pub prj: ProjectName,
    /// Which keys within that project.
    pub keys: KeySelector,
    /// Which actions are permitted.
    pub act: Vec<Action>,
}

impl TokenScope {
    /// Whether this scope authorizes `action` over `project`/`key`.
    pub fn authorizes(&self, action: Action, project: &ProjectName, key: &SecretKey) -> bool {
        &self.prj == project && self.keys.covers(key) && self.act.contains(&action)
    }

    /// Expand into the normalized `Scope` list the rest of the system
    /// reasons about (e.g. a principal policy's declared grants).
    pub fn to_scopes(&self) -> Vec<Scope> {
        let resource = match &self.keys {
            KeySelector::Wildcard(_) => Resource::whole_project(self.prj.clone()),
            KeySelector::Keys(keys) if keys.len() == 1 => {
                Resource::single_secret(self.prj.clone(), keys[0].clone())
            }
            KeySelector::Keys(_) => Resource::whole_project(self.prj.clone()),
        };
        self.act.iter().map(|&action| Scope { action, resource: resource.clone() }).collect()
    }
}

/// The full signed payload (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Unique token identifier, checked against the revocation set.
    pub tid: TokenId,
    /// The principal this token was issued to.
    pub sub: warden_types::Principal,
    /// What the token authorizes.
    pub scp: TokenScope,
    /// When the token was issued.
    pub iat: DateTime<Utc>,
    /// The token is not valid before this time, if set.
    pub nbf: Option<DateTime<Utc>>,
    /// When the token expires.
    pub exp: DateTime<Utc>,
}

impl Claims {
    /// Validate the time-based claims against `now` (spec.md §4.7).
    pub fn check_time_bounds(&self, now: DateTime<Utc>) -> Result<(), crate::error::ValidateError> {
        if now >= self.exp {
            return Err(crate::error::ValidateError::Expired);
        }
        if let Some(nbf) = self.nbf {
            if now < nbf {
                return Err(crate::error::ValidateError::NotYetValid);
            }
        }
        Ok(())
    }
}
