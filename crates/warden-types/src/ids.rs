//! Validated identifiers shared across every Warden crate.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error returned when a raw string does not satisfy an identifier's grammar.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("invalid {what}: {reason}")]
pub struct InvalidName {
    /// Which identifier kind rejected the value (`"project name"`, `"secret key"`, ...).
    pub what: &'static str,
    /// Human-readable reason, safe to surface to callers.
    pub reason: String,
}

fn check_charset(raw: &str, what: &'static str, max_len: usize, allowed: impl Fn(char) -> bool) -> Result<(), InvalidName> {
    if raw.is_empty() {
        return Err(InvalidName { what, reason: "must not be empty".into() });
    }
    if raw.len() > max_len {
        return Err(InvalidName { what, reason: format!("must be at most {max_len} bytes") });
    }
    if !raw.chars().all(allowed) {
        return Err(InvalidName { what, reason: "contains a disallowed character".into() });
    }
    Ok(())
}

/// Name of a project, unique within a [`crate::VaultDocument`].
///
/// Grammar: `[A-Za-z0-9_.-]{1,64}`, case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectName(String);

impl ProjectName {
    /// Validate and wrap a raw project name.
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidName> {
        let raw = raw.into();
        check_charset(&raw, "project name", 64, |c| {
            c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
        })?;
        Ok(Self(raw))
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of a secret, unique within a [`crate::Project`].
///
/// spec.md recommends `[A-Z][A-Z0-9_]{0,127}` but does not enforce it; we
/// accept any non-empty value up to 128 bytes and only reject control
/// characters and path separators, which would otherwise make the key unsafe
/// to use as a retired-version audit subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretKey(String);

impl SecretKey {
    /// Validate and wrap a raw secret key.
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidName> {
        let raw = raw.into();
        check_charset(&raw, "secret key", 128, |c| {
            !c.is_control() && c != '/' && c != '\\'
        })?;
        Ok(Self(raw))
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Verified identity of a token holder, supplied by an external identity
/// provider. Warden never authenticates end users itself (spec.md §1).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Wrap a principal identifier. Principals are opaque to Warden; the
    /// external identity provider owns their grammar.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier minted for every issued token (ULID/UUID per spec.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub Uuid);

impl TokenId {
    /// Generate a fresh, random token identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_name_accepts_grammar() {
        assert!(ProjectName::parse("svcA").is_ok());
        assert!(ProjectName::parse("svc-A_1.2").is_ok());
    }

    #[test]
    fn project_name_rejects_empty_and_oversized() {
        assert!(ProjectName::parse("").is_err());
        assert!(ProjectName::parse("a".repeat(65)).is_err());
    }

    #[test]
    fn project_name_rejects_bad_chars() {
        assert!(ProjectName::parse("svc A").is_err());
        assert!(ProjectName::parse("svc/A").is_err());
    }

    #[test]
    fn secret_key_rejects_path_separators() {
        assert!(SecretKey::parse("DB_PASSWORD").is_ok());
        assert!(SecretKey::parse("../etc/passwd").is_err());
    }
}
