use warden_types::ErrorKind;

/// Failures raised while issuing a token (spec.md §4.6).
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    /// The requested scope exceeds what the principal's policy allows.
    #[error("requested scope exceeds policy for this principal")]
    ScopeTooBroad,
    /// No policy entry exists for the principal.
    #[error("principal is not known to the policy table")]
    PrincipalUnknown,
    /// The requested TTL exceeds the policy's `maxTtl` for this action set.
    #[error("requested ttl exceeds the policy maximum")]
    TtlTooLong,
}

impl IssueError {
    /// Maps this error onto the shared taxonomy (spec.md §7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            IssueError::ScopeTooBroad | IssueError::TtlTooLong => ErrorKind::InputError,
            IssueError::PrincipalUnknown => ErrorKind::AuthError,
        }
    }
}

/// Failures raised while validating a presented bearer token (spec.md §4.7).
#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    /// `now >= exp`.
    #[error("token has expired")]
    Expired,
    /// `now < nbf`.
    #[error("token is not yet valid")]
    NotYetValid,
    /// The signature did not verify under any currently trusted key.
    #[error("token signature is invalid")]
    BadSignature,
    /// The token's id is in the revocation set.
    #[error("token has been revoked")]
    Revoked,
    /// The token's scope does not cover the requested project/key/action.
    #[error("token scope does not cover the requested resource")]
    OutOfScope,
    /// The token string did not parse as Warden's wire format.
    #[error("token is malformed")]
    Malformed,
}

impl ValidateError {
    /// Maps this error onto the shared taxonomy (spec.md §7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidateError::Expired
            | ValidateError::NotYetValid
            | ValidateError::BadSignature
            | ValidateError::Revoked
            | ValidateError::OutOfScope => ErrorKind::AuthError,
            ValidateError::Malformed => ErrorKind::InputError,
        }
    }
}
