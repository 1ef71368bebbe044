use warden_types::ErrorKind;

/// Failures raised by the access broker (spec.md §4.8, §7).
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Token validation rejected the bearer (bad signature, expired,
    /// revoked, out of scope).
    #[error(transparent)]
    Token(#[from] warden_token::ValidateError),
    /// The vault store rejected the operation (not found, not decryptable).
    #[error(transparent)]
    Store(#[from] warden_store::StoreError),
    /// The rotation engine rejected an `Access(rotate)` call.
    #[error(transparent)]
    Rotation(#[from] warden_rotation::RotationError),
    /// The secret's classification is `restricted` and the caller did not
    /// propagate a verified MFA assertion (spec.md §4.8 step 2).
    #[error("secret is restricted and requires a verified MFA assertion")]
    MfaRequired,
    /// The principal's request rate exceeded its token-bucket policy.
    #[error("principal exceeded its rate limit")]
    RateLimited,
    /// The call's deadline elapsed before a result was available.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl BrokerError {
    /// Maps this error onto the shared taxonomy (spec.md §7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            BrokerError::Token(e) => e.kind(),
            BrokerError::Store(e) => e.kind(),
            BrokerError::Rotation(e) => e.kind(),
            BrokerError::MfaRequired | BrokerError::RateLimited => ErrorKind::AuthError,
            BrokerError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
        }
    }
}
