use warden_types::ErrorKind;

/// Failures raised by the rotation engine (spec.md §4.9).
#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    /// The referenced project or secret does not exist.
    #[error(transparent)]
    Store(#[from] warden_store::StoreError),
    /// A `webhook` generator's HTTP call failed or timed out.
    #[error("webhook generator failed: {0}")]
    GeneratorFailed(String),
    /// The secret has no rotation policy attached.
    #[error("secret has no rotation policy")]
    NoPolicy,
    /// The policy is paused after exhausting its retry budget.
    #[error("rotation policy is paused pending operator intervention")]
    Paused,
}

impl RotationError {
    /// Maps this error onto the shared taxonomy (spec.md §7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            RotationError::Store(e) => e.kind(),
            RotationError::GeneratorFailed(_) => ErrorKind::DeadlineExceeded,
            RotationError::NoPolicy => ErrorKind::InputError,
            RotationError::Paused => ErrorKind::Conflict,
        }
    }
}
