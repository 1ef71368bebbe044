use warden_types::ErrorKind;

/// The aggregated error type returned across the composition root's public
/// surface (spec.md §6 "Internal API boundary", §7).
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    /// A token could not be issued (spec.md §4.6).
    #[error(transparent)]
    Issue(#[from] warden_token::IssueError),
    /// The vault store rejected an admin operation.
    #[error(transparent)]
    Store(#[from] warden_store::StoreError),
    /// The access broker rejected a read or rotate call.
    #[error(transparent)]
    Broker(#[from] warden_broker::BrokerError),
    /// `RevokeToken` named a token id this instance never issued.
    #[error("token id not found")]
    TokenNotFound,
    /// The vault failed its integrity check on load and this instance is
    /// now serving in read-only safe mode (spec.md §9 "Fatal invariant
    /// violations ... transition the vault to read-only safe mode").
    #[error("vault is in read-only safe mode after an integrity failure")]
    ReadOnlySafeMode,
}

impl WardenError {
    /// Maps this error onto the shared taxonomy (spec.md §7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            WardenError::Issue(e) => e.kind(),
            WardenError::Store(e) => e.kind(),
            WardenError::Broker(e) => e.kind(),
            WardenError::TokenNotFound => ErrorKind::NotFound,
            WardenError::ReadOnlySafeMode => ErrorKind::Conflict,
        }
    }
}
