use warden_types::ErrorKind;

/// Failures raised by the vault store (spec.md §4.3).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `CreateProject` named a project that already exists.
    #[error("project already exists")]
    AlreadyExists,
    /// A name failed `warden_types` identifier validation.
    #[error("invalid name: {0}")]
    InvalidName(#[from] warden_types::InvalidName),
    /// The referenced project does not exist.
    #[error("project not found")]
    ProjectNotFound,
    /// The referenced secret does not exist.
    #[error("secret not found")]
    SecretNotFound,
    /// The referenced secret version does not exist.
    #[error("secret version not found")]
    VersionNotFound,
    /// `DeleteProject` without `force` was called on a non-empty project.
    #[error("project is not empty")]
    NotEmpty,
    /// The requested version exists but is `retired` and cannot be read.
    #[error("secret version is not decryptable (retired)")]
    NotDecryptable,
    /// A rotation policy failed validation (e.g. zero interval).
    #[error("invalid rotation policy: {0}")]
    InvalidPolicy(&'static str),
    /// Unlocking the vault with the given material failed.
    #[error("failed to unlock vault")]
    AuthFailed,
    /// The vault file does not exist at the given path.
    #[error("vault not found")]
    NotFound,
    /// Underlying codec I/O or framing failure.
    #[error(transparent)]
    Codec(#[from] warden_codec::CodecError),
}

impl StoreError {
    /// Maps this error onto the shared taxonomy (spec.md §7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::AlreadyExists => ErrorKind::Conflict,
            StoreError::InvalidName(_) => ErrorKind::InputError,
            StoreError::ProjectNotFound | StoreError::SecretNotFound | StoreError::VersionNotFound | StoreError::NotFound => {
                ErrorKind::NotFound
            }
            StoreError::NotEmpty => ErrorKind::Conflict,
            StoreError::NotDecryptable => ErrorKind::IntegrityError,
            StoreError::InvalidPolicy(_) => ErrorKind::InputError,
            StoreError::AuthFailed => ErrorKind::AuthError,
            StoreError::Codec(e) => e.kind(),
        }
    }
}
