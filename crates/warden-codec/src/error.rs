use warden_types::ErrorKind;

/// Failures raised while reading or writing a vault file (spec.md §4.2).
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Decryption or authentication of the header/ciphertext failed.
    #[error("vault file failed integrity check")]
    IntegrityError,
    /// The file's `schemaVersion` major component is not understood by this
    /// build.
    #[error("unsupported vault schema version {found} (supported up to {supported})")]
    SchemaError {
        /// Schema version found in the file.
        found: u32,
        /// Highest schema version this build understands.
        supported: u32,
    },
    /// A filesystem operation failed.
    #[error("vault file I/O error: {0}")]
    IOError(#[from] std::io::Error),
    /// Another process holds the exclusive writer lock.
    #[error("vault is locked by another writer")]
    LockedByAnotherWriter,
    /// The file is shorter than the fixed header framing requires, or the
    /// magic bytes don't match.
    #[error("malformed vault file: {0}")]
    Malformed(&'static str),
}

impl CodecError {
    /// Maps this error onto the shared taxonomy (spec.md §7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::IntegrityError | CodecError::Malformed(_) => ErrorKind::IntegrityError,
            CodecError::SchemaError { .. } => ErrorKind::InputError,
            CodecError::IOError(_) => ErrorKind::IOError,
            CodecError::LockedByAnotherWriter => ErrorKind::Conflict,
        }
    }
}
