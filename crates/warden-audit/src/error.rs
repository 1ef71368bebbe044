use warden_types::ErrorKind;

/// Failures raised by the audit log (spec.md §4.4).
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// A filesystem operation failed.
    #[error("audit log I/O error: {0}")]
    IOError(#[from] std::io::Error),
    /// A record failed to serialize or deserialize.
    #[error("audit record malformed: {0}")]
    Malformed(String),
    /// `Verify` found the hash chain broken at the given sequence number.
    #[error("audit chain broken at seq {0}")]
    BrokenAt(u64),
}

impl AuditError {
    /// Maps this error onto the shared taxonomy (spec.md §7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuditError::IOError(_) => ErrorKind::IOError,
            AuditError::Malformed(_) => ErrorKind::IntegrityError,
            AuditError::BrokenAt(_) => ErrorKind::IntegrityError,
        }
    }
}
