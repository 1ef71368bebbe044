use warden_types::ErrorKind;

/// Failures raised by the event bus.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// `publish` was called after the bus had no remaining live subscribers
    /// and `require_subscriber` was set; harmless in the default
    /// configuration, where publishing to nobody is a no-op.
    #[error("no subscribers are registered")]
    NoSubscribers,
}

impl BusError {
    /// Maps this error onto the shared taxonomy (spec.md §7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            BusError::NoSubscribers => ErrorKind::InternalError,
        }
    }
}
