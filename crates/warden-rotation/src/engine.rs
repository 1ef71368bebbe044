//! The contract the access broker (C8) invokes for `Access(rotate)`
//! (spec.md §4.8 step 4: "invoke C9's `RotateNow(project, key)`").

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use warden_types::{ProjectName, SecretKey};

use crate::error::RotationError;

/// Result of a successful out-of-band rotation (spec.md §4.8 step 7).
#[derive(Debug, Clone, Copy)]
pub struct RotateOutcome {
    /// Version number the new value was written as.
    pub new_version: u64,
    /// When the previous version's grace window expires, if it had one.
    pub retires_previous_at: Option<DateTime<Utc>>,
}

/// Implemented by the scheduler so callers outside this crate (the access
/// broker) can trigger an immediate, out-of-schedule rotation without
/// depending on the scheduler's internal queue or worker pool.
#[async_trait]
pub trait RotationEngine: Send + Sync {
    /// Rotate `project`/`key` immediately, bypassing the scheduler's
    /// `nextRotationAt` queue. Still runs through the same generator and
    /// grace-window logic a scheduled rotation would.
    async fn rotate_now(&self, project: &ProjectName, key: &SecretKey) -> Result<RotateOutcome, RotationError>;
}
