//! Rotation engine for Warden (C9): a min-heap scheduler keyed by
//! `nextRotationAt`, a bounded worker pool, four generator kinds, and a
//! grace sweeper that retires versions once their window elapses.

#![forbid(unsafe_code)]

mod backoff;
mod engine;
mod error;
mod generators;
mod scheduler;

pub use backoff::{backoff_for_attempt, DEFAULT_MAX_ATTEMPTS};
pub use engine::{RotateOutcome, RotationEngine};
pub use error::RotationError;
pub use generators::generate;
pub use scheduler::{Scheduler, SchedulerConfig};
