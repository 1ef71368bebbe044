//! Environment-driven configuration (spec.md §6 "Environment &
//! configuration"). Every option has a built-in default and can be
//! overridden by the host via environment variables of the same name.

#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use warden_bus::BackpressurePolicy;

/// Overflow policy for a subscriber's bounded event queue, as spelled in
/// the environment table (`block|drop_oldest|drop_newest`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOverflow {
    Block,
    DropOldest,
    DropNewest,
}

impl From<EventOverflow> for BackpressurePolicy {
    fn from(value: EventOverflow) -> Self {
        match value {
            EventOverflow::Block => BackpressurePolicy::Block,
            EventOverflow::DropOldest => BackpressurePolicy::DropOldest,
            EventOverflow::DropNewest => BackpressurePolicy::DropNewest,
        }
    }
}

/// Failures while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The `config` crate failed to build or deserialize the source tree.
    #[error(transparent)]
    Source(#[from] config::ConfigError),
}

/// The full set of options the core recognizes (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
pub struct WardenConfig {
    /// Vault file location.
    pub vault_path: PathBuf,
    /// Audit epochs directory.
    pub audit_dir: PathBuf,
    /// Max read-token TTL, in seconds.
    pub t_max_read_seconds: u64,
    /// Max rotate-token TTL, in seconds.
    pub t_max_rotate_seconds: u64,
    /// Versions retained per secret.
    pub n_retain: usize,
    /// Default grace window, in seconds.
    pub grace_default_seconds: u64,
    /// Parallel rotation workers.
    pub rotation_workers: usize,
    /// Per-subscriber event queue depth.
    pub event_queue_depth: usize,
    /// What a subscriber's bus queue does when it is full.
    pub event_overflow: EventOverflow,
}

impl WardenConfig {
    /// Load configuration: built-in defaults (spec.md §6's default column),
    /// overridden by any matching environment variable.
    pub fn load() -> Result<Self, ConfigError> {
        let source = config::Config::builder()
            .set_default("vault_path", "./vault")?
            .set_default("audit_dir", "./audit")?
            .set_default("t_max_read_seconds", 3_600i64)?
            .set_default("t_max_rotate_seconds", 300i64)?
            .set_default("n_retain", 3i64)?
            .set_default("grace_default_seconds", 600i64)?
            .set_default("rotation_workers", 4i64)?
            .set_default("event_queue_depth", 256i64)?
            .set_default("event_overflow", "block")?
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        Ok(source.try_deserialize()?)
    }

    /// Max read-token TTL as a [`Duration`].
    pub fn t_max_read(&self) -> Duration {
        Duration::from_secs(self.t_max_read_seconds)
    }

    /// Max rotate-token TTL as a [`Duration`].
    pub fn t_max_rotate(&self) -> Duration {
        Duration::from_secs(self.t_max_rotate_seconds)
    }

    /// Default grace window as a [`Duration`].
    pub fn grace_default(&self) -> Duration {
        Duration::from_secs(self.grace_default_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_table() {
        std::env::remove_var("VAULT_PATH");
        std::env::remove_var("N_RETAIN");
        let config = WardenConfig::load().unwrap();
        assert_eq!(config.vault_path, PathBuf::from("./vault"));
        assert_eq!(config.n_retain, 3);
        assert_eq!(config.event_overflow, EventOverflow::Block);
    }

    #[test]
    fn environment_variable_overrides_the_default() {
        std::env::set_var("N_RETAIN", "9");
        let config = WardenConfig::load().unwrap();
        assert_eq!(config.n_retain, 9);
        std::env::remove_var("N_RETAIN");
    }
}
