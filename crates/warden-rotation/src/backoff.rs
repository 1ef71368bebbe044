//! Exponential backoff with jitter for transient generator failures
//! (spec.md §4.9: "base 30s, cap 1h, jitter ±20%").

use std::time::Duration;

use rand::Rng;

const BASE_SECONDS: u64 = 30;
const CAP_SECONDS: u64 = 3_600;
const JITTER_FRACTION: f64 = 0.2;

/// Default number of attempts before a policy is paused (spec.md §4.9's
/// "persistent generator failures beyond N attempts (default 5)").
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Delay before retrying the `attempt`-th failed rotation (1-indexed).
/// Doubles per attempt, capped at an hour, jittered by up to ±20%.
pub fn backoff_for_attempt(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(32);
    let unjittered = BASE_SECONDS.saturating_mul(1u64 << exponent).min(CAP_SECONDS);
    let jitter_range = (unjittered as f64 * JITTER_FRACTION) as i64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(-jitter_range..=jitter_range)
    } else {
        0
    };
    let jittered = (unjittered as i64 + jitter).max(1) as u64;
    Duration::from_secs(jittered)
}
