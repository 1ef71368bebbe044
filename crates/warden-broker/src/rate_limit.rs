//! Per-principal token-bucket rate limiting (spec.md §4.8 step 2: "rate
//! limits per principal"), grounded on `toka-rate-limiter`'s
//! `TokenBucketState` but simplified to a single in-memory bucket per
//! principal rather than a pluggable storage backend, since the broker has
//! no need for a distributed rate limiter.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use warden_types::Principal;

#[derive(Debug, Clone)]
struct TokenBucketState {
    tokens: f64,
    capacity: f64,
    refill_per_second: f64,
    last_refill: DateTime<Utc>,
}

impl TokenBucketState {
    fn new(capacity: f64, refill_per_second: f64, now: DateTime<Utc>) -> Self {
        Self { tokens: capacity, capacity, refill_per_second, last_refill: now }
    }

    fn refill(&mut self, now: DateTime<Utc>) {
        let elapsed = (now - self.last_refill).num_milliseconds().max(0) as f64 / 1000.0;
        self.tokens = (self.tokens + elapsed * self.refill_per_second).min(self.capacity);
        self.last_refill = now;
    }

    fn try_consume(&mut self, now: DateTime<Utc>) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Token-bucket rate limiter keyed by principal.
pub struct PrincipalRateLimiter {
    capacity: f64,
    refill_per_second: f64,
    buckets: Mutex<HashMap<Principal, TokenBucketState>>,
}

impl PrincipalRateLimiter {
    /// Construct a limiter allowing bursts up to `capacity` requests,
    /// refilling at `refill_per_second` tokens/second thereafter.
    pub fn new(capacity: u32, refill_per_second: f64) -> Self {
        Self { capacity: capacity as f64, refill_per_second, buckets: Mutex::new(HashMap::new()) }
    }

    /// Whether `principal` currently has a token available, consuming one
    /// if so.
    pub fn allow(&self, principal: &Principal, now: DateTime<Utc>) -> bool {
        let mut buckets = self.buckets.lock();
        let state = buckets
            .entry(principal.clone())
            .or_insert_with(|| TokenBucketState::new(self.capacity, self.refill_per_second, now));
        state.try_consume(now)
    }
}
