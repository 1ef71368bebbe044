//! Single-flight coalescing for concurrent `Access(read)` calls against the
//! same `(project, key, version)` (spec.md §4.8 "Single-flight guarantee").
//!
//! Not built on `tokio::sync::broadcast`: a broadcast channel needs a
//! receiver subscribed before the value is sent or it misses the message,
//! which would race against a follower joining after the leader has already
//! started. A `Notify` paired with a slot each waiter reads after being
//! woken has no such race.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;
use warden_types::{ProjectName, SecretKey};

type FlightKey = (ProjectName, SecretKey, Option<u64>);

struct Waiter {
    notify: Notify,
    result: Mutex<Option<Result<warden_types::SecretBytes, String>>>,
}

/// Coalesces concurrent identical reads into a single call to `compute`.
#[derive(Default)]
pub struct SingleFlight {
    inflight: DashMap<FlightKey, Arc<Waiter>>,
}

impl SingleFlight {
    /// Construct an empty coalescing table.
    pub fn new() -> Self {
        Self { inflight: DashMap::new() }
    }

    /// Run `compute` for `key`, or, if another caller is already computing
    /// the same key, wait for its result instead of computing again.
    pub async fn run<F, Fut>(
        &self,
        project: ProjectName,
        secret_key: SecretKey,
        version: Option<u64>,
        compute: F,
    ) -> Result<warden_types::SecretBytes, String>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<warden_types::SecretBytes, String>>,
    {
        let key: FlightKey = (project, secret_key, version);

        let (waiter, is_leader) = match self.inflight.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => (entry.get().clone(), false),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let waiter = Arc::new(Waiter { notify: Notify::new(), result: Mutex::new(None) });
                entry.insert(waiter.clone());
                (waiter, true)
            }
        };

        if is_leader {
            let result = compute().await;
            *waiter.result.lock() = Some(result.clone());
            self.inflight.remove(&key);
            waiter.notify.notify_waiters();
            result
        } else {
            loop {
                if let Some(result) = waiter.result.lock().clone() {
                    return result;
                }
                waiter.notify.notified().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn concurrent_identical_requests_compute_exactly_once() {
        let flight = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let project = ProjectName::parse("svcA").unwrap();
        let key = SecretKey::parse("DB_PASSWORD").unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let flight = flight.clone();
            let calls = calls.clone();
            let project = project.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                flight
                    .run(project, key, None, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(warden_types::SecretBytes::new(b"p@ss-1".to_vec()))
                    })
                    .await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for r in &results {
            assert_eq!(r.expose(), b"p@ss-1");
        }
    }
}
