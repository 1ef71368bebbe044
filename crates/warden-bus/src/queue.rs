//! A bounded, per-subscriber queue with a configurable overflow policy
//! (spec.md §4.5): "publication is non-blocking for the publisher unless a
//! subscriber's queue is full, in which case backpressure is applied".
//!
//! `tokio::sync::broadcast` applies one fixed overflow policy (drop the
//! oldest) to every subscriber alike; this queue exists because the spec
//! requires the policy to be chosen per subscription.

use std::collections::VecDeque;

use tokio::sync::Notify;

use crate::BackpressurePolicy;
use crate::event::DomainEvent;

pub struct BoundedQueue {
    inner: parking_lot::Mutex<VecDeque<DomainEvent>>,
    capacity: usize,
    policy: BackpressurePolicy,
    not_empty: Notify,
    not_full: Notify,
}

impl BoundedQueue {
    pub fn new(capacity: usize, policy: BackpressurePolicy) -> Self {
        Self {
            inner: parking_lot::Mutex::new(VecDeque::with_capacity(capacity.min(256))),
            capacity,
            policy,
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    /// Enqueue `event` according to this queue's overflow policy. Under
    /// `Block`, waits until space is available; the other policies never
    /// wait.
    pub async fn push(&self, event: DomainEvent) {
        match self.policy {
            BackpressurePolicy::DropNewest => {
                let mut guard = self.inner.lock();
                if guard.len() < self.capacity {
                    guard.push_back(event);
                    drop(guard);
                    self.not_empty.notify_one();
                } else {
                    tracing::warn!("event bus subscriber queue full, dropping newest event");
                }
            }
            BackpressurePolicy::DropOldest => {
                let mut guard = self.inner.lock();
                if guard.len() >= self.capacity {
                    guard.pop_front();
                    tracing::warn!("event bus subscriber queue full, dropping oldest event");
                }
                guard.push_back(event);
                drop(guard);
                self.not_empty.notify_one();
            }
            BackpressurePolicy::Block => {
                let mut event = Some(event);
                loop {
                    {
                        let mut guard = self.inner.lock();
                        if guard.len() < self.capacity {
                            guard.push_back(event.take().expect("pushed exactly once"));
                            drop(guard);
                            self.not_empty.notify_one();
                            return;
                        }
                    }
                    self.not_full.notified().await;
                }
            }
        }
    }

    /// Dequeue the next event, waiting if the queue is currently empty.
    pub async fn recv(&self) -> DomainEvent {
        loop {
            {
                let mut guard = self.inner.lock();
                if let Some(event) = guard.pop_front() {
                    drop(guard);
                    self.not_full.notify_one();
                    return event;
                }
            }
            self.not_empty.notified().await;
        }
    }
}
