//! The publish/subscribe contract (spec.md §4.5) and its in-process
//! implementation, grounded on `toka-bus-core`'s `EventBus`/`InMemoryBus`
//! pair but generalized to per-subscriber bounded queues with a
//! configurable overflow policy instead of one shared broadcast channel.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BusError;
use crate::event::DomainEvent;
use crate::queue::BoundedQueue;

/// How a subscriber's queue behaves once full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressurePolicy {
    /// The publisher waits until the subscriber drains space. The default
    /// (spec.md §4.5).
    Block,
    /// Silently drop the oldest queued event to make room.
    DropOldest,
    /// Silently drop the incoming event.
    DropNewest,
}

impl Default for BackpressurePolicy {
    fn default() -> Self {
        Self::Block
    }
}

/// Contract every publisher in the system depends on. Kept as a trait so
/// `warden-broker`/`warden-store`/`warden-rotation` can be tested against a
/// fake bus without pulling in the real queueing machinery.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish `event` to every live subscriber. Ordered per subscriber;
    /// at-least-once; non-blocking for the publisher except under the
    /// `Block` backpressure policy.
    async fn publish(&self, event: DomainEvent) -> Result<(), BusError>;

    /// Register a new subscriber with its own bounded queue.
    fn subscribe(&self, capacity: usize, policy: BackpressurePolicy) -> Subscription;
}

/// A live subscription. Dropping it unregisters the subscriber; the bus
/// notices on its next publish and stops holding a strong reference.
pub struct Subscription {
    queue: Arc<BoundedQueue>,
}

impl Subscription {
    /// Receive the next event, in publish order, waiting if none is queued.
    pub async fn recv(&self) -> DomainEvent {
        self.queue.recv().await
    }
}

/// In-process event bus. `publish` fans out to every subscriber
/// concurrently so one slow `Block` subscriber doesn't delay delivery to
/// the others.
#[derive(Default)]
pub struct InMemoryBus {
    subscribers: parking_lot::Mutex<Vec<Weak<BoundedQueue>>>,
}

impl InMemoryBus {
    /// Construct an empty bus.
    pub fn new() -> Self {
        Self { subscribers: parking_lot::Mutex::new(Vec::new()) }
    }

    fn live_subscribers(&self) -> Vec<Arc<BoundedQueue>> {
        let mut guard = self.subscribers.lock();
        guard.retain(|weak| weak.strong_count() > 0);
        guard.iter().filter_map(Weak::upgrade).collect()
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, event: DomainEvent) -> Result<(), BusError> {
        let subscribers = self.live_subscribers();
        let pushes = subscribers.iter().map(|q| q.push(event.clone()));
        futures::future::join_all(pushes).await;
        Ok(())
    }

    fn subscribe(&self, capacity: usize, policy: BackpressurePolicy) -> Subscription {
        let queue = Arc::new(BoundedQueue::new(capacity, policy));
        self.subscribers.lock().push(Arc::downgrade(&queue));
        Subscription { queue }
    }
}
