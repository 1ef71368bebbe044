//! In-process event bus for Warden (C5): ordered, at-least-once delivery
//! per subscriber, non-blocking publish except under the `Block`
//! backpressure policy.

#![forbid(unsafe_code)]

mod bus;
mod error;
mod event;
mod queue;

pub use bus::{BackpressurePolicy, EventBus, InMemoryBus, Subscription};
pub use error::BusError;
pub use event::{DomainEvent, EventKind};
pub use warden_types::Subject;
