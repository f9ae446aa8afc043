//! # Shared Bus - Pool Lifecycle Events
//!
//! Fan-out of submission pool transitions to observers (dashboard views,
//! recovery logic, logging, metrics) without polling.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐  subscribe()   ┌────────────┐
//! │ Submission   │ ────────────→ │  Event Bus   │ ─────────────→ │ Subscriber │
//! │ Pool         │               │              │  register_     │ / Listener │
//! └──────────────┘               └──────────────┘  listener()    └────────────┘
//! ```
//!
//! ## Delivery
//!
//! - **Pull**: `Subscription`/`EventStream` over a broadcast channel. Slow
//!   readers lag and lose the oldest events.
//! - **Push**: listeners, each with its own bounded queue and task. A
//!   failing or panicking listener is logged and isolated.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod listener;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, PoolEvent, PoolEventKind};
pub use listener::{EventListener, ListenerError, ListenerHandle};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }
}
