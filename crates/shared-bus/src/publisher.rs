//! # Event Publisher
//!
//! Defines the publishing side of the event bus.

use crate::events::{EventFilter, PoolEvent};
use crate::listener::{EventListener, ListenerError, ListenerHandle, ListenerRegistry};
use crate::subscriber::{EventStream, Subscription, SubscriptionError};
use crate::DEFAULT_CHANNEL_CAPACITY;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// Trait for publishing events to the bus.
///
/// Publishing never blocks: the pool calls it right after releasing its
/// store lock, from synchronous admission calls as well as from the
/// scheduler task.
pub trait EventPublisher: Send + Sync {
    /// Publish an event. Returns how many subscribers and listeners took it.
    fn publish(&self, event: PoolEvent) -> usize;

    /// Total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Uses `tokio::sync::broadcast` for pull subscriptions and one bounded
/// channel per registered listener. Suitable for single-node operation.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<PoolEvent>,
    listeners: Arc<ListenerRegistry>,
    events_published: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            listeners: Arc::new(ListenerRegistry::new(capacity)),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Stream of events matching a filter.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    /// Register a callback listener.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn register_listener<F>(
        &self,
        filter: EventFilter,
        listener: F,
    ) -> Result<ListenerHandle, SubscriptionError>
    where
        F: Fn(&PoolEvent) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.listeners.register(filter, Arc::new(listener))
    }

    /// Register a listener trait object.
    pub fn register(
        &self,
        filter: EventFilter,
        listener: Arc<dyn EventListener>,
    ) -> Result<ListenerHandle, SubscriptionError> {
        self.listeners.register(filter, listener)
    }

    /// Number of active pull subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Drop every registered listener. Pull subscriptions stay open.
    pub fn clear_listeners(&self) {
        self.listeners.clear();
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, event: PoolEvent) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let delivered = self.listeners.dispatch(&event);
        let kind = event.kind;
        let record_id = event.record.id;

        // No receivers is normal: nobody may be watching.
        let received = self.sender.send(event).unwrap_or(0);

        trace!(
            event = %kind,
            record_id = %record_id,
            receivers = received,
            listeners = delivered,
            "Event published"
        );
        received + delivered
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
