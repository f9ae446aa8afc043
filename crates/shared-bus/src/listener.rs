//! # Event Listeners
//!
//! Push-side of the event bus. Each registered listener owns a bounded
//! channel and a task that feeds it events one at a time. A listener that
//! returns an error or panics is logged and keeps receiving; it never
//! affects delivery to other listeners or the publisher.

use crate::events::{EventFilter, PoolEvent};
use crate::subscriber::SubscriptionError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Error returned by a listener callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Callback invoked for every matching event.
pub trait EventListener: Send + Sync + 'static {
    fn on_event(&self, event: &PoolEvent) -> Result<(), ListenerError>;
}

impl<F> EventListener for F
where
    F: Fn(&PoolEvent) -> Result<(), ListenerError> + Send + Sync + 'static,
{
    fn on_event(&self, event: &PoolEvent) -> Result<(), ListenerError> {
        self(event)
    }
}

struct ListenerSlot {
    filter: EventFilter,
    sender: mpsc::Sender<PoolEvent>,
}

/// Registered listeners keyed by registration id.
pub(crate) struct ListenerRegistry {
    slots: RwLock<HashMap<u64, ListenerSlot>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl ListenerRegistry {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            capacity,
        }
    }

    pub(crate) fn register(
        self: &Arc<Self>,
        filter: EventFilter,
        listener: Arc<dyn EventListener>,
    ) -> Result<ListenerHandle, SubscriptionError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SubscriptionError::NoRuntime)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, mut receiver) = mpsc::channel::<PoolEvent>(self.capacity);

        runtime.spawn(async move {
            while let Some(event) = receiver.recv().await {
                let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_event(&event)));
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(
                        listener = id,
                        event = %event.kind,
                        record_id = %event.record.id,
                        error = %e,
                        "Event listener failed"
                    ),
                    Err(_) => warn!(
                        listener = id,
                        event = %event.kind,
                        record_id = %event.record.id,
                        "Event listener panicked"
                    ),
                }
            }
            debug!(listener = id, "Listener task finished");
        });

        self.slots.write().insert(id, ListenerSlot { filter, sender });
        debug!(listener = id, "Listener registered");

        Ok(ListenerHandle {
            id,
            registry: Arc::downgrade(self),
            detached: false,
        })
    }

    /// Queue an event for every matching listener. Returns how many took it.
    pub(crate) fn dispatch(&self, event: &PoolEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        {
            let slots = self.slots.read();
            for (id, slot) in slots.iter() {
                if !slot.filter.matches(event) {
                    continue;
                }
                match slot.sender.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => warn!(
                        listener = id,
                        event = %event.kind,
                        "Listener lagging, event dropped"
                    ),
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        if !closed.is_empty() {
            let mut slots = self.slots.write();
            for id in closed {
                slots.remove(&id);
            }
        }

        delivered
    }

    fn unregister(&self, id: u64) -> bool {
        let removed = self.slots.write().remove(&id).is_some();
        if removed {
            debug!(listener = id, "Listener unregistered");
        }
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub(crate) fn clear(&self) {
        self.slots.write().clear();
    }
}

/// Registration handle. Dropping it unregisters the listener unless
/// `detach` was called.
#[must_use = "dropping the handle unregisters the listener"]
pub struct ListenerHandle {
    id: u64,
    registry: Weak<ListenerRegistry>,
    detached: bool,
}

impl ListenerHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop delivering events to this listener.
    pub fn unsubscribe(mut self) -> bool {
        self.detached = true;
        self.registry
            .upgrade()
            .map(|registry| registry.unregister(self.id))
            .unwrap_or(false)
    }

    /// Keep the listener registered for the lifetime of the bus.
    pub fn detach(mut self) {
        self.detached = true;
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if self.detached {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::test_support::event;
    use crate::events::PoolEventKind;
    use crate::publisher::{EventPublisher, InMemoryEventBus};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    async fn wait_for(counter: &AtomicUsize, expected: usize) {
        for _ in 0..100 {
            if counter.load(Ordering::SeqCst) >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_listener_receives_events() {
        let bus = InMemoryEventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();

        let _handle = bus
            .register_listener(EventFilter::all(), move |_: &PoolEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        bus.publish(event(PoolEventKind::Added, 1, [0xAA; 20]));
        bus.publish(event(PoolEventKind::Processing, 1, [0xAA; 20]));

        wait_for(&seen, 2).await;
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failing_listener_does_not_block_others() {
        let bus = InMemoryEventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();

        let _bad = bus
            .register_listener(EventFilter::all(), |_: &PoolEvent| {
                Err(ListenerError::new("refused"))
            })
            .unwrap();
        let _panicky = bus
            .register_listener(EventFilter::all(), |_: &PoolEvent| -> Result<(), ListenerError> {
                panic!("listener bug");
            })
            .unwrap();
        let _good = bus
            .register_listener(EventFilter::all(), move |_: &PoolEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        for _ in 0..3 {
            bus.publish(event(PoolEventKind::Failed, 1, [0xAA; 20]));
        }

        wait_for(&seen, 3).await;
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(bus.listener_count(), 3);
    }

    #[tokio::test]
    async fn test_unsubscribe_and_drop() {
        let bus = InMemoryEventBus::new();

        let handle = bus
            .register_listener(EventFilter::all(), |_: &PoolEvent| Ok(()))
            .unwrap();
        assert_eq!(bus.listener_count(), 1);
        assert!(handle.unsubscribe());
        assert_eq!(bus.listener_count(), 0);

        {
            let _scoped = bus
                .register_listener(EventFilter::all(), |_: &PoolEvent| Ok(()))
                .unwrap();
            assert_eq!(bus.listener_count(), 1);
        }
        assert_eq!(bus.listener_count(), 0);

        bus.register_listener(EventFilter::all(), |_: &PoolEvent| Ok(()))
            .unwrap()
            .detach();
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn test_register_without_runtime_fails() {
        let bus = InMemoryEventBus::new();
        let result = bus.register_listener(EventFilter::all(), |_: &PoolEvent| Ok(()));
        assert!(matches!(result, Err(SubscriptionError::NoRuntime)));
    }
}
