//! # Integration Test Flows
//!
//! Pool transitions observed through the shared bus.
//!
//! ## Flows Tested
//!
//! 1. **Pool → Event Bus → Stream**: full lifecycle in order
//! 2. **Shared bus, several pools**: chain and kind filters
//! 3. **Listener isolation**: a failing listener does not affect others
//! 4. **Pool → Watcher → Pool**: confirmation round trip

#[cfg(test)]
mod tests {
    use crate::support::*;
    use pool_runtime::ConfirmationWatcher;
    use shared_bus::{
        EventFilter, EventListener, EventPublisher, ListenerError, PoolEvent, PoolEventKind,
    };
    use shared_types::{SubmissionRequest, SubmissionStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;
    use tx_pool::{PoolConfig, SubmissionError, SubmissionPool, SubmissionPoolApi};

    // =========================================================================
    // FIXTURES
    // =========================================================================

    struct CountingListener {
        seen: AtomicUsize,
    }

    impl EventListener for CountingListener {
        fn on_event(&self, _event: &PoolEvent) -> Result<(), ListenerError> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct BrokenListener;

    impl EventListener for BrokenListener {
        fn on_event(&self, event: &PoolEvent) -> Result<(), ListenerError> {
            if event.kind == PoolEventKind::Processing {
                panic!("listener bug");
            }
            Err(ListenerError::new("dashboard offline"))
        }
    }

    // =========================================================================
    // POOL → BUS
    // =========================================================================

    #[tokio::test]
    async fn test_stream_sees_lifecycle_in_order() {
        let h = Harness::for_testing(Arc::new(ScriptedAdapter::succeeding()));
        let mut stream = h
            .pool
            .event_stream(EventFilter::all().with_signer(TREASURY));

        let id = h.pool.enqueue(SubmissionRequest::new(1, TREASURY)).unwrap();
        h.pool.enqueue(SubmissionRequest::new(1, TRADING_DESK)).unwrap();
        h.tick_and_settle().await;
        h.pool.confirm(&id).unwrap();

        let mut kinds = Vec::new();
        for _ in 0..4 {
            let event = timeout(Duration::from_secs(1), stream.next())
                .await
                .expect("timeout")
                .expect("stream closed");
            assert_eq!(event.record.id, id);
            kinds.push(event.kind);
        }
        assert_eq!(
            kinds,
            vec![
                PoolEventKind::Added,
                PoolEventKind::Processing,
                PoolEventKind::Submitted,
                PoolEventKind::Confirmed,
            ]
        );
    }

    #[tokio::test]
    async fn test_event_snapshot_matches_record_at_transition() {
        let adapter = Arc::new(ScriptedAdapter::succeeding());
        adapter.push(Err(SubmissionError::Network("timeout talking to node".into())));
        let h = Harness::for_testing(adapter);
        let mut failures = h.pool.subscription(EventFilter::kinds(vec![
            PoolEventKind::Failed,
            PoolEventKind::Retried,
        ]));

        let id = h.pool.enqueue(SubmissionRequest::new(1, TREASURY)).unwrap();
        h.tick_and_settle().await;
        h.advance(h.pool.config().retry_delay_base_ms);
        h.tick().await;

        let events = failures.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, PoolEventKind::Failed);
        assert_eq!(events[0].record.status, SubmissionStatus::Failed);
        assert_eq!(
            events[0].record.error.as_deref(),
            Some("Network error: timeout talking to node")
        );
        assert_eq!(events[1].kind, PoolEventKind::Retried);
        assert_eq!(events[1].record.id, id);
        assert_eq!(events[1].record.retry_count, 1);
        assert_eq!(events[1].timestamp, h.now());
    }

    #[tokio::test]
    async fn test_shared_bus_filters_by_chain() {
        let h = Harness::for_testing(Arc::new(SilentAdapter));
        let polygon = SubmissionPool::with_dependencies(
            PoolConfig::for_testing(),
            Arc::new(SilentAdapter),
            h.clock.clone(),
            h.bus.clone(),
        )
        .unwrap();

        let mut mainnet_only = h.bus.subscribe(EventFilter::chains(vec![1]));
        let mut everything = h.bus.subscribe(EventFilter::all());

        h.pool.enqueue(SubmissionRequest::new(1, TREASURY)).unwrap();
        polygon.enqueue(SubmissionRequest::new(137, TREASURY)).unwrap();

        let mainnet: Vec<_> = mainnet_only.drain();
        assert_eq!(mainnet.len(), 1);
        assert_eq!(mainnet[0].chain_id(), 1);
        assert_eq!(everything.drain().len(), 2);
        assert_eq!(h.bus.events_published(), 2);
    }

    #[tokio::test]
    async fn test_broken_listener_does_not_stop_others() {
        let h = Harness::for_testing(Arc::new(ScriptedAdapter::succeeding()));
        let counter = Arc::new(CountingListener {
            seen: AtomicUsize::new(0),
        });

        let _broken = h
            .pool
            .subscribe_filtered(EventFilter::all(), Arc::new(BrokenListener))
            .unwrap();
        let _counting = h
            .pool
            .subscribe_filtered(EventFilter::all(), counter.clone())
            .unwrap();

        let id = h.pool.enqueue(SubmissionRequest::new(1, TREASURY)).unwrap();
        h.tick_and_settle().await;
        h.pool.confirm(&id).unwrap();

        let seen = counter.clone();
        assert!(wait_until(move || seen.seen.load(Ordering::SeqCst) == 4, Duration::from_secs(1)).await);
        assert_eq!(h.pool.get(&id).unwrap().status, SubmissionStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_shutdown_detaches_listeners() {
        let h = Harness::for_testing(Arc::new(SilentAdapter));
        let counter = Arc::new(CountingListener {
            seen: AtomicUsize::new(0),
        });
        let _handle = h
            .pool
            .subscribe_filtered(EventFilter::all(), counter)
            .unwrap();
        assert_eq!(h.bus.listener_count(), 1);

        h.pool.shutdown();
        assert_eq!(h.bus.listener_count(), 0);
        assert!(h.pool.is_empty());
    }

    // =========================================================================
    // POOL → WATCHER → POOL
    // =========================================================================

    #[tokio::test]
    async fn test_watcher_confirms_through_trait_object() {
        let h = Harness::for_testing(Arc::new(ScriptedAdapter::succeeding()));
        let (stop_tx, stop_rx) = watch::channel(false);
        let watcher = ConfirmationWatcher::new(h.pool.clone(), Duration::from_millis(1), 0.0)
            .spawn(stop_rx);

        let api: Arc<dyn SubmissionPoolApi> = Arc::new(h.pool.clone());
        let id = api.enqueue(SubmissionRequest::new(1, TREASURY)).unwrap();
        h.tick_and_settle().await;

        let reader = Arc::clone(&api);
        assert!(
            wait_until(
                move || reader.get(&id).map(|r| r.status) == Some(SubmissionStatus::Confirmed),
                Duration::from_secs(2),
            )
            .await
        );
        assert_eq!(api.stats().confirmed, 1);
        assert_eq!(api.clear_completed(), 1);

        stop_tx.send(true).unwrap();
        timeout(Duration::from_secs(1), watcher).await.unwrap().unwrap();
    }
}
