//! # Scheduling Scenarios
//!
//! End-to-end behavior of the scheduler on a manual clock.
//!
//! | Scenario | Behavior |
//! |----------|----------|
//! | A | Highest priority dispatched first under a concurrency of one |
//! | B | Dependent record waits for its dependency to confirm |
//! | C | Always-failing adapter exhausts retries and stays FAILED |
//! | D | PENDING record expires even though the adapter never answers |

#[cfg(test)]
mod tests {
    use crate::support::*;
    use shared_types::{Priority, SubmissionRequest, SubmissionStatus};
    use std::sync::Arc;
    use tx_pool::{retry_backoff_ms, PoolConfig};

    // =========================================================================
    // SCENARIO A: PRIORITY ORDER
    // =========================================================================

    #[tokio::test]
    async fn scenario_a_urgent_dispatched_before_normal_and_low() {
        let adapter = Arc::new(ScriptedAdapter::succeeding());
        let config = PoolConfig {
            max_concurrent_transactions: 1,
            ..PoolConfig::for_testing()
        };
        let h = Harness::new(config, adapter.clone());

        let low = h
            .pool
            .enqueue(SubmissionRequest::new(1, TREASURY).priority(Priority::Low))
            .unwrap();
        let urgent = h
            .pool
            .enqueue(SubmissionRequest::new(1, TRADING_DESK).priority(Priority::Urgent))
            .unwrap();
        let normal = h
            .pool
            .enqueue(SubmissionRequest::new(1, COMPLIANCE).priority(Priority::Normal))
            .unwrap();

        for _ in 0..3 {
            h.tick_and_settle().await;
        }

        assert_eq!(adapter.seen(), vec![urgent, normal, low]);
    }

    // =========================================================================
    // SCENARIO B: DEPENDENCIES
    // =========================================================================

    #[tokio::test]
    async fn scenario_b_dependent_waits_for_confirmation() {
        let adapter = Arc::new(ScriptedAdapter::succeeding());
        let h = Harness::for_testing(adapter.clone());

        let approve = h.pool.enqueue(SubmissionRequest::new(1, TREASURY)).unwrap();
        let swap = h
            .pool
            .enqueue(SubmissionRequest::new(1, TREASURY).depends_on(approve))
            .unwrap();

        let report = h.tick_and_settle().await;
        assert_eq!(report.dispatched, vec![approve]);
        assert_eq!(h.pool.get(&approve).unwrap().status, SubmissionStatus::Submitted);

        // Submitted is not enough.
        for _ in 0..3 {
            assert!(h.tick().await.dispatched.is_empty());
        }
        assert_eq!(h.pool.get(&swap).unwrap().status, SubmissionStatus::Queued);

        h.pool.confirm(&approve).unwrap();
        assert_eq!(h.tick_and_settle().await.dispatched, vec![swap]);
        assert_eq!(adapter.seen(), vec![approve, swap]);
    }

    #[tokio::test]
    async fn scenario_b_failed_dependency_keeps_dependent_queued() {
        let adapter = Arc::new(ScriptedAdapter::always_failing());
        let config = PoolConfig {
            enable_retry: false,
            ..PoolConfig::for_testing()
        };
        let h = Harness::new(config, adapter);

        let first = h.pool.enqueue(SubmissionRequest::new(1, TREASURY)).unwrap();
        let second = h
            .pool
            .enqueue(SubmissionRequest::new(1, TREASURY).depends_on(first))
            .unwrap();

        h.tick_and_settle().await;
        h.tick_and_settle().await;
        assert_eq!(h.pool.get(&first).unwrap().status, SubmissionStatus::Failed);
        assert_eq!(h.pool.get(&second).unwrap().status, SubmissionStatus::Queued);

        // The caller resolves the stuck dependent.
        assert!(h.pool.cancel(&second));
    }

    // =========================================================================
    // SCENARIO C: RETRY EXHAUSTION
    // =========================================================================

    #[tokio::test]
    async fn scenario_c_retries_exhausted_after_three() {
        let adapter = Arc::new(ScriptedAdapter::always_failing());
        let h = Harness::for_testing(adapter.clone());
        let config = h.pool.config();

        let id = h
            .pool
            .enqueue(SubmissionRequest::new(1, TREASURY).max_retries(3))
            .unwrap();

        let mut retried = 0;
        for _ in 0..12 {
            let report = h.tick_and_settle().await;
            retried += report.retried.len();
            h.advance(config.retry_delay_max_ms);
        }

        let record = h.pool.get(&id).unwrap();
        assert_eq!(record.status, SubmissionStatus::Failed);
        assert_eq!(record.retry_count, 3);
        assert_eq!(retried, 3);
        assert_eq!(adapter.calls(), 4);
        assert_eq!(record.error.as_deref(), Some("Rejected: nonce too low"));

        h.advance(config.retry_delay_max_ms * 10);
        let report = h.tick().await;
        assert!(report.retried.is_empty());
        assert!(!report.has_work);
    }

    #[tokio::test]
    async fn scenario_c_backoff_doubles_between_attempts() {
        let adapter = Arc::new(ScriptedAdapter::always_failing());
        let h = Harness::for_testing(adapter);
        let config = h.pool.config();

        let id = h.pool.enqueue(SubmissionRequest::new(1, TREASURY)).unwrap();
        h.tick_and_settle().await;

        for attempt in 0..config.max_retries {
            let delay = retry_backoff_ms(
                attempt,
                config.retry_delay_base_ms,
                config.retry_delay_max_ms,
            );
            h.advance(delay - 1);
            assert!(h.tick().await.retried.is_empty(), "retried early at {attempt}");
            h.advance(1);
            assert_eq!(h.tick().await.retried, vec![id]);
            // Dispatch happens on the following tick.
            h.tick_and_settle().await;
        }
        assert_eq!(h.pool.get(&id).unwrap().retry_count, config.max_retries);
    }

    // =========================================================================
    // SCENARIO D: EXPIRY
    // =========================================================================

    #[tokio::test]
    async fn scenario_d_pending_expires_without_adapter_answer() {
        let h = Harness::for_testing(Arc::new(SilentAdapter));
        let timeout = h.pool.config().transaction_timeout_ms;

        let id = h.pool.enqueue(SubmissionRequest::new(1, TREASURY)).unwrap();
        h.tick().await;
        assert_eq!(h.pool.get(&id).unwrap().status, SubmissionStatus::Pending);

        h.advance(timeout);
        assert!(h.tick().await.expired.is_empty());

        h.advance(1);
        let report = h.tick().await;
        assert_eq!(report.expired, vec![id]);
        assert_eq!(h.pool.get(&id).unwrap().status, SubmissionStatus::Expired);
        assert_eq!(h.pool.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn scenario_d_expiry_frees_slot_for_next_record() {
        let config = PoolConfig {
            max_concurrent_transactions: 1,
            ..PoolConfig::for_testing()
        };
        let h = Harness::new(config, Arc::new(SilentAdapter));
        let timeout = h.pool.config().transaction_timeout_ms;

        let stuck = h.pool.enqueue(SubmissionRequest::new(1, TREASURY)).unwrap();
        h.tick().await;
        h.advance(1);
        let waiting = h.pool.enqueue(SubmissionRequest::new(1, TRADING_DESK)).unwrap();
        assert!(h.tick().await.dispatched.is_empty());

        h.advance(timeout);
        let report = h.tick().await;
        assert_eq!(report.expired, vec![stuck]);
        assert_eq!(report.dispatched, vec![waiting]);
    }

    // =========================================================================
    // CONCURRENCY, CANCELLATION, PRIORITY
    // =========================================================================

    #[tokio::test]
    async fn concurrency_limit_holds_across_ticks() {
        let h = Harness::for_testing(Arc::new(SilentAdapter));
        let limit = h.pool.config().max_concurrent_transactions;

        for i in 0..10u8 {
            h.pool.enqueue(SubmissionRequest::new(1, [i; 20])).unwrap();
        }
        for _ in 0..5 {
            h.tick().await;
            assert_eq!(h.pool.in_flight_count(), limit);
            h.advance(10);
        }
        assert_eq!(h.pool.list_by_status(SubmissionStatus::Queued).len(), 10 - limit);
    }

    #[tokio::test]
    async fn cancelled_and_reprioritized_records() {
        let config = PoolConfig {
            max_concurrent_transactions: 1,
            ..PoolConfig::for_testing()
        };
        let adapter = Arc::new(ScriptedAdapter::succeeding());
        let h = Harness::new(config, adapter.clone());

        let first = h.pool.enqueue(SubmissionRequest::new(1, TREASURY)).unwrap();
        let second = h.pool.enqueue(SubmissionRequest::new(1, TRADING_DESK)).unwrap();
        let third = h.pool.enqueue(SubmissionRequest::new(1, COMPLIANCE)).unwrap();

        assert!(h.pool.cancel(&first));
        assert!(h.pool.set_priority(&third, Priority::Urgent));

        for _ in 0..3 {
            h.tick_and_settle().await;
        }
        assert_eq!(adapter.seen(), vec![third, second]);
        assert_eq!(h.pool.get(&first).unwrap().status, SubmissionStatus::Cancelled);
    }

    #[tokio::test]
    async fn boosted_record_overtakes_newer_peer() {
        let config = PoolConfig {
            max_concurrent_transactions: 1,
            ..PoolConfig::for_testing()
        };
        let h = Harness::new(config, Arc::new(SilentAdapter));
        let threshold = h.pool.config().priority_boost_threshold_ms;

        let blocker = h
            .pool
            .enqueue(SubmissionRequest::new(1, COMPLIANCE).priority(Priority::Urgent))
            .unwrap();
        h.tick().await;

        let old_low = h
            .pool
            .enqueue(SubmissionRequest::new(1, TREASURY).priority(Priority::Low))
            .unwrap();
        h.advance(threshold + 1);
        let fresh_normal = h
            .pool
            .enqueue(SubmissionRequest::new(1, TRADING_DESK).priority(Priority::Normal))
            .unwrap();

        let report = h.tick().await;
        assert_eq!(report.boosted, vec![old_low]);

        // Same priority now; the older record comes first.
        let queued: Vec<_> = h
            .pool
            .list_by_status(SubmissionStatus::Queued)
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(queued, vec![old_low, fresh_normal]);

        assert!(h.pool.cancel(&blocker));
        assert_eq!(h.pool.get(&blocker).unwrap().status, SubmissionStatus::Cancelled);
    }

    #[tokio::test]
    async fn nonce_gap_is_tracked_until_synced() {
        // One slot, so nonces settle in dispatch order.
        let config = PoolConfig {
            max_concurrent_transactions: 1,
            ..PoolConfig::for_testing()
        };
        let h = Harness::new(config, Arc::new(ScriptedAdapter::succeeding()));

        let ids: Vec<_> = (0..3)
            .map(|_| h.pool.enqueue(SubmissionRequest::new(1, TREASURY)).unwrap())
            .collect();
        // Nonce 1 never reaches the network.
        assert!(h.pool.cancel(&ids[1]));

        assert_eq!(h.tick_and_settle().await.dispatched, vec![ids[0]]);
        assert_eq!(h.tick_and_settle().await.dispatched, vec![ids[2]]);

        let state = h.pool.nonce_state(1, &TREASURY).unwrap();
        assert_eq!(state.current_nonce, 3);
        assert_eq!(h.pool.nonce_gaps(1, &TREASURY), vec![1]);

        // The chain reports nonce 1 consumed elsewhere.
        h.pool.sync_nonce(1, &TREASURY, 2);
        let state = h.pool.nonce_state(1, &TREASURY).unwrap();
        assert_eq!(state.current_nonce, 3);
        assert!(h.pool.nonce_gaps(1, &TREASURY).is_empty());
    }
}
