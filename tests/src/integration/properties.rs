//! # Property Tests
//!
//! Random operation sequences against a pool on a manual clock. After every
//! step the pool must respect its capacity, concurrency and retry bounds and
//! never hand out a nonce twice.

#[cfg(test)]
mod tests {
    use crate::support::*;
    use proptest::prelude::*;
    use shared_types::{Address, Priority, RecordId, SubmissionRequest};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;
    use tx_pool::{PoolConfig, SubmissionError};

    const SIGNERS: [Address; 3] = [TREASURY, TRADING_DESK, COMPLIANCE];

    #[derive(Debug, Clone)]
    enum Op {
        Enqueue { signer: usize, priority: usize },
        Cancel(usize),
        Remove(usize),
        SetPriority(usize, usize),
        Confirm(usize),
        Tick,
        Settle,
        Advance(u64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0..SIGNERS.len(), 0..4usize)
                .prop_map(|(signer, priority)| Op::Enqueue { signer, priority }),
            1 => any::<usize>().prop_map(Op::Cancel),
            1 => any::<usize>().prop_map(Op::Remove),
            1 => (any::<usize>(), 0..4usize).prop_map(|(i, p)| Op::SetPriority(i, p)),
            1 => any::<usize>().prop_map(Op::Confirm),
            3 => Just(Op::Tick),
            2 => Just(Op::Settle),
            2 => (1..3_000u64).prop_map(Op::Advance),
        ]
    }

    fn pick(ids: &[RecordId], index: usize) -> Option<RecordId> {
        if ids.is_empty() {
            None
        } else {
            Some(ids[index % ids.len()])
        }
    }

    fn check_invariants(h: &Harness, config: &PoolConfig) -> Result<(), TestCaseError> {
        prop_assert!(h.pool.in_flight_count() <= config.max_concurrent_transactions);
        prop_assert!(h.pool.len() <= config.max_queue_size);

        let mut nonces = HashSet::new();
        for signer in SIGNERS {
            for record in h.pool.list_by_address(&signer) {
                prop_assert!(record.retry_count <= record.max_retries);
                if let Some(nonce) = record.nonce {
                    prop_assert!(
                        nonces.insert((record.chain_id, record.from, nonce)),
                        "nonce {} reused",
                        nonce
                    );
                }
            }
        }
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn random_operations_respect_pool_bounds(ops in prop::collection::vec(op(), 1..80)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let adapter = Arc::new(ScriptedAdapter::succeeding());
                for i in 0..40 {
                    if i % 3 == 0 {
                        adapter.push(Err(SubmissionError::Network("flaky".into())));
                    } else {
                        adapter.push(Ok([i as u8; 32]));
                    }
                }
                let config = PoolConfig {
                    max_queue_size: 20,
                    ..PoolConfig::for_testing()
                };
                let h = Harness::new(config.clone(), adapter);
                let mut ids: Vec<RecordId> = Vec::new();

                for op in ops {
                    match op {
                        Op::Enqueue { signer, priority } => {
                            let request = SubmissionRequest::new(1, SIGNERS[signer])
                                .priority(Priority::ALL[priority]);
                            if let Ok(id) = h.pool.enqueue(request) {
                                ids.push(id);
                            }
                        }
                        Op::Cancel(i) => {
                            if let Some(id) = pick(&ids, i) {
                                h.pool.cancel(&id);
                            }
                        }
                        Op::Remove(i) => {
                            if let Some(id) = pick(&ids, i) {
                                let _ = h.pool.remove(&id);
                            }
                        }
                        Op::SetPriority(i, p) => {
                            if let Some(id) = pick(&ids, i) {
                                h.pool.set_priority(&id, Priority::ALL[p]);
                            }
                        }
                        Op::Confirm(i) => {
                            if let Some(id) = pick(&ids, i) {
                                let _ = h.pool.confirm(&id);
                            }
                        }
                        Op::Tick => {
                            h.tick().await;
                        }
                        Op::Settle => {
                            tokio::time::sleep(Duration::from_millis(1)).await;
                        }
                        Op::Advance(ms) => h.advance(ms),
                    }
                    check_invariants(&h, &config)?;
                }
                Ok::<(), TestCaseError>(())
            })?;
        }

        #[test]
        fn allocated_nonces_are_dense_per_signer(counts in prop::collection::vec(0..6usize, 3)) {
            let h = Harness::for_testing(Arc::new(SilentAdapter));
            for (signer, count) in SIGNERS.iter().zip(&counts) {
                for _ in 0..*count {
                    h.pool.enqueue(SubmissionRequest::new(1, *signer)).unwrap();
                }
            }
            for (signer, count) in SIGNERS.iter().zip(&counts) {
                let mut nonces: Vec<u64> = h
                    .pool
                    .list_by_address(signer)
                    .iter()
                    .filter_map(|r| r.nonce)
                    .collect();
                nonces.sort_unstable();
                prop_assert_eq!(nonces, (0..*count as u64).collect::<Vec<_>>());
            }
        }
    }
}
