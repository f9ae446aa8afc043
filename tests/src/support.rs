//! Test doubles and harness shared by the integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::InMemoryEventBus;
use shared_types::{Address, Hash, RecordId, SubmissionRecord};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tx_pool::{
    ManualTimeSource, PoolConfig, SubmissionAdapter, SubmissionError, SubmissionPool, TickReport,
    TimeSource,
};

pub const TREASURY: Address = [0x7E; 20];
pub const TRADING_DESK: Address = [0xD5; 20];
pub const COMPLIANCE: Address = [0xC0; 20];

/// Start of the manual clock.
pub const T0: u64 = 1_700_000_000_000;

// =============================================================================
// ADAPTERS
// =============================================================================

/// Answers from a script; succeeds (or fails, if `always_fail`) once the
/// script runs out. Records the order of calls.
#[derive(Default)]
pub struct ScriptedAdapter {
    script: Mutex<VecDeque<Result<Hash, SubmissionError>>>,
    always_fail: bool,
    calls: AtomicUsize,
    seen: Mutex<Vec<RecordId>>,
}

impl ScriptedAdapter {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn always_failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    pub fn push(&self, outcome: Result<Hash, SubmissionError>) {
        self.script.lock().push_back(outcome);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Record ids in the order the adapter saw them.
    pub fn seen(&self) -> Vec<RecordId> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl SubmissionAdapter for ScriptedAdapter {
    async fn submit(&self, record: &SubmissionRecord) -> Result<Hash, SubmissionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(record.id);
        if let Some(outcome) = self.script.lock().pop_front() {
            return outcome;
        }
        if self.always_fail {
            Err(SubmissionError::Rejected("nonce too low".to_string()))
        } else {
            let mut hash = [0u8; 32];
            hash[..16].copy_from_slice(record.id.as_bytes());
            Ok(hash)
        }
    }
}

/// Never answers; records stay PENDING until they expire.
pub struct SilentAdapter;

#[async_trait]
impl SubmissionAdapter for SilentAdapter {
    async fn submit(&self, _record: &SubmissionRecord) -> Result<Hash, SubmissionError> {
        std::future::pending().await
    }
}

// =============================================================================
// HARNESS
// =============================================================================

/// Pool on a manual clock, driven tick by tick.
pub struct Harness {
    pub pool: SubmissionPool,
    pub clock: Arc<ManualTimeSource>,
    pub bus: Arc<InMemoryEventBus>,
}

impl Harness {
    pub fn new(config: PoolConfig, adapter: Arc<dyn SubmissionAdapter>) -> Self {
        let clock = Arc::new(ManualTimeSource::new(T0));
        let bus = Arc::new(InMemoryEventBus::new());
        let pool = SubmissionPool::with_dependencies(config, adapter, clock.clone(), bus.clone())
            .expect("valid test config");
        Self { pool, clock, bus }
    }

    /// Harness with `PoolConfig::for_testing()` (auto start off).
    pub fn for_testing(adapter: Arc<dyn SubmissionAdapter>) -> Self {
        Self::new(PoolConfig::for_testing(), adapter)
    }

    pub async fn tick(&self) -> TickReport {
        self.pool.tick().await
    }

    /// Tick, then wait for every adapter call to answer.
    pub async fn tick_and_settle(&self) -> TickReport {
        let report = self.pool.tick().await;
        let pool = self.pool.clone();
        assert!(
            wait_until(move || pool.in_flight_count() == 0, Duration::from_secs(2)).await,
            "adapter calls did not complete"
        );
        report
    }

    pub fn advance(&self, ms: u64) {
        self.clock.advance(ms);
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }
}

/// Poll `condition` every millisecond until it holds or `timeout` elapses.
pub async fn wait_until<F>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}
