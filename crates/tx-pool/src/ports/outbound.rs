//! Outbound (Driven) ports for the submission pool.
//!
//! These traits define dependencies on external systems the pool needs.

use crate::domain::SubmissionError;
use async_trait::async_trait;
use shared_types::{Hash, SubmissionRecord, Timestamp};
use std::sync::atomic::{AtomicU64, Ordering};

/// Network submission interface.
///
/// The pool calls `submit` without holding any lock, on its own task.
/// Implementations must tolerate being called again for the same record on
/// retry; only `retry_count` differs between attempts.
#[async_trait]
pub trait SubmissionAdapter: Send + Sync {
    /// Broadcasts the operation and returns the network identifier.
    async fn submit(&self, record: &SubmissionRecord) -> Result<Hash, SubmissionError>;
}

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    time: AtomicU64,
}

impl ManualTimeSource {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.time.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, time: Timestamp) {
        self.time.store(time, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        self.time.load(Ordering::SeqCst)
    }
}
