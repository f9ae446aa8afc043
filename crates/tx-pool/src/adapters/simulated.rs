//! Simulated network submission.
//!
//! Sleeps for a random latency, fails at a configurable rate and derives a
//! deterministic hash from the record identity and attempt number.

use crate::domain::SubmissionError;
use crate::ports::SubmissionAdapter;
use async_trait::async_trait;
use rand::Rng;
use sha2::{Digest, Sha256};
use shared_types::{Hash, SubmissionRecord};
use std::time::Duration;
use tracing::debug;

/// Adapter standing in for a real broadcast layer.
#[derive(Debug, Clone)]
pub struct SimulatedAdapter {
    min_latency: Duration,
    max_latency: Duration,
    failure_rate: f64,
}

impl Default for SimulatedAdapter {
    fn default() -> Self {
        Self {
            min_latency: Duration::from_millis(50),
            max_latency: Duration::from_millis(250),
            failure_rate: 0.1,
        }
    }
}

impl SimulatedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latency range; `max` below `min` is treated as `min`.
    pub fn with_latency(mut self, min: Duration, max: Duration) -> Self {
        self.min_latency = min;
        self.max_latency = max.max(min);
        self
    }

    /// Probability in `[0, 1]` that a submission fails.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        self
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }

    /// Hash reported for an attempt.
    pub fn attempt_hash(record: &SubmissionRecord) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(record.id.as_bytes());
        hasher.update(record.chain_id.to_be_bytes());
        hasher.update(record.retry_count.to_be_bytes());
        hasher.finalize().into()
    }
}

#[async_trait]
impl SubmissionAdapter for SimulatedAdapter {
    async fn submit(&self, record: &SubmissionRecord) -> Result<Hash, SubmissionError> {
        // ThreadRng is not Send; draw everything before the first await.
        let (latency, fails) = {
            let mut rng = rand::thread_rng();
            let min = self.min_latency.as_millis() as u64;
            let max = self.max_latency.as_millis() as u64;
            (
                Duration::from_millis(rng.gen_range(min..=max)),
                rng.gen_bool(self.failure_rate),
            )
        };

        tokio::time::sleep(latency).await;

        if fails {
            debug!(record_id = %record.id, "Simulated submission failure");
            return Err(SubmissionError::Network("simulated network failure".into()));
        }
        Ok(Self::attempt_hash(record))
    }
}
