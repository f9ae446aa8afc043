//! # Simulated Confirmation Watcher
//!
//! Stands in for the chain observer: every SUBMITTED record is either
//! confirmed or dropped after a fixed delay.

use rand::Rng;
use shared_bus::{EventFilter, PoolEventKind};
use shared_types::RecordId;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, info};
use tx_pool::SubmissionPool;

/// Confirms or drops submitted records after `delay`.
#[derive(Clone)]
pub struct ConfirmationWatcher {
    pool: SubmissionPool,
    delay: Duration,
    drop_rate: f64,
}

impl ConfirmationWatcher {
    pub fn new(pool: SubmissionPool, delay: Duration, drop_rate: f64) -> Self {
        Self {
            pool,
            delay,
            drop_rate: if drop_rate.is_nan() {
                0.0
            } else {
                drop_rate.clamp(0.0, 1.0)
            },
        }
    }

    /// Start watching. The task ends when `shutdown` flips or the bus closes.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let mut submitted = self
            .pool
            .event_stream(EventFilter::kinds(vec![PoolEventKind::Submitted]));

        tokio::spawn(async move {
            info!(
                delay_ms = self.delay.as_millis() as u64,
                drop_rate = self.drop_rate,
                "Confirmation watcher started"
            );
            loop {
                tokio::select! {
                    next = submitted.next() => {
                        let Some(event) = next else {
                            break;
                        };
                        let watcher = self.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(watcher.delay).await;
                            watcher.settle(event.record.id);
                        });
                    }
                    _ = shutdown.changed() => {
                        break;
                    }
                }
            }
            info!("Confirmation watcher stopped");
        })
    }

    /// Report the verdict for one record.
    ///
    /// Records cancelled, expired or removed meanwhile are skipped.
    pub fn settle(&self, id: RecordId) {
        let dropped = rand::thread_rng().gen_bool(self.drop_rate);
        let outcome = if dropped {
            self.pool.reject(&id, "dropped from mempool")
        } else {
            self.pool.confirm(&id)
        };
        match outcome {
            Ok(true) => debug!(record_id = %id, dropped = dropped, "Watcher verdict applied"),
            Ok(false) => debug!(record_id = %id, "Record gone before verdict"),
            Err(e) => debug!(record_id = %id, error = %e, "Verdict no longer applicable"),
        }
    }
}
