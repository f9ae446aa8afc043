//! # Event Handlers
//!
//! Pool event listener that feeds the Prometheus metrics and logs final
//! outcomes, plus the gauge refresh used by the periodic reporter.

use pool_telemetry::{
    BOOSTS, CONFIRMATION_LATENCY, EVENTS_OBSERVED, EXPIRIES, IN_FLIGHT, RECORDS_BY_STATUS,
    RETRIES, SUBMISSIONS,
};
use shared_bus::{EventListener, ListenerError, PoolEvent, PoolEventKind};
use shared_types::{format_address, SubmissionStatus};
use tracing::{info, warn};
use tx_pool::{PoolStats, SubmissionPool};

/// Outcome label values used on `pool_submissions_total`.
pub const OUTCOMES: [&str; 5] = ["submitted", "confirmed", "failed", "cancelled", "expired"];

/// Counts every pool event and logs records that reach a final state.
#[derive(Debug, Default)]
pub struct MetricsListener;

impl EventListener for MetricsListener {
    fn on_event(&self, event: &PoolEvent) -> Result<(), ListenerError> {
        EVENTS_OBSERVED
            .with_label_values(&[event.kind.as_str()])
            .inc();

        let record = &event.record;
        match event.kind {
            PoolEventKind::Submitted => {
                SUBMISSIONS.with_label_values(&["submitted"]).inc();
            }
            PoolEventKind::Confirmed => {
                SUBMISSIONS.with_label_values(&["confirmed"]).inc();
                if let Some(elapsed_ms) = record.confirmation_time() {
                    CONFIRMATION_LATENCY.observe(elapsed_ms as f64 / 1000.0);
                }
                info!(
                    record_id = %record.id,
                    label = record.label.as_deref().unwrap_or("-"),
                    signer = %format_address(&record.from),
                    nonce = ?record.nonce,
                    retries = record.retry_count,
                    "Submission confirmed"
                );
            }
            PoolEventKind::Failed => {
                SUBMISSIONS.with_label_values(&["failed"]).inc();
                if !record.can_retry() {
                    warn!(
                        record_id = %record.id,
                        label = record.label.as_deref().unwrap_or("-"),
                        retries = record.retry_count,
                        error = record.error.as_deref().unwrap_or("unknown"),
                        "Submission failed permanently"
                    );
                }
            }
            PoolEventKind::Cancelled => {
                SUBMISSIONS.with_label_values(&["cancelled"]).inc();
            }
            PoolEventKind::Expired => {
                SUBMISSIONS.with_label_values(&["expired"]).inc();
                EXPIRIES.inc();
            }
            PoolEventKind::Retried => RETRIES.inc(),
            PoolEventKind::PriorityBoosted => BOOSTS.inc(),
            _ => {}
        }
        Ok(())
    }
}

/// Set the queue gauges from a fresh snapshot. Returns the snapshot.
pub fn refresh_gauges(pool: &SubmissionPool) -> PoolStats {
    let stats = pool.stats();
    for status in SubmissionStatus::ALL {
        RECORDS_BY_STATUS
            .with_label_values(&[status.as_str()])
            .set(stats.count(status) as f64);
    }
    IN_FLIGHT.set(pool.in_flight_count() as f64);
    stats
}

/// Status label values used on `pool_records`.
pub fn status_labels() -> Vec<&'static str> {
    SubmissionStatus::ALL.iter().map(|s| s.as_str()).collect()
}
