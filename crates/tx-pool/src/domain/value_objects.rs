//! Read-side snapshots returned by the pool.

use serde::{Deserialize, Serialize};
use shared_types::{RecordId, SubmissionStatus};

/// Pool statistics snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Records currently in the store.
    pub total: usize,
    pub queued: usize,
    pub pending: usize,
    pub submitted: usize,
    pub confirmed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub expired: usize,
    /// Mean `confirmed_at - created_at` over confirmed records (ms).
    pub avg_confirmation_time_ms: f64,
    /// Mean `retry_count` over all records.
    pub avg_retry_count: f64,
    /// `confirmed / total`, 0.0 when empty.
    pub success_rate: f64,
}

impl PoolStats {
    /// Count for one status.
    pub fn count(&self, status: SubmissionStatus) -> usize {
        match status {
            SubmissionStatus::Queued => self.queued,
            SubmissionStatus::Pending => self.pending,
            SubmissionStatus::Submitted => self.submitted,
            SubmissionStatus::Confirmed => self.confirmed,
            SubmissionStatus::Failed => self.failed,
            SubmissionStatus::Cancelled => self.cancelled,
            SubmissionStatus::Expired => self.expired,
        }
    }

    pub(crate) fn increment(&mut self, status: SubmissionStatus) {
        let slot = match status {
            SubmissionStatus::Queued => &mut self.queued,
            SubmissionStatus::Pending => &mut self.pending,
            SubmissionStatus::Submitted => &mut self.submitted,
            SubmissionStatus::Confirmed => &mut self.confirmed,
            SubmissionStatus::Failed => &mut self.failed,
            SubmissionStatus::Cancelled => &mut self.cancelled,
            SubmissionStatus::Expired => &mut self.expired,
        };
        *slot += 1;
    }
}

/// What one scheduler tick did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub expired: Vec<RecordId>,
    pub boosted: Vec<RecordId>,
    pub dispatched: Vec<RecordId>,
    pub retried: Vec<RecordId>,
    /// Whether anything is left for a future tick to do.
    pub has_work: bool,
}

impl TickReport {
    /// No transition happened during the tick.
    pub fn is_idle(&self) -> bool {
        self.expired.is_empty()
            && self.boosted.is_empty()
            && self.dispatched.is_empty()
            && self.retried.is_empty()
    }
}
