//! # Inbound Port - SubmissionPoolApi
//!
//! Primary driving port exposing the submission pool to dashboard callers
//! and to the confirmation watcher.
//!
//! | Method | Caller |
//! |--------|--------|
//! | `enqueue`, `cancel`, `remove`, `set_priority` | Dashboard services |
//! | `confirm`, `reject` | Confirmation watcher |
//! | reads | Anyone |

use crate::domain::{PoolError, PoolStats};
use shared_types::{Address, Priority, RecordId, SubmissionRecord, SubmissionRequest, SubmissionStatus};

/// Primary API for the submission pool.
///
/// Every method is synchronous and serialized against the scheduler; none
/// of them waits on the network.
///
/// # Example
///
/// ```rust,ignore
/// use tx_pool::ports::SubmissionPoolApi;
///
/// fn swap(pool: &dyn SubmissionPoolApi, signer: Address) -> Result<RecordId, PoolError> {
///     let request = SubmissionRequest::new(1, signer)
///         .priority(Priority::High)
///         .label("dex-swap");
///     pool.enqueue(request)
/// }
/// ```
pub trait SubmissionPoolApi: Send + Sync {
    /// Admits a new record in QUEUED status.
    ///
    /// # Errors
    /// - `QueueFull`: the store already holds `max_queue_size` records
    fn enqueue(&self, request: SubmissionRequest) -> Result<RecordId, PoolError>;

    /// Cancels a QUEUED or PENDING record. `false` for anything else.
    fn cancel(&self, id: &RecordId) -> bool;

    /// Deletes a QUEUED, FAILED or CANCELLED record.
    ///
    /// # Errors
    /// - `InvalidState`: the record is PENDING or SUBMITTED
    fn remove(&self, id: &RecordId) -> Result<bool, PoolError>;

    /// Changes the priority of a QUEUED record. `false` for anything else.
    fn set_priority(&self, id: &RecordId, priority: Priority) -> bool;

    /// SUBMITTED → CONFIRMED.
    ///
    /// # Errors
    /// - `InvalidState`: the record is not SUBMITTED
    fn confirm(&self, id: &RecordId) -> Result<bool, PoolError>;

    /// SUBMITTED → FAILED; the network dropped the operation.
    ///
    /// # Errors
    /// - `InvalidState`: the record is not SUBMITTED
    fn reject(&self, id: &RecordId, reason: &str) -> Result<bool, PoolError>;

    fn get(&self, id: &RecordId) -> Option<SubmissionRecord>;

    /// Records with `status`, priority descending then oldest first.
    fn list_by_status(&self, status: SubmissionStatus) -> Vec<SubmissionRecord>;

    /// Records from one signer, newest first.
    fn list_by_address(&self, from: &Address) -> Vec<SubmissionRecord>;

    fn stats(&self) -> PoolStats;

    /// Deletes CONFIRMED, FAILED, CANCELLED and EXPIRED records.
    fn clear_completed(&self) -> usize;
}
