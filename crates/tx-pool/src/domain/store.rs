//! # Record Store
//!
//! Keyed table of submission records; the single source of truth for
//! status and history.
//!
//! ## Ordering
//!
//! - Status listings and dispatch: priority descending, then `created_at`
//!   ascending, then insertion order.
//! - Signer listings: newest first.

use super::value_objects::PoolStats;
use shared_types::{Address, RecordId, SubmissionRecord, SubmissionStatus};
use std::cmp::Reverse;
use std::collections::HashMap;

/// In-memory record table.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<RecordId, SubmissionRecord>,
    /// Insertion sequence; breaks ties between records created in the same
    /// millisecond.
    sequence: HashMap<RecordId, u64>,
    next_sequence: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &RecordId) -> Option<&SubmissionRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &RecordId) -> Option<&mut SubmissionRecord> {
        self.records.get_mut(id)
    }

    pub fn status(&self, id: &RecordId) -> Option<SubmissionStatus> {
        self.records.get(id).map(|record| record.status)
    }

    /// Inserts a record. Replacing an existing id keeps its queue position.
    pub fn insert(&mut self, record: SubmissionRecord) {
        let id = record.id;
        if !self.sequence.contains_key(&id) {
            self.sequence.insert(id, self.next_sequence);
            self.next_sequence += 1;
        }
        self.records.insert(id, record);
    }

    pub fn remove(&mut self, id: &RecordId) -> Option<SubmissionRecord> {
        self.sequence.remove(id);
        self.records.remove(id)
    }

    /// Ids with `status`, in dispatch order.
    pub fn ids_by_status(&self, status: SubmissionStatus) -> Vec<RecordId> {
        let mut matching: Vec<&SubmissionRecord> = self
            .records
            .values()
            .filter(|record| record.status == status)
            .collect();
        matching.sort_by_key(|record| {
            (
                Reverse(record.priority),
                record.created_at,
                self.sequence.get(&record.id).copied().unwrap_or(u64::MAX),
            )
        });
        matching.into_iter().map(|record| record.id).collect()
    }

    /// Records with `status`, priority descending then oldest first.
    pub fn list_by_status(&self, status: SubmissionStatus) -> Vec<SubmissionRecord> {
        self.ids_by_status(status)
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect()
    }

    /// Records from one signer across all chains, newest first.
    pub fn list_by_address(&self, from: &Address) -> Vec<SubmissionRecord> {
        let mut matching: Vec<&SubmissionRecord> = self
            .records
            .values()
            .filter(|record| &record.from == from)
            .collect();
        matching.sort_by_key(|record| {
            Reverse((
                record.created_at,
                self.sequence.get(&record.id).copied().unwrap_or(0),
            ))
        });
        matching.into_iter().cloned().collect()
    }

    /// Any record a future tick could still move.
    ///
    /// Failed records count only when retries are enabled and left.
    pub fn has_schedulable_work(&self, retry_enabled: bool) -> bool {
        self.records.values().any(|record| match record.status {
            SubmissionStatus::Queued | SubmissionStatus::Pending | SubmissionStatus::Submitted => {
                true
            }
            SubmissionStatus::Failed => retry_enabled && record.can_retry(),
            _ => false,
        })
    }

    /// Ids of records whose status is terminal for `clear_completed`.
    pub fn completed_ids(&self) -> Vec<RecordId> {
        self.records
            .values()
            .filter(|record| record.status.is_completed())
            .map(|record| record.id)
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &SubmissionRecord> {
        self.records.values()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.sequence.clear();
    }

    /// Aggregate statistics.
    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats {
            total: self.records.len(),
            ..PoolStats::default()
        };
        if self.records.is_empty() {
            return stats;
        }

        let mut confirmation_total = 0u128;
        let mut retry_total = 0u64;
        for record in self.records.values() {
            stats.increment(record.status);
            retry_total += u64::from(record.retry_count);
            if record.status == SubmissionStatus::Confirmed {
                if let Some(elapsed) = record.confirmation_time() {
                    confirmation_total += u128::from(elapsed);
                }
            }
        }

        if stats.confirmed > 0 {
            stats.avg_confirmation_time_ms = confirmation_total as f64 / stats.confirmed as f64;
        }
        stats.avg_retry_count = retry_total as f64 / stats.total as f64;
        stats.success_rate = stats.confirmed as f64 / stats.total as f64;
        stats
    }
}
