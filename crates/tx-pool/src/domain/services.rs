//! Domain services for the submission pool.
//!
//! Pure functions the scheduler applies to records.

use super::config::PoolConfig;
use super::nonce::NonceAllocator;
use super::store::RecordStore;
use shared_types::{Priority, SubmissionRecord, SubmissionStatus, Timestamp};

/// Delay before retry number `retry_count + 1`.
///
/// Formula: min(base * 2^retry_count, max), saturating.
pub fn retry_backoff_ms(retry_count: u32, base_ms: u64, max_ms: u64) -> u64 {
    let factor = 1u64.checked_shl(retry_count).unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor).min(max_ms)
}

/// Whether a failed record has waited out its backoff and has retries left.
pub fn is_retry_due(record: &SubmissionRecord, now: Timestamp, config: &PoolConfig) -> bool {
    if !record.can_retry() {
        return false;
    }
    let delay = retry_backoff_ms(
        record.retry_count,
        config.retry_delay_base_ms,
        config.retry_delay_max_ms,
    );
    now.saturating_sub(record.last_activity()) >= delay
}

/// Whether a queued record has waited long enough to be promoted.
///
/// Only priorities below High are promoted.
pub fn is_boost_due(record: &SubmissionRecord, now: Timestamp, config: &PoolConfig) -> bool {
    record.status == SubmissionStatus::Queued
        && record.priority < Priority::High
        && record.age(now) > config.priority_boost_threshold_ms
}

/// Whether every dependency is present and CONFIRMED.
pub fn dependencies_confirmed(record: &SubmissionRecord, store: &RecordStore) -> bool {
    record
        .dependencies
        .iter()
        .all(|dep| store.status(dep) == Some(SubmissionStatus::Confirmed))
}

/// Full dispatch admissibility: dependencies, then nonce window.
pub fn is_admissible(
    record: &SubmissionRecord,
    store: &RecordStore,
    nonces: &mut NonceAllocator,
    config: &PoolConfig,
) -> bool {
    if !dependencies_confirmed(record, store) {
        return false;
    }
    match record.nonce {
        Some(nonce) if config.enable_nonce_management => nonces.is_admissible(
            record.chain_id,
            &record.from,
            nonce,
            config.nonce_gap_tolerance,
        ),
        _ => true,
    }
}
