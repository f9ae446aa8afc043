//! # Submission Records
//!
//! The unit of work tracked by the submission pool and the state machine
//! that governs it.
//!
//! ```text
//! [QUEUED] ──dispatch──→ [PENDING] ──adapter ok──→ [SUBMITTED] ──confirm──→ [CONFIRMED]
//!    │                      │  │                        │  │
//!    │                      │  └──adapter err──→ [FAILED] ←┘  (reject)
//!    └──cancel──→ [CANCELLED] ←┘                  │
//!                                                  └──backoff elapsed──→ [QUEUED]
//! [PENDING]/[SUBMITTED] ──timeout──→ [EXPIRED]
//! ```

use crate::entities::{Address, ChainId, Hash, RecordId, Timestamp, U256};
use crate::errors::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Scheduling priority. Ordering is `Low < Normal < High < Urgent`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// All priorities, lowest first.
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Normal,
        Priority::High,
        Priority::Urgent,
    ];

    /// One step up, capped at `Urgent`.
    #[must_use]
    pub fn boosted(self) -> Self {
        match self {
            Priority::Low => Priority::Normal,
            Priority::Normal => Priority::High,
            Priority::High | Priority::Urgent => Priority::Urgent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(ParseError::UnknownVariant {
                kind: "priority",
                value: s.to_string(),
            }),
        }
    }
}

/// Lifecycle status of a submission record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// Waiting for the scheduler.
    Queued,
    /// Handed to the submission adapter, no answer yet.
    Pending,
    /// Accepted by the network layer, awaiting external confirmation.
    Submitted,
    /// Finality observed by the confirmation watcher.
    Confirmed,
    /// Adapter error or dropped by the network.
    Failed,
    /// Cancelled by a caller before completion.
    Cancelled,
    /// Pending/submitted for longer than the configured timeout.
    Expired,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 7] = [
        SubmissionStatus::Queued,
        SubmissionStatus::Pending,
        SubmissionStatus::Submitted,
        SubmissionStatus::Confirmed,
        SubmissionStatus::Failed,
        SubmissionStatus::Cancelled,
        SubmissionStatus::Expired,
    ];

    /// Pending or Submitted: the network side may still be working on it.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Pending | Self::Submitted)
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Queued | Self::Pending)
    }

    pub fn is_removable(&self) -> bool {
        matches!(self, Self::Queued | Self::Failed | Self::Cancelled)
    }

    /// Statuses swept by `clear_completed`.
    pub fn is_completed(&self) -> bool {
        matches!(
            self,
            Self::Confirmed | Self::Failed | Self::Cancelled | Self::Expired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::UnknownVariant {
                kind: "status",
                value: s.to_string(),
            })
    }
}

/// Illegal status transition attempted on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Illegal transition {from} -> {to}")]
pub struct TransitionError {
    pub from: SubmissionStatus,
    pub to: SubmissionStatus,
}

/// Gas parameters carried through to the broadcast layer untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasSettings {
    pub gas_limit: Option<U256>,
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
}

impl GasSettings {
    /// Upper bound on the fee this operation may pay, if it can be computed.
    ///
    /// Uses `max_fee_per_gas` when present, else `gas_price`. `None` on
    /// overflow or when either factor is missing.
    pub fn max_fee(&self) -> Option<U256> {
        let limit = self.gas_limit?;
        let price = self.max_fee_per_gas.or(self.gas_price)?;
        limit.checked_mul(price)
    }
}

/// What a caller hands to `enqueue`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub chain_id: ChainId,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Vec<u8>,
    pub gas: GasSettings,
    /// Explicit nonce. Left empty, the pool allocates one.
    pub nonce: Option<u64>,
    pub priority: Priority,
    /// Overrides the pool-wide retry limit.
    pub max_retries: Option<u32>,
    /// Records that must be CONFIRMED before this one is dispatched.
    pub dependencies: Vec<RecordId>,
    /// Free-form origin tag for observers (e.g. "dex-swap").
    pub label: Option<String>,
}

impl SubmissionRequest {
    pub fn new(chain_id: ChainId, from: Address) -> Self {
        Self {
            chain_id,
            from,
            to: None,
            value: U256::zero(),
            data: Vec::new(),
            gas: GasSettings::default(),
            nonce: None,
            priority: Priority::Normal,
            max_retries: None,
            dependencies: Vec::new(),
            label: None,
        }
    }

    pub fn to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    pub fn gas(mut self, gas: GasSettings) -> Self {
        self.gas = gas;
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn depends_on(mut self, id: RecordId) -> Self {
        self.dependencies.push(id);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// One queued unit of work.
///
/// `id`, `created_at`, `chain_id` and `from` never change after creation.
/// `nonce` never changes once assigned. Fields are public for reading;
/// status changes go through the `mark_*` methods so that illegal
/// transitions are rejected in one place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: RecordId,
    pub chain_id: ChainId,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Vec<u8>,
    pub gas: GasSettings,
    pub nonce: Option<u64>,
    pub priority: Priority,
    pub status: SubmissionStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: Timestamp,
    pub scheduled_at: Option<Timestamp>,
    pub submitted_at: Option<Timestamp>,
    pub confirmed_at: Option<Timestamp>,
    pub failed_at: Option<Timestamp>,
    pub last_retry_at: Option<Timestamp>,
    pub dependencies: Vec<RecordId>,
    pub hash: Option<Hash>,
    pub error: Option<String>,
    pub label: Option<String>,
}

impl SubmissionRecord {
    /// Creates a QUEUED record from a request.
    ///
    /// `nonce` is the allocated nonce when the request carried none.
    pub fn from_request(
        id: RecordId,
        request: SubmissionRequest,
        nonce: Option<u64>,
        default_max_retries: u32,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            chain_id: request.chain_id,
            from: request.from,
            to: request.to,
            value: request.value,
            data: request.data,
            gas: request.gas,
            nonce: request.nonce.or(nonce),
            priority: request.priority,
            status: SubmissionStatus::Queued,
            retry_count: 0,
            max_retries: request.max_retries.unwrap_or(default_max_retries),
            created_at: now,
            scheduled_at: Some(now),
            submitted_at: None,
            confirmed_at: None,
            failed_at: None,
            last_retry_at: None,
            dependencies: request.dependencies,
            hash: None,
            error: None,
            label: request.label,
        }
    }

    /// Milliseconds since creation.
    pub fn age(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.created_at)
    }

    /// Timestamp the retry backoff is measured from.
    pub fn last_activity(&self) -> Timestamp {
        self.failed_at
            .or(self.last_retry_at)
            .unwrap_or(self.created_at)
    }

    /// Failed with retries left.
    pub fn can_retry(&self) -> bool {
        self.status == SubmissionStatus::Failed && self.retry_count < self.max_retries
    }

    /// Pending/Submitted and older than `timeout_ms`.
    pub fn is_timed_out(&self, now: Timestamp, timeout_ms: u64) -> bool {
        self.status.is_in_flight() && self.age(now) > timeout_ms
    }

    /// Confirmation latency, once confirmed.
    pub fn confirmation_time(&self) -> Option<u64> {
        self.confirmed_at
            .map(|confirmed| confirmed.saturating_sub(self.created_at))
    }

    fn transition(
        &mut self,
        allowed: &[SubmissionStatus],
        to: SubmissionStatus,
    ) -> Result<(), TransitionError> {
        if !allowed.contains(&self.status) {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// QUEUED → PENDING.
    pub fn mark_pending(&mut self, now: Timestamp) -> Result<(), TransitionError> {
        self.transition(&[SubmissionStatus::Queued], SubmissionStatus::Pending)?;
        self.submitted_at = Some(now);
        Ok(())
    }

    /// PENDING → SUBMITTED.
    pub fn mark_submitted(&mut self, hash: Hash) -> Result<(), TransitionError> {
        self.transition(&[SubmissionStatus::Pending], SubmissionStatus::Submitted)?;
        self.hash = Some(hash);
        Ok(())
    }

    /// PENDING → FAILED (adapter error) or SUBMITTED → FAILED (dropped).
    pub fn mark_failed(
        &mut self,
        error: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), TransitionError> {
        self.transition(
            &[SubmissionStatus::Pending, SubmissionStatus::Submitted],
            SubmissionStatus::Failed,
        )?;
        self.error = Some(error.into());
        self.failed_at = Some(now);
        Ok(())
    }

    /// SUBMITTED → CONFIRMED.
    pub fn mark_confirmed(&mut self, now: Timestamp) -> Result<(), TransitionError> {
        self.transition(&[SubmissionStatus::Submitted], SubmissionStatus::Confirmed)?;
        self.confirmed_at = Some(now);
        Ok(())
    }

    /// QUEUED/PENDING → CANCELLED.
    pub fn mark_cancelled(&mut self) -> Result<(), TransitionError> {
        self.transition(
            &[SubmissionStatus::Queued, SubmissionStatus::Pending],
            SubmissionStatus::Cancelled,
        )
    }

    /// PENDING/SUBMITTED → EXPIRED.
    pub fn mark_expired(&mut self) -> Result<(), TransitionError> {
        self.transition(
            &[SubmissionStatus::Pending, SubmissionStatus::Submitted],
            SubmissionStatus::Expired,
        )
    }

    /// FAILED → QUEUED for another attempt.
    pub fn requeue_for_retry(&mut self, now: Timestamp) -> Result<(), TransitionError> {
        if !self.can_retry() {
            return Err(TransitionError {
                from: self.status,
                to: SubmissionStatus::Queued,
            });
        }
        self.status = SubmissionStatus::Queued;
        self.retry_count += 1;
        self.last_retry_at = Some(now);
        self.error = None;
        Ok(())
    }
}
