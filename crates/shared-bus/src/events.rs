//! # Pool Events
//!
//! Every lifecycle transition inside the submission pool is reported as a
//! `PoolEvent` carrying a full snapshot of the record at that moment.

use serde::{Deserialize, Serialize};
use shared_types::{Address, ChainId, SubmissionRecord, Timestamp};
use std::fmt;

/// Kind of lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolEventKind {
    /// Record accepted by `enqueue`.
    Added,
    /// Record deleted by `remove`.
    Removed,
    /// Record cancelled by a caller.
    Cancelled,
    /// Priority changed by `set_priority`.
    PriorityUpdated,
    /// Record dispatched to the submission adapter.
    Processing,
    /// Adapter accepted the record.
    Submitted,
    /// Adapter error, or dropped by the network.
    Failed,
    /// Pending/submitted past the timeout.
    Expired,
    /// Failed record re-queued after backoff.
    Retried,
    /// Aged record promoted one priority step.
    PriorityBoosted,
    /// Confirmation watcher reported finality.
    Confirmed,
}

impl PoolEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Cancelled => "cancelled",
            Self::PriorityUpdated => "priority_updated",
            Self::Processing => "processing",
            Self::Submitted => "submitted",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Retried => "retried",
            Self::PriorityBoosted => "priority_boosted",
            Self::Confirmed => "confirmed",
        }
    }
}

impl fmt::Display for PoolEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEvent {
    pub kind: PoolEventKind,
    pub record: SubmissionRecord,
    pub timestamp: Timestamp,
}

impl PoolEvent {
    pub fn new(kind: PoolEventKind, record: SubmissionRecord, timestamp: Timestamp) -> Self {
        Self {
            kind,
            record,
            timestamp,
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.record.chain_id
    }

    pub fn signer(&self) -> &Address {
        &self.record.from
    }
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Kinds to include. Empty means all kinds.
    pub kinds: Vec<PoolEventKind>,
    /// Chains to include. Empty means all chains.
    pub chain_ids: Vec<ChainId>,
    /// Signers to include. Empty means all signers.
    pub signers: Vec<Address>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific event kinds.
    #[must_use]
    pub fn kinds(kinds: Vec<PoolEventKind>) -> Self {
        Self {
            kinds,
            ..Self::default()
        }
    }

    /// Create a filter for events on specific chains.
    #[must_use]
    pub fn chains(chain_ids: Vec<ChainId>) -> Self {
        Self {
            chain_ids,
            ..Self::default()
        }
    }

    /// Narrow an existing filter to one signer.
    #[must_use]
    pub fn with_signer(mut self, signer: Address) -> Self {
        self.signers.push(signer);
        self
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &PoolEvent) -> bool {
        let kind_match = self.kinds.is_empty() || self.kinds.contains(&event.kind);
        let chain_match = self.chain_ids.is_empty() || self.chain_ids.contains(&event.chain_id());
        let signer_match = self.signers.is_empty() || self.signers.contains(event.signer());

        kind_match && chain_match && signer_match
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::event;
    use super::*;

    #[test]
    fn test_filter_all() {
        let filter = EventFilter::all();
        assert!(filter.matches(&event(PoolEventKind::Added, 1, [0xAA; 20])));
        assert!(filter.matches(&event(PoolEventKind::Expired, 137, [0xBB; 20])));
    }

    #[test]
    fn test_filter_by_kind() {
        let filter = EventFilter::kinds(vec![PoolEventKind::Failed, PoolEventKind::Expired]);
        assert!(filter.matches(&event(PoolEventKind::Failed, 1, [0xAA; 20])));
        assert!(!filter.matches(&event(PoolEventKind::Submitted, 1, [0xAA; 20])));
    }

    #[test]
    fn test_filter_by_chain_and_signer() {
        let filter = EventFilter::chains(vec![137]).with_signer([0xAA; 20]);
        assert!(filter.matches(&event(PoolEventKind::Added, 137, [0xAA; 20])));
        assert!(!filter.matches(&event(PoolEventKind::Added, 1, [0xAA; 20])));
        assert!(!filter.matches(&event(PoolEventKind::Added, 137, [0xBB; 20])));
    }

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(PoolEventKind::PriorityBoosted.as_str(), "priority_boosted");
        let json = serde_json::to_string(&PoolEventKind::PriorityUpdated).unwrap();
        assert_eq!(json, "\"priority_updated\"");
    }
}
