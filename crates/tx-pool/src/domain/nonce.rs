//! # Nonce Allocator
//!
//! One tracker per `(chain, signer)` pair. Hands out increasing sequence
//! numbers and tracks which of them the network has consumed.
//!
//! ```text
//!        settled            gaps / in use          free
//! ──────────────────┬──────────────────────────┬──────────────→
//!                current_nonce             pending_nonce
//! ```
//!
//! Every value in `[current_nonce, pending_nonce)` is either a recorded gap
//! or has been handed out and not yet settled. `pending_nonce >=
//! current_nonce` always holds.

use serde::{Deserialize, Serialize};
use shared_types::{Address, ChainId};
use std::collections::{BTreeSet, HashMap};

/// Sequence-number state for one signer on one chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceState {
    /// Next value considered settled.
    pub current_nonce: u64,
    /// Next value to hand out.
    pub pending_nonce: u64,
    /// Skipped values below `current_nonce` that were never settled.
    pub gaps: BTreeSet<u64>,
}

impl NonceState {
    fn settle(&mut self, nonce: u64) {
        if nonce == self.current_nonce {
            self.current_nonce = self.current_nonce.saturating_add(1);
            while self.gaps.remove(&self.current_nonce) {
                self.current_nonce = self.current_nonce.saturating_add(1);
            }
        } else if nonce > self.current_nonce {
            self.gaps.extend(self.current_nonce..nonce);
            self.current_nonce = nonce.saturating_add(1);
        }
        // Below the watermark: duplicate or replacement, nothing to do.
        self.pending_nonce = self.pending_nonce.max(self.current_nonce);
    }
}

/// Per-signer nonce trackers, created lazily.
#[derive(Debug, Default)]
pub struct NonceAllocator {
    states: HashMap<(ChainId, Address), NonceState>,
}

impl NonceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    fn state_mut(&mut self, chain_id: ChainId, address: &Address) -> &mut NonceState {
        self.states.entry((chain_id, *address)).or_default()
    }

    /// Returns the next unused nonce and reserves it.
    pub fn next_nonce(&mut self, chain_id: ChainId, address: &Address) -> u64 {
        let state = self.state_mut(chain_id, address);
        let nonce = state.pending_nonce;
        state.pending_nonce = state.pending_nonce.saturating_add(1);
        nonce
    }

    /// Records that the network consumed `nonce`.
    ///
    /// - `nonce == current`: advance, then skip any contiguous recorded gaps.
    /// - `nonce > current`: everything skipped becomes a gap.
    /// - `nonce < current`: duplicate or replacement, no-op.
    pub fn settle(&mut self, chain_id: ChainId, address: &Address, nonce: u64) {
        self.state_mut(chain_id, address).settle(nonce);
    }

    /// Whether `nonce` is close enough to the settled watermark to dispatch.
    pub fn is_admissible(
        &mut self,
        chain_id: ChainId,
        address: &Address,
        nonce: u64,
        tolerance: u64,
    ) -> bool {
        let state = self.state_mut(chain_id, address);
        nonce <= state.current_nonce.saturating_add(tolerance)
    }

    /// Aligns a tracker with an externally observed next nonce.
    ///
    /// Counters only move forward. Every value below `on_chain_next` has
    /// been consumed, so gaps below it are dropped.
    pub fn sync(&mut self, chain_id: ChainId, address: &Address, on_chain_next: u64) {
        let state = self.state_mut(chain_id, address);
        state.current_nonce = state.current_nonce.max(on_chain_next);
        state.pending_nonce = state.pending_nonce.max(state.current_nonce);
        state.gaps.retain(|gap| *gap >= on_chain_next);
    }

    /// Snapshot of a tracker, if one exists.
    pub fn state(&self, chain_id: ChainId, address: &Address) -> Option<NonceState> {
        self.states.get(&(chain_id, *address)).cloned()
    }

    /// Recorded gaps for a signer, ascending.
    pub fn gaps(&self, chain_id: ChainId, address: &Address) -> Vec<u64> {
        self.states
            .get(&(chain_id, *address))
            .map(|state| state.gaps.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of tracked signers.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}
