//! # Transaction Submission Pool
//!
//! Nonce-aware queue that sits between dashboard services and the network
//! broadcast layer. Callers enqueue operations; a periodic scheduler orders,
//! bounds, retries and expires them, and every transition is published on
//! the event bus.
//!
//! ## Lifecycle
//!
//! ```text
//! [QUEUED] ──dispatch──→ [PENDING] ──adapter ok──→ [SUBMITTED] ──confirm──→ [CONFIRMED]
//!    ↑                      │                          │
//!    │                      └──adapter err──→ [FAILED] ←──reject
//!    └──────backoff elapsed───────────────────────┘
//! [PENDING]/[SUBMITTED] ──timeout──→ [EXPIRED]
//! [QUEUED]/[PENDING] ──cancel──→ [CANCELLED]
//! ```
//!
//! ## Pool Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Store never exceeds `max_queue_size` | `service.rs` - `enqueue()` |
//! | At most `max_concurrent_transactions` adapter calls in flight | `service.rs` - `tick()` dispatch |
//! | Nonces per (chain, signer) never reused | `domain/nonce.rs` - `next_nonce()` |
//! | Dependencies CONFIRMED before dispatch | `domain/services.rs` - `is_admissible()` |
//! | Illegal transitions rejected | `shared-types::submission` - `mark_*()` |
//!
//! ## Tick Order
//!
//! 1. Expire PENDING/SUBMITTED records past `transaction_timeout_ms`
//! 2. Promote QUEUED records older than `priority_boost_threshold_ms`
//! 3. Dispatch the top QUEUED records that fit the free slots; inadmissible
//!    ones are skipped for the tick
//! 4. Requeue FAILED records whose backoff has elapsed
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/ - SimulatedAdapter                                   │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/ - SubmissionPoolApi (inbound)                           │
//! │           SubmissionAdapter, TimeSource (outbound)              │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/ - RecordStore, NonceAllocator, PoolConfig, rules       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `service.rs` ties the layers together as `SubmissionPool`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tx_pool::{PoolConfig, SimulatedAdapter, SubmissionPool};
//! use shared_types::{Priority, SubmissionRequest};
//!
//! let pool = SubmissionPool::new(PoolConfig::default(), Arc::new(SimulatedAdapter::new()))?;
//! let id = pool.enqueue(SubmissionRequest::new(1, signer).priority(Priority::High))?;
//! // Scheduler starts on its own; confirm once the watcher sees finality.
//! pool.confirm(&id)?;
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export main types
pub use adapters::SimulatedAdapter;
pub use domain::{
    retry_backoff_ms, ConfigError, NonceAllocator, NonceSettlement, NonceState, PoolConfig,
    PoolError, PoolStats, RecordStore, SubmissionError, TickReport,
};
pub use ports::{
    ManualTimeSource, SubmissionAdapter, SubmissionPoolApi, SystemTimeSource, TimeSource,
};
pub use service::SubmissionPool;
