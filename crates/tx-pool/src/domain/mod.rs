//! # Domain Layer - Submission Pool
//!
//! Pure scheduling logic with no runtime dependencies.
//!
//! ## Components
//!
//! - `config`: PoolConfig, NonceSettlement, environment loading
//! - `store`: RecordStore with dispatch ordering and statistics
//! - `nonce`: NonceAllocator, per-signer watermark and gap tracking
//! - `services`: Backoff, boosting and admissibility rules
//! - `value_objects`: PoolStats, TickReport
//! - `errors`: PoolError, SubmissionError

pub mod config;
pub mod errors;
pub mod nonce;
pub mod services;
pub mod store;
pub mod value_objects;

pub use config::*;
pub use errors::*;
pub use nonce::*;
pub use services::*;
pub use store::*;
pub use value_objects::*;
