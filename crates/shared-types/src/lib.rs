//! # Shared Types Crate
//!
//! Primitive identifiers and the submission record shared by the pool,
//! the event bus and the runtime.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the record observers see on the bus is the
//!   same type the pool stores.
//! - **Exact Arithmetic**: values and gas are `U256`, never floats.
//! - **Case-Insensitive Signers**: addresses are bytes, so hex spelling
//!   cannot split one signer into two nonce trackers.

pub mod entities;
pub mod errors;
pub mod submission;

pub use entities::*;
pub use errors::*;
pub use submission::*;
