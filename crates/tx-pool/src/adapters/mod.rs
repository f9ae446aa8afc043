//! Adapters layer for the submission pool.
//!
//! Concrete submission adapters. Real broadcast layers live outside this
//! crate and implement `SubmissionAdapter` themselves.

pub mod simulated;

pub use simulated::SimulatedAdapter;
