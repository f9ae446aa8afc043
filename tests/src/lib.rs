//! # Submission Pool Test Suite
//!
//! Unified test crate for behavior that spans crates.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support.rs        # Test adapters, manual clock harness, wait helpers
//! └── integration/
//!     ├── scenarios.rs  # Dispatch order, dependencies, retry exhaustion, expiry
//!     ├── flows.rs      # Pool → event bus → observers
//!     └── properties.rs # Property tests over random operation sequences
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p pool-tests
//!
//! # By category
//! cargo test -p pool-tests integration::scenarios
//! cargo test -p pool-tests integration::flows
//! ```

#![allow(dead_code)]

pub mod integration;
pub mod support;
