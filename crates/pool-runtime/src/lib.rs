//! # Submission Pool Runtime
//!
//! Wires the submission pool to telemetry, a simulated network adapter and a
//! simulated confirmation watcher, and drives it with a demo workload.
//!
//! ## Modules
//!
//! - `config/` - Runtime configuration from the environment
//! - `handlers/` - Metrics listener and gauge refresh
//! - `watcher/` - Simulated confirmation watcher
//! - `workload/` - Dashboard-style demo requests
//! - `runtime/` - `PoolRuntime`, startup and shutdown
//!
//! ## Event Flow
//!
//! ```text
//! workload ──enqueue──→ SubmissionPool ──events──→ Event Bus
//!                             ↑                       │
//!                             │           ┌───────────┴───────────┐
//!                             │           ↓                       ↓
//!                             │   MetricsListener       ConfirmationWatcher
//!                             │     (Prometheus)                  │
//!                             └────────confirm / reject───────────┘
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod handlers;
pub mod runtime;
pub mod watcher;
pub mod workload;

pub use config::{AdapterConfig, DemoConfig, RuntimeConfig, WatcherConfig};
pub use handlers::{refresh_gauges, status_labels, MetricsListener, OUTCOMES};
pub use runtime::{PoolRuntime, DEMO_CALLERS};
pub use watcher::ConfirmationWatcher;
