//! Ports layer for the submission pool.
//!
//! - Inbound (Driving) port: the API callers and the confirmation watcher use
//! - Outbound (Driven) ports: the network submission adapter and the clock

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
