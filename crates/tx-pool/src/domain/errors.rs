//! Submission pool error types.

use shared_types::{RecordId, SubmissionStatus};
use thiserror::Error;

use super::config::ConfigError;

/// Errors returned by the pool's admission and mutation API.
///
/// Not-found is never an error: lookups return `None` and mutations return
/// `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The store already holds `max_queue_size` records.
    #[error("Submission queue full at {capacity} records")]
    QueueFull { capacity: usize },

    /// The record's status does not allow the operation. The record is unchanged.
    #[error("Cannot {operation} record {id} while {status}")]
    InvalidState {
        id: RecordId,
        status: SubmissionStatus,
        operation: &'static str,
    },

    /// Rejected configuration.
    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),
}

impl From<ConfigError> for PoolError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Invalid(reason) => Self::InvalidConfig(reason),
            other => Self::InvalidConfig(other.to_string()),
        }
    }
}

/// Errors reported by a submission adapter.
///
/// Recorded as the record's `error` string; never propagated to the caller
/// of `enqueue`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The network refused the operation.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// No answer in time.
    #[error("Submission timed out")]
    Timeout,

    #[error("{0}")]
    Other(String),
}
