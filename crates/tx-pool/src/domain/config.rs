//! Pool configuration.
//!
//! A `PoolConfig` is replaced wholesale at runtime; the scheduler clones a
//! snapshot at the start of every tick so a mid-tick update never mixes
//! old and new values.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// When a nonce counts as consumed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonceSettlement {
    /// Settle as soon as the adapter accepts the submission.
    #[default]
    OnSubmission,
    /// Settle only when the confirmation watcher calls `confirm`.
    OnConfirmation,
}

impl FromStr for NonceSettlement {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "submission" | "on_submission" => Ok(Self::OnSubmission),
            "confirmation" | "on_confirmation" => Ok(Self::OnConfirmation),
            _ => Err(ConfigError::InvalidValue {
                var: "POOL_NONCE_SETTLEMENT",
                value: s.to_string(),
            }),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    /// The values parse but do not make a usable pool.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tunables of the submission pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum records held in the store, whatever their status.
    pub max_queue_size: usize,
    /// Maximum records dispatched and awaiting an adapter result.
    pub max_concurrent_transactions: usize,
    /// Default retry limit for requests that do not set their own.
    pub max_retries: u32,
    /// First retry delay (milliseconds).
    pub retry_delay_base_ms: u64,
    /// Retry delay cap (milliseconds).
    pub retry_delay_max_ms: u64,
    /// Pending/submitted records older than this expire (milliseconds).
    pub transaction_timeout_ms: u64,
    /// How far past the settled watermark a nonce may be dispatched.
    pub nonce_gap_tolerance: u64,
    /// Queued records older than this are boosted one step (milliseconds).
    pub priority_boost_threshold_ms: u64,
    /// Scheduler tick period (milliseconds).
    pub tick_interval_ms: u64,
    pub enable_nonce_management: bool,
    pub enable_priority_boost: bool,
    pub enable_retry: bool,
    /// Start the scheduler loop on `enqueue` when it is idle.
    pub auto_start: bool,
    pub nonce_settlement: NonceSettlement,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 1000,
            max_concurrent_transactions: 5,
            max_retries: 3,
            retry_delay_base_ms: 1_000,
            retry_delay_max_ms: 30_000,
            transaction_timeout_ms: 300_000, // 5 minutes
            nonce_gap_tolerance: 5,
            priority_boost_threshold_ms: 60_000, // 1 minute
            tick_interval_ms: 1_000,
            enable_nonce_management: true,
            enable_priority_boost: true,
            enable_retry: true,
            auto_start: true,
            nonce_settlement: NonceSettlement::OnSubmission,
        }
    }
}

impl PoolConfig {
    /// Creates a small, fast config for testing. The loop is driven by hand.
    pub fn for_testing() -> Self {
        Self {
            max_queue_size: 100,
            max_concurrent_transactions: 2,
            retry_delay_base_ms: 100,
            retry_delay_max_ms: 1_000,
            transaction_timeout_ms: 5_000,
            priority_boost_threshold_ms: 2_000,
            tick_interval_ms: 10,
            auto_start: false,
            ..Default::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Unset variables keep their default. Set-but-unparseable variables
    /// are an error rather than silently ignored.
    ///
    /// # Environment Variables
    ///
    /// - `POOL_MAX_QUEUE_SIZE` (default: 1000)
    /// - `POOL_MAX_CONCURRENT` (default: 5)
    /// - `POOL_MAX_RETRIES` (default: 3)
    /// - `POOL_RETRY_DELAY_BASE_MS` (default: 1000)
    /// - `POOL_RETRY_DELAY_MAX_MS` (default: 30000)
    /// - `POOL_TX_TIMEOUT_MS` (default: 300000)
    /// - `POOL_NONCE_GAP_TOLERANCE` (default: 5)
    /// - `POOL_PRIORITY_BOOST_MS` (default: 60000)
    /// - `POOL_TICK_INTERVAL_MS` (default: 1000)
    /// - `POOL_NONCE_MANAGEMENT`, `POOL_PRIORITY_BOOST`, `POOL_RETRY`,
    ///   `POOL_AUTO_START` (default: true)
    /// - `POOL_NONCE_SETTLEMENT`: `submission` or `confirmation`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            max_queue_size: parse_var(&lookup, "POOL_MAX_QUEUE_SIZE", defaults.max_queue_size)?,
            max_concurrent_transactions: parse_var(
                &lookup,
                "POOL_MAX_CONCURRENT",
                defaults.max_concurrent_transactions,
            )?,
            max_retries: parse_var(&lookup, "POOL_MAX_RETRIES", defaults.max_retries)?,
            retry_delay_base_ms: parse_var(
                &lookup,
                "POOL_RETRY_DELAY_BASE_MS",
                defaults.retry_delay_base_ms,
            )?,
            retry_delay_max_ms: parse_var(
                &lookup,
                "POOL_RETRY_DELAY_MAX_MS",
                defaults.retry_delay_max_ms,
            )?,
            transaction_timeout_ms: parse_var(
                &lookup,
                "POOL_TX_TIMEOUT_MS",
                defaults.transaction_timeout_ms,
            )?,
            nonce_gap_tolerance: parse_var(
                &lookup,
                "POOL_NONCE_GAP_TOLERANCE",
                defaults.nonce_gap_tolerance,
            )?,
            priority_boost_threshold_ms: parse_var(
                &lookup,
                "POOL_PRIORITY_BOOST_MS",
                defaults.priority_boost_threshold_ms,
            )?,
            tick_interval_ms: parse_var(
                &lookup,
                "POOL_TICK_INTERVAL_MS",
                defaults.tick_interval_ms,
            )?,
            enable_nonce_management: parse_flag(
                &lookup,
                "POOL_NONCE_MANAGEMENT",
                defaults.enable_nonce_management,
            )?,
            enable_priority_boost: parse_flag(
                &lookup,
                "POOL_PRIORITY_BOOST",
                defaults.enable_priority_boost,
            )?,
            enable_retry: parse_flag(&lookup, "POOL_RETRY", defaults.enable_retry)?,
            auto_start: parse_flag(&lookup, "POOL_AUTO_START", defaults.auto_start)?,
            nonce_settlement: match lookup("POOL_NONCE_SETTLEMENT") {
                Some(value) => value.trim().parse()?,
                None => defaults.nonce_settlement,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_queue_size == 0 {
            return Err(ConfigError::Invalid("max_queue_size must be > 0".into()));
        }
        if self.max_concurrent_transactions == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_transactions must be > 0".into(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be > 0".into()));
        }
        if self.retry_delay_base_ms > self.retry_delay_max_ms {
            return Err(ConfigError::Invalid(format!(
                "retry_delay_base_ms ({}) exceeds retry_delay_max_ms ({})",
                self.retry_delay_base_ms, self.retry_delay_max_ms
            )));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, var: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    match lookup(var) {
        Some(value) => {
            let normalized = value.trim().to_ascii_lowercase();
            match normalized.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue { var, value }),
            }
        }
        None => Ok(default),
    }
}
