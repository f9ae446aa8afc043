//! # Runtime Configuration
//!
//! Pool tunables plus the knobs of the simulated network around it.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tx_pool::{ConfigError, PoolConfig};

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Submission pool configuration.
    pub pool: PoolConfig,
    /// Simulated adapter configuration.
    pub adapter: AdapterConfig,
    /// Simulated confirmation watcher configuration.
    pub watcher: WatcherConfig,
    /// Demo workload configuration.
    pub demo: DemoConfig,
}

/// Simulated network adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    /// Probability in [0, 1] that a submission fails.
    pub failure_rate: f64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            min_latency_ms: 50,
            max_latency_ms: 250,
            failure_rate: 0.1,
        }
    }
}

/// Simulated confirmation watcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Delay between SUBMITTED and the watcher's verdict.
    pub confirmation_delay_ms: u64,
    /// Probability in [0, 1] that the network drops a submitted record.
    pub drop_rate: f64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            confirmation_delay_ms: 1500,
            drop_rate: 0.05,
        }
    }
}

impl WatcherConfig {
    pub fn confirmation_delay(&self) -> Duration {
        Duration::from_millis(self.confirmation_delay_ms)
    }
}

/// Demo workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Rounds of swap + purchase + attestation per caller.
    pub rounds: usize,
    /// Chain the demo callers submit to.
    pub chain_id: u64,
    /// Give up waiting for the pool to drain after this long.
    pub drain_timeout_secs: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            rounds: 3,
            chain_id: 1,
            drain_timeout_secs: 120,
        }
    }
}

impl DemoConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

impl RuntimeConfig {
    /// Load from the process environment.
    ///
    /// Pool variables are documented on `PoolConfig::from_env`. Runtime
    /// variables:
    ///
    /// - `POOL_SIM_MIN_LATENCY_MS`, `POOL_SIM_MAX_LATENCY_MS`
    /// - `POOL_SIM_FAILURE_RATE`
    /// - `POOL_CONFIRM_DELAY_MS`, `POOL_DROP_RATE`
    /// - `POOL_DEMO_ROUNDS`, `POOL_DEMO_CHAIN_ID`, `POOL_DRAIN_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let defaults = Self::default();
        let pool = PoolConfig::from_lookup(&lookup)?;

        let adapter = AdapterConfig {
            min_latency_ms: parse(
                &lookup,
                "POOL_SIM_MIN_LATENCY_MS",
                defaults.adapter.min_latency_ms,
            )?,
            max_latency_ms: parse(
                &lookup,
                "POOL_SIM_MAX_LATENCY_MS",
                defaults.adapter.max_latency_ms,
            )?,
            failure_rate: parse_rate(&lookup, "POOL_SIM_FAILURE_RATE", defaults.adapter.failure_rate)?,
        };

        let watcher = WatcherConfig {
            confirmation_delay_ms: parse(
                &lookup,
                "POOL_CONFIRM_DELAY_MS",
                defaults.watcher.confirmation_delay_ms,
            )?,
            drop_rate: parse_rate(&lookup, "POOL_DROP_RATE", defaults.watcher.drop_rate)?,
        };

        let demo = DemoConfig {
            rounds: parse(&lookup, "POOL_DEMO_ROUNDS", defaults.demo.rounds)?,
            chain_id: parse(&lookup, "POOL_DEMO_CHAIN_ID", defaults.demo.chain_id)?,
            drain_timeout_secs: parse(
                &lookup,
                "POOL_DRAIN_TIMEOUT_SECS",
                defaults.demo.drain_timeout_secs,
            )?,
        };

        Ok(Self {
            pool,
            adapter,
            watcher,
            demo,
        })
    }
}

fn parse<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var,
            value: value.clone(),
        }),
        None => Ok(default),
    }
}

fn parse_rate<F>(lookup: &F, var: &'static str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    let rate: f64 = parse(lookup, var, default)?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidValue {
            var,
            value: rate.to_string(),
        });
    }
    Ok(rate)
}
