//! # Pool Runtime
//!
//! Owns the pool and the tasks around it.
//!
//! ## Startup Sequence
//!
//! 1. Build the simulated adapter and the pool
//! 2. Register the metrics listener
//! 3. Start the confirmation watcher and the stats reporter
//! 4. Enqueue the demo workload (the scheduler starts on its own)
//!
//! ## Shutdown Sequence
//!
//! 1. Signal the watcher and reporter to stop
//! 2. Take a final stats snapshot
//! 3. Shut the pool down (scheduler, records, listeners)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use shared_bus::{EventFilter, ListenerHandle};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tx_pool::{PoolStats, SimulatedAdapter, SubmissionPool};

use crate::config::RuntimeConfig;
use crate::handlers::{refresh_gauges, MetricsListener};
use crate::watcher::ConfirmationWatcher;
use crate::workload::enqueue_demo;

/// Names of the demo dashboard callers.
pub const DEMO_CALLERS: [&str; 3] = ["treasury", "trading-desk", "compliance-office"];

const REPORT_INTERVAL: Duration = Duration::from_secs(5);
const DRAIN_POLL: Duration = Duration::from_millis(100);

/// The runtime around one submission pool.
pub struct PoolRuntime {
    config: RuntimeConfig,
    pool: SubmissionPool,
    /// Keeps the metrics listener registered.
    _metrics_listener: ListenerHandle,
    /// Background tasks, awaited on shutdown.
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl PoolRuntime {
    /// Build the pool and register the metrics listener.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let adapter = SimulatedAdapter::new()
            .with_latency(
                Duration::from_millis(config.adapter.min_latency_ms),
                Duration::from_millis(config.adapter.max_latency_ms),
            )
            .with_failure_rate(config.adapter.failure_rate);

        let pool = SubmissionPool::new(config.pool.clone(), Arc::new(adapter))
            .context("Failed to create submission pool")?;

        let metrics_listener = pool
            .subscribe_filtered(EventFilter::all(), Arc::new(MetricsListener))
            .context("Failed to register metrics listener")?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            pool,
            _metrics_listener: metrics_listener,
            tasks: Mutex::new(Vec::new()),
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn pool(&self) -> &SubmissionPool {
        &self.pool
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Start the watcher and reporter tasks.
    pub fn start(&self) {
        info!("===========================================");
        info!("  Submission Pool Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");
        info!(
            max_queue = self.config.pool.max_queue_size,
            max_concurrent = self.config.pool.max_concurrent_transactions,
            max_retries = self.config.pool.max_retries,
            tick_ms = self.config.pool.tick_interval_ms,
            "Pool configuration"
        );

        let watcher = ConfirmationWatcher::new(
            self.pool.clone(),
            self.config.watcher.confirmation_delay(),
            self.config.watcher.drop_rate,
        );
        let watcher_task = watcher.spawn(self.shutdown_rx.clone());

        let reporter_task = self.spawn_reporter();

        let mut tasks = self.tasks.lock();
        tasks.push(watcher_task);
        tasks.push(reporter_task);
    }

    fn spawn_reporter(&self) -> JoinHandle<()> {
        let pool = self.pool.clone();
        let mut shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REPORT_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let stats = refresh_gauges(&pool);
                        info!(
                            total = stats.total,
                            queued = stats.queued,
                            pending = stats.pending,
                            submitted = stats.submitted,
                            confirmed = stats.confirmed,
                            failed = stats.failed,
                            in_flight = pool.in_flight_count(),
                            "Pool status"
                        );
                    }
                    _ = shutdown.changed() => {
                        debug!("Stats reporter stopping");
                        break;
                    }
                }
            }
        })
    }

    /// Enqueue the demo workload from every dashboard caller.
    pub fn enqueue_demo_workload(&self) -> Result<usize> {
        let ids = enqueue_demo(
            &self.pool,
            self.config.demo.chain_id,
            &DEMO_CALLERS,
            self.config.demo.rounds,
        )
        .context("Failed to enqueue demo workload")?;
        Ok(ids.len())
    }

    /// Resolves once the scheduler has retired: nothing queued, in flight,
    /// awaiting confirmation or awaiting a retry.
    pub async fn wait_until_drained(&self) {
        // The scheduler may not have picked up the first records yet.
        tokio::time::sleep(DRAIN_POLL).await;
        while self.pool.is_running() {
            tokio::time::sleep(DRAIN_POLL).await;
        }
    }

    /// Like `wait_until_drained`, bounded by the configured drain timeout.
    /// Returns `false` on timeout.
    pub async fn wait_until_drained_or_timeout(&self) -> bool {
        let timeout = self.config.demo.drain_timeout();
        match tokio::time::timeout(timeout, self.wait_until_drained()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "Pool did not drain in time");
                false
            }
        }
    }

    /// Stop background tasks, snapshot stats, shut the pool down.
    pub async fn shutdown(&self) -> PoolStats {
        info!("Initiating graceful shutdown...");

        if self.shutdown_tx.send(true).is_err() {
            debug!("No background task was listening for shutdown");
        }
        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }

        let stats = refresh_gauges(&self.pool);
        self.pool.shutdown();
        info!(
            confirmed = stats.confirmed,
            failed = stats.failed,
            expired = stats.expired,
            success_rate = stats.success_rate,
            "Shutdown complete"
        );
        stats
    }
}
