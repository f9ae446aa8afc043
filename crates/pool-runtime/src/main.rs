//! # Submission Pool Runtime
//!
//! Runs the submission pool with a simulated network until the demo
//! workload drains or Ctrl+C is pressed, then prints the final statistics.

use anyhow::{Context, Result};
use tracing::info;

use pool_runtime::{handlers, PoolRuntime, RuntimeConfig, OUTCOMES};
use pool_telemetry::{encode_metrics, init_telemetry, MetricsSnapshot, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging and metrics
    let telemetry_config = TelemetryConfig::from_env();
    let metrics_enabled = telemetry_config.metrics_enabled;
    let _telemetry = init_telemetry(telemetry_config).context("Failed to initialize telemetry")?;

    // Load configuration
    let config = RuntimeConfig::from_env().context("Invalid runtime configuration")?;

    // Create and start the runtime
    let runtime = PoolRuntime::new(config)?;
    runtime.start();
    let enqueued = runtime.enqueue_demo_workload()?;
    info!(records = enqueued, "Submission pool is running. Press Ctrl+C to stop.");

    tokio::select! {
        drained = runtime.wait_until_drained_or_timeout() => {
            if drained {
                info!("Demo workload drained");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            info!("Ctrl+C received");
        }
    }

    // Graceful shutdown
    let stats = runtime.shutdown().await;
    println!(
        "{}",
        serde_json::to_string_pretty(&stats).context("Failed to encode pool stats")?
    );

    if metrics_enabled {
        let snapshot = MetricsSnapshot::capture(&handlers::status_labels(), &OUTCOMES);
        info!(metrics = %snapshot.to_json()?, "Final metrics");
        if let Ok(level) = std::env::var("POOL_PRINT_METRICS") {
            if level == "1" || level.eq_ignore_ascii_case("true") {
                println!("{}", encode_metrics()?);
            }
        }
    }

    Ok(())
}
