//! Prometheus metrics for the submission pool.
//!
//! All metrics follow the naming convention: `pool_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., pool_retries_total)
//! - **Gauge**: Value that can go up or down (e.g., pool_in_flight)
//! - **Histogram**: Distribution of values (e.g., pool_confirmation_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramOpts,
    Opts, Registry, TextEncoder,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Registry holding every pool metric
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // QUEUE STATE
    // =========================================================================

    /// Records currently held, by status
    pub static ref RECORDS_BY_STATUS: GaugeVec = GaugeVec::new(
        Opts::new("pool_records", "Submission records held by the pool"),
        &["status"]
    ).expect("metric creation failed");

    /// Adapter calls awaiting an answer
    pub static ref IN_FLIGHT: Gauge = Gauge::new(
        "pool_in_flight",
        "Adapter calls currently in flight"
    ).expect("metric creation failed");

    // =========================================================================
    // OUTCOMES
    // =========================================================================

    /// Terminal and intermediate outcomes
    pub static ref SUBMISSIONS: CounterVec = CounterVec::new(
        Opts::new("pool_submissions_total", "Submission outcomes"),
        &["outcome"]  // submitted/confirmed/failed/cancelled/expired
    ).expect("metric creation failed");

    /// Failed records put back in the queue
    pub static ref RETRIES: Counter = Counter::new(
        "pool_retries_total",
        "Failed submissions re-queued for another attempt"
    ).expect("metric creation failed");

    /// Pending/submitted records that timed out
    pub static ref EXPIRIES: Counter = Counter::new(
        "pool_expiries_total",
        "Submissions expired by the scheduler"
    ).expect("metric creation failed");

    /// Age-based priority promotions
    pub static ref BOOSTS: Counter = Counter::new(
        "pool_priority_boosts_total",
        "Queued submissions promoted one priority level"
    ).expect("metric creation failed");

    /// Creation to confirmation latency
    pub static ref CONFIRMATION_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "pool_confirmation_seconds",
            "Time from enqueue to confirmation"
        ).buckets(exponential_buckets(0.05, 2.0, 14).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // EVENT BUS
    // =========================================================================

    /// Events seen by the metrics listener, by kind
    pub static ref EVENTS_OBSERVED: CounterVec = CounterVec::new(
        Opts::new("pool_events_total", "Pool events observed"),
        &["kind"]
    ).expect("metric creation failed");
}

/// Handle returned by `register_metrics`.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the pool registry.
///
/// Registering twice is not an error.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(RECORDS_BY_STATUS.clone()),
        Box::new(IN_FLIGHT.clone()),
        Box::new(SUBMISSIONS.clone()),
        Box::new(RETRIES.clone()),
        Box::new(EXPIRIES.clone()),
        Box::new(BOOSTS.clone()),
        Box::new(CONFIRMATION_LATENCY.clone()),
        Box::new(EVENTS_OBSERVED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Point-in-time copy of the pool counters, for logs and shutdown reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub in_flight: f64,
    pub records: BTreeMap<String, f64>,
    pub outcomes: BTreeMap<String, f64>,
    pub retries: f64,
    pub expiries: f64,
    pub boosts: f64,
}

impl MetricsSnapshot {
    /// Read the current values. `statuses` and `outcomes` name the label
    /// values to read.
    pub fn capture(statuses: &[&str], outcomes: &[&str]) -> Self {
        Self {
            in_flight: IN_FLIGHT.get(),
            records: statuses
                .iter()
                .map(|&s| (s.to_string(), RECORDS_BY_STATUS.with_label_values(&[s]).get()))
                .collect(),
            outcomes: outcomes
                .iter()
                .map(|&o| (o.to_string(), SUBMISSIONS.with_label_values(&[o]).get()))
                .collect(),
            retries: RETRIES.get(),
            expiries: EXPIRIES.get(),
            boosts: BOOSTS.get(),
        }
    }

    pub fn to_json(&self) -> Result<String, TelemetryError> {
        serde_json::to_string(self).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}
