//! Prometheus metrics for moex-eod.
//!
//! Counts provider requests, stale fetch results discarded by the
//! selection controller, priced history points and SQL exports.
//!
//! Registration panics on a duplicate metric name. That can only happen on
//! first access of a static below.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, CounterVec, Encoder,
    HistogramVec, IntCounter, TextEncoder,
};

/// Total provider requests.
/// Labels: operation (engines/markets/securities/definition/history), outcome (ok/error)
pub static GATEWAY_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "eod_gateway_requests_total",
        "Total market data provider requests",
        &["operation", "outcome"]
    )
    .unwrap()
});

/// Provider request latency in milliseconds.
pub static GATEWAY_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "eod_gateway_latency_ms",
        "Market data provider request latency in milliseconds",
        &["operation"],
        vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Fetch results discarded because a newer selection superseded them.
/// Labels: kind (engines/markets/securities/description/history)
pub static STALE_RESULTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "eod_stale_results_total",
        "Fetch results discarded by the staleness guard",
        &["kind"]
    )
    .unwrap()
});

/// Total priced history points applied to the controller state.
pub static HISTORY_POINTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "eod_history_points_total",
        "Total priced history points produced"
    )
    .unwrap()
});

/// SQL script exports.
/// Labels: outcome (written/skipped/failed)
pub static EXPORTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "eod_exports_total",
        "Total SQL script exports",
        &["outcome"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a completed provider request.
    pub fn gateway_request(operation: &str, ok: bool, latency_ms: f64) {
        let outcome = if ok { "ok" } else { "error" };
        GATEWAY_REQUESTS_TOTAL
            .with_label_values(&[operation, outcome])
            .inc();
        GATEWAY_LATENCY_MS
            .with_label_values(&[operation])
            .observe(latency_ms);
    }

    /// Record a discarded stale fetch result.
    pub fn stale_result(kind: &str) {
        STALE_RESULTS_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record priced history points.
    pub fn history_points(count: usize) {
        HISTORY_POINTS_TOTAL.inc_by(count as u64);
    }

    /// Record an export outcome.
    pub fn export(outcome: &str) {
        EXPORTS_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn gather() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| TelemetryError::Encode(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Encode(e.to_string()))
    }
}
