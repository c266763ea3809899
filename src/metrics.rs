// Metrics and observability module
// This file handles collection and reporting of performance metrics
// for venue quoting, route execution and swap outcomes
//
// Numan Thabit 2025 Nov

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

pub static REQ_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "aggr_request_latency_seconds",
        "latency for upstream calls",
        &["service", "method"]
    )
    .unwrap()
});

pub static REQ_ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "aggr_request_errors_total",
        "errors by upstream",
        &["service", "method"]
    )
    .unwrap()
});

pub static QUOTE_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "aggr_venue_quote_latency_seconds",
        "venue quote latency",
        &["venue"]
    )
    .unwrap()
});

pub static QUOTE_FAILURES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "aggr_venue_quote_failures_total",
        "venue quotes that produced no route",
        &["venue", "kind"]
    )
    .unwrap()
});

pub static ROUTE_EXECUTIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "aggr_route_executions_total",
        "route executions by venue and outcome",
        &["venue", "outcome"]
    )
    .unwrap()
});

pub static SWAPS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!("aggr_swaps_total", "swap calls by outcome", &["outcome"]).unwrap()
});

/// Render the default registry in the Prometheus text format.
pub fn render() -> String {
    let mut buf = Vec::new();
    if let Err(err) = TextEncoder::new().encode(&prometheus::gather(), &mut buf) {
        tracing::warn!(error = %err, "metrics encoding failed");
    }
    String::from_utf8(buf).unwrap_or_default()
}
