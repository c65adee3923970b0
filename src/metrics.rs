//! Prometheus metrics for latency tracking and monitoring.
//!
//! This module provides metrics for:
//! - Engine cycles, opportunities and trades
//! - Order placement outcomes and latency
//! - Market snapshot and HTTP request latency
//! - Latest route factors

use std::time::Instant;

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use crate::trading::Side;

// === Metric Name Constants ===

/// Engine cycles counter metric name.
pub const METRIC_CYCLES: &str = "engine_cycles_total";
/// Opportunities detected counter metric name.
pub const METRIC_OPPORTUNITIES_DETECTED: &str = "opportunities_detected_total";
/// Trades placed counter metric name.
pub const METRIC_TRADES_PLACED: &str = "trades_placed_total";
/// Orders placed counter metric name.
pub const METRIC_ORDERS_PLACED: &str = "orders_placed_total";
/// Orders failed counter metric name.
pub const METRIC_ORDERS_FAILED: &str = "orders_failed_total";
/// Inconsistent order state cancels counter metric name.
pub const METRIC_INCONSISTENT_CANCELS: &str = "inconsistent_state_cancels_total";
/// Read failures counter metric name.
pub const METRIC_READ_FAILURES: &str = "read_failures_total";
/// Order placement latency metric name.
pub const METRIC_ORDER_LATENCY: &str = "order_place_latency_ms";
/// Market snapshot latency metric name.
pub const METRIC_SNAPSHOT_LATENCY: &str = "snapshot_latency_ms";
/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// Signing latency metric name.
pub const METRIC_SIGNING_LATENCY: &str = "signing_latency_ms";
/// Order book fetch latency metric name.
pub const METRIC_ORDERBOOK_FETCH_LATENCY: &str = "orderbook_fetch_latency_ms";
/// Route factor gauge metric name.
pub const METRIC_ROUTE_FACTOR: &str = "route_factor";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    // Latency histograms
    describe_histogram!(
        METRIC_ORDER_LATENCY,
        "Order placement latency in milliseconds"
    );
    describe_histogram!(
        METRIC_SNAPSHOT_LATENCY,
        "Time to read books and fees for the triangle in milliseconds"
    );
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );
    describe_histogram!(
        METRIC_SIGNING_LATENCY,
        "Request signing latency in milliseconds"
    );
    describe_histogram!(
        METRIC_ORDERBOOK_FETCH_LATENCY,
        "Order book fetch latency in milliseconds"
    );

    // Counters
    describe_counter!(METRIC_CYCLES, "Total number of engine cycles");
    describe_counter!(
        METRIC_OPPORTUNITIES_DETECTED,
        "Total number of profitable routes detected"
    );
    describe_counter!(METRIC_TRADES_PLACED, "Total number of triangles placed");
    describe_counter!(METRIC_ORDERS_PLACED, "Total number of orders accepted");
    describe_counter!(
        METRIC_ORDERS_FAILED,
        "Total number of orders that failed to place"
    );
    describe_counter!(
        METRIC_INCONSISTENT_CANCELS,
        "Total number of cancel-all calls caused by too many open orders"
    );
    describe_counter!(METRIC_READ_FAILURES, "Total number of failed exchange reads");

    // Gauges
    describe_gauge!(
        METRIC_ROUTE_FACTOR,
        "Fee-adjusted conversion factor of the last evaluation"
    );

    debug!("Metrics initialized");
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Record order placement latency.
pub fn record_order_latency(start: Instant) {
    histogram!(METRIC_ORDER_LATENCY).record(elapsed_ms(start));
}

/// Record market snapshot latency.
pub fn record_snapshot_latency(start: Instant) {
    histogram!(METRIC_SNAPSHOT_LATENCY).record(elapsed_ms(start));
}

/// Record HTTP request latency.
pub fn record_http_latency(start: Instant, endpoint: &str) {
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => endpoint.to_string())
        .record(elapsed_ms(start));
}

/// Record order book fetch latency.
pub fn record_orderbook_fetch_latency(start: Instant, pair: &str) {
    histogram!(METRIC_ORDERBOOK_FETCH_LATENCY, "pair" => pair.to_string())
        .record(elapsed_ms(start));
}

/// Increment the cycle counter.
pub fn record_cycle() {
    counter!(METRIC_CYCLES).increment(1);
}

/// Increment the opportunity counter for a route.
pub fn record_opportunity(route: &'static str) {
    counter!(METRIC_OPPORTUNITIES_DETECTED, "route" => route).increment(1);
}

/// Increment the trade counter for a route.
pub fn record_trade(route: &'static str) {
    counter!(METRIC_TRADES_PLACED, "route" => route).increment(1);
}

/// Increment the accepted order counter.
pub fn record_order_placed(pair: &str, side: Side) {
    counter!(
        METRIC_ORDERS_PLACED,
        "pair" => pair.to_string(),
        "side" => side.to_string()
    )
    .increment(1);
}

/// Increment the failed order counter.
pub fn record_order_failed(pair: &str) {
    counter!(METRIC_ORDERS_FAILED, "pair" => pair.to_string()).increment(1);
}

/// Increment the inconsistent-state cancel counter.
pub fn record_inconsistent_cancel() {
    counter!(METRIC_INCONSISTENT_CANCELS).increment(1);
}

/// Increment the read failure counter.
pub fn record_read_failure(kind: &'static str) {
    counter!(METRIC_READ_FAILURES, "kind" => kind).increment(1);
}

/// Publish the latest factors of both routes.
pub fn record_route_factors(bid: Decimal, ask: Decimal) {
    gauge!(METRIC_ROUTE_FACTOR, "route" => "bid").set(bid.to_f64().unwrap_or(0.0));
    gauge!(METRIC_ROUTE_FACTOR, "route" => "ask").set(ask.to_f64().unwrap_or(0.0));
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        elapsed_ms(self.start)
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(self.metric_name).record(elapsed_ms(self.start));
    }
}

/// Create a latency timer for signing operations.
pub fn timer_signing() -> LatencyTimer {
    LatencyTimer::new(METRIC_SIGNING_LATENCY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn latency_timer_measures_time() {
        let timer = LatencyTimer::new("test_metric");
        sleep(Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 9.0);
    }

    #[test]
    fn recorders_work_without_exporter() {
        record_cycle();
        record_route_factors(Decimal::new(404, 0), Decimal::ONE);
        record_order_placed("eth_btc", Side::Buy);
    }
}
