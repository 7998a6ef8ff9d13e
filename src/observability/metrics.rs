//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_requests_total` (counter): requests by method, status, tier
//! - `guard_request_duration_seconds` (histogram): latency distribution
//! - `guard_rate_limited_total` (counter): rejections by tier
//! - `guard_csrf_rejected_total` (counter): failed CSRF checks
//! - `guard_audit_log_entries` (gauge): entries currently retained
//! - `guard_cleanup_removed_total` (counter): entries swept by kind
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, tier: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("tier", tier.to_string()),
    ];
    counter!("guard_requests_total", &labels).increment(1);
    histogram!("guard_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(tier: &str) {
    counter!("guard_rate_limited_total", "tier" => tier.to_string()).increment(1);
}

pub fn record_csrf_rejected() {
    counter!("guard_csrf_rejected_total").increment(1);
}

pub fn record_audit_log_size(len: usize) {
    gauge!("guard_audit_log_entries").set(len as f64);
}

pub fn record_cleanup(kind: &'static str, removed: usize) {
    counter!("guard_cleanup_removed_total", "kind" => kind).increment(removed as u64);
}
