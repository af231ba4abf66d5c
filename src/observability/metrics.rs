//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): responses started, by method and status;
//!   counted when the response head is ready, before its body is streamed
//! - `mirror_bytes_total` (counter): body bytes copied to the sink, by direction
//! - `mirror_errors_total` (counter): failed sink writes
//! - `upstream_errors_total` (counter): upstream round trips that failed
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Exporter is opt-in (`--metrics`)

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_mirrored_bytes(direction: &'static str, bytes: usize) {
    metrics::counter!("mirror_bytes_total", "direction" => direction).increment(bytes as u64);
}

pub fn record_mirror_error() {
    metrics::counter!("mirror_errors_total").increment(1);
}

pub fn record_upstream_error() {
    metrics::counter!("upstream_errors_total").increment(1);
}
