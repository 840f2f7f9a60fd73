//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (requests, latency, contract reports)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `contract_proxy_requests_total` (counter): requests by method, status, matched
//! - `contract_proxy_request_duration_seconds` (histogram): time to response head
//! - `contract_proxy_reports_total` (counter): reports by kind
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels stay low-cardinality: no paths or request IDs

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Kind of contract report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Warning,
    Error,
    Success,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Warning => "warning",
            ReportKind::Error => "error",
            ReportKind::Success => "success",
        }
    }
}

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one proxied request.
pub fn record_request(method: &str, status: u16, matched: bool, start: Instant) {
    counter!(
        "contract_proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "matched" => matched.to_string()
    )
    .increment(1);
    histogram!(
        "contract_proxy_request_duration_seconds",
        "method" => method.to_string(),
        "matched" => matched.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record one contract report.
pub fn record_report(kind: ReportKind) {
    counter!("contract_proxy_reports_total", "kind" => kind.as_str()).increment(1);
}
