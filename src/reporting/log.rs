//! Reporter that logs through `tracing` and counts outcomes.

use crate::http::request::RequestSummary;
use crate::observability::metrics;
use crate::reporting::{ReportError, Reporter};

/// Default reporter: structured logs plus `contract_proxy_reports_total`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn warning(&self, request: &RequestSummary, message: &str) {
        tracing::warn!(
            request_id = %request.request_id,
            method = %request.method,
            uri = %request.uri,
            "{}",
            message
        );
        metrics::record_report(metrics::ReportKind::Warning);
    }

    fn error(&self, request: &RequestSummary, error: &ReportError) {
        match error {
            ReportError::StatusNotDefined { status } => {
                tracing::error!(
                    request_id = %request.request_id,
                    method = %request.method,
                    uri = %request.uri,
                    status,
                    "{}",
                    error
                );
            }
            ReportError::Violations(failure) => {
                tracing::error!(
                    request_id = %request.request_id,
                    method = %request.method,
                    uri = %request.uri,
                    violations = failure.len(),
                    "{}",
                    failure
                );
            }
        }
        metrics::record_report(metrics::ReportKind::Error);
    }

    fn success(&self, request: &RequestSummary) {
        tracing::info!(
            request_id = %request.request_id,
            method = %request.method,
            uri = %request.uri,
            "Response conforms to contract"
        );
        metrics::record_report(metrics::ReportKind::Success);
    }
}
