//! Reporting subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch core verdict
//!     → Reporter::warning  (route not defined)
//!     → Reporter::error    (status not defined, contract violations)
//!     → Reporter::success  (response conforms)
//! ```
//!
//! # Design Decisions
//! - The only side channel for contract results; traffic is never altered
//! - Implementations are shared by all in-flight requests and must be `Send + Sync`
//! - One notification per request, violations aggregated

pub mod log;

use crate::http::request::RequestSummary;
use crate::validation::ValidationFailure;

pub use log::TracingReporter;

/// Why a matched response did not meet its contract.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReportError {
    #[error("server status {status} not defined by the contract")]
    StatusNotDefined { status: u16 },

    #[error(transparent)]
    Violations(#[from] ValidationFailure),
}

/// Receives the outcome of every proxied request.
pub trait Reporter: Send + Sync {
    fn warning(&self, request: &RequestSummary, message: &str);
    fn error(&self, request: &RequestSummary, error: &ReportError);
    fn success(&self, request: &RequestSummary);
}
