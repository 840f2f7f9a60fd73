//! Per-request contract dispatch.
//!
//! ```text
//! Routing ──miss──────────────────────────────▶ warning, forward ──▶ Reported
//!    │ hit
//!    ▼
//! Proxying (forward + RecordingBody)
//!    │ body fully sent
//!    ▼
//! AwaitingContract ──status not declared──────▶ error ────────────▶ Reported
//!    │ declared
//!    ▼
//! Validating ─────────────────────────────────▶ success / error ──▶ Reported
//! ```
//!
//! The client always receives the backend response as-is; checks run on the
//! recorded copy after the body has been sent. A body cut short (client gone,
//! backend error) is still reported: a declared status then yields a single
//! truncation violation instead of a body check.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    http::{Request, Response},
};

use crate::http::forward::Forwarder;
use crate::http::recorder::{CapturedResponse, RecordingBody};
use crate::http::request::RequestSummary;
use crate::observability::metrics;
use crate::reporting::{ReportError, Reporter};
use crate::routing::{RouteEntry, RouteMatch, RouteTable};
use crate::validation::{ResponseValidator, ValidationFailure, ValidationOutcome, Violation};

/// Warning raised for requests no route governs.
pub const ROUTE_NOT_DEFINED: &str = "Route not defined on the contract";

/// How a matched request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The response status has no declaration in the operation.
    StatusNotDefined(u16),
    /// The response met its declaration.
    Conformant,
    /// The response broke its declaration this many times.
    Violated(usize),
}

/// Shared, read-only request pipeline. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    validator: ResponseValidator,
    reporter: Arc<dyn Reporter>,
    forwarder: Forwarder,
}

impl Dispatcher {
    pub fn new(
        routes: Arc<RouteTable>,
        validator: ResponseValidator,
        reporter: Arc<dyn Reporter>,
        forwarder: Forwarder,
    ) -> Self {
        Self {
            routes,
            validator,
            reporter,
            forwarder,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Handle one inbound request end to end.
    pub async fn dispatch(&self, request: Request<Body>, client_addr: Option<SocketAddr>) -> Response<Body> {
        let summary = RequestSummary::from_request(&request);
        tracing::debug!(request_id = %summary.request_id, stage = "routing", "{}", summary);

        // Resolved once; the match travels with the request from here on.
        match self.routes.lookup(request.method(), request.uri().path()) {
            Some(matched) => self.proxy(summary, matched, request, client_addr).await,
            None => self.not_defined(summary, request, client_addr).await,
        }
    }

    /// Forward a request no route governs, without recording it.
    pub async fn not_defined(
        &self,
        summary: RequestSummary,
        request: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Response<Body> {
        let start = Instant::now();
        self.reporter.warning(&summary, ROUTE_NOT_DEFINED);

        let response = self.forwarder.forward(request, client_addr).await;
        metrics::record_request(summary.method.as_str(), response.status().as_u16(), false, start);
        tracing::debug!(request_id = %summary.request_id, stage = "reported", "Forwarded without contract");
        response
    }

    async fn proxy(
        &self,
        summary: RequestSummary,
        matched: RouteMatch,
        request: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Response<Body> {
        let start = Instant::now();
        tracing::debug!(
            request_id = %summary.request_id,
            stage = "proxying",
            route = %matched.entry.describe(),
            params = ?matched.params,
            "Route matched"
        );

        let response = self.forwarder.forward(request, client_addr).await;
        metrics::record_request(summary.method.as_str(), response.status().as_u16(), true, start);

        let (parts, body) = response.into_parts();
        let (body, captured) = RecordingBody::new(parts.status, &parts.headers, body);

        let dispatcher = self.clone();
        let entry = matched.entry;
        tokio::spawn(async move {
            tracing::debug!(request_id = %summary.request_id, stage = "awaiting_contract", "Waiting for response body");
            match captured.await {
                Ok(captured) => {
                    dispatcher.settle(&summary, &entry, &captured);
                }
                Err(_) => {
                    tracing::error!(
                        request_id = %summary.request_id,
                        "Response recorder dropped without a capture"
                    );
                }
            }
        });

        Response::from_parts(parts, Body::new(body))
    }

    /// Check a completed response against the matched route and report once.
    pub fn settle(&self, summary: &RequestSummary, entry: &RouteEntry, captured: &CapturedResponse) -> Verdict {
        let status = captured.status.as_u16();

        let verdict = match entry.operation.response_for(status) {
            None => {
                self.reporter
                    .error(summary, &ReportError::StatusNotDefined { status });
                Verdict::StatusNotDefined(status)
            }
            Some(_) if !captured.complete => {
                let failure = ValidationFailure::single(Violation::body(
                    "",
                    format!(
                        "response body ended after {} bytes, before the backend finished sending it",
                        captured.body.len()
                    ),
                ));
                self.reporter.error(summary, &ReportError::Violations(failure));
                Verdict::Violated(1)
            }
            Some(contract) => {
                tracing::debug!(request_id = %summary.request_id, stage = "validating", status, "Checking response");
                match self
                    .validator
                    .validate(status, &captured.headers, &captured.body, contract)
                {
                    ValidationOutcome::Success => {
                        self.reporter.success(summary);
                        Verdict::Conformant
                    }
                    ValidationOutcome::Failure(failure) => {
                        let count = failure.len();
                        self.reporter.error(summary, &ReportError::Violations(failure));
                        Verdict::Violated(count)
                    }
                }
            }
        };

        tracing::debug!(request_id = %summary.request_id, stage = "reported", verdict = ?verdict, "Contract checked");
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractDocument;
    use crate::validation::JsonSchemaEngine;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method, StatusCode};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect {
        events: Mutex<Vec<String>>,
    }

    impl Reporter for Collect {
        fn warning(&self, _request: &RequestSummary, message: &str) {
            self.events.lock().unwrap().push(format!("warning: {}", message));
        }

        fn error(&self, _request: &RequestSummary, error: &ReportError) {
            self.events.lock().unwrap().push(format!("error: {}", error));
        }

        fn success(&self, _request: &RequestSummary) {
            self.events.lock().unwrap().push("success".to_string());
        }
    }

    fn dispatcher(reporter: Arc<Collect>) -> Dispatcher {
        let document = Arc::new(
            ContractDocument::from_value(json!({
                "paths": {
                    "/widgets/{id}": {
                        "get": {
                            "responses": {
                                "200": {
                                    "description": "ok",
                                    "schema": {
                                        "type": "object",
                                        "required": ["id", "name"],
                                        "properties": {
                                            "id": { "type": "integer" },
                                            "name": { "type": "string" }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }))
            .unwrap(),
        );
        let routes = Arc::new(RouteTable::build(&document.base_path, &document.paths).unwrap());
        let validator = ResponseValidator::new(document, Arc::new(JsonSchemaEngine::new()));
        Dispatcher::new(routes, validator, reporter, Forwarder::new("http://127.0.0.1:9").unwrap())
    }

    fn summary() -> RequestSummary {
        let request = Request::builder().uri("/widgets/1").body(()).unwrap();
        RequestSummary::from_request(&request)
    }

    fn captured(status: StatusCode, body: &'static str) -> CapturedResponse {
        CapturedResponse {
            status,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body.as_bytes()),
            complete: true,
        }
    }

    #[tokio::test]
    async fn test_settle_verdicts() {
        let reporter = Arc::new(Collect::default());
        let dispatcher = dispatcher(reporter.clone());
        let entry = dispatcher.routes().lookup(&Method::GET, "/widgets/1").unwrap().entry;

        assert_eq!(
            dispatcher.settle(&summary(), &entry, &captured(StatusCode::OK, r#"{"id":1,"name":"x"}"#)),
            Verdict::Conformant
        );
        assert_eq!(
            dispatcher.settle(&summary(), &entry, &captured(StatusCode::NOT_FOUND, "{}")),
            Verdict::StatusNotDefined(404)
        );
        assert_eq!(
            dispatcher.settle(&summary(), &entry, &captured(StatusCode::OK, r#"{"id":"one"}"#)),
            Verdict::Violated(2)
        );

        let events = reporter.events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], "success");
        assert_eq!(events[1], "error: server status 404 not defined by the contract");
        assert!(events[2].starts_with("error: validation failure list:"));
    }

    #[tokio::test]
    async fn test_truncated_body_still_reported() {
        let reporter = Arc::new(Collect::default());
        let dispatcher = dispatcher(reporter.clone());
        let entry = dispatcher.routes().lookup(&Method::GET, "/widgets/1").unwrap().entry;

        let mut partial = captured(StatusCode::OK, r#"{"id":1,"#);
        partial.complete = false;
        assert_eq!(dispatcher.settle(&summary(), &entry, &partial), Verdict::Violated(1));

        // An undeclared status is reported as such whatever the body.
        let mut partial = captured(StatusCode::NOT_FOUND, "");
        partial.complete = false;
        assert_eq!(
            dispatcher.settle(&summary(), &entry, &partial),
            Verdict::StatusNotDefined(404)
        );

        let events = reporter.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].contains("response body ended after 8 bytes"));
        assert_eq!(events[1], "error: server status 404 not defined by the contract");
    }

    #[tokio::test]
    async fn test_abandoned_response_is_reported() {
        let reporter = Arc::new(Collect::default());
        let dispatcher = dispatcher(reporter.clone());

        // Nothing listens on the target, so the body is the 502 text.
        let request = Request::builder()
            .method(Method::GET)
            .uri("/widgets/1")
            .body(Body::empty())
            .unwrap();
        let response = dispatcher.dispatch(request, None).await;
        drop(response);

        for _ in 0..50 {
            if !reporter.events.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(reporter.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_checked_as_502() {
        let reporter = Arc::new(Collect::default());
        let dispatcher = dispatcher(reporter.clone());

        let request = Request::builder()
            .method(Method::GET)
            .uri("/widgets/1")
            .body(Body::empty())
            .unwrap();
        let response = dispatcher.dispatch(request, None).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Bad Gateway");

        // The report is issued by a spawned task once the body is sent.
        for _ in 0..50 {
            if !reporter.events.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let events = reporter.events.lock().unwrap();
        assert_eq!(events.as_slice(), ["error: server status 502 not defined by the contract"]);
    }

    #[tokio::test]
    async fn test_unmatched_route_warns() {
        let reporter = Arc::new(Collect::default());
        let dispatcher = dispatcher(reporter.clone());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/widgets/1")
            .body(Body::empty())
            .unwrap();
        let response = dispatcher.dispatch(request, None).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let events = reporter.events.lock().unwrap();
        assert_eq!(events.as_slice(), [format!("warning: {}", ROUTE_NOT_DEFINED)]);
    }
}
