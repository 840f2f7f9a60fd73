//! Contract proxy facade.
//!
//! # Responsibilities
//! - Build the route table, validator and forwarder from one contract document
//! - Expose an Axum router that sends every request through the dispatcher
//!
//! # Design Decisions
//! - Defaults: target `http://localhost:8080`, not verbose, `jsonschema` engine
//! - Requests the router itself cannot place fall back to the not-defined path,
//!   which warns and forwards like any unmatched route
//! - The client address is taken from `ConnectInfo` when the server provides it

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, Response},
    routing::any,
    Router,
};

use crate::contract::ContractDocument;
use crate::dispatch::Dispatcher;
use crate::http::forward::{Forwarder, TargetError};
use crate::http::request::RequestSummary;
use crate::reporting::Reporter;
use crate::routing::{PatternError, RouteTable};
use crate::validation::{JsonSchemaEngine, ResponseValidator, SchemaValidator};

pub const DEFAULT_TARGET: &str = "http://localhost:8080";

/// Errors raised while assembling the proxy.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("invalid path template in contract: {0}")]
    Route(#[from] PatternError),
}

/// Construction options.
#[derive(Clone)]
pub struct ProxyOptions {
    /// Backend base URL.
    pub target: String,
    /// Log each registered route.
    pub verbose: bool,
    /// Body schema engine. `None` selects [`JsonSchemaEngine`].
    pub schema_validator: Option<Arc<dyn SchemaValidator>>,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            verbose: false,
            schema_validator: None,
        }
    }
}

impl ProxyOptions {
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_schema_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.schema_validator = Some(validator);
        self
    }
}

/// A reverse proxy that checks every response against a contract.
#[derive(Clone)]
pub struct ContractProxy {
    dispatcher: Dispatcher,
}

impl ContractProxy {
    pub fn new(
        document: ContractDocument,
        reporter: Arc<dyn Reporter>,
        options: ProxyOptions,
    ) -> Result<Self, ProxyError> {
        let forwarder = Forwarder::new(&options.target)?;
        let routes = RouteTable::build(&document.base_path, &document.paths)?;

        if options.verbose {
            for entry in routes.entries() {
                tracing::info!("Register {} {}", entry.method, entry.pattern);
            }
        }
        tracing::info!(
            routes = routes.len(),
            target = %options.target,
            "Contract proxy ready"
        );

        let schemas = options
            .schema_validator
            .unwrap_or_else(|| Arc::new(JsonSchemaEngine::new()));
        let validator = ResponseValidator::new(Arc::new(document), schemas);
        let dispatcher = Dispatcher::new(Arc::new(routes), validator, reporter, forwarder);

        Ok(Self { dispatcher })
    }

    pub fn routes(&self) -> &RouteTable {
        self.dispatcher.routes()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Router accepting every method on every path.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", any(dispatch_handler))
            .route("/{*path}", any(dispatch_handler))
            .fallback(not_found_handler)
            .with_state(self.dispatcher.clone())
    }
}

async fn dispatch_handler(State(dispatcher): State<Dispatcher>, request: Request<Body>) -> Response<Body> {
    let client_addr = client_addr(&request);
    dispatcher.dispatch(request, client_addr).await
}

async fn not_found_handler(State(dispatcher): State<Dispatcher>, request: Request<Body>) -> Response<Body> {
    let client_addr = client_addr(&request);
    let summary = RequestSummary::from_request(&request);
    dispatcher.not_defined(summary, request, client_addr).await
}

fn client_addr<B>(request: &Request<B>) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::TracingReporter;
    use serde_json::json;

    fn document() -> ContractDocument {
        ContractDocument::from_value(json!({
            "basePath": "/v1",
            "paths": {
                "/widgets": {
                    "get": { "responses": { "200": { "description": "ok" } } },
                    "post": { "responses": { "201": { "description": "created" } } }
                },
                "/widgets/{id}": {
                    "delete": { "responses": { "204": { "description": "gone" } } }
                }
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_default_options() {
        let options = ProxyOptions::default();
        assert_eq!(options.target, "http://localhost:8080");
        assert!(!options.verbose);
        assert!(options.schema_validator.is_none());

        let proxy = ContractProxy::new(document(), Arc::new(TracingReporter), options).unwrap();
        assert_eq!(proxy.routes().len(), 2);
    }

    #[tokio::test]
    async fn test_routes_registered_under_base_path() {
        let proxy = ContractProxy::new(
            document(),
            Arc::new(TracingReporter),
            ProxyOptions::default().with_verbose(true),
        )
        .unwrap();

        let mut described: Vec<String> = proxy.routes().entries().map(|e| e.describe()).collect();
        described.sort();
        assert_eq!(described, ["DELETE /v1/widgets/{id}", "GET /v1/widgets"]);
    }

    #[tokio::test]
    async fn test_bad_target_rejected() {
        let result = ContractProxy::new(
            document(),
            Arc::new(TracingReporter),
            ProxyOptions::default().with_target("ftp://backend"),
        );
        assert!(matches!(result, Err(ProxyError::Target(TargetError::Scheme(_)))));
    }

    #[tokio::test]
    async fn test_bad_template_rejected() {
        let document = ContractDocument::from_value(json!({
            "paths": { "/widgets/{id": { "get": { "responses": {} } } }
        }))
        .unwrap();
        let result = ContractProxy::new(document, Arc::new(TracingReporter), ProxyOptions::default());
        assert!(matches!(result, Err(ProxyError::Route(_))));
    }
}
