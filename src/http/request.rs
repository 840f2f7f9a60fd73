//! Request identification.
//!
//! # Responsibilities
//! - Give every request an ID (UUID v4) as early as possible
//! - Summarise a request for reports once the request itself is forwarded
//!
//! # Design Decisions
//! - An incoming `x-request-id` is reused as the ID
//! - The ID lives in request extensions only; no header is added to the
//!   request sent upstream or the response sent back
//! - The summary is taken before forwarding, since forwarding consumes the request

use std::fmt;

use axum::{
    body::Body,
    extract::Request,
    http::{Method, Uri},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Correlation ID of one request, stored as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Reuse the client's `x-request-id`, or generate one.
    pub fn for_request<B>(request: &axum::http::Request<B>) -> Self {
        request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| RequestId(v.to_string()))
            .unwrap_or_else(|| RequestId(Uuid::new_v4().to_string()))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Middleware attaching a [`RequestId`] extension to every request.
pub async fn assign_request_id(mut request: Request, next: Next) -> Response {
    let id = RequestId::for_request(&request);
    request.extensions_mut().insert(id);
    next.run(request).await
}

/// Span for `TraceLayer` carrying the request ID.
pub fn request_span(request: &axum::http::Request<Body>) -> Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.as_str())
        .unwrap_or("unknown");
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

/// What reports need to know about a request.
#[derive(Debug, Clone)]
pub struct RequestSummary {
    pub method: Method,
    pub uri: Uri,
    pub request_id: String,
}

impl RequestSummary {
    pub fn from_request<B>(request: &axum::http::Request<B>) -> Self {
        let request_id = match request.extensions().get::<RequestId>() {
            Some(id) => id.0.clone(),
            None => request
                .headers()
                .get(X_REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string(),
        };

        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            request_id,
        }
    }
}

impl fmt::Display for RequestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.uri)
    }
}
