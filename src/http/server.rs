//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the contract proxy router in middleware (timeout, request ID, tracing)
//! - Add no headers of its own to forwarded traffic
//! - Serve HTTP/1.1 and HTTP/2 on the given listener
//! - Record client addresses for `X-Forwarded-For`
//! - Stop accepting and drain in-flight requests on shutdown

use std::net::SocketAddr;
use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::http::request::{assign_request_id, request_span};
use crate::proxy::ContractProxy;

/// HTTP server for the contract proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving the given proxy.
    pub fn new(config: ProxyConfig, proxy: ContractProxy) -> Self {
        let router = Self::build_router(&config, &proxy);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers, outermost first.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, proxy: &ContractProxy) -> Router {
        proxy.router().layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(assign_request_id))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
        )
    }

    /// Run the server until a shutdown signal is received.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            target = %self.config.upstream.target,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}
