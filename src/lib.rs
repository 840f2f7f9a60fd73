//! Contract-enforcing reverse proxy library.
//!
//! Forwards traffic to one backend and checks every response against a
//! Swagger 2.0 contract, reporting through a [`reporting::Reporter`].

pub mod config;
pub mod contract;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod reporting;
pub mod routing;
pub mod validation;

pub use config::schema::ProxyConfig;
pub use contract::ContractDocument;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{ContractProxy, ProxyError, ProxyOptions};
pub use reporting::{ReportError, Reporter, TracingReporter};
