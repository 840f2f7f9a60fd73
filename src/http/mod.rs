//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, request summary)
//!     → [dispatch core resolves the route]
//!     → forward.rs (rewrite URI, send to backend)
//!     → recorder.rs (stream to client, keep a copy)
//!     → Send to client
//! ```

pub mod forward;
pub mod recorder;
pub mod request;
pub mod server;

pub use forward::{Forwarder, TargetError};
pub use recorder::{CapturedResponse, RecordError, RecordingBody, ResponseRecorder};
pub use request::{RequestId, RequestSummary, X_REQUEST_ID};
pub use server::HttpServer;
