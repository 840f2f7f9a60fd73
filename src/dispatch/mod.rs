//! Contract dispatch.
//!
//! # Responsibilities
//! - Resolve each request against the route table exactly once
//! - Forward matched requests through a recording body
//! - Check the recorded response and issue exactly one report per request
//!
//! # Design Decisions
//! - The client response is never altered by contract checks
//! - Checks run in a spawned task after the body has been sent
//! - A body that ends before the backend finishes is reported as truncated
//!
//! # Data Flow
//! ```text
//! request ──▶ RouteTable::lookup ──▶ Forwarder ──▶ RecordingBody ──▶ client
//!                                                      │
//!                                                      ▼ (capture)
//!                                  ResponseValidator ──▶ Reporter
//! ```

pub mod dispatcher;

pub use dispatcher::{Dispatcher, Verdict, ROUTE_NOT_DEFINED};
