//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Trigger → broadcast to subscribers → stop accepting → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - One broadcast channel; every long-running task subscribes
//! - In-flight requests finish before the server returns

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
