//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate path template, extract params)
//!     → Return: RouteMatch (entry + params) or NoMatch
//!
//! Route Compilation (at startup):
//!     ContractDocument (basePath, paths)
//!     → One governing operation per path item
//!     → Compile path templates
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route
//! - A request is matched once; the match travels with the request

pub mod matcher;
pub mod router;

pub use matcher::{PathPattern, PatternError};
pub use router::{RouteEntry, RouteMatch, RouteTable};
