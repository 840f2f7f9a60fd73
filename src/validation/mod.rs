//! Response validation subsystem.
//!
//! # Data Flow
//! ```text
//! CapturedResponse (status, headers, body) + ResponseContract
//!     → response.rs (JSON parse gate)
//!     → headers.rs (presence + format of each declared header)
//!     → schema.rs (body against schema, via SchemaValidator)
//!     → outcome.rs (Success, or one Failure holding every Violation)
//! ```
//!
//! # Design Decisions
//! - A body that is not JSON fails the whole check; nothing else is reported
//! - Header and schema problems never short-circuit each other
//! - Unknown header formats are accepted

pub mod headers;
pub mod outcome;
pub mod response;
pub mod schema;

pub use outcome::{ValidationFailure, ValidationOutcome, Violation};
pub use response::ResponseValidator;
pub use schema::{JsonSchemaEngine, SchemaValidator};
