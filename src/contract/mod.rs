//! Contract document subsystem.
//!
//! # Data Flow
//! ```text
//! contract file (Swagger 2.0, JSON or YAML)
//!     → loader.rs (read, parse, normalise to JSON)
//!     → document.rs (typed paths/operations/responses + raw JSON)
//!     → ContractDocument (immutable, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - Only the parts used for routing and response checks are typed
//! - The raw JSON is kept so body schemas can resolve `#/definitions/...`

pub mod document;
pub mod loader;

pub use document::{ContractDocument, HeaderContract, Operation, PathItem, ResponseContract, Responses};
pub use loader::{load_contract, parse_contract, ContractError, ContractFormat};
