//! Checks a captured response against its declared contract.

use std::sync::Arc;

use axum::http::HeaderMap;
use serde_json::Value;

use crate::contract::{ContractDocument, ResponseContract};
use crate::validation::headers::check_header;
use crate::validation::outcome::{ValidationFailure, ValidationOutcome, Violation};
use crate::validation::schema::SchemaValidator;

/// Binds the schema capability to the contract document it resolves against.
#[derive(Clone)]
pub struct ResponseValidator {
    document: Arc<ContractDocument>,
    schemas: Arc<dyn SchemaValidator>,
}

impl ResponseValidator {
    pub fn new(document: Arc<ContractDocument>, schemas: Arc<dyn SchemaValidator>) -> Self {
        Self { document, schemas }
    }

    /// Validate one response.
    ///
    /// The body must parse as JSON before anything else is looked at; a parse
    /// failure is the whole outcome. Otherwise header and schema violations
    /// are collected together.
    pub fn validate(
        &self,
        status: u16,
        headers: &HeaderMap,
        body: &[u8],
        contract: &ResponseContract,
    ) -> ValidationOutcome {
        let data: Value = match serde_json::from_slice(body) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(status, error = %e, "Response body is not JSON");
                return ValidationOutcome::Failure(ValidationFailure::single(Violation::body(
                    "",
                    format!("response body is not valid JSON: {}", e),
                )));
            }
        };

        let mut violations: Vec<Violation> = contract
            .headers
            .iter()
            .filter_map(|(name, header)| check_header(name, headers, header))
            .collect();

        if let Some(schema) = &contract.schema {
            violations.extend(self.schemas.validate(schema, &self.document.raw, &data));
        }

        tracing::trace!(status, violations = violations.len(), "Response validated");
        ValidationOutcome::from_violations(violations)
    }
}
