//! Violations and the aggregated validation outcome.

use std::fmt;

/// One concrete mismatch between a response and its contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// `header:{name}`, `body`, or `body/...` JSON pointer.
    pub location: String,
    pub message: String,
}

impl Violation {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn header(name: &str, message: impl Into<String>) -> Self {
        Self::new(format!("header:{}", name), message)
    }

    /// A violation inside the body. `pointer` is a JSON pointer (`""` for the root).
    pub fn body(pointer: &str, message: impl Into<String>) -> Self {
        Self::new(format!("body{}", pointer), message)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Every violation found in one response. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    violations: Vec<Violation>,
}

impl ValidationFailure {
    /// `None` when there is nothing to report.
    pub fn from_violations(violations: Vec<Violation>) -> Option<Self> {
        (!violations.is_empty()).then_some(Self { violations })
    }

    pub fn single(violation: Violation) -> Self {
        Self {
            violations: vec![violation],
        }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failure list:")?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, ";")?;
            }
            write!(f, " {}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

/// Result of checking one captured response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Success,
    Failure(ValidationFailure),
}

impl ValidationOutcome {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        match ValidationFailure::from_violations(violations) {
            Some(failure) => ValidationOutcome::Failure(failure),
            None => ValidationOutcome::Success,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ValidationOutcome::Success)
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidationOutcome::Success => &[],
            ValidationOutcome::Failure(failure) => failure.violations(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_violations_is_success() {
        assert!(ValidationOutcome::from_violations(vec![]).is_success());
        assert!(ValidationFailure::from_violations(vec![]).is_none());
    }

    #[test]
    fn test_failure_display_lists_every_violation() {
        let outcome = ValidationOutcome::from_violations(vec![
            Violation::header("X-Rate-Limit", "X-Rate-Limit in headers is missing"),
            Violation::body("/id", "\"one\" is not of type \"integer\""),
        ]);
        let ValidationOutcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.len(), 2);
        assert_eq!(
            failure.to_string(),
            "validation failure list: header:X-Rate-Limit: X-Rate-Limit in headers is missing; \
             body/id: \"one\" is not of type \"integer\""
        );
    }

    #[test]
    fn test_body_root_location() {
        assert_eq!(Violation::body("", "bad").location, "body");
    }
}
