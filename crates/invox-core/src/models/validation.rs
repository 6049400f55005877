//! Validation verdict model.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Outcome of validating one invoice record.
///
/// `is_valid` is derived from `errors` at construction and kept in sync by
/// every mutator, so a valid result never carries errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the invoice passed every blocking check.
    pub is_valid: bool,

    /// Blocking findings.
    pub errors: Vec<String>,

    /// Non-blocking findings.
    pub warnings: Vec<String>,

    /// Validation confidence in [0, 1].
    pub confidence: f64,

    /// Names of the fields/checks that were evaluated.
    pub validated_fields: BTreeSet<String>,
}

impl ValidationResult {
    pub fn new(
        errors: Vec<String>,
        warnings: Vec<String>,
        confidence: f64,
        validated_fields: BTreeSet<String>,
    ) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            confidence: clamp_unit(confidence),
            validated_fields,
        }
    }

    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.is_valid = false;
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// Clamp a score into [0, 1], mapping NaN to 0.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_follows_errors() {
        let result = ValidationResult::new(Vec::new(), vec!["low".into()], 0.9, BTreeSet::new());
        assert!(result.is_valid);

        let mut result = result;
        result.push_error("Missing vendor name");
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let result = ValidationResult::new(Vec::new(), Vec::new(), 1.7, BTreeSet::new());
        assert_eq!(result.confidence, 1.0);
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
    }
}
