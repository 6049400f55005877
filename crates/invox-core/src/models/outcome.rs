//! Per-document processing outcome.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AcquisitionError, GuardrailViolation, InvoxError, MalformedInput};

use super::invoice::InvoiceRecord;
use super::validation::ValidationResult;

/// Stages a document moves through in the pipeline.
///
/// A failed document stops at the last stage it finished; validation is the
/// final step before `Completed` and cannot fail on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Received,
    AcquiredText,
    Extracted,
    Completed,
}

/// Category of a terminal pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    GuardrailViolation,
    EngineUnavailable,
    AcquisitionFailure,
    MalformedInput,
    Cancelled,
}

impl From<&GuardrailViolation> for FailureKind {
    fn from(_: &GuardrailViolation) -> Self {
        FailureKind::GuardrailViolation
    }
}

impl From<&AcquisitionError> for FailureKind {
    fn from(error: &AcquisitionError) -> Self {
        match error {
            AcquisitionError::EngineUnavailable { .. } => FailureKind::EngineUnavailable,
            _ => FailureKind::AcquisitionFailure,
        }
    }
}

impl From<&MalformedInput> for FailureKind {
    fn from(_: &MalformedInput) -> Self {
        FailureKind::MalformedInput
    }
}

impl From<&InvoxError> for FailureKind {
    fn from(error: &InvoxError) -> Self {
        match error {
            InvoxError::Guardrail(e) => e.into(),
            InvoxError::Acquisition(e) => e.into(),
            _ => FailureKind::MalformedInput,
        }
    }
}

/// Terminal artifact returned for every processed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingOutcome {
    /// Whether the pipeline ran to completion.
    pub success: bool,

    /// Extracted invoice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice: Option<InvoiceRecord>,

    /// Validation verdict, present only when validation was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,

    /// Human-readable failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Failure category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,

    /// Last stage reached; `Completed` on success.
    pub stage: PipelineStage,

    /// End-to-end processing time in milliseconds.
    pub processing_time_ms: u64,

    /// Free-form observability data.
    pub metadata: BTreeMap<String, Value>,
}

impl ProcessingOutcome {
    pub fn completed(
        invoice: InvoiceRecord,
        validation: Option<ValidationResult>,
        elapsed: Duration,
        metadata: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            success: true,
            invoice: Some(invoice),
            validation,
            error: None,
            failure: None,
            stage: PipelineStage::Completed,
            processing_time_ms: elapsed.as_millis() as u64,
            metadata,
        }
    }

    pub fn failed(
        kind: FailureKind,
        error: impl Into<String>,
        stage: PipelineStage,
        elapsed: Duration,
        metadata: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            success: false,
            invoice: None,
            validation: None,
            error: Some(error.into()),
            failure: Some(kind),
            stage,
            processing_time_ms: elapsed.as_millis() as u64,
            metadata,
        }
    }

    pub fn processing_time(&self) -> Duration {
        Duration::from_millis(self.processing_time_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_failure_kind_mapping() {
        let missing = AcquisitionError::EngineUnavailable {
            capability: "OCR models".to_string(),
        };
        assert_eq!(FailureKind::from(&missing), FailureKind::EngineUnavailable);

        let io = AcquisitionError::Io(std::io::Error::other("boom"));
        assert_eq!(FailureKind::from(&io), FailureKind::AcquisitionFailure);

        let guard = InvoxError::Guardrail(GuardrailViolation::NotFound(PathBuf::from("x.pdf")));
        assert_eq!(FailureKind::from(&guard), FailureKind::GuardrailViolation);
    }

    #[test]
    fn test_failed_outcome_shape() {
        let outcome = ProcessingOutcome::failed(
            FailureKind::GuardrailViolation,
            "unsupported file extension",
            PipelineStage::Received,
            Duration::from_millis(3),
            BTreeMap::new(),
        );
        assert!(!outcome.success);
        assert!(outcome.invoice.is_none());
        assert_eq!(outcome.stage, PipelineStage::Received);
        assert_eq!(outcome.processing_time(), Duration::from_millis(3));

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["failure"], "guardrail_violation");
        assert_eq!(json["stage"], "received");
        assert!(json.get("invoice").is_none());
    }
}
