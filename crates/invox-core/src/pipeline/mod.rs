//! Pipeline orchestrator: guardrail, acquisition, extraction, validation.
//!
//! Every stage returns a `Result`; [`InvoicePipeline::process`] is the one
//! place where a stage failure becomes a terminal [`ProcessingOutcome`].

mod batch;

pub use batch::CancellationToken;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::acquisition::{DocumentKind, TextAcquirer};
use crate::error::{AcquisitionError, Result};
use crate::guardrail::{FileGuardrail, Guardrail};
use crate::invoice::{InvoiceExtractor, build_extractor};
use crate::models::config::InvoxConfig;
use crate::models::invoice::{InvoiceRecord, InvoiceStatus};
use crate::models::outcome::{FailureKind, PipelineStage, ProcessingOutcome};
use crate::models::validation::ValidationResult;
use crate::ocr::{TextRecognizer, load_recognizer};
use crate::validation::{DuplicateDetector, InvoiceValidator, NoPurchaseOrders, PoProvider};

/// Per-document processing options.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Run the validator after extraction.
    pub validate: bool,
    /// Purchase order to cross-check against.
    pub po_number: Option<String>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            validate: true,
            po_number: None,
        }
    }
}

impl ProcessOptions {
    pub fn without_validation() -> Self {
        Self {
            validate: false,
            po_number: None,
        }
    }

    pub fn with_po_number(mut self, po_number: impl Into<String>) -> Self {
        self.po_number = Some(po_number.into());
        self
    }
}

type Metadata = BTreeMap<String, Value>;

/// Runs documents through the full pipeline.
///
/// Holds only read-only state after construction, so one instance can be
/// shared across worker threads.
pub struct InvoicePipeline {
    config: Arc<InvoxConfig>,
    guardrail: Box<dyn Guardrail>,
    acquirer: TextAcquirer,
    extractor: Arc<dyn InvoiceExtractor>,
    validator: InvoiceValidator,
    po_provider: Box<dyn PoProvider>,
}

/// Builder for [`InvoicePipeline`]; every collaborator has a default.
pub struct InvoicePipelineBuilder {
    config: InvoxConfig,
    guardrail: Option<Box<dyn Guardrail>>,
    acquirer: Option<TextAcquirer>,
    recognizer: Option<Arc<dyn TextRecognizer>>,
    extractor: Option<Arc<dyn InvoiceExtractor>>,
    po_provider: Option<Box<dyn PoProvider>>,
    duplicates: Option<Box<dyn DuplicateDetector>>,
}

impl InvoicePipelineBuilder {
    pub fn with_guardrail(mut self, guardrail: Box<dyn Guardrail>) -> Self {
        self.guardrail = Some(guardrail);
        self
    }

    /// Replace the whole acquisition chain. Takes precedence over
    /// [`with_recognizer`](Self::with_recognizer).
    pub fn with_acquirer(mut self, acquirer: TextAcquirer) -> Self {
        self.acquirer = Some(acquirer);
        self
    }

    /// Use `recognizer` in the standard acquisition chain.
    pub fn with_recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn InvoiceExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_po_provider(mut self, provider: Box<dyn PoProvider>) -> Self {
        self.po_provider = Some(provider);
        self
    }

    pub fn with_duplicate_detector(mut self, detector: Box<dyn DuplicateDetector>) -> Self {
        self.duplicates = Some(detector);
        self
    }

    pub fn build(self) -> Result<InvoicePipeline> {
        self.config.validate()?;

        let acquirer = match self.acquirer {
            Some(acquirer) => acquirer,
            None => {
                let recognizer = self
                    .recognizer
                    .unwrap_or_else(|| load_recognizer(&self.config.ocr));
                TextAcquirer::standard(&self.config, recognizer)
            }
        };

        let mut validator = InvoiceValidator::new(self.config.validation.clone());
        if let Some(detector) = self.duplicates {
            validator = validator.with_duplicate_detector(detector);
        }

        let pipeline = InvoicePipeline {
            guardrail: self
                .guardrail
                .unwrap_or_else(|| Box::new(FileGuardrail::new(&self.config.guardrail))),
            extractor: self
                .extractor
                .unwrap_or_else(|| build_extractor(&self.config.extraction)),
            po_provider: self.po_provider.unwrap_or_else(|| Box::new(NoPurchaseOrders)),
            acquirer,
            validator,
            config: Arc::new(self.config),
        };

        debug!(
            "Pipeline ready: extractor={}, strategies={:?}",
            pipeline.extractor.name(),
            pipeline.acquirer.strategy_names()
        );
        Ok(pipeline)
    }
}

impl InvoicePipeline {
    pub fn builder(config: InvoxConfig) -> InvoicePipelineBuilder {
        InvoicePipelineBuilder {
            config,
            guardrail: None,
            acquirer: None,
            recognizer: None,
            extractor: None,
            po_provider: None,
            duplicates: None,
        }
    }

    /// Pipeline with every default collaborator.
    pub fn new(config: InvoxConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &InvoxConfig {
        &self.config
    }

    /// Process one document. Never panics on bad input and never returns an
    /// error: failures are reported inside the outcome.
    pub fn process(&self, path: &Path, options: &ProcessOptions) -> ProcessingOutcome {
        let start = Instant::now();
        let mut metadata = Metadata::new();
        metadata.insert("file_path".to_string(), json!(path.display().to_string()));

        info!("Processing invoice: {}", path.display());

        let mut stage = PipelineStage::Received;
        match self.run(path, options, &mut stage, &mut metadata) {
            Ok((invoice, validation)) => {
                if let Some(validation) = &validation {
                    info!(
                        "Validation: {} ({} errors, {} warnings)",
                        if validation.is_valid { "PASS" } else { "FAIL" },
                        validation.errors.len(),
                        validation.warnings.len()
                    );
                }
                ProcessingOutcome::completed(invoice, validation, start.elapsed(), metadata)
            }
            Err(error) => {
                let kind = FailureKind::from(&error);
                warn!("Processing failed for {} after {:?}: {}", path.display(), stage, error);
                ProcessingOutcome::failed(kind, error.to_string(), stage, start.elapsed(), metadata)
            }
        }
    }

    fn run(
        &self,
        path: &Path,
        options: &ProcessOptions,
        stage: &mut PipelineStage,
        metadata: &mut Metadata,
    ) -> Result<(InvoiceRecord, Option<ValidationResult>)> {
        self.guardrail.check(path)?;

        let kind = DocumentKind::from_path(path).ok_or_else(|| {
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_string();
            AcquisitionError::UnsupportedKind(extension)
        })?;
        metadata.insert("document_kind".to_string(), json!(kind.as_str()));

        let acquired = self.acquirer.acquire(path, kind)?;
        debug!(
            "Acquired {} characters ({}) from {}",
            acquired.text.len(),
            acquired.provenance.as_str(),
            path.display()
        );
        metadata.insert("provenance".to_string(), json!(acquired.provenance.as_str()));
        metadata.insert("text_chars".to_string(), json!(acquired.significant_chars()));
        metadata.insert("pages".to_string(), json!(acquired.pages));
        *stage = PipelineStage::AcquiredText;

        let source_name = path.file_name().and_then(|n| n.to_str());
        let extraction = self.extractor.extract(&acquired.text, source_name)?;
        metadata.insert("extractor".to_string(), json!(self.extractor.name()));
        metadata.insert("signals".to_string(), json!(extraction.signals));
        metadata.insert("extraction_warnings".to_string(), json!(extraction.warnings));
        *stage = PipelineStage::Extracted;

        let invoice = extraction.invoice.with_po_number(options.po_number.clone());

        if !options.validate {
            return Ok((invoice, None));
        }

        let po = options
            .po_number
            .as_deref()
            .and_then(|number| self.po_provider.lookup(number));
        let mut validation = self.validator.validate(&invoice, po.as_ref())?;
        if let (Some(number), None) = (&options.po_number, &po) {
            validation.push_warning(format!(
                "Purchase order {} not found, PO checks skipped",
                number
            ));
        }

        let invoice = if validation.is_valid {
            invoice.with_status(InvoiceStatus::Validated)
        } else {
            invoice
        };
        Ok((invoice, Some(validation)))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::acquisition::{AcquiredText, Attempt, Provenance, SourceDocument, TextStrategy};
    use crate::error::{GuardrailViolation, InvoxError};

    struct FixedText(&'static str);

    impl TextStrategy for FixedText {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn applies_to(&self, _kind: DocumentKind) -> bool {
            true
        }

        fn attempt(&self, _document: &SourceDocument) -> std::result::Result<Attempt, AcquisitionError> {
            Ok(Attempt::Sufficient(AcquiredText::new(self.0, Provenance::Native, 1)))
        }
    }

    struct RejectAll;

    impl Guardrail for RejectAll {
        fn check(&self, path: &Path) -> std::result::Result<(), GuardrailViolation> {
            Err(GuardrailViolation::NotFound(path.to_path_buf()))
        }
    }

    fn pipeline(text: &'static str) -> InvoicePipeline {
        InvoicePipeline::builder(InvoxConfig::default())
            .with_acquirer(TextAcquirer::new(vec![Box::new(FixedText(text))]))
            .build()
            .unwrap()
    }

    fn write_pdf(dir: &Path) -> PathBuf {
        let path = dir.join("invoice.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        path
    }

    #[test]
    fn test_process_with_fixed_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path());
        let text = "Invoice #INV-100\nVendor: Acme Co\nInvoice Date: 2024-01-15\nDue Date: 2024-02-14\nTotal: $1,000.00";

        let outcome = pipeline(text).process(&path, &ProcessOptions::default());
        assert!(outcome.success, "{:?}", outcome.error);
        let invoice = outcome.invoice.unwrap();
        assert_eq!(invoice.invoice_number, "INV-100");
        assert_eq!(invoice.status, InvoiceStatus::Validated);
        assert!(outcome.validation.unwrap().is_valid);
        assert_eq!(outcome.metadata["provenance"], json!("native"));
        assert_eq!(outcome.metadata["document_kind"], json!("pdf"));
    }

    #[test]
    fn test_no_validation_requested() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path());
        let outcome = pipeline("").process(&path, &ProcessOptions::without_validation());

        assert!(outcome.success);
        assert!(outcome.validation.is_none());
        assert_eq!(outcome.invoice.unwrap().confidence_score, 0.0);
    }

    #[test]
    fn test_guardrail_failure_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path());
        let pipeline = InvoicePipeline::builder(InvoxConfig::default())
            .with_acquirer(TextAcquirer::new(vec![Box::new(FixedText("Total: 5.00"))]))
            .with_guardrail(Box::new(RejectAll))
            .build()
            .unwrap();

        let outcome = pipeline.process(&path, &ProcessOptions::default());
        assert!(!outcome.success);
        assert_eq!(outcome.failure, Some(FailureKind::GuardrailViolation));
        assert!(!outcome.metadata.contains_key("provenance"));
    }

    #[test]
    fn test_missing_po_adds_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path());
        let options = ProcessOptions::default().with_po_number("PO-404");
        let outcome = pipeline("Vendor: Acme Co\nInvoice #A-1\nTotal: 10.00").process(&path, &options);

        assert_eq!(outcome.invoice.unwrap().po_number.as_deref(), Some("PO-404"));
        let validation = outcome.validation.unwrap();
        assert!(validation.warnings.iter().any(|w| w.contains("PO-404 not found")));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = InvoxConfig::default();
        config.batch.workers = 0;
        assert!(matches!(
            InvoicePipeline::builder(config).build(),
            Err(InvoxError::Config(_))
        ));
    }
}
