//! Core library for offline invoice processing.
//!
//! This crate provides:
//! - Text acquisition from PDFs and images (native text layer first, OCR fallback)
//! - Rule-based invoice field extraction with a signal-count confidence score
//! - Business-rule validation with optional purchase order cross-checks
//! - A pipeline orchestrator and a parallel batch driver
//!
//! The library logs through `tracing` but never installs a subscriber.

pub mod acquisition;
pub mod error;
pub mod guardrail;
pub mod invoice;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod validation;

pub use acquisition::{AcquiredText, DocumentKind, Provenance, TextAcquirer};
pub use error::{InvoxError, Result};
pub use guardrail::{FileGuardrail, Guardrail};
pub use invoice::{ExtractionResult, InvoiceExtractor, RuleInvoiceParser};
pub use models::{
    FailureKind, InvoiceRecord, InvoiceStatus, InvoxConfig, LineItem, LineItemOrigin,
    PipelineStage, ProcessingOutcome, ValidationResult,
};
pub use ocr::{OcrResult, TextBox, TextRecognizer};
pub use pipeline::{CancellationToken, InvoicePipeline, ProcessOptions};
pub use validation::{InMemoryPoProvider, InvoiceValidator, PoProvider, PurchaseOrder};
