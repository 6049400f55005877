//! Invoice field extraction module.

mod confidence;
mod parser;
pub mod rules;

pub use confidence::{Signal, SignalReport, score_signals};
pub use parser::{RuleInvoiceParser, record_id};

use std::sync::Arc;

use crate::error::MalformedInput;
use crate::models::config::{ExtractionConfig, ExtractionStrategy};
use crate::models::invoice::InvoiceRecord;

/// Result of invoice extraction.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Extracted invoice data.
    pub invoice: InvoiceRecord,
    /// Which signals were resolved.
    pub signals: SignalReport,
    /// Extraction warnings.
    pub warnings: Vec<String>,
}

/// Turns acquired text into an invoice record.
///
/// Implementations fail only on input that is not text at all; missing
/// fields are reported through defaults and a lower confidence score.
pub trait InvoiceExtractor: Send + Sync {
    /// Short name for logs and metadata.
    fn name(&self) -> &str;

    /// Extract an invoice from `text`. `source_name` seeds the record id.
    fn extract(&self, text: &str, source_name: Option<&str>) -> Result<ExtractionResult, MalformedInput>;
}

/// Build the extractor selected by `config.strategy`.
pub fn build_extractor(config: &ExtractionConfig) -> Arc<dyn InvoiceExtractor> {
    match config.strategy {
        ExtractionStrategy::Rules => Arc::new(RuleInvoiceParser::from_config(config)),
    }
}
