//! Rule-based field extractors for invoice text.

pub mod amounts;
pub mod dates;
pub mod invoice_number;
pub mod line_items;
pub mod patterns;
pub mod vendor;

pub use amounts::{AmountExtractor, InvoiceAmounts, detect_currency, extract_amounts, parse_amount};
pub use dates::{DateExtractor, InvoiceDates, extract_dates};
pub use invoice_number::{extract_invoice_number, invoice_number_candidates};
pub use line_items::extract_line_items;
pub use vendor::{VendorHeuristic, identify_vendor};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// Extraction context with confidence scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Byte span in the searched text.
    pub position: Option<(usize, usize)>,
    /// Zero-based line the match came from.
    pub line: Option<usize>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            line: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

/// Zero-based line index of a byte offset.
pub(crate) fn line_of(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset.min(text.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
}

/// The first non-blank line after `index`, if any.
pub(crate) fn next_non_empty<'a>(lines: &[&'a str], index: usize) -> Option<(usize, &'a str)> {
    lines
        .iter()
        .enumerate()
        .skip(index + 1)
        .map(|(i, l)| (i, l.trim()))
        .find(|(_, l)| !l.is_empty())
}
