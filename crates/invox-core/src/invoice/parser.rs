//! Deterministic rule-based invoice parser.

use std::path::Path;

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::MalformedInput;
use crate::models::config::{ConfidenceWeights, DateOrder, ExtractionConfig};
use crate::models::invoice::{InvoiceRecord, InvoiceStatus, LineItem, LineItemOrigin};

use super::confidence::{Signal, SignalReport};
use super::rules::{
    detect_currency, extract_amounts, extract_dates, extract_invoice_number, extract_line_items,
    identify_vendor, invoice_number_candidates,
};
use super::{ExtractionResult, InvoiceExtractor};

/// Share of control characters above which text is treated as binary.
const MAX_CONTROL_PERCENT: f64 = 10.0;

/// Rule-based invoice parser.
///
/// Missing fields never fail extraction: they become empty or zero values
/// and lower the confidence score.
#[derive(Debug, Clone)]
pub struct RuleInvoiceParser {
    /// Reading of ambiguous numeric dates.
    date_order: DateOrder,
    /// Currency used when the text names none.
    default_currency: String,
    /// Confidence heuristic weights.
    weights: ConfidenceWeights,
}

impl RuleInvoiceParser {
    /// Create a new parser with default settings.
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            date_order: config.date_order,
            default_currency: config.default_currency.clone(),
            weights: config.confidence.clone(),
        }
    }

    /// Set how ambiguous numeric dates are read.
    pub fn with_date_order(mut self, order: DateOrder) -> Self {
        self.date_order = order;
        self
    }

    /// Set the currency used when none is detected.
    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    /// Set confidence heuristic weights.
    pub fn with_confidence_weights(mut self, weights: ConfidenceWeights) -> Self {
        self.weights = weights;
        self
    }
}

impl Default for RuleInvoiceParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject payloads that are binary data rather than text.
fn check_text(text: &str) -> Result<(), MalformedInput> {
    let total = text.chars().count();
    if total == 0 {
        return Ok(());
    }

    let control = text
        .chars()
        .filter(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t' | '\x0c'))
        .count();
    let control_ratio = control as f64 * 100.0 / total as f64;

    if text.contains('\0') || control_ratio > MAX_CONTROL_PERCENT {
        return Err(MalformedInput::BinaryPayload { control_ratio });
    }
    Ok(())
}

/// Deterministic record id: source stem plus a prefix of the text hash.
pub fn record_id(source_name: Option<&str>, text: &str) -> String {
    let stem = source_name
        .and_then(|name| Path::new(name).file_stem())
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("invoice");
    let digest = hex::encode(Sha256::digest(text.as_bytes()));
    format!("{}-{}", stem, &digest[..12])
}

impl InvoiceExtractor for RuleInvoiceParser {
    fn name(&self) -> &str {
        "rules"
    }

    fn extract(&self, text: &str, source_name: Option<&str>) -> Result<ExtractionResult, MalformedInput> {
        check_text(text)?;

        let mut found = Vec::new();
        let mut warnings = Vec::new();

        let marker_line = invoice_number_candidates(text).first().and_then(|c| c.line);
        let vendor = identify_vendor(text, marker_line);
        let vendor_line = vendor.as_ref().and_then(|(m, _)| m.line);
        let vendor_heuristic = vendor.as_ref().map(|(_, h)| *h);
        let vendor_name = vendor.map(|(m, _)| m.value).unwrap_or_default();
        if vendor_name.is_empty() {
            warnings.push("Could not identify vendor".to_string());
        } else {
            found.push(Signal::Vendor);
        }

        let invoice_number = match extract_invoice_number(text, vendor_line) {
            Some(number) => {
                found.push(Signal::InvoiceNumber);
                number.value
            }
            None => {
                warnings.push("Could not extract invoice number".to_string());
                String::new()
            }
        };

        let dates = extract_dates(text, self.date_order);
        let invoice_date = dates.invoice_date.map(|d| d.value);
        let due_date = dates.due_date.map(|d| d.value);
        if invoice_date.is_some() {
            found.push(Signal::InvoiceDate);
        } else {
            warnings.push("Could not extract invoice date".to_string());
        }
        if due_date.is_some() {
            found.push(Signal::DueDate);
        }

        let amounts = extract_amounts(text);
        let total_amount = amounts.total.map(|m| m.value).unwrap_or(Decimal::ZERO);
        let tax_amount = amounts
            .tax
            .map(|m| m.value)
            .filter(|tax| *tax >= Decimal::ZERO)
            .unwrap_or(Decimal::ZERO);
        if total_amount > Decimal::ZERO {
            found.push(Signal::TotalAmount);
        } else {
            warnings.push("Could not extract total amount".to_string());
        }
        if amounts.tax_inferred {
            warnings.push("Tax amount inferred from subtotal".to_string());
        }

        let parsed_items = extract_line_items(text);
        let structured = !parsed_items.is_empty();
        let (line_items, line_item_origin) = if structured {
            (parsed_items, LineItemOrigin::Parsed)
        } else {
            warnings.push("No line item table found, using a single fallback item".to_string());
            (vec![LineItem::fallback(total_amount)], LineItemOrigin::Fallback)
        };

        let signals = SignalReport::new(found, vendor_heuristic, structured, &self.weights);

        let invoice = InvoiceRecord {
            id: record_id(source_name, text),
            vendor_name,
            vendor_id: None,
            invoice_number,
            invoice_date,
            due_date,
            total_amount,
            tax_amount,
            currency: detect_currency(text, &self.default_currency),
            line_items,
            line_item_origin,
            status: InvoiceStatus::Extracted,
            confidence_score: signals.score,
            po_number: None,
        };
        invoice.check_invariants()?;

        debug!(
            "Extracted invoice '{}' with confidence {:.2} ({} of {} signals)",
            invoice.invoice_number,
            invoice.confidence_score,
            signals.found.len(),
            Signal::ALL.len()
        );

        Ok(ExtractionResult {
            invoice,
            signals,
            warnings,
        })
    }
}
