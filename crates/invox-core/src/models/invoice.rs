//! Invoice data models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::MalformedInput;

/// Description used for the synthetic line item of an invoice without a parseable table.
pub const FALLBACK_DESCRIPTION: &str = "Invoice total (no itemized lines found)";

/// A structured invoice extracted from a single document.
///
/// Created once by an extractor and never mutated by validation; the
/// validator reports its findings in a separate [`ValidationResult`].
///
/// [`ValidationResult`]: crate::models::validation::ValidationResult
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// Record identifier derived from the source name and text hash.
    pub id: String,

    /// Vendor/supplier name (empty when unresolved).
    pub vendor_name: String,

    /// Vendor identifier resolved by an external system.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,

    /// Invoice number as printed by the vendor.
    pub invoice_number: String,

    /// Date the invoice was issued.
    pub invoice_date: Option<NaiveDate>,

    /// Payment due date.
    pub due_date: Option<NaiveDate>,

    /// Total amount payable.
    pub total_amount: Decimal,

    /// Tax portion of the total.
    pub tax_amount: Decimal,

    /// ISO 4217 currency code.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Line items. Never empty.
    pub line_items: Vec<LineItem>,

    /// Whether `line_items` came from the document or were synthesized.
    pub line_item_origin: LineItemOrigin,

    /// Processing status.
    pub status: InvoiceStatus,

    /// Extraction confidence in [0, 1].
    pub confidence_score: f64,

    /// Purchase order number supplied by the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub po_number: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Processing status of an invoice record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Received,
    Extracted,
    Validated,
    Failed,
}

/// Where the line items of a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemOrigin {
    /// Parsed from an itemized table in the document.
    Parsed,
    /// A single synthetic item standing in for the whole invoice.
    Fallback,
}

/// A single invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Item description.
    pub description: String,

    /// Quantity (strictly positive).
    pub quantity: Decimal,

    /// Price per unit.
    pub unit_price: Decimal,

    /// Line amount as printed; not forced to quantity × unit price.
    pub amount: Decimal,

    /// Accounting code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_code: Option<String>,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal, amount: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            amount,
            account_code: None,
        }
    }

    /// The synthetic single line summarizing an invoice total.
    pub fn fallback(total: Decimal) -> Self {
        Self::new(FALLBACK_DESCRIPTION, Decimal::ONE, total, total)
    }

    /// Quantity × unit price, or `None` when the product overflows.
    pub fn expected_amount(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.unit_price)
    }
}

impl InvoiceRecord {
    /// The record with its purchase order reference set.
    pub fn with_po_number(self, po_number: Option<String>) -> Self {
        Self { po_number, ..self }
    }

    /// The record moved to `status`.
    pub fn with_status(self, status: InvoiceStatus) -> Self {
        Self { status, ..self }
    }

    /// Sum of all line amounts, or `None` when the sum overflows.
    pub fn line_items_subtotal(&self) -> Option<Decimal> {
        self.line_items
            .iter()
            .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.amount))
    }

    /// Whether the line items were synthesized rather than parsed.
    pub fn has_fallback_line_item(&self) -> bool {
        self.line_item_origin == LineItemOrigin::Fallback
    }

    /// Check the structural invariants every record must satisfy.
    pub fn check_invariants(&self) -> Result<(), MalformedInput> {
        if self.total_amount < Decimal::ZERO {
            return Err(MalformedInput::record("total_amount", "must not be negative"));
        }
        if self.tax_amount < Decimal::ZERO {
            return Err(MalformedInput::record("tax_amount", "must not be negative"));
        }
        if !self.confidence_score.is_finite() || !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(MalformedInput::record(
                "confidence_score",
                format!("{} is outside [0, 1]", self.confidence_score),
            ));
        }
        if self.line_items.is_empty() {
            return Err(MalformedInput::record("line_items", "must contain at least one item"));
        }
        if let Some(item) = self.line_items.iter().find(|item| item.quantity <= Decimal::ZERO) {
            return Err(MalformedInput::record(
                "line_items",
                format!("quantity {} of '{}' is not positive", item.quantity, item.description),
            ));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(MalformedInput::record(
                "currency",
                format!("'{}' is not a 3-letter code", self.currency),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn record() -> InvoiceRecord {
        InvoiceRecord {
            id: "INV-2024-001".to_string(),
            vendor_name: "Acme Corp".to_string(),
            vendor_id: Some("V-12345".to_string()),
            invoice_number: "INV-9876".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            due_date: NaiveDate::from_ymd_opt(2024, 2, 15),
            total_amount: Decimal::from_str("275.00").unwrap(),
            tax_amount: Decimal::from_str("20.00").unwrap(),
            currency: "USD".to_string(),
            line_items: vec![LineItem::new(
                "Widget A",
                Decimal::from(10),
                Decimal::from_str("25.50").unwrap(),
                Decimal::from_str("255.00").unwrap(),
            )],
            line_item_origin: LineItemOrigin::Parsed,
            status: InvoiceStatus::Extracted,
            confidence_score: 0.95,
            po_number: None,
        }
    }

    #[test]
    fn test_valid_record_passes_invariants() {
        assert!(record().check_invariants().is_ok());
        assert_eq!(record().line_items_subtotal(), Some(Decimal::from_str("255.00").unwrap()));
    }

    #[test]
    fn test_negative_total_is_malformed() {
        let mut invoice = record();
        invoice.total_amount = Decimal::from(-5);
        assert!(matches!(
            invoice.check_invariants(),
            Err(MalformedInput::InvalidRecord { field, .. }) if field == "total_amount"
        ));
    }

    #[test]
    fn test_empty_line_items_is_malformed() {
        let mut invoice = record();
        invoice.line_items.clear();
        assert!(invoice.check_invariants().is_err());
    }

    #[test]
    fn test_zero_quantity_is_malformed() {
        let mut invoice = record();
        invoice.line_items[0].quantity = Decimal::ZERO;
        assert!(invoice.check_invariants().is_err());
    }

    #[test]
    fn test_builders_keep_other_fields() {
        let invoice = record()
            .with_po_number(Some("PO-9".to_string()))
            .with_status(InvoiceStatus::Validated);
        assert_eq!(invoice.po_number.as_deref(), Some("PO-9"));
        assert_eq!(invoice.status, InvoiceStatus::Validated);
        assert_eq!(invoice.invoice_number, record().invoice_number);
        assert_eq!(invoice.line_items, record().line_items);
    }

    #[test]
    fn test_fallback_line_item() {
        let item = LineItem::fallback(Decimal::from(1000));
        assert_eq!(item.quantity, Decimal::ONE);
        assert_eq!(item.amount, Decimal::from(1000));
        assert_eq!(item.expected_amount(), Some(item.amount));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&InvoiceStatus::Validated).unwrap();
        assert_eq!(json, "\"validated\"");
    }
}
