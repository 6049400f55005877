//! Business-rule validation of extracted invoices.
//!
//! Findings are data: every rule violation lands in the returned
//! [`ValidationResult`] as an error or a warning. Only a record that breaks
//! its own structural invariants is rejected with [`MalformedInput`].

mod po;

pub use po::{InMemoryPoProvider, NoPurchaseOrders, PoProvider, PurchaseOrder};

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::MalformedInput;
use crate::models::config::ValidationConfig;
use crate::models::invoice::InvoiceRecord;
use crate::models::validation::ValidationResult;

/// Extension point for duplicate invoice detection.
pub trait DuplicateDetector: Send + Sync {
    fn is_duplicate(&self, invoice: &InvoiceRecord) -> bool;
}

/// Detector that never reports duplicates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDuplicateCheck;

impl DuplicateDetector for NoDuplicateCheck {
    fn is_duplicate(&self, _invoice: &InvoiceRecord) -> bool {
        false
    }
}

/// Validates invoice records against configured business rules.
pub struct InvoiceValidator {
    config: ValidationConfig,
    duplicates: Box<dyn DuplicateDetector>,
}

fn normalize_vendor(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl InvoiceValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            duplicates: Box::new(NoDuplicateCheck),
        }
    }

    pub fn with_duplicate_detector(mut self, detector: Box<dyn DuplicateDetector>) -> Self {
        self.duplicates = detector;
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate `invoice`, cross-checking it against `po` when supplied.
    pub fn validate(
        &self,
        invoice: &InvoiceRecord,
        po: Option<&PurchaseOrder>,
    ) -> Result<ValidationResult, MalformedInput> {
        invoice.check_invariants()?;

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut fields = BTreeSet::new();
        let mut confidence = invoice.confidence_score;

        // Completeness
        fields.insert("vendor_name".to_string());
        if invoice.vendor_name.trim().is_empty() {
            errors.push("Missing vendor name".to_string());
        }
        fields.insert("invoice_number".to_string());
        if invoice.invoice_number.trim().is_empty() {
            errors.push("Missing invoice number".to_string());
        }
        fields.insert("total_amount".to_string());
        if invoice.total_amount <= Decimal::ZERO {
            errors.push("Missing or zero total amount".to_string());
        }

        // Date ordering
        fields.insert("dates".to_string());
        match (invoice.invoice_date, invoice.due_date) {
            (Some(issued), Some(due)) if due < issued => {
                errors.push(format!("Due date {} is before invoice date {}", due, issued));
            }
            (_, None) => warnings.push("Missing due date".to_string()),
            _ => {}
        }
        if invoice.invoice_date.is_none() {
            warnings.push("Missing invoice date".to_string());
        }

        // Arithmetic; a fallback item only restates the total
        if !invoice.has_fallback_line_item() {
            fields.insert("line_items".to_string());
            let subtotal = invoice.line_items_subtotal();
            let difference = subtotal
                .and_then(|subtotal| subtotal.checked_add(invoice.tax_amount))
                .and_then(|expected| invoice.total_amount.checked_sub(expected))
                .map(|difference| difference.abs());
            match (subtotal, difference) {
                (Some(subtotal), Some(difference)) if difference > self.config.arithmetic_tolerance => {
                    let message = format!(
                        "Line items ({}) plus tax ({}) do not match total ({}): difference {}",
                        subtotal, invoice.tax_amount, invoice.total_amount, difference
                    );
                    match self.config.arithmetic_error_tolerance {
                        Some(limit) if difference > limit => errors.push(message),
                        _ => warnings.push(message),
                    }
                }
                (_, None) => errors.push(format!(
                    "Line items plus tax overflow the supported amount range (total {})",
                    invoice.total_amount
                )),
                _ => {}
            }
        }

        if let Some(max) = self.config.max_amount {
            fields.insert("max_amount".to_string());
            if invoice.total_amount > max {
                errors.push(format!(
                    "Total amount {} exceeds maximum {}",
                    invoice.total_amount, max
                ));
            }
        }

        fields.insert("confidence_score".to_string());
        if invoice.confidence_score < self.config.confidence_threshold {
            warnings.push(format!(
                "Extraction confidence {:.2} is below threshold {:.2}",
                invoice.confidence_score, self.config.confidence_threshold
            ));
        }

        let has_po_number = invoice
            .po_number
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty());
        if self.config.require_po {
            fields.insert("po_number".to_string());
            if !has_po_number {
                errors.push("Purchase order number is required".to_string());
            }
        }

        if let Some(po) = po {
            let mut po_failed = false;

            fields.insert("po_amount".to_string());
            let limit = po
                .amount
                .checked_add(self.config.po_amount_tolerance)
                .unwrap_or(Decimal::MAX);
            if invoice.total_amount > limit {
                errors.push(format!(
                    "Invoice total {} exceeds PO amount {} for {}",
                    invoice.total_amount, po.amount, po.po_number
                ));
                po_failed = true;
            }

            if !po.vendor.trim().is_empty() {
                fields.insert("po_vendor".to_string());
                if normalize_vendor(&invoice.vendor_name) != normalize_vendor(&po.vendor) {
                    errors.push(format!(
                        "Vendor '{}' does not match PO vendor '{}'",
                        invoice.vendor_name, po.vendor
                    ));
                    po_failed = true;
                }
            }

            if po_failed {
                confidence *= 0.5;
            }
        }

        fields.insert("duplicate".to_string());
        if self.duplicates.is_duplicate(invoice) {
            errors.push(format!("Possible duplicate of invoice {}", invoice.invoice_number));
        }

        let result = ValidationResult::new(errors, warnings, confidence, fields);
        debug!(
            "Validated invoice '{}': valid={}, {} errors, {} warnings",
            invoice.invoice_number,
            result.is_valid,
            result.errors.len(),
            result.warnings.len()
        );
        Ok(result)
    }
}

impl Default for InvoiceValidator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::invoice::{InvoiceStatus, LineItem, LineItemOrigin};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn record() -> InvoiceRecord {
        InvoiceRecord {
            id: "acme-000000000000".to_string(),
            vendor_name: "Acme Co".to_string(),
            vendor_id: None,
            invoice_number: "INV-100".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            due_date: NaiveDate::from_ymd_opt(2024, 2, 14),
            total_amount: dec("1000.00"),
            tax_amount: Decimal::ZERO,
            currency: "USD".to_string(),
            line_items: vec![LineItem::fallback(dec("1000.00"))],
            line_item_origin: LineItemOrigin::Fallback,
            status: InvoiceStatus::Extracted,
            confidence_score: 0.9,
            po_number: None,
        }
    }

    #[test]
    fn test_valid_invoice() {
        let result = InvoiceValidator::default().validate(&record(), None).unwrap();
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert_eq!(result.confidence, 0.9);
        assert!(result.validated_fields.contains("dates"));
        assert!(!result.validated_fields.contains("line_items"));
    }

    #[test]
    fn test_due_before_invoice_date() {
        let mut invoice = record();
        invoice.due_date = NaiveDate::from_ymd_opt(2024, 1, 10);
        let result = InvoiceValidator::default().validate(&invoice, None).unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["Due date 2024-01-10 is before invoice date 2024-01-15"]);
    }

    #[test]
    fn test_missing_due_date_is_warning() {
        let mut invoice = record();
        invoice.due_date = None;
        let result = InvoiceValidator::default().validate(&invoice, None).unwrap();
        assert!(result.is_valid);
        assert!(result.warnings.contains(&"Missing due date".to_string()));
    }

    #[test]
    fn test_completeness_errors() {
        let mut invoice = record();
        invoice.vendor_name = String::new();
        invoice.total_amount = Decimal::ZERO;
        invoice.line_items = vec![LineItem::fallback(Decimal::ZERO)];
        let result = InvoiceValidator::default().validate(&invoice, None).unwrap();
        assert!(!result.is_valid);
        assert_eq!(
            result.errors,
            vec!["Missing vendor name", "Missing or zero total amount"]
        );
    }

    #[test]
    fn test_po_amount_exceeded() {
        let po = PurchaseOrder::new("PO-1", dec("900.00"), "Acme Co");
        let result = InvoiceValidator::default().validate(&record(), Some(&po)).unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("exceeds PO amount"));
        assert_eq!(result.confidence, 0.45);
    }

    #[test]
    fn test_po_tolerance_and_vendor() {
        let config = ValidationConfig {
            po_amount_tolerance: dec("100.00"),
            ..ValidationConfig::default()
        };
        let validator = InvoiceValidator::new(config);

        let po = PurchaseOrder::new("PO-1", dec("900.00"), "ACME CO.");
        let result = validator.validate(&record(), Some(&po)).unwrap();
        assert!(result.is_valid, "{:?}", result.errors);

        let po = PurchaseOrder::new("PO-1", dec("900.00"), "Globex");
        let result = validator.validate(&record(), Some(&po)).unwrap();
        assert!(!result.is_valid);
        assert!(result.errors[0].contains("does not match PO vendor"));
    }

    #[test]
    fn test_arithmetic_mismatch_is_warning_by_default() {
        let mut invoice = record();
        invoice.line_items = vec![LineItem::new("Widgets", dec("2"), dec("400.00"), dec("800.00"))];
        invoice.line_item_origin = LineItemOrigin::Parsed;
        invoice.tax_amount = dec("100.00");

        let result = InvoiceValidator::default().validate(&invoice, None).unwrap();
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("difference 100.00"));
    }

    #[test]
    fn test_arithmetic_mismatch_escalates_beyond_error_tolerance() {
        let mut invoice = record();
        invoice.line_items = vec![LineItem::new("Widgets", dec("2"), dec("400.00"), dec("800.00"))];
        invoice.line_item_origin = LineItemOrigin::Parsed;

        let config = ValidationConfig {
            arithmetic_error_tolerance: Some(dec("50")),
            ..ValidationConfig::default()
        };
        let result = InvoiceValidator::new(config).validate(&invoice, None).unwrap();
        assert!(!result.is_valid);
        assert!(result.validated_fields.contains("line_items"));
    }

    #[test]
    fn test_matching_line_items_pass() {
        let mut invoice = record();
        invoice.line_items = vec![
            LineItem::new("Widgets", dec("2"), dec("400.00"), dec("800.00")),
            LineItem::new("Support", dec("1"), dec("120.00"), dec("120.00")),
        ];
        invoice.line_item_origin = LineItemOrigin::Parsed;
        invoice.tax_amount = dec("80.005");

        let result = InvoiceValidator::default().validate(&invoice, None).unwrap();
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn test_low_confidence_warns_only() {
        let mut invoice = record();
        invoice.confidence_score = 0.36;
        let result = InvoiceValidator::default().validate(&invoice, None).unwrap();
        assert!(result.is_valid);
        assert_eq!(
            result.warnings,
            vec!["Extraction confidence 0.36 is below threshold 0.70"]
        );
    }

    #[test]
    fn test_max_amount_and_required_po() {
        let mut invoice = record();
        invoice.total_amount = dec("250000.00");
        invoice.line_items = vec![LineItem::fallback(invoice.total_amount)];
        let config = ValidationConfig {
            require_po: true,
            ..ValidationConfig::default()
        };
        let result = InvoiceValidator::new(config).validate(&invoice, None).unwrap();
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("exceeds maximum")));
        assert!(result.errors.contains(&"Purchase order number is required".to_string()));
    }

    #[test]
    fn test_duplicate_detector() {
        struct AlwaysDuplicate;
        impl DuplicateDetector for AlwaysDuplicate {
            fn is_duplicate(&self, _invoice: &InvoiceRecord) -> bool {
                true
            }
        }

        let validator = InvoiceValidator::default().with_duplicate_detector(Box::new(AlwaysDuplicate));
        let result = validator.validate(&record(), None).unwrap();
        assert!(!result.is_valid);
    }

    #[test]
    fn test_overflowing_line_items_are_reported() {
        let mut invoice = record();
        invoice.line_items = vec![
            LineItem::new("Widget", Decimal::ONE, Decimal::MAX, Decimal::MAX),
            LineItem::new("Gadget", Decimal::ONE, Decimal::MAX, Decimal::MAX),
        ];
        invoice.line_item_origin = LineItemOrigin::Parsed;

        let result = InvoiceValidator::default().validate(&invoice, None).unwrap();
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("overflow the supported amount range")));
    }

    #[test]
    fn test_po_limit_saturates() {
        let config = ValidationConfig {
            po_amount_tolerance: dec("1.00"),
            ..ValidationConfig::default()
        };
        let po = PurchaseOrder::new("PO-1", Decimal::MAX, "Acme Co");
        let result = InvoiceValidator::new(config).validate(&record(), Some(&po)).unwrap();
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_malformed_record() {
        let mut invoice = record();
        invoice.line_items.clear();
        assert!(InvoiceValidator::default().validate(&invoice, None).is_err());
    }
}
