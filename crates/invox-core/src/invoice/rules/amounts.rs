//! Amount extraction.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

use super::patterns::{
    AMOUNT_TOKEN, CURRENCY_CODE, DATE_NUMERIC, DATE_YMD, PERCENTAGE, SUBTOTAL_LABEL, TAX_LABEL,
    TOTAL_LABEL,
};
use super::{ExtractionMatch, FieldExtractor, next_non_empty};

lazy_static! {
    static ref TAX_IDENTIFIER: Regex = Regex::new(
        r"(?i)\b(?:tax|vat|gst)[ \t]*(?:id|no|number|reg(?:istration)?)\b"
    ).unwrap();
}

/// Amount field extractor.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let cleaned = strip_non_amounts(text);
        AMOUNT_TOKEN
            .find_iter(&cleaned)
            .filter_map(|m| {
                let token = m.as_str().trim_end_matches(['.', ',']);
                parse_amount(token).map(|amount| {
                    ExtractionMatch::new(amount, 0.8, token).with_position(m.start(), m.end())
                })
            })
            .collect()
    }
}

/// Labeled amounts found on an invoice.
#[derive(Debug, Clone, Default)]
pub struct InvoiceAmounts {
    /// Amount payable.
    pub total: Option<ExtractionMatch<Decimal>>,
    /// Amount before tax.
    pub subtotal: Option<ExtractionMatch<Decimal>>,
    /// Tax amount, read or inferred.
    pub tax: Option<ExtractionMatch<Decimal>>,
    /// Whether `tax` was computed as total minus subtotal.
    pub tax_inferred: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AmountLabel {
    /// Lower rank wins when several total labels appear.
    Total(u8),
    Subtotal,
    Tax,
}

fn total_rank(label: &str) -> u8 {
    let normalized = label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    match normalized.as_str() {
        "amount due" => 0,
        "balance due" => 1,
        "total due" => 2,
        "grand total" => 3,
        "invoice total" => 4,
        "total amount" => 5,
        "amount payable" => 6,
        _ => 7,
    }
}

/// Classify a line by its amount label, returning the byte offset where the
/// label ends.
fn classify(line: &str) -> Option<(AmountLabel, usize)> {
    if let Some(m) = SUBTOTAL_LABEL.find(line) {
        return Some((AmountLabel::Subtotal, m.end()));
    }

    let total = TOTAL_LABEL.find(line);
    let tax = TAX_LABEL.find(line).filter(|_| !TAX_IDENTIFIER.is_match(line));

    match (total, tax) {
        // "Total Tax", "Total VAT"
        (Some(t), Some(x)) if x.start() >= t.end() && line[t.end()..x.start()].trim().is_empty() => {
            Some((AmountLabel::Tax, x.end()))
        }
        (Some(t), _) => Some((AmountLabel::Total(total_rank(t.as_str())), t.end())),
        (None, Some(x)) => Some((AmountLabel::Tax, x.end())),
        (None, None) => None,
    }
}

/// Blank out percentages and dates so their digits are not read as money.
fn strip_non_amounts(text: &str) -> String {
    let text = PERCENTAGE.replace_all(text, " ");
    let text = DATE_YMD.replace_all(&text, " ");
    DATE_NUMERIC.replace_all(&text, " ").into_owned()
}

fn last_amount(text: &str) -> Option<Decimal> {
    let cleaned = strip_non_amounts(text);
    AMOUNT_TOKEN
        .find_iter(&cleaned)
        .filter_map(|m| parse_amount(m.as_str().trim_end_matches(['.', ','])))
        .last()
}

/// Amount following the label on `lines[index]`, or on the next line when the
/// label stands alone.
fn labeled_amount(lines: &[&str], index: usize, label_end: usize) -> Option<(Decimal, String)> {
    let line = lines[index];
    let rest = &line[label_end..];
    if let Some(amount) = last_amount(rest) {
        return Some((amount, line.trim().to_string()));
    }

    let label_only = !rest.chars().any(|c| c.is_alphanumeric());
    if !label_only {
        return None;
    }

    let (_, next) = next_non_empty(lines, index)?;
    let without_codes = CURRENCY_CODE.replace_all(next, "");
    if without_codes.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    last_amount(next).map(|amount| (amount, format!("{} {}", line.trim(), next)))
}

/// Extract total, subtotal and tax from invoice text.
pub fn extract_amounts(text: &str) -> InvoiceAmounts {
    let mut result = InvoiceAmounts::default();
    let mut best_total_rank = u8::MAX;
    let lines: Vec<&str> = text.lines().collect();

    for (index, line) in lines.iter().enumerate() {
        let Some((label, label_end)) = classify(line) else {
            continue;
        };
        let Some((amount, source)) = labeled_amount(&lines, index, label_end) else {
            continue;
        };
        let found = ExtractionMatch::new(amount, 0.95, source).with_line(index);

        match label {
            // Ties go to the later line: closing totals sit below the table.
            AmountLabel::Total(rank) if rank <= best_total_rank => {
                best_total_rank = rank;
                result.total = Some(found);
            }
            AmountLabel::Total(_) => {}
            AmountLabel::Subtotal => {
                if result.subtotal.is_none() {
                    result.subtotal = Some(found);
                }
            }
            AmountLabel::Tax => {
                if result.tax.is_none() {
                    result.tax = Some(found);
                }
            }
        }
    }

    if result.tax.is_none() {
        if let (Some(total), Some(subtotal)) = (&result.total, &result.subtotal) {
            let tax = total.value - subtotal.value;
            if tax >= Decimal::ZERO {
                result.tax = Some(ExtractionMatch::new(tax, 0.8, "calculated"));
                result.tax_inferred = true;
            }
        }
    }

    result
}

/// Parse an amount written with optional thousands separators and currency
/// symbols (e.g. "$1,234.56", "1.234,56", "1234.5").
///
/// When both `,` and `.` appear the last one is the decimal separator. A lone
/// comma followed by one or two digits is decimal, otherwise a thousands
/// separator. A lone dot is decimal; repeated dots are thousands separators.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(c), None) => {
            let decimals = cleaned.len() - c - 1;
            if cleaned.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (None, Some(_)) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    Decimal::from_str(normalized.trim_matches('.')).ok()
}

/// Detect the invoice currency from ISO codes or currency symbols.
pub fn detect_currency(text: &str, default: &str) -> String {
    if let Some(caps) = CURRENCY_CODE.captures(text) {
        return caps[1].to_string();
    }
    if text.contains('€') {
        "EUR".to_string()
    } else if text.contains('£') {
        "GBP".to_string()
    } else if text.contains('¥') {
        "JPY".to_string()
    } else {
        default.to_string()
    }
}
