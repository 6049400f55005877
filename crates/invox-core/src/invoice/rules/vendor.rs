//! Vendor identification.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::patterns::{
    CONTACT_TOKEN, DATE_DAY_FIRST_NAME, DATE_MONTH_NAME_FIRST, DATE_NUMERIC, DATE_YMD,
    DOCUMENT_TITLE, INVOICE_NUMBER_LABELED, NON_VENDOR_PREFIX, VENDOR_LABEL,
};
use super::{ExtractionMatch, next_non_empty};

lazy_static! {
    static ref MONEY: Regex = Regex::new(r"[$€£¥]|\d[.,]\d{2}\b").unwrap();
}

/// Which heuristic resolved the vendor name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorHeuristic {
    /// An explicit "Vendor:" / "From:" style label.
    Label,
    /// The closest plausible line above the invoice number.
    PrecedingInvoiceMarker,
    /// The first plausible line of the document.
    FirstLine,
}

impl VendorHeuristic {
    pub fn as_str(&self) -> &'static str {
        match self {
            VendorHeuristic::Label => "label",
            VendorHeuristic::PrecedingInvoiceMarker => "preceding_invoice_marker",
            VendorHeuristic::FirstLine => "first_line",
        }
    }
}

fn letter_count(line: &str) -> usize {
    line.chars().filter(|c| c.is_alphabetic()).count()
}

/// Whether a line could be a company name on its own.
fn is_name_line(line: &str) -> bool {
    let line = line.trim();
    let length = line.chars().count();
    if !(2..=80).contains(&length) || letter_count(line) < 2 || line.contains(':') {
        return false;
    }

    let rejected = [
        &*DOCUMENT_TITLE,
        &*NON_VENDOR_PREFIX,
        &*CONTACT_TOKEN,
        &*INVOICE_NUMBER_LABELED,
        &*MONEY,
        &*DATE_YMD,
        &*DATE_NUMERIC,
        &*DATE_MONTH_NAME_FIRST,
        &*DATE_DAY_FIRST_NAME,
    ];
    if rejected.iter().any(|pattern| pattern.is_match(line)) {
        return false;
    }

    let visible = line.chars().filter(|c| !c.is_whitespace()).count();
    letter_count(line) * 2 >= visible
}

fn from_label(lines: &[&str]) -> Option<ExtractionMatch<String>> {
    for (index, line) in lines.iter().enumerate() {
        let Some(caps) = VENDOR_LABEL.captures(line) else {
            continue;
        };
        let value = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        if letter_count(value) >= 2 {
            return Some(ExtractionMatch::new(value.to_string(), 0.95, line.trim()).with_line(index));
        }
        if value.is_empty() {
            if let Some((next_index, next)) = next_non_empty(lines, index) {
                if letter_count(next) >= 2 {
                    return Some(ExtractionMatch::new(next.to_string(), 0.9, next).with_line(next_index));
                }
            }
        }
    }
    None
}

/// Identify the vendor name.
///
/// Heuristics run in order and the first match wins: an explicit vendor
/// label, then the nearest name-like line above the invoice number marker on
/// `marker_line`, then the first name-like line of the document.
pub fn identify_vendor(
    text: &str,
    marker_line: Option<usize>,
) -> Option<(ExtractionMatch<String>, VendorHeuristic)> {
    let lines: Vec<&str> = text.lines().collect();

    if let Some(found) = from_label(&lines) {
        return Some((found, VendorHeuristic::Label));
    }

    if let Some(marker) = marker_line {
        let preceding = lines
            .iter()
            .enumerate()
            .take(marker)
            .rev()
            .find(|(_, line)| is_name_line(line));
        if let Some((index, line)) = preceding {
            let found = ExtractionMatch::new(line.trim().to_string(), 0.8, line.trim()).with_line(index);
            return Some((found, VendorHeuristic::PrecedingInvoiceMarker));
        }
    }

    lines
        .iter()
        .enumerate()
        .find(|(_, line)| is_name_line(line))
        .map(|(index, line)| {
            let found = ExtractionMatch::new(line.trim().to_string(), 0.6, line.trim()).with_line(index);
            (found, VendorHeuristic::FirstLine)
        })
}
