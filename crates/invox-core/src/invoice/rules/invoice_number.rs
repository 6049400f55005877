//! Invoice number extraction.

use regex::Regex;

use super::ExtractionMatch;
use super::patterns::{INVOICE_NUMBER_COLON, INVOICE_NUMBER_LABELED, INVOICE_NUMBER_STANDALONE};

const MAX_NUMBER_LEN: usize = 40;

fn clean_token(token: &str) -> Option<String> {
    let token = token.trim_end_matches(['.', '-', '/', '_']);
    let valid = !token.is_empty()
        && token.len() <= MAX_NUMBER_LEN
        && token.chars().any(|c| c.is_ascii_digit());
    valid.then(|| token.to_string())
}

fn collect(
    lines: &[&str],
    patterns: &[(&Regex, f32)],
    out: &mut Vec<ExtractionMatch<String>>,
) {
    for (index, line) in lines.iter().enumerate() {
        for (pattern, confidence) in patterns {
            for caps in pattern.captures_iter(line) {
                let Some(token) = caps.get(1).and_then(|m| clean_token(m.as_str())) else {
                    continue;
                };
                if out.iter().any(|c| c.value == token) {
                    continue;
                }
                out.push(ExtractionMatch::new(token, *confidence, line.trim()).with_line(index));
            }
        }
    }
}

/// All invoice number candidates, in document order.
///
/// Label-adjacent tokens ("Invoice #", "Inv No", "Invoice Number") are
/// preferred; bare `INV-…` tokens are only considered when no label matched.
/// A candidate must contain at least one digit.
pub fn invoice_number_candidates(text: &str) -> Vec<ExtractionMatch<String>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut candidates = Vec::new();

    collect(
        &lines,
        &[(&*INVOICE_NUMBER_LABELED, 0.95), (&*INVOICE_NUMBER_COLON, 0.9)],
        &mut candidates,
    );
    if candidates.is_empty() {
        collect(&lines, &[(&*INVOICE_NUMBER_STANDALONE, 0.7)], &mut candidates);
    }

    candidates.sort_by_key(|c| c.line);
    candidates
}

/// Extract the invoice number.
///
/// With several candidates, the one closest to `vendor_line` wins; without a
/// vendor position the first candidate in the document is used.
pub fn extract_invoice_number(
    text: &str,
    vendor_line: Option<usize>,
) -> Option<ExtractionMatch<String>> {
    let candidates = invoice_number_candidates(text);

    match vendor_line {
        Some(vendor) => candidates
            .into_iter()
            .min_by_key(|c| (c.line.unwrap_or(0).abs_diff(vendor), c.line)),
        None => candidates.into_iter().next(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_variants() {
        let cases = [
            ("Invoice #INV-100", "INV-100"),
            ("Invoice Number: 12345", "12345"),
            ("INV NO. A-77", "A-77"),
            ("Invoice No: 2024/001.", "2024/001"),
            ("Invoice: 98765", "98765"),
        ];
        for (text, expected) in cases {
            let found = extract_invoice_number(text, None).unwrap();
            assert_eq!(found.value, expected, "text: {}", text);
        }
    }

    #[test]
    fn test_token_must_contain_digit() {
        assert!(extract_invoice_number("Invoice Notes: none", None).is_none());
        assert!(extract_invoice_number("Invoice Date: Jan 5", None).is_none());
    }

    #[test]
    fn test_standalone_fallback() {
        let found = extract_invoice_number("Ref INV-2024-0042 attached", None).unwrap();
        assert_eq!(found.value, "INV-2024-0042");
        assert!(found.confidence < 0.9);
    }

    #[test]
    fn test_nearest_vendor_wins() {
        let text = "Invoice # 111\n\n\n\n\nGlobex Inc\nInvoice # 222";
        assert_eq!(extract_invoice_number(text, None).unwrap().value, "111");
        assert_eq!(extract_invoice_number(text, Some(5)).unwrap().value, "222");
    }
}
