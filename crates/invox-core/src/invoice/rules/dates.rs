//! Date extraction.

use chrono::NaiveDate;
use regex::Captures;

use super::patterns::{
    DATE_DAY_FIRST_NAME, DATE_MONTH_NAME_FIRST, DATE_NUMERIC, DATE_YMD, DUE_DATE_LABEL,
    GENERIC_DATE_LABEL, INVOICE_DATE_LABEL,
};
use super::{ExtractionMatch, FieldExtractor, line_of, next_non_empty};
use crate::models::config::DateOrder;

/// Date field extractor.
pub struct DateExtractor {
    order: DateOrder,
}

impl DateExtractor {
    pub fn new() -> Self {
        Self {
            order: DateOrder::default(),
        }
    }

    /// Set how ambiguous numeric dates are read.
    pub fn with_order(mut self, order: DateOrder) -> Self {
        self.order = order;
        self
    }

    fn numeric(&self, caps: &Captures) -> Option<NaiveDate> {
        let first: u32 = caps[1].parse().ok()?;
        let separator = &caps[2];
        let second: u32 = caps[3].parse().ok()?;
        let year = parse_year(&caps[4]);

        let day_first = if separator == "." || first > 12 {
            true
        } else if second > 12 {
            false
        } else {
            self.order == DateOrder::DayFirst
        };

        if day_first {
            NaiveDate::from_ymd_opt(year, second, first)
        } else {
            NaiveDate::from_ymd_opt(year, first, second)
        }
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    /// All dates in `text`, ordered by position.
    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<Self::Output> = Vec::new();
        let mut push = |date: Option<NaiveDate>, caps: &Captures, confidence: f32| {
            let (Some(date), Some(whole)) = (date, caps.get(0)) else {
                return;
            };
            let overlaps = results.iter().any(|r| {
                r.position
                    .is_some_and(|(start, end)| whole.start() < end && start < whole.end())
            });
            if !overlaps {
                results.push(
                    ExtractionMatch::new(date, confidence, whole.as_str())
                        .with_position(whole.start(), whole.end()),
                );
            }
        };

        // YYYY-MM-DD or YYYY/MM/DD
        for caps in DATE_YMD.captures_iter(text) {
            let date = match (caps[1].parse(), caps[2].parse(), caps[3].parse()) {
                (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d),
                _ => None,
            };
            push(date, &caps, 0.95);
        }

        // "January 15, 2024"
        for caps in DATE_MONTH_NAME_FIRST.captures_iter(text) {
            let date = match (month_to_number(&caps[1]), caps[2].parse(), caps[3].parse()) {
                (Some(m), Ok(d), Ok(y)) => NaiveDate::from_ymd_opt(y, m, d),
                _ => None,
            };
            push(date, &caps, 0.95);
        }

        // "15 January 2024"
        for caps in DATE_DAY_FIRST_NAME.captures_iter(text) {
            let date = match (caps[1].parse(), month_to_number(&caps[2]), caps[3].parse()) {
                (Ok(d), Some(m), Ok(y)) => NaiveDate::from_ymd_opt(y, m, d),
                _ => None,
            };
            push(date, &caps, 0.95);
        }

        // 01/15/2024, 15.01.2024, 15-01-24
        for caps in DATE_NUMERIC.captures_iter(text) {
            let date = self.numeric(&caps);
            push(date, &caps, 0.85);
        }

        results.sort_by_key(|r| r.position.map(|(start, _)| start));
        results
    }
}

/// Invoice and due dates found in the text.
#[derive(Debug, Clone, Default)]
pub struct InvoiceDates {
    pub invoice_date: Option<ExtractionMatch<NaiveDate>>,
    pub due_date: Option<ExtractionMatch<NaiveDate>>,
}

/// Date following a label, or on the next line when the label stands alone.
fn labeled_date(
    extractor: &DateExtractor,
    text: &str,
    lines: &[&str],
    caps: &Captures,
    confidence: f32,
) -> Option<ExtractionMatch<NaiveDate>> {
    let whole = caps.get(0)?;
    let line = line_of(text, whole.start());
    let value = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();

    if let Some(found) = extractor.extract(value) {
        return Some(ExtractionMatch::new(found.value, confidence, whole.as_str().trim()).with_line(line));
    }
    if !value.is_empty() {
        return None;
    }

    let (next_index, next) = next_non_empty(lines, line)?;
    extractor
        .extract(next)
        .map(|found| ExtractionMatch::new(found.value, confidence * 0.9, next).with_line(next_index))
}

/// Extract the invoice and due dates from invoice text.
///
/// A missing due date stays `None`; it is never derived from payment terms.
pub fn extract_dates(text: &str, order: DateOrder) -> InvoiceDates {
    let mut result = InvoiceDates::default();
    let extractor = DateExtractor::new().with_order(order);
    let lines: Vec<&str> = text.lines().collect();

    let mut due_lines = Vec::new();
    for caps in DUE_DATE_LABEL.captures_iter(text) {
        if let Some(whole) = caps.get(0) {
            due_lines.push(line_of(text, whole.start()));
        }
        if result.due_date.is_none() {
            result.due_date = labeled_date(&extractor, text, &lines, &caps, 0.95);
        }
    }

    result.invoice_date = INVOICE_DATE_LABEL
        .captures_iter(text)
        .find_map(|caps| labeled_date(&extractor, text, &lines, &caps, 0.95));

    if result.invoice_date.is_none() {
        result.invoice_date = GENERIC_DATE_LABEL
            .captures_iter(text)
            .filter(|caps| {
                caps.get(0)
                    .is_some_and(|m| !due_lines.contains(&line_of(text, m.start())))
            })
            .find_map(|caps| labeled_date(&extractor, text, &lines, &caps, 0.85));
    }

    // Unlabeled: first date that is not the due date
    if result.invoice_date.is_none() {
        let due_line = result.due_date.as_ref().and_then(|d| d.line);
        result.invoice_date = extractor
            .extract_all(text)
            .into_iter()
            .map(|found| {
                let line = found.position.map(|(start, _)| line_of(text, start)).unwrap_or(0);
                let confidence = found.confidence * 0.7;
                ExtractionMatch { confidence, ..found }.with_line(line)
            })
            .find(|found| !due_lines.contains(&found.line.unwrap_or(0)) && found.line != due_line);
    }

    result
}

fn parse_year(s: &str) -> i32 {
    let year: i32 = s.parse().unwrap_or(0);
    if year < 100 {
        // Two-digit year: assume 2000s for 00-50, 1900s for 51-99
        if year <= 50 { 2000 + year } else { 1900 + year }
    } else {
        year
    }
}

fn month_to_number(month: &str) -> Option<u32> {
    let month = month.to_lowercase();
    let number = match month.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(number)
}
