//! Line item table parsing.

use rust_decimal::Decimal;

use super::amounts::parse_amount;
use super::patterns::{
    COLUMN_SEPARATOR, HEADER_AMOUNT, HEADER_DESCRIPTION, HEADER_QUANTITY, NUMERIC_CELL,
    ROW_PATTERN, SUBTOTAL_LABEL, TAX_LABEL, TOTAL_LABEL,
};
use crate::models::invoice::LineItem;

/// Largest gap between quantity x unit price and the amount for a row
/// found outside a table.
const ROW_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

fn is_header(line: &str) -> bool {
    HEADER_DESCRIPTION.is_match(line) && HEADER_QUANTITY.is_match(line) && HEADER_AMOUNT.is_match(line)
}

/// Whether the line opens with a total, subtotal or tax label.
fn is_summary_line(line: &str) -> bool {
    let line = line.trim_start_matches(|c: char| c.is_whitespace() || c == '|');
    [&*SUBTOTAL_LABEL, &*TOTAL_LABEL, &*TAX_LABEL]
        .iter()
        .any(|pattern| pattern.find(line).is_some_and(|m| m.start() == 0))
}

fn is_rule_line(line: &str) -> bool {
    line.chars().all(|c| matches!(c, '-' | '=' | '_' | '|' | '+' | ' ' | '\t'))
}

fn item(description: &str, quantity: Decimal, unit_price: Decimal, amount: Decimal) -> Option<LineItem> {
    let description = description.trim();
    if quantity <= Decimal::ZERO || !description.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    Some(LineItem::new(description, quantity, unit_price, amount))
}

/// Parse a row split into columns; the trailing numeric cells are
/// (quantity, unit price, amount) or (quantity, amount).
fn parse_columns(line: &str) -> Option<LineItem> {
    let cells: Vec<&str> = COLUMN_SEPARATOR
        .split(line.trim())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();

    let numeric = cells.iter().rev().take_while(|c| NUMERIC_CELL.is_match(c)).count();
    if numeric < 2 || numeric == cells.len() {
        return None;
    }

    let values = cells[cells.len() - numeric..]
        .iter()
        .map(|c| parse_amount(c))
        .collect::<Option<Vec<Decimal>>>()?;
    let n = values.len();

    let (described, quantity, unit_price, amount) = if n >= 3 {
        (cells.len() - 3, values[n - 3], values[n - 2], values[n - 1])
    } else {
        let (quantity, amount) = (values[0], values[1]);
        if quantity <= Decimal::ZERO {
            return None;
        }
        (cells.len() - 2, quantity, amount.checked_div(quantity)?.round_dp(2), amount)
    };

    item(&cells[..described].join(" "), quantity, unit_price, amount)
}

fn parse_row_pattern(line: &str) -> Option<LineItem> {
    let caps = ROW_PATTERN.captures(line)?;
    item(
        &caps[1],
        parse_amount(&caps[2])?,
        parse_amount(&caps[3])?,
        parse_amount(&caps[4])?,
    )
}

fn parse_table(rows: &[&str]) -> Vec<LineItem> {
    let mut items = Vec::new();

    for row in rows {
        if row.trim().is_empty() {
            if items.is_empty() {
                continue;
            }
            break;
        }
        if is_rule_line(row) {
            continue;
        }
        if is_summary_line(row) {
            break;
        }
        if let Some(item) = parse_columns(row).or_else(|| parse_row_pattern(row)) {
            items.push(item);
        }
    }

    items
}

/// Extract line items from invoice text.
///
/// A table is recognized by a header naming a description, a quantity and an
/// amount column; its rows run until a blank line or a summary line. Without
/// a table, single-spaced rows are accepted only when quantity x unit price
/// matches the amount. An empty result means no structured items were found.
pub fn extract_line_items(text: &str) -> Vec<LineItem> {
    let lines: Vec<&str> = text.lines().collect();

    if let Some(header) = lines.iter().position(|l| is_header(l)) {
        let items = parse_table(&lines[header + 1..]);
        if !items.is_empty() {
            return items;
        }
    }

    lines
        .iter()
        .filter(|line| !is_summary_line(line))
        .filter_map(|line| parse_row_pattern(line))
        .filter(|item| {
            item.expected_amount()
                .and_then(|expected| expected.checked_sub(item.amount))
                .is_some_and(|difference| difference.abs() <= ROW_TOLERANCE)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_column_table() {
        let text = "\
Description        Qty   Unit Price   Amount
Consulting hours   10    150.00       1,500.00
Travel expenses    1     $250.00      $250.00

Subtotal                              1,750.00";
        let items = extract_line_items(text);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description, "Consulting hours");
        assert_eq!(items[0].quantity, dec("10"));
        assert_eq!(items[0].unit_price, dec("150.00"));
        assert_eq!(items[0].amount, dec("1500.00"));
        assert_eq!(items[1].amount, dec("250.00"));
    }

    #[test]
    fn test_pipe_table_with_two_numbers() {
        let text = "| Item | Hours | Total |\n|------|-------|-------|\n| Design | 4 | 300.00 |\n| Total | | 300.00 |";
        let items = extract_line_items(text);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Design");
        assert_eq!(items[0].unit_price, dec("75.00"));
    }

    #[test]
    fn test_headerless_rows_need_consistent_arithmetic() {
        let text = "Widget 2 10.00 20.00\nGadget 3 5.00 99.00\nTotal 1 20.00 20.00";
        let items = extract_line_items(text);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Widget");
    }

    #[test]
    fn test_zero_quantity_rows_are_skipped() {
        let text = "Description  Qty  Price  Amount\nFree sample  0  0.00  0.00\nPaper  5  2.00  10.00";
        let items = extract_line_items(text);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Paper");
    }

    #[test]
    fn test_overflowing_rows_are_dropped() {
        let text = "Widget 2 10.00 20.00\nBolts 99999999999999999999 99999999999999999999 1.00";
        let items = extract_line_items(text);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Widget");

        let table = "Item  Qty  Amount\nCrates  0.0000001  79228162514264337593543950335";
        assert!(extract_line_items(table).is_empty());
    }

    #[test]
    fn test_no_items() {
        assert!(extract_line_items("Invoice #1\nTotal: 10.00").is_empty());
        assert!(extract_line_items("").is_empty());
    }
}
