//! Property: labeled invoice text renders back to the fields it came from.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use invox_core::invoice::{InvoiceExtractor, RuleInvoiceParser};

const RESERVED: [&str; 10] = [
    "total", "tax", "vat", "gst", "hst", "due", "date", "invoice", "amount", "balance",
];

fn name_word() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{2,10}".prop_filter("label words would be read as fields", |word| {
        let lower = word.to_lowercase();
        !RESERVED.iter().any(|reserved| lower.contains(reserved))
    })
}

fn vendor_name() -> impl Strategy<Value = String> {
    (
        name_word(),
        proptest::option::of(name_word()),
        prop_oneof![Just("Inc"), Just("LLC"), Just("Co"), Just("Ltd")],
    )
        .prop_map(|(first, second, suffix)| match second {
            Some(second) => format!("{} {} {}", first, second, suffix),
            None => format!("{} {}", first, suffix),
        })
}

fn invoice_date() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2031, 1u32..13, 1u32..29)
        .prop_map(|(year, month, day)| NaiveDate::from_ymd_opt(year, month, day).unwrap())
}

/// `1234567.89` as `1,234,567.89`.
fn with_thousands(amount: Decimal) -> String {
    let rendered = amount.to_string();
    let (whole, cents) = rendered.split_once('.').unwrap();
    let mut grouped = String::new();
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{}.{}", grouped, cents)
}

proptest! {
    #[test]
    fn labeled_fields_round_trip(
        vendor in vendor_name(),
        number in "[A-Z]{2,4}-[0-9]{3,6}",
        issued in invoice_date(),
        terms in 0i64..91,
        cents in 100i64..10_000_000_000,
    ) {
        let due = issued + Duration::days(terms);
        let total = Decimal::new(cents, 2);
        let text = format!(
            "Vendor: {}\nInvoice #{}\nInvoice Date: {}\nDue Date: {}\nTotal: ${}",
            vendor,
            number,
            issued.format("%Y-%m-%d"),
            due.format("%Y-%m-%d"),
            with_thousands(total),
        );

        let invoice = RuleInvoiceParser::new().extract(&text, None).unwrap().invoice;
        prop_assert_eq!(&invoice.vendor_name, &vendor);
        prop_assert_eq!(&invoice.invoice_number, &number);
        prop_assert_eq!(invoice.invoice_date, Some(issued));
        prop_assert_eq!(invoice.due_date, Some(due));
        prop_assert_eq!(invoice.total_amount, total);
    }
}

#[test]
fn thousands_grouping() {
    assert_eq!(with_thousands(Decimal::new(123456789, 2)), "1,234,567.89");
    assert_eq!(with_thousands(Decimal::new(100, 2)), "1.00");
    assert_eq!(with_thousands(Decimal::new(100000, 2)), "1,000.00");
}
