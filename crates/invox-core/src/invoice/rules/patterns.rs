//! Common regex patterns for invoice extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Invoice numbers
    pub static ref INVOICE_NUMBER_LABELED: Regex = Regex::new(
        r"(?i)\b(?:invoice|inv)\.?[ \t]*(?:#|no\b\.?|nr\b\.?|number\b|num\b\.?|id\b)[ \t]*[:#]?[ \t]*([A-Za-z0-9][A-Za-z0-9\-/_.]*)"
    ).unwrap();

    pub static ref INVOICE_NUMBER_COLON: Regex = Regex::new(
        r"(?i)^[ \t]*invoice[ \t]*:[ \t]*([A-Za-z0-9][A-Za-z0-9\-/_.]*)"
    ).unwrap();

    pub static ref INVOICE_NUMBER_STANDALONE: Regex = Regex::new(
        r"(?i)\b(INV[\-/#]?\d[A-Za-z0-9\-/_.]*)"
    ).unwrap();

    // Vendor labels
    pub static ref VENDOR_LABEL: Regex = Regex::new(
        r"(?i)^[ \t]*(?:vendor|supplier|seller|from|bill(?:ed)?[ \t]+from|sold[ \t]+by|remit[ \t]+to|payee|company)[ \t]*:[ \t]*(.*)$"
    ).unwrap();

    pub static ref NON_VENDOR_PREFIX: Regex = Regex::new(
        r"(?i)^[ \t]*(?:(?:bill(?:ed)?[ \t]+to|ship(?:ped)?[ \t]+to|sold[ \t]+to|customer|client|date|due|total|sub[\s\-]?total|tax|vat|amount|balance|page|description|qty|quantity|terms|phone|tel|fax|email)\b|p\.?o\.?[ \t]*(?:box|#|number|no\b)|purchase[ \t]+order)"
    ).unwrap();

    pub static ref DOCUMENT_TITLE: Regex = Regex::new(
        r"(?i)^[ \t]*(?:(?:tax|commercial|sales|proforma|pro[ \t]*forma)[ \t]+)?(?:invoice|bill|receipt|statement)(?:[ \t]+(?:copy|original))?[ \t]*$"
    ).unwrap();

    pub static ref CONTACT_TOKEN: Regex = Regex::new(
        r"(?i)@|https?://|www\."
    ).unwrap();

    // Dates
    pub static ref DATE_YMD: Regex = Regex::new(
        r"\b(\d{4})[./\-](\d{1,2})[./\-](\d{1,2})\b"
    ).unwrap();

    pub static ref DATE_NUMERIC: Regex = Regex::new(
        r"\b(\d{1,2})([./\-])(\d{1,2})[./\-](\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_MONTH_NAME_FIRST: Regex = Regex::new(
        r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?[ \t]+(\d{1,2})(?:st|nd|rd|th)?,?[ \t]+(\d{4})\b"
    ).unwrap();

    pub static ref DATE_DAY_FIRST_NAME: Regex = Regex::new(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?[ \t]+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?[ \t]+(\d{4})\b"
    ).unwrap();

    pub static ref DUE_DATE_LABEL: Regex = Regex::new(
        r"(?im)\b(?:due[ \t]+date|payment[ \t]+due|date[ \t]+due|due[ \t]+by|due[ \t]+on|pay[ \t]+by)\b[ \t]*[:\-]?[ \t]*(.*)$"
    ).unwrap();

    pub static ref INVOICE_DATE_LABEL: Regex = Regex::new(
        r"(?im)\b(?:invoice[ \t]+date|date[ \t]+of[ \t]+issue|issue[ \t]+date|date[ \t]+issued|billing[ \t]+date|invoice[ \t]+dated)\b[ \t]*[:\-]?[ \t]*(.*)$"
    ).unwrap();

    pub static ref GENERIC_DATE_LABEL: Regex = Regex::new(
        r"(?im)^[ \t]*dated?\b[ \t]*[:\-]?[ \t]*(.*)$"
    ).unwrap();

    // Amounts
    pub static ref TOTAL_LABEL: Regex = Regex::new(
        r"(?i)\b(amount[ \t]+due|balance[ \t]+due|total[ \t]+due|grand[ \t]+total|invoice[ \t]+total|total[ \t]+amount|amount[ \t]+payable|total)\b"
    ).unwrap();

    pub static ref SUBTOTAL_LABEL: Regex = Regex::new(
        r"(?i)\b(sub[ \t\-]?total|net[ \t]+amount|net[ \t]+total)\b"
    ).unwrap();

    pub static ref TAX_LABEL: Regex = Regex::new(
        r"(?i)\b(sales[ \t]+tax|vat|gst|hst|tax)\b"
    ).unwrap();

    pub static ref AMOUNT_TOKEN: Regex = Regex::new(
        r"\d[\d,.]*"
    ).unwrap();

    pub static ref PERCENTAGE: Regex = Regex::new(
        r"\d+(?:[.,]\d+)?[ \t]*%"
    ).unwrap();

    pub static ref CURRENCY_CODE: Regex = Regex::new(
        r"\b(USD|EUR|GBP|CAD|AUD|NZD|CHF|JPY|CNY|INR|PLN|SEK|NOK|DKK|CZK|MXN|BRL|ZAR|SGD|HKD)\b"
    ).unwrap();

    // Line items
    pub static ref HEADER_DESCRIPTION: Regex = Regex::new(
        r"(?i)\b(?:description|item|service|product|details)s?\b"
    ).unwrap();

    pub static ref HEADER_QUANTITY: Regex = Regex::new(
        r"(?i)\b(?:qty|quantity|hours|hrs|units)\b"
    ).unwrap();

    pub static ref HEADER_AMOUNT: Regex = Regex::new(
        r"(?i)\b(?:amount|total|price|rate|cost)\b"
    ).unwrap();

    pub static ref COLUMN_SEPARATOR: Regex = Regex::new(
        r"[ \t]*\|[ \t]*|\t+|[ ]{2,}"
    ).unwrap();

    pub static ref NUMERIC_CELL: Regex = Regex::new(
        r"^[$€£¥]?[ \t]*\d[\d,.]*$"
    ).unwrap();

    pub static ref ROW_PATTERN: Regex = Regex::new(
        r"^[ \t]*(.*?[A-Za-z].*?)[ \t]+(\d+(?:\.\d+)?)[ \t]+[$€£¥]?(\d[\d,]*(?:\.\d+)?)[ \t]+[$€£¥]?(\d[\d,]*(?:\.\d+)?)[ \t]*$"
    ).unwrap();
}
