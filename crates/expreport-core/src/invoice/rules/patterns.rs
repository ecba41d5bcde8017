//! Common regex patterns for the commercial invoice template.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Customs classification marker, repeated once per line item
    pub static ref COMMODITY_CODE: Regex = Regex::new(
        r"Commodity Code\s*:\s*(\d+)"
    ).unwrap();

    // Currency ticker followed by an amount
    pub static ref AMOUNT_AFTER_CURRENCY: Regex = Regex::new(
        r"\b(EUR|RON)\s*:?\s*(\d[\d.,]*\d|\d)\b"
    ).unwrap();

    // Amount followed by a currency ticker
    pub static ref AMOUNT_BEFORE_CURRENCY: Regex = Regex::new(
        r"\b(\d[\d.,]*\d|\d)\s*(EUR|RON)\b"
    ).unwrap();

    pub static ref COUNTRY_OF_ORIGIN: Regex = Regex::new(
        r"(?i)Country of origin\s*:\s*([A-Z]{2})"
    ).unwrap();

    pub static ref INVOICED_TO: Regex = Regex::new(
        r"(?s)Invoiced to\s*:\s*(.+?)\nCredit transfer"
    ).unwrap();

    pub static ref TAX_NUMBER: Regex = Regex::new(
        r"(?i)Tax number\s*:\s*(\w+)"
    ).unwrap();

    pub static ref INCOTERMS: Regex = Regex::new(
        r"(?i)Incoterms\s*:\s*(\w+)"
    ).unwrap();

    pub static ref NET_WEIGHT: Regex = Regex::new(
        r"(?i)Net weight\s+([\d.,]+)\s+KG"
    ).unwrap();

    // DD.MM.YYYY or DD.MM.YY
    pub static ref SHIPMENT_DATE: Regex = Regex::new(
        r"(\d{2})\.(\d{2})\.(\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DELIVERING_PLANT: Regex = Regex::new(
        r"(?m)Delivering plant : (.+?)$"
    ).unwrap();

    pub static ref BAU_CODE: Regex = Regex::new(
        r"Our BAU Code : ([A-Z0-9_]+)"
    ).unwrap();

    // VAT-style prefix such as RO15599111
    pub static ref VAT_PREFIX: Regex = Regex::new(
        r"\b([A-Z]{2})\d+"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_amount_both_orders() {
        let caps = AMOUNT_AFTER_CURRENCY.captures("Total EUR 1.234,56").unwrap();
        assert_eq!(&caps[1], "EUR");
        assert_eq!(&caps[2], "1.234,56");

        let caps = AMOUNT_BEFORE_CURRENCY.captures("Amount 980,00 RON").unwrap();
        assert_eq!(&caps[1], "980,00");
        assert_eq!(&caps[2], "RON");
    }

    #[test]
    fn test_shipment_date_pattern() {
        let caps = SHIPMENT_DATE.captures("4500123 15.03.2025").unwrap();
        assert_eq!(&caps[3], "2025");
        let caps = SHIPMENT_DATE.captures("4500123 15.03.25").unwrap();
        assert_eq!(&caps[3], "25");
    }

    #[test]
    fn test_invoiced_to_spans_lines() {
        let text = "Invoiced to : Muster GmbH\nHauptstr. 1\nDE 80331 Munich\nCredit transfer";
        let caps = INVOICED_TO.captures(text).unwrap();
        assert_eq!(&caps[1], "Muster GmbH\nHauptstr. 1\nDE 80331 Munich");
    }
}
