//! Labelled text fields of the invoice bands.

use regex::Regex;

use super::patterns::{COUNTRY_OF_ORIGIN, INVOICED_TO};
use crate::models::record::DocumentKind;

/// Decide the document subtype from the header band.
pub fn classify_document(header: &str) -> DocumentKind {
    let upper = header.to_uppercase();
    if upper.contains("CREDIT NOTE") {
        DocumentKind::CreditNote
    } else if upper.contains("DEBIT NOTE") {
        DocumentKind::DebitNote
    } else {
        DocumentKind::Shipment
    }
}

/// The line following `ORDERED BY`.
pub fn extract_company(ordered_by: &str) -> Option<String> {
    let mut lines = ordered_by.lines();
    lines.find(|line| line.contains("ORDERED BY"))?;
    lines
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
}

/// Last line of a band, the one carrying the invoice number and date.
pub fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}

/// First token of the header's last line, read as an integer.
pub fn extract_invoice_number(header: &str) -> Option<i64> {
    last_line(header)?.split_whitespace().next()?.parse().ok()
}

/// Two-letter country after `Country of origin`, uppercased.
pub fn extract_origin(goods: &str) -> Option<String> {
    COUNTRY_OF_ORIGIN
        .captures(goods)
        .map(|caps| caps[1].to_uppercase())
}

/// First capture group of `pattern`, trimmed.
pub fn extract_labeled(text: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Buyer address between `Invoiced to :` and `Credit transfer`.
pub fn extract_destination_address(invoiced_to: &str) -> Option<String> {
    extract_labeled(invoiced_to, &INVOICED_TO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::rules::patterns::{INCOTERMS, TAX_NUMBER};

    #[test]
    fn test_classify_document() {
        assert_eq!(classify_document("CREDIT NOTE\n123"), DocumentKind::CreditNote);
        assert_eq!(classify_document("Debit Note"), DocumentKind::DebitNote);
        assert_eq!(classify_document("COMMERCIAL INVOICE"), DocumentKind::Shipment);
        assert_eq!(classify_document(""), DocumentKind::Shipment);
    }

    #[test]
    fn test_extract_company() {
        let text = "ORDERED BY\n  ACME Components SRL  \nStr. Fabricii 4";
        assert_eq!(extract_company(text), Some("ACME Components SRL".to_string()));
        assert_eq!(extract_company("ORDERED BY"), None);
        assert_eq!(extract_company("nothing"), None);
    }

    #[test]
    fn test_extract_invoice_number() {
        assert_eq!(extract_invoice_number("INVOICE\n4500123 15.03.2025\n"), Some(4500123));
        assert_eq!(extract_invoice_number("INVOICE\nNo. 15.03.2025"), None);
        assert_eq!(extract_invoice_number(""), None);
    }

    #[test]
    fn test_extract_origin() {
        assert_eq!(extract_origin("Country of origin : ro"), Some("RO".to_string()));
        assert_eq!(extract_origin("Country of origin: DE\nnext"), Some("DE".to_string()));
        assert_eq!(extract_origin("Made in EU"), None);
    }

    #[test]
    fn test_extract_labeled() {
        let text = "Tax number : DE811234567\nIncoterms : FCA Craiova";
        assert_eq!(extract_labeled(text, &TAX_NUMBER), Some("DE811234567".to_string()));
        assert_eq!(extract_labeled(text, &INCOTERMS), Some("FCA".to_string()));
        assert_eq!(extract_labeled("", &INCOTERMS), None);
    }

    #[test]
    fn test_extract_destination_address() {
        let text = "Invoiced to : Muster GmbH\nHauptstr. 1\nGermany\nCredit transfer\nIBAN";
        assert_eq!(
            extract_destination_address(text),
            Some("Muster GmbH\nHauptstr. 1\nGermany".to_string())
        );
        assert_eq!(extract_destination_address("Invoiced to : nowhere"), None);
    }
}
