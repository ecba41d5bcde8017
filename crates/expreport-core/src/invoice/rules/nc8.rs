//! Customs classification (NC8) codes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::amounts::currency_amounts;
use super::patterns::COMMODITY_CODE;

/// Code used for every credit note.
pub const CREDIT_NOTE_CODE: &str = "Credit Note";

/// Code used when the goods band references an internal order instead of goods.
pub const INTERNAL_ORDER_CODE: &str = "REFERENCE; INTERNAL ORDER";

/// Code used when no commodity code is printed on the document.
pub const UNKNOWN_CODE: &str = "Unknown";

/// Reformat an 8-digit code as `XX XX XXXX`; anything else is returned as is.
///
/// ```
/// use expreport_core::invoice::rules::format_nc8_code;
///
/// assert_eq!(format_nc8_code("87082990"), "87 08 2990");
/// assert_eq!(format_nc8_code("1234"), "1234");
/// ```
pub fn format_nc8_code(value: &str) -> String {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 8 {
        format!("{} {} {}", &digits[..2], &digits[2..4], &digits[4..])
    } else {
        value.to_string()
    }
}

/// A commodity code together with the amount printed just before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeEntry {
    pub code: String,
    /// Last currency amount between the previous marker and this one; zero if none.
    pub partial_value: Decimal,
}

/// Scan page texts for commodity code markers.
///
/// Each code is paired with the last currency amount that precedes its marker
/// on the same page, looking no further back than the previous marker.
pub fn extract_code_entries<S: AsRef<str>>(pages: &[S]) -> Vec<CodeEntry> {
    let mut entries = Vec::new();

    for page in pages {
        let text = page.as_ref();
        let mut segment_start = 0;
        for caps in COMMODITY_CODE.captures_iter(text) {
            let Some(marker) = caps.get(0) else {
                continue;
            };
            let partial_value = currency_amounts(&text[segment_start..marker.start()])
                .pop()
                .unwrap_or(Decimal::ZERO);
            entries.push(CodeEntry {
                code: caps[1].to_string(),
                partial_value,
            });
            segment_start = marker.end();
        }
    }

    entries
}

/// Whether the goods band describes an internal order reference.
pub fn is_internal_order(goods: &str) -> bool {
    goods.contains("REFERENCE") && goods.contains("INTERNAL ORDER")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn test_format_nc8_code() {
        assert_eq!(format_nc8_code("87082990"), "87 08 2990");
        assert_eq!(format_nc8_code("87 08 2990"), "87 08 2990");
        assert_eq!(format_nc8_code("1234"), "1234");
        assert_eq!(format_nc8_code(CREDIT_NOTE_CODE), CREDIT_NOTE_CODE);
        assert_eq!(format_nc8_code(""), "");
    }

    #[test]
    fn test_extract_code_entries_pairs_preceding_amount() {
        let page1 = "Pos 10 Brake disc\n4 PCS EUR 1.200,00\nCommodity Code : 87083091\n\
                     Pos 20 Bracket\nEUR 300,50\nCommodity Code: 73269098";
        let page2 = "Pos 30 Sample\nCommodity Code : 39269097";

        let entries = extract_code_entries(&[page1, page2]);
        assert_eq!(
            entries,
            vec![
                CodeEntry {
                    code: "87083091".into(),
                    partial_value: Decimal::from_str("1200.00").unwrap(),
                },
                CodeEntry {
                    code: "73269098".into(),
                    partial_value: Decimal::from_str("300.50").unwrap(),
                },
                CodeEntry {
                    code: "39269097".into(),
                    partial_value: Decimal::ZERO,
                },
            ]
        );
    }

    #[test]
    fn test_extract_code_entries_none() {
        assert!(extract_code_entries(&["no goods"]).is_empty());
    }

    #[test]
    fn test_is_internal_order() {
        assert!(is_internal_order("REFERENCE 4711\nINTERNAL ORDER 99"));
        assert!(!is_internal_order("REFERENCE only"));
    }
}
