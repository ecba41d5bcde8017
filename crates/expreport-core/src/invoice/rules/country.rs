//! Destination country inference from a free-text address.

use lazy_static::lazy_static;
use regex::Regex;

use super::patterns::VAT_PREFIX;

const COUNTRY_NAMES: [(&str, &str); 16] = [
    ("RO", "Romania"),
    ("DE", "Germany"),
    ("FR", "France"),
    ("IT", "Italy"),
    ("ES", "Spain"),
    ("HU", "Hungary"),
    ("PL", "Poland"),
    ("BG", "Bulgaria"),
    ("CZ", "Czech Republic"),
    ("SK", "Slovakia"),
    ("AT", "Austria"),
    ("NL", "Netherlands"),
    ("BE", "Belgium"),
    ("LU", "Luxembourg"),
    ("UK", "United Kingdom"),
    ("US", "United States"),
];

lazy_static! {
    static ref COUNTRY_NAME_PATTERNS: Vec<(&'static str, Regex)> = COUNTRY_NAMES
        .iter()
        .map(|(code, name)| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(name));
            (*code, Regex::new(&pattern).unwrap())
        })
        .collect();
}

/// ISO alpha-2 code of the country in `address`.
///
/// A VAT-style prefix (`RO15599111`) wins over a spelled-out country name.
pub fn country_code_from_address(address: &str) -> Option<String> {
    if let Some(caps) = VAT_PREFIX.captures(address) {
        return Some(caps[1].to_string());
    }

    COUNTRY_NAME_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(address))
        .map(|(code, _)| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vat_prefix_wins() {
        assert_eq!(
            country_code_from_address("Client SRL\nRO15599111\nBucharest, Germany"),
            Some("RO".to_string())
        );
    }

    #[test]
    fn test_country_name_lookup() {
        assert_eq!(
            country_code_from_address("Muster GmbH\nHauptstr. 1\n80331 Munich\ngermany"),
            Some("DE".to_string())
        );
        assert_eq!(
            country_code_from_address("Plant 4\nCzech Republic"),
            Some("CZ".to_string())
        );
    }

    #[test]
    fn test_unknown_country() {
        assert_eq!(country_code_from_address("Somewhere 12"), None);
        assert_eq!(country_code_from_address(""), None);
    }
}
