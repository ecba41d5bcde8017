//! Delivery location code resolution.

use std::collections::BTreeMap;

use super::patterns::{BAU_CODE, DELIVERING_PLANT};
use crate::models::config::ExtractionConfig;

/// A header marker that decides the delivery location when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationRule {
    /// `Delivering plant : <address>`: last word of the address, looked up in
    /// the location table.
    DeliveringPlant,
    /// `Our BAU Code : <code>`: final `_` segment read as the code.
    BauCode,
}

/// Rules in the order they are tried. The first rule whose marker is present
/// decides, even if it cannot resolve a code.
pub const LOCATION_RULES: [LocationRule; 2] = [LocationRule::DeliveringPlant, LocationRule::BauCode];

impl LocationRule {
    /// `None` when the marker is absent; `Some(None)` when present but unresolved.
    fn apply(self, text: &str, table: &BTreeMap<String, i64>) -> Option<Option<i64>> {
        match self {
            LocationRule::DeliveringPlant => {
                let caps = DELIVERING_PLANT.captures(text)?;
                let town = caps[1].split_whitespace().last().map(str::to_uppercase);
                Some(town.and_then(|town| table.get(&town).copied()))
            }
            LocationRule::BauCode => {
                let caps = BAU_CODE.captures(text)?;
                Some(caps[1].rsplit('_').next().and_then(|s| s.parse().ok()))
            }
        }
    }
}

/// Delivery location code for a header band.
pub fn resolve_delivery_location(header: &str, config: &ExtractionConfig) -> i64 {
    LOCATION_RULES
        .iter()
        .find_map(|rule| rule.apply(header, &config.location_codes))
        .flatten()
        .unwrap_or(config.default_location_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(text: &str) -> i64 {
        resolve_delivery_location(text, &ExtractionConfig::default())
    }

    #[test]
    fn test_delivering_plant_lookup() {
        assert_eq!(resolve("INVOICE\nDelivering plant : Str. Fabricii 4 Craiova\n4500 01.02.2025"), 1593);
        assert_eq!(resolve("Delivering plant : DN 5 BUDESTI"), 1759);
        assert_eq!(resolve("Delivering plant : Timisoara"), 2093);
    }

    #[test]
    fn test_delivering_plant_takes_priority() {
        let text = "Delivering plant : Cateasca\nOur BAU Code : RO03_E_CRA_1593";
        assert_eq!(resolve(text), 1826);

        let text = "Delivering plant : Arad\nOur BAU Code : RO03_E_CRA_1593";
        assert_eq!(resolve(text), 2093);
    }

    #[test]
    fn test_bau_code() {
        assert_eq!(resolve("Our BAU Code : RO03_E_CRA_1593"), 1593);
        assert_eq!(resolve("Our BAU Code : RO03_E_CRA"), 2093);
    }

    #[test]
    fn test_default() {
        assert_eq!(resolve(""), 2093);
        assert_eq!(resolve("COMMERCIAL INVOICE"), 2093);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let text = "Our BAU Code : RO03_E_CRA_1593";
        assert_eq!(resolve(text), resolve(text));
    }
}
