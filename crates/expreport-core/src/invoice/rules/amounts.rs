//! Amount, currency and weight extraction.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::patterns::{AMOUNT_AFTER_CURRENCY, AMOUNT_BEFORE_CURRENCY, NET_WEIGHT};

/// Currency of an invoice total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Eur,
    Ron,
}

impl FromStr for Currency {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EUR" => Ok(Currency::Eur),
            "RON" => Ok(Currency::Ron),
            _ => Err(()),
        }
    }
}

/// Thousands/decimal separator convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberLocale {
    /// `1.234,56`
    Romanian,
    /// `1,234.56`
    English,
}

impl NumberLocale {
    /// Convention used for figures printed on a document in the given currency.
    pub fn for_currency(currency: Option<Currency>) -> Self {
        match currency {
            Some(Currency::Ron) => NumberLocale::Romanian,
            _ => NumberLocale::English,
        }
    }
}

/// Parse a number whose separators are not known in advance.
///
/// With both `.` and `,` present, the one appearing last is the decimal
/// separator and the other is dropped. A single separator kind is the decimal
/// point, unless it occurs more than once, in which case it groups thousands.
///
/// ```
/// use expreport_core::invoice::rules::parse_mixed_number;
/// use rust_decimal::Decimal;
///
/// assert_eq!(parse_mixed_number("1.234,56"), Some(Decimal::new(123456, 2)));
/// assert_eq!(parse_mixed_number("1,234.56"), Some(Decimal::new(123456, 2)));
/// ```
pub fn parse_mixed_number(s: &str) -> Option<Decimal> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let last_dot = compact.rfind('.');
    let last_comma = compact.rfind(',');

    let normalized = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) if dot > comma => compact.replace(',', ""),
        (Some(_), Some(_)) => compact.replace('.', "").replace(',', "."),
        (Some(_), None) if compact.matches('.').count() > 1 => compact.replace('.', ""),
        (None, Some(_)) if compact.matches(',').count() > 1 => compact.replace(',', ""),
        _ => compact.replace(',', "."),
    };

    Decimal::from_str(&normalized).ok()
}

/// Parse a number written in a known locale.
pub fn parse_localized_number(s: &str, locale: NumberLocale) -> Option<Decimal> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let normalized = match locale {
        NumberLocale::Romanian => compact.replace('.', "").replace(',', "."),
        NumberLocale::English => compact.replace(',', ""),
    };
    Decimal::from_str(&normalized).ok()
}

/// Invoice total read from the totals box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TotalValue {
    pub currency: Currency,
    pub amount: Decimal,
}

/// Read the invoice total from the text of the totals box.
///
/// The first line carrying a currency ticker next to an amount wins. Credit
/// notes are negated.
pub fn extract_total_value(text: &str, negate: bool) -> Option<TotalValue> {
    text.lines()
        .map(|line| line.replace('*', " "))
        .find_map(|line| line_amounts(&line).into_iter().next())
        .map(|(currency, amount)| TotalValue {
            currency,
            amount: if negate { -amount } else { amount },
        })
}

/// Read the net weight marker and round it to whole kilograms.
pub fn extract_net_weight(text: &str, locale: NumberLocale) -> Option<u64> {
    let caps = NET_WEIGHT.captures(text)?;
    let value = parse_localized_number(&caps[1], locale)?;
    value.round().to_u64()
}

/// Amount of every currency ticker found in `text`, in order of appearance.
pub(crate) fn currency_amounts(text: &str) -> Vec<Decimal> {
    text.lines()
        .flat_map(line_amounts)
        .map(|(_, amount)| amount)
        .collect()
}

/// Currency amounts on one line. `EUR 100,00` is preferred over `100,00 EUR`
/// so that a leading quantity is never taken for the amount.
fn line_amounts(line: &str) -> Vec<(Currency, Decimal)> {
    let parse = |ticker: &str, raw: &str| {
        Some((Currency::from_str(ticker).ok()?, parse_mixed_number(raw)?))
    };

    let after: Vec<_> = AMOUNT_AFTER_CURRENCY
        .captures_iter(line)
        .filter_map(|caps| parse(&caps[1], &caps[2]))
        .collect();
    if !after.is_empty() {
        return after;
    }

    AMOUNT_BEFORE_CURRENCY
        .captures_iter(line)
        .filter_map(|caps| parse(&caps[2], &caps[1]))
        .collect()
}
