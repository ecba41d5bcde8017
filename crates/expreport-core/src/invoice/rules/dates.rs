//! Shipment date extraction.

use chrono::NaiveDate;

use super::patterns::SHIPMENT_DATE;

/// Two-digit years below this pivot belong to the 2000s, the rest to the 1900s.
const CENTURY_PIVOT: i32 = 50;

/// Find the first `DD.MM.YYYY` or `DD.MM.YY` date in `text`.
pub fn parse_shipment_date(text: &str) -> Option<NaiveDate> {
    SHIPMENT_DATE.captures_iter(text).find_map(|caps| {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year = expand_year(&caps[3])?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

fn expand_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    Some(match s.len() {
        2 if year < CENTURY_PIVOT => 2000 + year,
        2 => 1900 + year,
        _ => year,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_two_digit_year_pivot() {
        assert_eq!(parse_shipment_date("15.03.25"), Some(date(2025, 3, 15)));
        assert_eq!(parse_shipment_date("15.03.99"), Some(date(1999, 3, 15)));
        assert_eq!(parse_shipment_date("01.01.49"), Some(date(2049, 1, 1)));
        assert_eq!(parse_shipment_date("01.01.50"), Some(date(1950, 1, 1)));
    }

    #[test]
    fn test_four_digit_year() {
        assert_eq!(
            parse_shipment_date("4500123 07.11.2024 Page 1"),
            Some(date(2024, 11, 7))
        );
    }

    #[test]
    fn test_invalid_dates_are_skipped() {
        assert_eq!(parse_shipment_date("31.02.2025"), None);
        assert_eq!(parse_shipment_date("31.02.2025 01.03.2025"), Some(date(2025, 3, 1)));
        assert_eq!(parse_shipment_date("no date"), None);
    }
}
