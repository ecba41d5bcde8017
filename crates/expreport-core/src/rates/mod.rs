//! Exchange rate resolution.
//!
//! A [`RateSource`] answers for one exact date. The [`ExchangeRateResolver`]
//! walks back over prior days when a date has no published rate and memoizes
//! every answer, including misses, for its own lifetime.

pub mod calendar;

use std::str::FromStr;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use dashmap::DashMap;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

pub use calendar::previous_business_day;

use crate::error::RateError;
use crate::models::config::RateConfig;

/// A date-indexed exchange rate lookup.
pub trait RateSource: Send + Sync {
    /// Units of `currency` per EUR on exactly `date`, or `None` if nothing was
    /// published that day.
    fn fetch(&self, date: NaiveDate, currency: &str) -> Result<Option<Decimal>, RateError>;
}

/// Rate resolver with a bounded walk-back window and a shared memo.
///
/// Safe to share between extraction workers; two workers may both fetch the
/// same key before either stores it.
pub struct ExchangeRateResolver {
    source: Box<dyn RateSource>,
    max_attempts: u32,
    memo: DashMap<(NaiveDate, String), Option<Decimal>>,
}

impl ExchangeRateResolver {
    /// Create a resolver over any source.
    pub fn new(source: impl RateSource + 'static, max_attempts: u32) -> Self {
        Self {
            source: Box::new(source),
            max_attempts: max_attempts.max(1),
            memo: DashMap::new(),
        }
    }

    /// Create a resolver backed by the ECB data service.
    pub fn from_config(config: &RateConfig) -> Result<Self, RateError> {
        Ok(Self::new(EcbRateSource::new(config)?, config.max_attempts))
    }

    /// Rate for `date`, falling back one calendar day per attempt.
    pub fn rate(&self, date: NaiveDate, currency: &str) -> Option<Decimal> {
        let key = (date, currency.to_string());
        if let Some(cached) = self.memo.get(&key) {
            return *cached;
        }

        let resolved = self.walk_back(date, currency);
        if resolved.is_none() {
            warn!(
                "No {} rate found within {} days before {}",
                currency, self.max_attempts, date
            );
        }
        self.memo.insert(key, resolved);
        resolved
    }

    /// Number of memoized keys.
    pub fn cached(&self) -> usize {
        self.memo.len()
    }

    fn walk_back(&self, date: NaiveDate, currency: &str) -> Option<Decimal> {
        for attempt in 0..self.max_attempts {
            let day = date.checked_sub_days(Days::new(u64::from(attempt)))?;
            match self.source.fetch(day, currency) {
                Ok(Some(rate)) => {
                    debug!("{} rate for {}: {}", currency, day, rate);
                    return Some(rate);
                }
                Ok(None) => debug!("No {} rate published on {}", currency, day),
                Err(e) => debug!("Rate lookup for {} on {} failed: {}", currency, day, e),
            }
        }
        None
    }
}

/// European Central Bank reference rates, read from the SDMX CSV service.
pub struct EcbRateSource {
    client: Client,
    endpoint: String,
}

impl EcbRateSource {
    pub fn new(config: &RateConfig) -> Result<Self, RateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        info!("Using ECB rate source at {}", config.endpoint);
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl RateSource for EcbRateSource {
    fn fetch(&self, date: NaiveDate, currency: &str) -> Result<Option<Decimal>, RateError> {
        let day = date.format("%Y-%m-%d").to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("startPeriod", day.as_str()),
                ("endPeriod", day.as_str()),
                ("format", "csvdata"),
            ])
            .send()?;

        let status = response.status();
        // Weekends and TARGET holidays come back as 404 "No results found".
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RateError::Status(status.as_u16()));
        }

        let body = response.text()?;
        parse_ecb_csv(&body, currency)
    }
}

/// Read `OBS_VALUE` from the row whose `CURRENCY` column equals `currency`.
pub fn parse_ecb_csv(body: &str, currency: &str) -> Result<Option<Decimal>, RateError> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| RateError::Malformed(e.to_string()))?
        .clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| RateError::Malformed(format!("missing {} column", name)))
    };
    let currency_col = column("CURRENCY")?;
    let value_col = column("OBS_VALUE")?;

    for record in reader.records() {
        let record = record.map_err(|e| RateError::Malformed(e.to_string()))?;
        if record.get(currency_col) != Some(currency) {
            continue;
        }
        let raw = record.get(value_col).unwrap_or_default();
        return Decimal::from_str(raw)
            .map(Some)
            .map_err(|_| RateError::Malformed(format!("OBS_VALUE '{}'", raw)));
    }

    Ok(None)
}


#[cfg(test)]
mod tests {
    use super::fake::FixedRates;
    use super::*;
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_exact_date_hit() {
        let source = Arc::new(FixedRates::default().with(date(2025, 3, 14), "4.9771"));
        let resolver = ExchangeRateResolver::new(source.clone(), 5);

        assert_eq!(
            resolver.rate(date(2025, 3, 14), "RON"),
            Some(Decimal::from_str("4.9771").unwrap())
        );
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_walks_back_over_misses_and_failures() {
        let mut fixed = FixedRates::default().with(date(2025, 3, 7), "4.9760");
        fixed.failing.push(date(2025, 3, 9));
        let source = Arc::new(fixed);
        let resolver = ExchangeRateResolver::new(source.clone(), 5);

        // 10th (miss), 9th (error), 8th (miss), 7th (hit)
        assert_eq!(
            resolver.rate(date(2025, 3, 10), "RON"),
            Some(Decimal::from_str("4.9760").unwrap())
        );
        assert_eq!(source.calls(), 4);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let source = Arc::new(FixedRates::default().with(date(2025, 3, 1), "4.97"));
        let resolver = ExchangeRateResolver::new(source.clone(), 5);

        assert_eq!(resolver.rate(date(2025, 3, 10), "RON"), None);
        assert_eq!(source.calls(), 5);
    }

    #[test]
    fn test_misses_are_memoized() {
        let source = Arc::new(FixedRates::default());
        let resolver = ExchangeRateResolver::new(source.clone(), 3);

        assert_eq!(resolver.rate(date(2025, 3, 10), "RON"), None);
        assert_eq!(resolver.rate(date(2025, 3, 10), "RON"), None);
        assert_eq!(source.calls(), 3);
        assert_eq!(resolver.cached(), 1);
    }

    #[test]
    fn test_memo_is_keyed_by_currency() {
        let source = Arc::new(FixedRates::default().with(date(2025, 3, 10), "4.97"));
        let resolver = ExchangeRateResolver::new(source.clone(), 1);

        resolver.rate(date(2025, 3, 10), "RON");
        resolver.rate(date(2025, 3, 10), "HUF");
        assert_eq!(resolver.cached(), 2);
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_concurrent_lookups_share_memo() {
        let source = Arc::new(FixedRates::default().with(date(2025, 3, 10), "4.97"));
        let resolver = Arc::new(ExchangeRateResolver::new(source.clone(), 5));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                std::thread::spawn(move || resolver.rate(date(2025, 3, 10), "RON"))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_some());
        }
        assert_eq!(resolver.cached(), 1);
        assert!(source.calls() <= 8);
    }

    #[test]
    fn test_parse_ecb_csv() {
        let body = "KEY,FREQ,CURRENCY,CURRENCY_DENOM,EXR_TYPE,EXR_SUFFIX,TIME_PERIOD,OBS_VALUE\n\
                    EXR.D.HUF.EUR.SP00.A,D,HUF,EUR,SP00,A,2025-03-14,398.51\n\
                    EXR.D.RON.EUR.SP00.A,D,RON,EUR,SP00,A,2025-03-14,4.9771\n";
        assert_eq!(
            parse_ecb_csv(body, "RON").unwrap(),
            Some(Decimal::from_str("4.9771").unwrap())
        );
        assert_eq!(parse_ecb_csv(body, "USD").unwrap(), None);
        assert_eq!(parse_ecb_csv("", "RON").unwrap(), None);
    }

    #[test]
    fn test_parse_ecb_csv_malformed() {
        assert!(parse_ecb_csv("A,B\n1,2\n", "RON").is_err());
        let body = "CURRENCY,OBS_VALUE\nRON,n/a\n";
        assert!(parse_ecb_csv(body, "RON").is_err());
    }
}
