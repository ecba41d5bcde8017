//! Configuration structures for extraction, rates, and workbook output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pdf::geometry::Proportion;

/// Main configuration for the expreport pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Page layout of the invoice template.
    pub layout: LayoutConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Exchange rate source configuration.
    pub rates: RateConfig,

    /// Workbook output configuration.
    pub workbook: WorkbookConfig,

    /// Batch execution configuration.
    pub batch: BatchConfig,
}

/// Proportional regions of the invoice template.
///
/// ```text
/// +-------------------------------+
/// |            header             |
/// +---------------+---------------+
/// |  ordered_by   |  invoiced_to  |
/// +---------------+---------------+
/// |             goods             |
/// +-------------------------------+
/// |            footer             |
/// +-------------------------------+
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Document title, delivery plant, invoice number and date.
    pub header: Proportion,

    /// Issuer block and Incoterms.
    pub ordered_by: Proportion,

    /// Buyer address and tax number.
    pub invoiced_to: Proportion,

    /// Goods description, origin, internal order references.
    pub goods: Proportion,

    /// Page footer.
    pub footer: Proportion,

    /// Box on the last page holding the invoice total.
    pub totals: Proportion,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            header: Proportion::new(0.0, 0.0, 1.0, 0.16),
            ordered_by: Proportion::new(0.0, 0.16, 0.46, 0.54),
            invoiced_to: Proportion::new(0.46, 0.16, 1.0, 0.54),
            goods: Proportion::new(0.0, 0.54, 1.0, 0.93),
            footer: Proportion::new(0.0, 0.93, 1.0, 1.0),
            totals: Proportion::new(0.52, 0.88, 0.94, 0.94),
        }
    }
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Delivering plant town → location code.
    pub location_codes: BTreeMap<String, i64>,

    /// Location code used when no rule resolves one.
    pub default_location_code: i64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        let location_codes = [("BUDESTI", 1759), ("CATEASCA", 1826), ("CRAIOVA", 1593)]
            .into_iter()
            .map(|(town, code)| (town.to_string(), code))
            .collect();

        Self {
            location_codes,
            default_location_code: 2093,
        }
    }
}

/// Exchange rate source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// SDMX data endpoint returning daily reference rates against EUR.
    pub endpoint: String,

    /// Currency quoted per EUR (RON for the report).
    pub quote_currency: String,

    /// Number of dates tried, walking one calendar day back each time.
    pub max_attempts: u32,

    /// Per request timeout.
    pub timeout_secs: u64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://data-api.ecb.europa.eu/service/data/EXR/D..EUR.SP00.A".to_string(),
            quote_currency: "RON".to_string(),
            max_attempts: 5,
            timeout_secs: 15,
        }
    }
}

/// What the percentage is applied to inside the statistic formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticBasis {
    /// `ROUND(RON + pct * transport, 0)`; a blank transport counts as zero.
    #[default]
    Transport,
    /// `ROUND(RON + pct * rate, 0)`.
    ExchangeRate,
}

/// Workbook output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbookConfig {
    /// Name of the single worksheet.
    pub sheet_name: String,

    /// Font used for every cell.
    pub font_name: String,

    /// Font size used for every cell.
    pub font_size: f64,

    /// Multiplier applied when auto-sizing columns.
    pub width_scaling: f64,

    /// Header fill colour (RGB).
    pub header_color: u32,

    /// Transport formula: `numerator * rate / denominator * weight`.
    pub transport_numerator: u32,

    /// See `transport_numerator`.
    pub transport_denominator: u32,

    /// Basis of the statistic formula.
    pub statistic_basis: StatisticBasis,

    /// Percentage used when the caller does not pass one.
    pub default_percentage: f64,
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            sheet_name: "Invoices".to_string(),
            font_name: "Arial".to_string(),
            font_size: 12.0,
            width_scaling: 1.2,
            header_color: 0x90EE90,
            transport_numerator: 28_000,
            transport_denominator: 147_000,
            statistic_basis: StatisticBasis::Transport,
            default_percentage: 0.6,
        }
    }
}

/// Batch execution configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads for document extraction (0 = one per logical CPU).
    pub jobs: usize,
}

impl ReportConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Check values that would otherwise produce a broken report.
    pub fn validate(&self) -> Result<(), crate::ReportError> {
        if self.workbook.transport_denominator == 0 {
            return Err(crate::ReportError::Config(
                "workbook.transport_denominator must not be zero".to_string(),
            ));
        }
        if self.rates.max_attempts == 0 {
            return Err(crate::ReportError::Config(
                "rates.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{ "workbook": { "font_size": 10 }, "extraction": { "default_location_code": 1 } }"#;
        let config: ReportConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.workbook.font_size, 10.0);
        assert_eq!(config.workbook.sheet_name, "Invoices");
        assert_eq!(config.extraction.default_location_code, 1);
        assert_eq!(config.rates.max_attempts, 5);
        assert_eq!(config.layout.header, Proportion::new(0.0, 0.0, 1.0, 0.16));
    }

    #[test]
    fn test_validate_rejects_zero_denominator() {
        let mut config = ReportConfig::default();
        assert!(config.validate().is_ok());

        config.workbook.transport_denominator = 0;
        assert!(config.validate().is_err());
    }
}
