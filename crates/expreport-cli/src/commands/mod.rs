//! CLI subcommands.

pub mod config;
pub mod generate;
pub mod process;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use expreport_core::models::config::ReportConfig;
use expreport_core::{DocumentExtractor, ExchangeRateResolver};

/// Location of the configuration file when `--config` is not given.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("expreport")
        .join("config.json")
}

/// Load the configuration from `--config`, else from the default location
/// when it exists, else use the defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ReportConfig> {
    let config = match config_path {
        Some(path) => ReportConfig::from_file(Path::new(path))?,
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                debug!("Using configuration from {}", default_path.display());
                ReportConfig::from_file(&default_path)?
            } else {
                ReportConfig::default()
            }
        }
    };
    config.validate()?;
    Ok(config)
}

/// Extractor backed by the configured exchange rate source.
pub fn build_extractor(config: &ReportConfig) -> anyhow::Result<DocumentExtractor> {
    let rates = ExchangeRateResolver::from_config(&config.rates)?;
    Ok(DocumentExtractor::new(config.clone(), Arc::new(rates)))
}
