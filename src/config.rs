use crate::analysis::Lookback;
use crate::data::fetch::{DEFAULT_INTERVAL, DEFAULT_OUTPUTSIZE, DEFAULT_TIMEZONE};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const API_KEY_ENV: &str = "TWELVEDATA_API_KEY";

pub const DEFAULT_BIN_WIDTH: f64 = 1.0;
pub const MIN_BIN_WIDTH: f64 = 0.01;
pub const MAX_BIN_WIDTH: f64 = 1000.0;

/// Unusable widths fall back to the default; the rest are clamped.
pub fn clamp_bin_width(bin_width: f64) -> f64 {
    if bin_width.is_finite() && bin_width > 0.0 {
        bin_width.clamp(MIN_BIN_WIDTH, MAX_BIN_WIDTH)
    } else {
        DEFAULT_BIN_WIDTH
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub stocks: Vec<String>,
    pub selected_symbol: usize,
    pub symbol: String,
    pub data_dir: PathBuf,
    pub lookback: Lookback,
    pub bin_width: f64,
    pub zoom: usize,
    pub interval: String,
    pub outputsize: u32,
    pub timezone: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let stocks = default_stocks();
        Self {
            api_key: None,
            symbol: stocks[0].clone(),
            stocks,
            selected_symbol: 0,
            data_dir: PathBuf::from("data"),
            lookback: Lookback::SixMonths,
            bin_width: DEFAULT_BIN_WIDTH,
            zoom: 1,
            interval: DEFAULT_INTERVAL.to_string(),
            outputsize: DEFAULT_OUTPUTSIZE,
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

impl AppConfig {
    pub fn sanitized(mut self) -> Self {
        self.stocks = self
            .stocks
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if self.stocks.is_empty() {
            self.stocks = default_stocks();
        }

        if self.selected_symbol >= self.stocks.len() {
            self.selected_symbol = self.stocks.len().saturating_sub(1);
        }

        self.symbol = self.symbol.trim().to_uppercase();
        if !self.stocks.iter().any(|s| s == &self.symbol) {
            self.symbol = self.stocks[self.selected_symbol].clone();
        }

        self.bin_width = clamp_bin_width(self.bin_width);

        self.zoom = self.zoom.clamp(1, 32);
        self.outputsize = self.outputsize.clamp(1, 5000);
        self
    }

    /// Environment wins over the file so keys need not be written to disk.
    pub fn resolve_api_key(&self) -> Result<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| {
                AppError::Config(format!(
                    "no API key: set {} or \"api_key\" in the config file",
                    API_KEY_ENV
                ))
            })
    }
}

pub fn default_stocks() -> Vec<String> {
    vec![
        "AMD".to_string(),
        "CAVA".to_string(),
        "NVDA".to_string(),
        "AAPL".to_string(),
        "MSFT".to_string(),
    ]
}

pub fn config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".stockcharts.json")
}

pub fn load_config(path: &Path) -> AppConfig {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => return AppConfig::default(),
    };

    match serde_json::from_str::<AppConfig>(&contents) {
        Ok(cfg) => cfg.sanitized(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid config, using defaults");
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<()> {
    let payload = serde_json::to_string_pretty(config)?;
    std::fs::write(path, payload)?;
    Ok(())
}
