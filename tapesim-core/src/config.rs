//! YAML run configuration: per-symbol slippage and backtester settings.
//!
//! ```yaml
//! symbols:
//!   AAPL:
//!     slippage:
//!       linear_coeff: 0.0001
//! backtester:
//!   initial_cash: 1000000.0
//! ```
//!
//! Unlisted symbols default to zero slippage; a missing `backtester`
//! section falls back to the defaults below.

use crate::oms::SlippageTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub symbols: BTreeMap<String, SymbolConfig>,
    #[serde(default)]
    pub backtester: BacktesterConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolConfig {
    #[serde(default)]
    pub slippage: SlippageConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlippageConfig {
    #[serde(default)]
    pub linear_coeff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktesterConfig {
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    /// Lowest cash balance a buy may leave behind. The default of zero
    /// rejects any buy that would overdraw.
    #[serde(default)]
    pub cash_floor: f64,
}

impl Default for BacktesterConfig {
    fn default() -> Self {
        Self {
            initial_cash: default_initial_cash(),
            cash_floor: 0.0,
        }
    }
}

fn default_initial_cash() -> f64 {
    100_000.0
}

impl SimConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Linear slippage coefficient for a symbol; 0 when unlisted.
    pub fn slippage_coeff(&self, symbol: &str) -> f64 {
        self.symbols
            .get(symbol)
            .map(|s| s.slippage.linear_coeff)
            .unwrap_or(0.0)
    }

    pub fn set_slippage_coeff(&mut self, symbol: &str, linear_coeff: f64) {
        self.symbols
            .entry(symbol.to_string())
            .or_default()
            .slippage
            .linear_coeff = linear_coeff;
    }

    /// The per-symbol coefficient table consumed by the matcher.
    pub fn slippage_table(&self) -> SlippageTable {
        SlippageTable::new(
            self.symbols
                .iter()
                .map(|(symbol, cfg)| (symbol.clone(), cfg.slippage.linear_coeff))
                .collect(),
        )
    }
}
