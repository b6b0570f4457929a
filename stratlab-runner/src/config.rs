//! Engine and run-file configuration.
//!
//! - `EngineConfig`: cash, costs and data requirements for one backtest.
//! - `BacktestConfig`: a complete TOML run file (engine, data, strategy,
//!   criteria, ranking weights).

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stratlab_core::{ConfigHash, ParamMap};
use thiserror::Error;

use crate::scorer::{ProfitabilityCriteria, RankingWeights};

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {field} = {value} ({reason})")]
    Invalid {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Engine parameters passed to every backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Starting cash.
    pub initial_cash: f64,
    /// Commission rate per trade side (0.001 = 0.1%).
    pub commission: f64,
    /// Slippage rate applied against the trader on every fill.
    pub slippage: f64,
    /// Minimum number of bars for a run to proceed.
    pub min_data_points: usize,
    /// Bar frequency label handed to the simulator.
    pub frequency: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_cash: 10_000.0,
            commission: 0.001,
            slippage: 0.0001,
            min_data_points: 100,
            frequency: "1D".into(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(invalid("initial_cash", self.initial_cash, "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.commission) {
            return Err(invalid("commission", self.commission, "must be between 0 and 1"));
        }
        if !(0.0..=1.0).contains(&self.slippage) {
            return Err(invalid("slippage", self.slippage, "must be between 0 and 1"));
        }
        if self.min_data_points < 10 {
            return Err(invalid(
                "min_data_points",
                self.min_data_points,
                "must be at least 10",
            ));
        }
        if self.frequency.trim().is_empty() {
            return Err(invalid("frequency", "\"\"", "must not be empty"));
        }
        Ok(())
    }

    /// Deterministic hash of the engine parameters.
    pub fn config_hash(&self) -> ConfigHash {
        ConfigHash::of_json(self)
    }
}

fn invalid(field: &'static str, value: impl ToString, reason: &'static str) -> ConfigError {
    ConfigError::Invalid {
        field,
        value: value.to_string(),
        reason,
    }
}

/// `[backtest]` section: what to run on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub symbol: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// CSV file with OHLCV bars. Takes precedence over `synthetic`.
    pub data: Option<PathBuf>,
    /// Generate a deterministic random walk instead of reading a file.
    pub synthetic: bool,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            symbol: "SPY".into(),
            start: None,
            end: None,
            data: None,
            synthetic: false,
        }
    }
}

/// `[strategy]` section: registry name plus parameter overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySection {
    pub name: String,
    #[serde(default)]
    pub params: ParamMap,
}

/// A complete run file.
///
/// ```toml
/// [engine]
/// initial_cash = 25000.0
///
/// [backtest]
/// symbol = "SPY"
/// synthetic = true
///
/// [strategy]
/// name = "sma_crossover"
/// params = { short_window = 10, long_window = 30 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub backtest: DataSection,
    pub strategy: StrategySection,
    #[serde(default)]
    pub criteria: ProfitabilityCriteria,
    #[serde(default)]
    pub ranking: RankingWeights,
}

impl BacktestConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.engine.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }
}
