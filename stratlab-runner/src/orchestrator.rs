//! Backtest orchestration: one strategy, one series, one run.
//!
//! Stages run strictly in sequence on the calling thread:
//!
//! `Validate → Slice → Sufficiency → GenerateSignals → Simulate → Metrics → Assemble`
//!
//! Any stage error aborts the run and surfaces as a `BacktestError` carrying
//! the stage-specific `StageError` as its source. The metrics stage is the
//! exception: it falls back to a default bundle and records a warning.

use std::fmt;

use chrono::{NaiveDate, Utc};
use stratlab_core::domain::{BarField, MarketSeries, Signals};
use stratlab_core::{Strategy, StrategyError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EngineConfig};
use crate::metrics::{compute_base_metrics, keys, MetricsBundle};
use crate::result::{BacktestPeriod, BacktestResult, StrategySnapshot};
use crate::simulator::{
    PortfolioSimulator, SignalSimulator, SimulationError, SimulationOutput, SimulationRequest,
};

/// Pipeline stage, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Slice,
    Sufficiency,
    GenerateSignals,
    Simulate,
    Metrics,
    Assemble,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Slice => "slice",
            Stage::Sufficiency => "sufficiency check",
            Stage::GenerateSignals => "signal generation",
            Stage::Simulate => "portfolio simulation",
            Stage::Metrics => "metrics",
            Stage::Assemble => "assemble",
        };
        f.write_str(name)
    }
}

/// Stage-specific failure kinds.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("data validation failed: {0}")]
    DataValidation(String),

    #[error("strategy '{strategy}' failed during signal generation: {source}")]
    StrategyExecution {
        strategy: String,
        #[source]
        source: StrategyError,
    },

    #[error("portfolio construction failed: {0}")]
    PortfolioConstruction(#[from] SimulationError),

    #[error("metrics calculation failed: {0}")]
    MetricsCalculation(String),
}

/// Umbrella error for a failed run.
#[derive(Debug, Error)]
#[error("backtest execution failed at {stage}: {source}")]
pub struct BacktestError {
    pub strategy: String,
    pub stage: Stage,
    #[source]
    pub source: StageError,
}

impl BacktestError {
    /// The stage-specific error.
    pub fn kind(&self) -> &StageError {
        &self.source
    }

    pub fn is_data_validation(&self) -> bool {
        matches!(self.source, StageError::DataValidation(_))
    }
}

/// Runs strategies against market data through a portfolio simulator.
pub struct BacktestOrchestrator {
    config: EngineConfig,
    simulator: Box<dyn PortfolioSimulator>,
}

impl fmt::Debug for BacktestOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BacktestOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BacktestOrchestrator {
    /// Validates `config` and uses the default `SignalSimulator`.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_simulator(config, SignalSimulator)
    }

    pub fn with_simulator(
        config: EngineConfig,
        simulator: impl PortfolioSimulator + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            initial_cash = config.initial_cash,
            commission = config.commission,
            slippage = config.slippage,
            min_data_points = config.min_data_points,
            "Backtest orchestrator initialized"
        );
        Ok(Self {
            config,
            simulator: Box::new(simulator),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `strategy` over `data`, optionally restricted to `[start, end]`.
    ///
    /// `symbol` overrides the series' own symbol in the result.
    pub fn execute_strategy_evaluation(
        &self,
        strategy: &mut dyn Strategy,
        data: &MarketSeries,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        symbol: Option<&str>,
    ) -> Result<BacktestResult, BacktestError> {
        let label = strategy.label().to_string();
        let symbol = symbol.unwrap_or(data.symbol.as_str()).to_string();
        let fail = |stage: Stage| {
            let strategy = label.clone();
            move |source: StageError| BacktestError {
                strategy,
                stage,
                source,
            }
        };

        info!(
            strategy = %label,
            symbol = %symbol,
            bars = data.len(),
            "Starting backtest"
        );
        let mut warnings = Vec::new();

        let cleaned = validate(data, &mut warnings).map_err(fail(Stage::Validate))?;
        let sliced = slice(cleaned, start, end).map_err(fail(Stage::Slice))?;
        check_sufficiency(sliced.len(), self.config.min_data_points, &mut warnings)
            .map_err(fail(Stage::Sufficiency))?;

        let dates = sliced.dates();
        let closes = sliced.closes();
        let signals =
            generate_signals(strategy, &sliced, &mut warnings).map_err(fail(Stage::GenerateSignals))?;
        let entries = signals.entries.to_flags();
        let exits = signals.exits.to_flags();

        let simulation = self
            .simulator
            .simulate(&SimulationRequest {
                dates: &dates,
                closes: &closes,
                entries: &entries,
                exits: &exits,
                initial_cash: self.config.initial_cash,
                commission: self.config.commission,
                slippage: self.config.slippage,
                frequency: &self.config.frequency,
            })
            .map_err(|e| fail(Stage::Simulate)(StageError::from(e)))?;

        let metrics = self.compute_metrics(&simulation, &closes, &mut warnings);

        let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
            return Err(fail(Stage::Assemble)(StageError::DataValidation(
                "no bars left to assemble a result from".into(),
            )));
        };
        let result = BacktestResult {
            strategy: StrategySnapshot::of(strategy),
            metrics,
            period: BacktestPeriod::new(*first, *last, sliced.len()),
            symbol,
            engine: self.config.clone(),
            timestamp: Utc::now(),
            simulation,
            closes,
            entries,
            exits,
            indicators: strategy.indicators().clone(),
            warnings,
            ranking: None,
        };

        info!(
            strategy = %label,
            total_return = result.metrics.get_or(keys::TOTAL_RETURN, 0.0),
            sharpe = result.metrics.get_or(keys::SHARPE_RATIO, 0.0),
            trades = result.metrics.get_or(keys::TOTAL_TRADES, 0.0),
            "Backtest completed"
        );
        Ok(result)
    }

    fn compute_metrics(
        &self,
        simulation: &SimulationOutput,
        closes: &[f64],
        warnings: &mut Vec<String>,
    ) -> MetricsBundle {
        match compute_base_metrics(simulation, closes) {
            Ok(metrics) => metrics,
            Err(reason) => {
                let err = StageError::MetricsCalculation(reason);
                record(warnings, format!("{err}; using default metrics"));
                MetricsBundle::defaults(self.config.initial_cash)
            }
        }
    }
}

fn record(warnings: &mut Vec<String>, message: String) {
    warn!("{message}");
    warnings.push(message);
}

/// Structural checks plus forward-filling of nulls. Returns a cleaned copy.
fn validate(data: &MarketSeries, warnings: &mut Vec<String>) -> Result<MarketSeries, StageError> {
    if data.is_empty() {
        return Err(StageError::DataValidation("Market data is empty".into()));
    }
    if !data.has_strictly_increasing_dates() {
        return Err(StageError::DataValidation(
            "Market data must be indexed by strictly increasing dates".into(),
        ));
    }

    let missing: Vec<&str> = BarField::ALL
        .iter()
        .filter(|&&f| data.column_fully_null(f))
        .map(|f| f.column_name())
        .collect();
    if !missing.is_empty() {
        return Err(StageError::DataValidation(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut cleaned = data.clone();
    let nulls = cleaned.null_count();
    if nulls > 0 {
        let filled = cleaned.forward_fill();
        record(
            warnings,
            format!("Found {nulls} null values in market data, forward-filled {filled}"),
        );
        let leading = cleaned.bars.iter().take_while(|b| b.close.is_nan()).count();
        if leading > 0 {
            return Err(StageError::DataValidation(format!(
                "Close has {leading} leading null values that cannot be forward-filled"
            )));
        }
    }
    debug!(bars = cleaned.len(), "Market data validated");
    Ok(cleaned)
}

fn slice(
    data: MarketSeries,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<MarketSeries, StageError> {
    if start.is_none() && end.is_none() {
        return Ok(data);
    }
    let sliced = data.slice(start, end);
    if sliced.is_empty() {
        let fmt = |d: Option<NaiveDate>| d.map_or_else(|| "open".to_string(), |d| d.to_string());
        return Err(StageError::DataValidation(format!(
            "No data available for the specified date range: {} to {}",
            fmt(start),
            fmt(end)
        )));
    }
    info!(bars = sliced.len(), ?start, ?end, "Data sliced to date range");
    Ok(sliced)
}

fn check_sufficiency(
    available: usize,
    required: usize,
    warnings: &mut Vec<String>,
) -> Result<(), StageError> {
    if available < required {
        return Err(StageError::DataValidation(format!(
            "Insufficient data for reliable backtest. Required: {required}, Available: {available}"
        )));
    }
    if available < required * 2 {
        record(
            warnings,
            format!(
                "Limited data available ({available} points). Results may be less reliable with fewer than {} points.",
                required * 2
            ),
        );
    }
    Ok(())
}

fn generate_signals(
    strategy: &mut dyn Strategy,
    data: &MarketSeries,
    warnings: &mut Vec<String>,
) -> Result<Signals, StageError> {
    let raw = strategy
        .generate_signals(data)
        .map_err(|source| StageError::StrategyExecution {
            strategy: strategy.label().to_string(),
            source,
        })?;

    let signals = raw.reindex(&data.dates());
    if signals.is_silent() {
        record(warnings, "No trading signals generated by strategy".into());
    }
    info!(
        entries = signals.entries.count(),
        exits = signals.exits.count(),
        "Signals generated"
    );
    Ok(signals)
}
