//! Backtest result: the unit exchanged between orchestrator, scorer and reports.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use stratlab_core::components::IndicatorValues;
use stratlab_core::{ConfigHash, ParamMap, Strategy, StrategyConfig};

use crate::config::EngineConfig;
use crate::metrics::{keys, MetricsBundle};
use crate::simulator::SimulationOutput;

/// Complete, immutable result of one backtest run.
///
/// Contains:
/// - The strategy that ran, with its effective parameters
/// - The metrics bundle
/// - Period, symbol and engine parameters
/// - The simulation output and the aligned inputs it was fed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub strategy: StrategySnapshot,

    pub metrics: MetricsBundle,

    pub period: BacktestPeriod,

    pub symbol: String,

    /// Engine parameters the run used
    pub engine: EngineConfig,

    /// Assembly time
    pub timestamp: DateTime<Utc>,

    pub simulation: SimulationOutput,

    /// Close series used for the buy-and-hold benchmark
    pub closes: Vec<f64>,

    /// Entry flags aligned 1:1 with `closes`
    pub entries: Vec<bool>,

    /// Exit flags aligned 1:1 with `closes`
    pub exits: Vec<bool>,

    /// Indicator series the strategy computed. Informational only.
    #[serde(skip)]
    pub indicators: IndicatorValues,

    /// Every warning raised while producing this result
    #[serde(default)]
    pub warnings: Vec<String>,

    /// Set by `rank`
    #[serde(default)]
    pub ranking: Option<RankingAnnotation>,
}

impl BacktestResult {
    pub fn total_return(&self) -> f64 {
        self.metrics.get_or(keys::TOTAL_RETURN, 0.0)
    }

    pub fn sharpe_ratio(&self) -> f64 {
        self.metrics.get_or(keys::SHARPE_RATIO, 0.0)
    }

    pub fn score(&self) -> Option<f64> {
        self.ranking.map(|r| r.score)
    }

    pub fn rank(&self) -> Option<usize> {
        self.ranking.map(|r| r.rank)
    }

    pub fn strategy_config(&self) -> StrategyConfig {
        StrategyConfig::new(self.strategy.identifier.clone(), self.strategy.parameters.clone())
    }

    pub fn entry_count(&self) -> usize {
        self.entries.iter().filter(|&&e| e).count()
    }

    pub fn exit_count(&self) -> usize {
        self.exits.iter().filter(|&&e| e).count()
    }
}

/// Strategy identity and parameters at the time of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySnapshot {
    pub identifier: String,
    pub label: String,
    pub short_label: String,
    /// e.g. "SMA 20/50"
    pub short_description: String,
    pub description: String,
    pub parameters: ParamMap,
    pub config_hash: ConfigHash,
}

impl StrategySnapshot {
    pub fn of(strategy: &dyn Strategy) -> Self {
        let config = strategy.config();
        Self {
            identifier: strategy.identifier().to_string(),
            label: strategy.label().to_string(),
            short_label: strategy.short_label().to_string(),
            short_description: strategy.short_description(),
            description: strategy.describe(),
            config_hash: config.config_hash(),
            parameters: config.parameters,
        }
    }
}

/// Time span covered by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Calendar days between first and last bar
    pub duration_days: i64,
    pub bar_count: usize,
}

impl BacktestPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate, bar_count: usize) -> Self {
        Self {
            start,
            end,
            duration_days: (end - start).num_days(),
            bar_count,
        }
    }
}

/// Composite score and 1-based position assigned by ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingAnnotation {
    pub score: f64,
    pub rank: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratlab_core::strategy::SmaCrossoverStrategy;

    #[test]
    fn period_counts_calendar_days() {
        let p = BacktestPeriod::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            43,
        );
        assert_eq!(p.duration_days, 60);
        assert_eq!(p.bar_count, 43);
    }

    #[test]
    fn snapshot_captures_effective_parameters() {
        let strategy = SmaCrossoverStrategy::new(10, 30).unwrap();
        let snap = StrategySnapshot::of(&strategy);
        assert_eq!(snap.identifier, "sma_crossover");
        assert_eq!(snap.label, "Simple Moving Average");
        assert_eq!(snap.short_description, "SMA 10/30");
        assert_eq!(snap.parameters.len(), 2);
        assert_eq!(snap.config_hash, strategy.config().config_hash());
    }
}
