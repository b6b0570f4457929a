//! Batch comparison: one strategy, many parameter sets, one series.
//!
//! Configurations run sequentially. A configuration that fails to build or
//! to backtest is recorded as a failed row and the batch moves on; only an
//! unknown strategy name fails the whole call.

use chrono::NaiveDate;
use stratlab_core::{MarketSeries, ParamMap, RegistryError, StrategyError, StrategyRegistry};
use thiserror::Error;
use tracing::{info, warn};

use crate::orchestrator::{BacktestError, BacktestOrchestrator};
use crate::result::BacktestResult;
use crate::scorer::{rank, RankingWeights, ScoringError};

/// Why a single configuration produced no result.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("invalid configuration: {0}")]
    Construction(#[source] StrategyError),

    #[error(transparent)]
    Backtest(#[from] BacktestError),
}

/// Outcome of one configuration.
#[derive(Debug)]
pub struct BatchRow {
    /// 1-based position in the configuration list
    pub index: usize,
    pub short_description: String,
    pub parameters: ParamMap,
    pub outcome: Result<BacktestResult, BatchError>,
}

impl BatchRow {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Debug)]
pub struct BatchReport {
    /// Display label of the strategy that was compared
    pub strategy: String,
    pub rows: Vec<BatchRow>,
}

impl BatchReport {
    pub fn successes(&self) -> impl Iterator<Item = &BacktestResult> {
        self.rows.iter().filter_map(|r| r.outcome.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&BatchRow, &BatchError)> {
        self.rows
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (r, e)))
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    /// Rank the successful rows only.
    pub fn ranked(&self, weights: &RankingWeights) -> Result<Vec<BacktestResult>, ScoringError> {
        rank(self.successes().cloned().collect(), weights)
    }
}

/// Backtest every configuration of `strategy_name` against `data`.
///
/// With `configurations = None` the strategy's predefined configurations
/// are used; an empty list falls back to a single default configuration.
#[allow(clippy::too_many_arguments)]
pub fn compare_configurations(
    registry: &StrategyRegistry,
    orchestrator: &BacktestOrchestrator,
    strategy_name: &str,
    configurations: Option<Vec<ParamMap>>,
    data: &MarketSeries,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    symbol: Option<&str>,
) -> Result<BatchReport, RegistryError> {
    let entry = registry.resolve(strategy_name)?;
    let mut configurations = match configurations {
        Some(list) => list,
        None => entry.predefined_configurations(),
    };
    if configurations.is_empty() {
        configurations.push(ParamMap::new());
    }

    info!(
        strategy = %entry.label,
        configurations = configurations.len(),
        "Starting batch comparison"
    );

    let mut rows = Vec::with_capacity(configurations.len());
    for (i, params) in configurations.into_iter().enumerate() {
        let index = i + 1;
        let row = match entry.build(&params) {
            Ok(mut strategy) => {
                let short_description = strategy.short_description();
                let parameters = strategy.parameters().clone();
                let outcome = orchestrator
                    .execute_strategy_evaluation(strategy.as_mut(), data, start, end, symbol)
                    .map_err(BatchError::from);
                BatchRow {
                    index,
                    short_description,
                    parameters,
                    outcome,
                }
            }
            Err(e) => BatchRow {
                index,
                short_description: format!("{} {}", entry.short_label, describe_params(&params)),
                parameters: params,
                outcome: Err(BatchError::Construction(e)),
            },
        };
        if let Err(e) = &row.outcome {
            warn!(index, config = %row.short_description, error = %e, "Configuration failed");
        }
        rows.push(row);
    }

    let report = BatchReport {
        strategy: entry.label.clone(),
        rows,
    };
    info!(
        succeeded = report.success_count(),
        total = report.rows.len(),
        "Batch comparison finished"
    );
    Ok(report)
}

fn describe_params(params: &ParamMap) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ")
}
