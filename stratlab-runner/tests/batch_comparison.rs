//! Batch comparison: per-row outcomes, continue-on-failure, ranking of the
//! surviving rows.

use chrono::NaiveDate;
use stratlab_core::components::{Indicator, IndicatorValues};
use stratlab_core::indicators::Sma;
use stratlab_core::schema::{params, ParamMap, ParameterDefinition, ParameterSchema};
use stratlab_core::strategy::{
    crossed_above, crossed_below, merge_params, resolve_params,
};
use stratlab_core::{
    MarketSeries, SignalSeries, Signals, Strategy, StrategyDefinition, StrategyError,
    StrategyRegistry,
};
use stratlab_runner::{
    compare_configurations, BacktestOrchestrator, BatchError, EngineConfig, RankingWeights,
    StageError, SyntheticProvider, MarketDataProvider,
};

/// Price vs. its own SMA. Refuses to compute for a window of 13.
#[derive(Debug)]
struct PriceVsSma {
    params: ParamMap,
    window: usize,
    indicators: IndicatorValues,
}

impl StrategyDefinition for PriceVsSma {
    const IDENTIFIER: &'static str = "price_vs_sma";
    const LABEL: &'static str = "Price vs SMA";
    const SHORT_LABEL: &'static str = "PSMA";

    fn schema() -> ParameterSchema {
        ParameterSchema::new().with(
            "window",
            ParameterDefinition::integer(10, 2, 60, "Moving average window"),
        )
    }

    fn from_params(overrides: &ParamMap) -> Result<Self, StrategyError> {
        let params = resolve_params(&Self::schema(), overrides)?;
        let window = params
            .get("window")
            .and_then(|v| v.as_usize())
            .ok_or_else(|| StrategyError::ParameterValidation("window".into()))?;
        Ok(Self {
            params,
            window,
            indicators: IndicatorValues::new(),
        })
    }

    fn predefined_configurations() -> Vec<ParamMap> {
        [5i64, 8, 13, 21, 34]
            .into_iter()
            .map(|w| params([("window", w)]))
            .collect()
    }
}

impl Strategy for PriceVsSma {
    fn identifier(&self) -> &str {
        Self::IDENTIFIER
    }
    fn label(&self) -> &str {
        Self::LABEL
    }
    fn short_label(&self) -> &str {
        Self::SHORT_LABEL
    }
    fn parameter_schema(&self) -> ParameterSchema {
        Self::schema()
    }
    fn parameters(&self) -> &ParamMap {
        &self.params
    }
    fn validate_parameters(&self, candidate: &ParamMap) -> Result<(), StrategyError> {
        Self::from_params(candidate).map(|_| ())
    }
    fn update_parameters(&mut self, overrides: &ParamMap) -> Result<(), StrategyError> {
        *self = Self::from_params(&merge_params(&self.params, overrides))?;
        Ok(())
    }
    fn required_lookback(&self) -> usize {
        self.window
    }
    fn generate_signals(&mut self, data: &MarketSeries) -> Result<Signals, StrategyError> {
        if self.window == 13 {
            return Err(StrategyError::Computation("window 13 is unsupported".into()));
        }
        let sma = Sma::new(self.window).compute(&data.bars);
        let closes = data.closes();
        let dates = data.dates();
        let entries = SignalSeries::new(dates.clone(), crossed_above(&closes, &sma))?;
        let exits = SignalSeries::new(dates, crossed_below(&closes, &sma))?;
        self.indicators.clear();
        self.indicators.insert("sma", sma);
        Ok(Signals::new(entries, exits))
    }
    fn describe(&self) -> String {
        format!("Close crossing its {}-day SMA", self.window)
    }
    fn short_description(&self) -> String {
        format!("PSMA {}", self.window)
    }
    fn indicators(&self) -> &IndicatorValues {
        &self.indicators
    }
}

fn registry() -> StrategyRegistry {
    let mut registry = StrategyRegistry::with_builtin().unwrap();
    registry.register_strategy::<PriceVsSma>().unwrap();
    registry
}

fn data() -> MarketSeries {
    SyntheticProvider::new(
        NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2023, 6, 30).unwrap(),
    )
    .fetch("BATCH", None, None)
    .unwrap()
}

#[test]
fn failing_configuration_does_not_stop_the_batch() {
    let orchestrator = BacktestOrchestrator::new(EngineConfig::default()).unwrap();
    let report = compare_configurations(
        &registry(),
        &orchestrator,
        "Price vs SMA",
        None,
        &data(),
        None,
        None,
        None,
    )
    .unwrap();

    assert_eq!(report.strategy, "Price vs SMA");
    assert_eq!(report.rows.len(), 5);
    assert_eq!(report.success_count(), 4);

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    let (row, err) = failures[0];
    assert_eq!(row.index, 3);
    assert_eq!(row.short_description, "PSMA 13");
    match err {
        BatchError::Backtest(e) => assert!(matches!(
            e.kind(),
            StageError::StrategyExecution { .. }
        )),
        other => panic!("expected a backtest failure, got {other:?}"),
    }

    let descriptions: Vec<&str> = report
        .successes()
        .map(|r| r.strategy.short_description.as_str())
        .collect();
    assert_eq!(descriptions, ["PSMA 5", "PSMA 8", "PSMA 21", "PSMA 34"]);
}

#[test]
fn ranking_covers_successful_rows_only() {
    let orchestrator = BacktestOrchestrator::new(EngineConfig::default()).unwrap();
    let report = compare_configurations(
        &registry(),
        &orchestrator,
        "price_vs_sma",
        None,
        &data(),
        None,
        None,
        None,
    )
    .unwrap();

    let ranked = report.ranked(&RankingWeights::default()).unwrap();
    assert_eq!(ranked.len(), 4);
    let ranks: Vec<usize> = ranked.iter().filter_map(|r| r.rank()).collect();
    assert_eq!(ranks, [1, 2, 3, 4]);
    let scores: Vec<f64> = ranked.iter().filter_map(|r| r.score()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn explicit_configurations_override_presets() {
    let orchestrator = BacktestOrchestrator::new(EngineConfig::default()).unwrap();
    let configs = vec![params([("window", 7i64)]), params([("window", 99i64)])];
    let report = compare_configurations(
        &registry(),
        &orchestrator,
        "price_vs_sma",
        Some(configs),
        &data(),
        None,
        None,
        Some("ALT"),
    )
    .unwrap();

    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[0].outcome.as_ref().unwrap().symbol, "ALT");
    assert!(matches!(
        report.rows[1].outcome,
        Err(BatchError::Construction(StrategyError::ParameterValidation(_)))
    ));
}
