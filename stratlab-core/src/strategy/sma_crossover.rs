//! SMA crossover: golden cross / death cross on two simple moving averages.
//!
//! Entry when the short SMA crosses above the long SMA, exit when it
//! crosses below.

use crate::components::{Indicator, IndicatorValues};
use crate::domain::{MarketSeries, SignalSeries, Signals};
use crate::indicators::Sma;
use crate::schema::{params, ParamMap, ParameterDefinition, ParameterSchema};

use super::{
    crossed_above, crossed_below, ensure_sufficient_data, merge_params, param_usize,
    resolve_params, Strategy, StrategyDefinition, StrategyError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmaCrossoverParams {
    pub short_window: usize,
    pub long_window: usize,
}

impl SmaCrossoverParams {
    fn from_map(p: &ParamMap) -> Result<Self, StrategyError> {
        let parsed = Self {
            short_window: param_usize(p, "short_window")?,
            long_window: param_usize(p, "long_window")?,
        };
        if parsed.short_window >= parsed.long_window {
            return Err(StrategyError::ParameterValidation(format!(
                "short_window ({}) must be less than long_window ({})",
                parsed.short_window, parsed.long_window
            )));
        }
        Ok(parsed)
    }
}

#[derive(Debug, Clone)]
pub struct SmaCrossoverStrategy {
    params: SmaCrossoverParams,
    effective: ParamMap,
    indicators: IndicatorValues,
}

impl SmaCrossoverStrategy {
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, StrategyError> {
        Self::from_params(&params([
            ("short_window", short_window as i64),
            ("long_window", long_window as i64),
        ]))
    }

    pub fn typed_params(&self) -> SmaCrossoverParams {
        self.params
    }
}

impl StrategyDefinition for SmaCrossoverStrategy {
    const IDENTIFIER: &'static str = "sma_crossover";
    const LABEL: &'static str = "Simple Moving Average";
    const SHORT_LABEL: &'static str = "SMA";

    fn schema() -> ParameterSchema {
        ParameterSchema::new()
            .with(
                "short_window",
                ParameterDefinition::integer(20, 5, 100, "Short-term moving average window"),
            )
            .with(
                "long_window",
                ParameterDefinition::integer(50, 10, 200, "Long-term moving average window"),
            )
    }

    fn from_params(overrides: &ParamMap) -> Result<Self, StrategyError> {
        let effective = resolve_params(&Self::schema(), overrides)?;
        let params = SmaCrossoverParams::from_map(&effective)?;
        Ok(Self {
            params,
            effective,
            indicators: IndicatorValues::new(),
        })
    }

    fn predefined_configurations() -> Vec<ParamMap> {
        [
            (5, 15),
            (10, 30),
            (20, 50),
            (12, 26),
            (30, 70),
            (50, 100),
            (50, 200),
            (15, 45),
            (25, 75),
        ]
        .into_iter()
        .map(|(s, l): (i64, i64)| params([("short_window", s), ("long_window", l)]))
        .collect()
    }
}

impl Strategy for SmaCrossoverStrategy {
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
        &self.effective
    }

    fn validate_parameters(&self, candidate: &ParamMap) -> Result<(), StrategyError> {
        let effective = resolve_params(&Self::schema(), candidate)?;
        SmaCrossoverParams::from_map(&effective).map(|_| ())
    }

    fn update_parameters(&mut self, overrides: &ParamMap) -> Result<(), StrategyError> {
        *self = Self::from_params(&merge_params(&self.effective, overrides))?;
        Ok(())
    }

    fn required_lookback(&self) -> usize {
        self.params.long_window
    }

    fn generate_signals(&mut self, data: &MarketSeries) -> Result<Signals, StrategyError> {
        ensure_sufficient_data(data, self.required_lookback(), "SMA crossover")?;

        let short = Sma::new(self.params.short_window).compute(&data.bars);
        let long = Sma::new(self.params.long_window).compute(&data.bars);

        let dates = data.dates();
        let entries = SignalSeries::new(dates.clone(), crossed_above(&short, &long))?;
        let exits = SignalSeries::new(dates, crossed_below(&short, &long))?;

        self.indicators.clear();
        self.indicators.insert("sma_short", short);
        self.indicators.insert("sma_long", long);

        Ok(Signals::new(entries, exits))
    }

    fn describe(&self) -> String {
        let SmaCrossoverParams {
            short_window,
            long_window,
        } = self.params;
        format!(
            "Simple Moving Average Crossover ({short_window}/{long_window})\n\
             Tracks a {short_window}-day and a {long_window}-day simple moving average of the close.\n\
             Buy: the {short_window}-day SMA crosses above the {long_window}-day SMA (golden cross).\n\
             Sell: the {short_window}-day SMA crosses below the {long_window}-day SMA (death cross).\n\
             Signals fire only on the crossing bar, never while the condition merely persists."
        )
    }

    fn short_description(&self) -> String {
        format!(
            "SMA {}/{}",
            self.params.short_window, self.params.long_window
        )
    }

    fn indicators(&self) -> &IndicatorValues {
        &self.indicators
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::{oscillating, series_from_closes};

    #[test]
    fn defaults_and_short_description() {
        let s = SmaCrossoverStrategy::from_params(&ParamMap::new()).unwrap();
        assert_eq!(s.short_description(), "SMA 20/50");
        assert_eq!(s.required_lookback(), 50);
        assert!(s.describe().contains("20-day"));
    }

    #[test]
    fn rejects_short_not_less_than_long() {
        let err = SmaCrossoverStrategy::new(50, 50).unwrap_err();
        assert!(matches!(err, StrategyError::ParameterValidation(_)));
        assert!(err.to_string().contains("must be less than"));
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(SmaCrossoverStrategy::new(4, 50).is_err());
        assert!(SmaCrossoverStrategy::new(20, 201).is_err());
    }

    #[test]
    fn update_revalidates_and_keeps_old_on_error() {
        let mut s = SmaCrossoverStrategy::new(10, 30).unwrap();
        let err = s.update_parameters(&params([("short_window", 40i64)]));
        assert!(err.is_err());
        assert_eq!(s.typed_params().short_window, 10);

        s.update_parameters(&params([("long_window", 60i64)])).unwrap();
        assert_eq!(s.short_description(), "SMA 10/60");
    }

    #[test]
    fn oscillating_prices_cross_both_ways() {
        let data = series_from_closes(&oscillating(200));
        let mut s = SmaCrossoverStrategy::new(5, 15).unwrap();
        let signals = s.generate_signals(&data).unwrap();
        assert_eq!(signals.entries.len(), 200);
        assert!(signals.entries.count() > 0);
        assert!(signals.exits.count() > 0);
        assert_eq!(s.indicators().len(), 2);
        for i in 0..200 {
            assert!(!(signals.entries.get(i) && signals.exits.get(i)));
        }
    }

    #[test]
    fn too_short_series_is_data_error() {
        let data = series_from_closes(&[100.0; 20]);
        let mut s = SmaCrossoverStrategy::new(10, 30).unwrap();
        let err = s.generate_signals(&data).unwrap_err();
        assert!(matches!(err, StrategyError::DataValidation(_)));
    }
}
