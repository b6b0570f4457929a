//! Bollinger Bands mean reversion.
//!
//! Entry when the close crosses below the lower band, exit when it crosses
//! above the upper band.

use crate::components::{Indicator, IndicatorValues};
use crate::domain::{MarketSeries, SignalSeries, Signals};
use crate::indicators::{bandwidth, percent_b, Bollinger};
use crate::schema::{params, ParamMap, ParamValue, ParameterDefinition, ParameterSchema};

use super::{
    crossed_above, crossed_below, ensure_sufficient_data, merge_params, param_f64, param_usize,
    resolve_params, Strategy, StrategyDefinition, StrategyError,
};

const STABILITY_BUFFER: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBandsParams {
    pub period: usize,
    pub std_dev: f64,
}

impl BollingerBandsParams {
    fn from_map(p: &ParamMap) -> Result<Self, StrategyError> {
        Ok(Self {
            period: param_usize(p, "period")?,
            std_dev: param_f64(p, "std_dev")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BollingerBandsStrategy {
    params: BollingerBandsParams,
    effective: ParamMap,
    indicators: IndicatorValues,
}

impl BollingerBandsStrategy {
    pub fn new(period: usize, std_dev: f64) -> Result<Self, StrategyError> {
        Self::from_params(&preset(period as i64, std_dev))
    }

    pub fn typed_params(&self) -> BollingerBandsParams {
        self.params
    }
}

fn preset(period: i64, std_dev: f64) -> ParamMap {
    let mut p = params([("period", period)]);
    p.insert("std_dev".into(), ParamValue::Float(std_dev));
    p
}

impl StrategyDefinition for BollingerBandsStrategy {
    const IDENTIFIER: &'static str = "bollinger_bands";
    const LABEL: &'static str = "Bollinger Bands";
    const SHORT_LABEL: &'static str = "BB";

    fn schema() -> ParameterSchema {
        ParameterSchema::new()
            .with(
                "period",
                ParameterDefinition::integer(20, 5, 50, "Moving average period for the middle band"),
            )
            .with(
                "std_dev",
                ParameterDefinition::float(2.0, 1.0, 3.0, "Standard deviation multiplier for the bands"),
            )
    }

    fn from_params(overrides: &ParamMap) -> Result<Self, StrategyError> {
        let effective = resolve_params(&Self::schema(), overrides)?;
        let params = BollingerBandsParams::from_map(&effective)?;
        Ok(Self {
            params,
            effective,
            indicators: IndicatorValues::new(),
        })
    }

    fn predefined_configurations() -> Vec<ParamMap> {
        [
            (20, 2.0),
            (20, 1.5),
            (20, 2.5),
            (10, 2.0),
            (30, 2.0),
            (50, 2.0),
            (15, 1.8),
            (25, 2.2),
            (12, 2.5),
            (5, 1.0),
            (40, 3.0),
        ]
        .into_iter()
        .map(|(period, k)| preset(period, k))
        .collect()
    }
}

impl Strategy for BollingerBandsStrategy {
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
        BollingerBandsParams::from_map(&effective).map(|_| ())
    }

    fn update_parameters(&mut self, overrides: &ParamMap) -> Result<(), StrategyError> {
        *self = Self::from_params(&merge_params(&self.effective, overrides))?;
        Ok(())
    }

    fn required_lookback(&self) -> usize {
        self.params.period + STABILITY_BUFFER
    }

    fn generate_signals(&mut self, data: &MarketSeries) -> Result<Signals, StrategyError> {
        ensure_sufficient_data(data, self.required_lookback(), "Bollinger Bands")?;

        let BollingerBandsParams { period, std_dev } = self.params;
        let upper = Bollinger::upper(period, std_dev).compute(&data.bars);
        let middle = Bollinger::middle(period, std_dev).compute(&data.bars);
        let lower = Bollinger::lower(period, std_dev).compute(&data.bars);
        let closes = data.closes();

        let dates = data.dates();
        let entries = SignalSeries::new(dates.clone(), crossed_below(&closes, &lower))?;
        let exits = SignalSeries::new(dates, crossed_above(&closes, &upper))?;

        self.indicators.clear();
        self.indicators.insert("bandwidth", bandwidth(&upper, &middle, &lower));
        self.indicators.insert("percent_b", percent_b(&closes, &upper, &lower));
        self.indicators.insert("middle_band", middle);
        self.indicators.insert("upper_band", upper);
        self.indicators.insert("lower_band", lower);

        Ok(Signals::new(entries, exits))
    }

    fn describe(&self) -> String {
        let BollingerBandsParams { period, std_dev } = self.params;
        format!(
            "Bollinger Bands Strategy ({period}-day, {std_dev:.1} std dev)\n\
             Middle band: {period}-day simple moving average of the close.\n\
             Upper/lower bands: middle band +/- {std_dev:.1} sample standard deviations.\n\
             Buy: close crosses below the lower band.\n\
             Sell: close crosses above the upper band."
        )
    }

    fn short_description(&self) -> String {
        format!("BB {}/{:.1}", self.params.period, self.params.std_dev)
    }

    fn indicators(&self) -> &IndicatorValues {
        &self.indicators
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::series_from_closes;

    #[test]
    fn defaults_and_short_description() {
        let s = BollingerBandsStrategy::from_params(&ParamMap::new()).unwrap();
        assert_eq!(s.short_description(), "BB 20/2.0");
        assert_eq!(s.required_lookback(), 25);
    }

    #[test]
    fn std_dev_range_enforced() {
        assert!(BollingerBandsStrategy::new(20, 0.5).is_err());
        assert!(BollingerBandsStrategy::new(20, 3.0).is_ok());
    }

    #[test]
    fn sharp_drop_then_spike_triggers_entry_then_exit() {
        let mut closes = vec![100.0, 101.0].repeat(15);
        closes.push(90.0); // breaks below the lower band
        closes.extend(vec![100.0, 101.0].repeat(5));
        closes.push(115.0); // breaks above the upper band
        let data = series_from_closes(&closes);

        let mut s = BollingerBandsStrategy::new(10, 2.0).unwrap();
        let signals = s.generate_signals(&data).unwrap();
        assert!(signals.entries.get(30));
        assert!(signals.exits.get(41));
        assert_eq!(signals.entries.count(), 1);
        assert_eq!(s.indicators().len(), 5);
    }
}
