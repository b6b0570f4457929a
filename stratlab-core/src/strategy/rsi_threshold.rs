//! RSI threshold: mean reversion on the Relative Strength Index.
//!
//! Entry when RSI crosses below the oversold level, exit when it crosses
//! above the overbought level. RSI uses exponential smoothing.

use crate::components::{Indicator, IndicatorValues};
use crate::domain::{MarketSeries, SignalSeries, Signals};
use crate::indicators::Rsi;
use crate::schema::{params, ParamMap, ParamValue, ParameterDefinition, ParameterSchema};

use super::{
    crossed_above_level, crossed_below_level, ensure_sufficient_data, merge_params, param_f64,
    param_usize, resolve_params, Strategy, StrategyDefinition, StrategyError,
};

/// Bars beyond the RSI period required for the smoothing to settle.
const STABILITY_BUFFER: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiThresholdParams {
    pub period: usize,
    pub oversold_threshold: f64,
    pub overbought_threshold: f64,
}

impl RsiThresholdParams {
    fn from_map(p: &ParamMap) -> Result<Self, StrategyError> {
        let parsed = Self {
            period: param_usize(p, "period")?,
            oversold_threshold: param_f64(p, "oversold_threshold")?,
            overbought_threshold: param_f64(p, "overbought_threshold")?,
        };
        if parsed.oversold_threshold >= parsed.overbought_threshold {
            return Err(StrategyError::ParameterValidation(format!(
                "oversold_threshold ({}) must be less than overbought_threshold ({})",
                parsed.oversold_threshold, parsed.overbought_threshold
            )));
        }
        Ok(parsed)
    }
}

#[derive(Debug, Clone)]
pub struct RsiThresholdStrategy {
    params: RsiThresholdParams,
    effective: ParamMap,
    indicators: IndicatorValues,
}

impl RsiThresholdStrategy {
    pub fn new(period: usize, oversold: f64, overbought: f64) -> Result<Self, StrategyError> {
        let mut overrides = params([("period", period as i64)]);
        overrides.insert("oversold_threshold".into(), ParamValue::Float(oversold));
        overrides.insert("overbought_threshold".into(), ParamValue::Float(overbought));
        Self::from_params(&overrides)
    }

    pub fn typed_params(&self) -> RsiThresholdParams {
        self.params
    }
}

fn preset(period: i64, oversold: f64, overbought: f64) -> ParamMap {
    let mut p = params([("period", period)]);
    p.insert("oversold_threshold".into(), ParamValue::Float(oversold));
    p.insert("overbought_threshold".into(), ParamValue::Float(overbought));
    p
}

impl StrategyDefinition for RsiThresholdStrategy {
    const IDENTIFIER: &'static str = "rsi_threshold";
    const LABEL: &'static str = "Relative Strength Index";
    const SHORT_LABEL: &'static str = "RSI";

    fn schema() -> ParameterSchema {
        ParameterSchema::new()
            .with(
                "period",
                ParameterDefinition::integer(14, 2, 50, "RSI calculation period"),
            )
            .with(
                "oversold_threshold",
                ParameterDefinition::float(30.0, 10.0, 40.0, "RSI level treated as oversold (buy)"),
            )
            .with(
                "overbought_threshold",
                ParameterDefinition::float(
                    70.0,
                    60.0,
                    90.0,
                    "RSI level treated as overbought (sell)",
                ),
            )
    }

    fn from_params(overrides: &ParamMap) -> Result<Self, StrategyError> {
        let effective = resolve_params(&Self::schema(), overrides)?;
        let params = RsiThresholdParams::from_map(&effective)?;
        Ok(Self {
            params,
            effective,
            indicators: IndicatorValues::new(),
        })
    }

    fn predefined_configurations() -> Vec<ParamMap> {
        vec![
            preset(7, 30.0, 70.0),
            preset(14, 30.0, 70.0),
            preset(21, 30.0, 70.0),
            preset(14, 35.0, 65.0),
            preset(14, 40.0, 60.0),
            preset(14, 25.0, 75.0),
            preset(14, 20.0, 80.0),
            preset(9, 25.0, 75.0),
            preset(28, 35.0, 65.0),
        ]
    }
}

impl Strategy for RsiThresholdStrategy {
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
        RsiThresholdParams::from_map(&effective).map(|_| ())
    }

    fn update_parameters(&mut self, overrides: &ParamMap) -> Result<(), StrategyError> {
        *self = Self::from_params(&merge_params(&self.effective, overrides))?;
        Ok(())
    }

    fn required_lookback(&self) -> usize {
        self.params.period + STABILITY_BUFFER
    }

    fn generate_signals(&mut self, data: &MarketSeries) -> Result<Signals, StrategyError> {
        ensure_sufficient_data(data, self.required_lookback(), "RSI calculation")?;

        let p = self.params;
        let rsi = Rsi::exponential(p.period).compute(&data.bars);

        let dates = data.dates();
        let entries = SignalSeries::new(dates.clone(), crossed_below_level(&rsi, p.oversold_threshold))?;
        let exits = SignalSeries::new(dates, crossed_above_level(&rsi, p.overbought_threshold))?;

        let n = rsi.len();
        self.indicators.clear();
        self.indicators.insert("rsi", rsi);
        self.indicators.insert("oversold_line", vec![p.oversold_threshold; n]);
        self.indicators.insert("overbought_line", vec![p.overbought_threshold; n]);

        Ok(Signals::new(entries, exits))
    }

    fn describe(&self) -> String {
        let RsiThresholdParams {
            period,
            oversold_threshold,
            overbought_threshold,
        } = self.params;
        format!(
            "RSI Threshold Strategy (period {period})\n\
             Computes a {period}-period Relative Strength Index with exponential smoothing.\n\
             Buy: RSI crosses below {oversold_threshold:.1} (oversold).\n\
             Sell: RSI crosses above {overbought_threshold:.1} (overbought).\n\
             Works best in ranging markets; strong trends can hold RSI at an extreme."
        )
    }

    fn short_description(&self) -> String {
        format!(
            "RSI {} ({:.1}/{:.1})",
            self.params.period, self.params.oversold_threshold, self.params.overbought_threshold
        )
    }

    fn indicators(&self) -> &IndicatorValues {
        &self.indicators
    }
}
