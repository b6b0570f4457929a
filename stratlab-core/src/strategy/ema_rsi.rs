//! EMA crossover filtered by RSI momentum.
//!
//! Entry: fast EMA crosses above slow EMA while RSI is above the entry
//! threshold. Exit: fast EMA crosses below slow EMA, or RSI is below the
//! exit threshold. The RSI here uses simple rolling means.

use crate::components::{Indicator, IndicatorValues};
use crate::domain::{MarketSeries, SignalSeries, Signals};
use crate::indicators::{Ema, Rsi};
use crate::schema::{params, ParamMap, ParamValue, ParameterDefinition, ParameterSchema};

use super::{
    and_signals, compare_level, crossed_above, crossed_below, ensure_sufficient_data,
    merge_params, or_signals, param_f64, param_usize, resolve_params, Strategy,
    StrategyDefinition, StrategyError,
};

const STABILITY_BUFFER: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmaRsiParams {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub rsi_entry: f64,
    pub rsi_exit: f64,
}

impl EmaRsiParams {
    fn from_map(p: &ParamMap) -> Result<Self, StrategyError> {
        let parsed = Self {
            ema_fast: param_usize(p, "ema_fast")?,
            ema_slow: param_usize(p, "ema_slow")?,
            rsi_period: param_usize(p, "rsi_period")?,
            rsi_entry: param_f64(p, "rsi_entry")?,
            rsi_exit: param_f64(p, "rsi_exit")?,
        };
        if parsed.ema_fast >= parsed.ema_slow {
            return Err(StrategyError::ParameterValidation(format!(
                "ema_fast ({}) must be less than ema_slow ({})",
                parsed.ema_fast, parsed.ema_slow
            )));
        }
        if parsed.rsi_exit >= parsed.rsi_entry {
            return Err(StrategyError::ParameterValidation(format!(
                "rsi_exit ({}) must be less than rsi_entry ({})",
                parsed.rsi_exit, parsed.rsi_entry
            )));
        }
        Ok(parsed)
    }
}

#[derive(Debug, Clone)]
pub struct EmaRsiStrategy {
    params: EmaRsiParams,
    effective: ParamMap,
    indicators: IndicatorValues,
}

impl EmaRsiStrategy {
    pub fn new(p: EmaRsiParams) -> Result<Self, StrategyError> {
        Self::from_params(&preset(
            p.ema_fast as i64,
            p.ema_slow as i64,
            p.rsi_period as i64,
            p.rsi_entry,
            p.rsi_exit,
        ))
    }

    pub fn typed_params(&self) -> EmaRsiParams {
        self.params
    }
}

fn preset(fast: i64, slow: i64, rsi_period: i64, entry: f64, exit: f64) -> ParamMap {
    let mut p = params([("ema_fast", fast), ("ema_slow", slow), ("rsi_period", rsi_period)]);
    p.insert("rsi_entry".into(), ParamValue::Float(entry));
    p.insert("rsi_exit".into(), ParamValue::Float(exit));
    p
}

impl StrategyDefinition for EmaRsiStrategy {
    const IDENTIFIER: &'static str = "ema_rsi";
    const LABEL: &'static str = "EMA + RSI Strategy";
    const SHORT_LABEL: &'static str = "EMA+RSI";

    fn schema() -> ParameterSchema {
        ParameterSchema::new()
            .with(
                "ema_fast",
                ParameterDefinition::integer(10, 5, 50, "Fast EMA span"),
            )
            .with(
                "ema_slow",
                ParameterDefinition::integer(30, 10, 200, "Slow EMA span"),
            )
            .with(
                "rsi_period",
                ParameterDefinition::integer(14, 5, 50, "RSI calculation period"),
            )
            .with(
                "rsi_entry",
                ParameterDefinition::float(50.0, 40.0, 60.0, "Minimum RSI to confirm an entry"),
            )
            .with(
                "rsi_exit",
                ParameterDefinition::float(40.0, 30.0, 50.0, "RSI level below which to exit"),
            )
    }

    fn from_params(overrides: &ParamMap) -> Result<Self, StrategyError> {
        let effective = resolve_params(&Self::schema(), overrides)?;
        let params = EmaRsiParams::from_map(&effective)?;
        Ok(Self {
            params,
            effective,
            indicators: IndicatorValues::new(),
        })
    }

    /// Grid over fast × slow × entry × exit at RSI period 14, plus a few
    /// hand-picked sets. Entries below 40 are out of range and get
    /// filtered by the registry.
    fn predefined_configurations() -> Vec<ParamMap> {
        let mut configs = Vec::new();
        for fast in [8, 10, 12] {
            for slow in [25, 30, 35] {
                for entry in [40.0, 42.0, 44.0] {
                    for exit in [28.0, 30.0, 32.0] {
                        configs.push(preset(fast, slow, 14, entry, exit));
                    }
                }
            }
        }
        configs.push(preset(15, 45, 21, 55.0, 35.0));
        configs.push(preset(20, 50, 14, 52.0, 38.0));
        configs.push(preset(5, 15, 7, 45.0, 35.0));
        configs.push(preset(8, 21, 10, 48.0, 32.0));
        configs
    }
}

impl Strategy for EmaRsiStrategy {
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
        EmaRsiParams::from_map(&effective).map(|_| ())
    }

    fn update_parameters(&mut self, overrides: &ParamMap) -> Result<(), StrategyError> {
        *self = Self::from_params(&merge_params(&self.effective, overrides))?;
        Ok(())
    }

    fn required_lookback(&self) -> usize {
        self.params.ema_slow.max(self.params.rsi_period) + STABILITY_BUFFER
    }

    fn generate_signals(&mut self, data: &MarketSeries) -> Result<Signals, StrategyError> {
        ensure_sufficient_data(data, self.required_lookback(), "EMA + RSI")?;

        let p = self.params;
        let fast = Ema::new(p.ema_fast).compute(&data.bars);
        let slow = Ema::new(p.ema_slow).compute(&data.bars);
        let rsi = Rsi::simple(p.rsi_period).compute(&data.bars);

        let bullish = crossed_above(&fast, &slow);
        let bearish = crossed_below(&fast, &slow);
        let momentum_ok = compare_level(&rsi, p.rsi_entry, |v, level| v > level);
        let momentum_lost = compare_level(&rsi, p.rsi_exit, |v, level| v < level);

        let dates = data.dates();
        let entries = SignalSeries::new(dates.clone(), and_signals(&bullish, &momentum_ok))?;
        let exits = SignalSeries::new(dates, or_signals(&bearish, &momentum_lost))?;

        self.indicators.clear();
        self.indicators.insert("ema_fast", fast);
        self.indicators.insert("ema_slow", slow);
        self.indicators.insert("rsi", rsi);

        Ok(Signals::new(entries, exits))
    }

    fn describe(&self) -> String {
        let EmaRsiParams {
            ema_fast,
            ema_slow,
            rsi_period,
            rsi_entry,
            rsi_exit,
        } = self.params;
        format!(
            "EMA + RSI Strategy\n\
             Trend: {ema_fast}-span and {ema_slow}-span exponential moving averages.\n\
             Momentum: {rsi_period}-period RSI (simple averages).\n\
             Buy: fast EMA crosses above slow EMA and RSI is above {rsi_entry:.1}.\n\
             Sell: fast EMA crosses below slow EMA, or RSI falls below {rsi_exit:.1}."
        )
    }

    fn short_description(&self) -> String {
        let p = self.params;
        format!(
            "EMA+RSI {}/{} RSI{} ({:.1}/{:.1})",
            p.ema_fast, p.ema_slow, p.rsi_period, p.rsi_entry, p.rsi_exit
        )
    }

    fn indicators(&self) -> &IndicatorValues {
        &self.indicators
    }
}
