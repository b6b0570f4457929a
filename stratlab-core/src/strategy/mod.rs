//! Strategy abstraction: parameterized rules mapping a price series to
//! entry/exit signals.
//!
//! Two traits:
//! - `Strategy`: object-safe runtime interface. The registry hands out
//!   `Box<dyn Strategy>`.
//! - `StrategyDefinition`: static identity, schema and constructor of a
//!   concrete type. Registration is driven from it.
//!
//! Signals are edge-triggered: a crossing fires only on the bar where the
//! comparison flips from false to true. Comparisons involving an undefined
//! (NaN) indicator value are themselves undefined and never fire.

pub mod bollinger_bands;
pub mod ema_rsi;
pub mod rsi_threshold;
pub mod sma_crossover;

pub use bollinger_bands::{BollingerBandsParams, BollingerBandsStrategy};
pub use ema_rsi::{EmaRsiParams, EmaRsiStrategy};
pub use rsi_threshold::{RsiThresholdParams, RsiThresholdStrategy};
pub use sma_crossover::{SmaCrossoverParams, SmaCrossoverStrategy};

use crate::components::IndicatorValues;
use crate::domain::{MarketSeries, Signals};
use crate::fingerprint::StrategyConfig;
use crate::schema::{ParamMap, ParameterSchema};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("parameter validation failed: {0}")]
    ParameterValidation(String),

    #[error("data validation failed: {0}")]
    DataValidation(String),

    #[error("signal computation failed: {0}")]
    Computation(String),
}

/// Runtime strategy interface.
pub trait Strategy: Send + Sync + fmt::Debug {
    /// Stable registry key (e.g. "sma_crossover").
    fn identifier(&self) -> &str;

    /// Display label (e.g. "Simple Moving Average").
    fn label(&self) -> &str;

    /// Compact label (e.g. "SMA").
    fn short_label(&self) -> &str;

    fn parameter_schema(&self) -> ParameterSchema;

    /// Effective, validated parameters.
    fn parameters(&self) -> &ParamMap;

    /// Check a complete candidate parameter map: schema types and ranges,
    /// then cross-parameter constraints.
    fn validate_parameters(&self, candidate: &ParamMap) -> Result<(), StrategyError>;

    /// Merge `overrides` onto the current parameters, revalidate, then commit.
    ///
    /// On error the strategy is left unchanged.
    fn update_parameters(&mut self, overrides: &ParamMap) -> Result<(), StrategyError>;

    /// Minimum number of bars `generate_signals` accepts.
    fn required_lookback(&self) -> usize;

    /// Compute entry and exit signals aligned 1:1 with `data`.
    ///
    /// Records the indicator series it computed (see [`Strategy::indicators`]).
    fn generate_signals(&mut self, data: &MarketSeries) -> Result<Signals, StrategyError>;

    /// Multi-line, parameter-interpolated explanation.
    fn describe(&self) -> String;

    /// One-line summary such as "SMA 20/50".
    fn short_description(&self) -> String;

    /// Indicator series from the most recent `generate_signals` call.
    fn indicators(&self) -> &IndicatorValues;

    fn config(&self) -> StrategyConfig {
        StrategyConfig::new(self.identifier(), self.parameters().clone())
    }
}

/// Static side of a concrete strategy type.
pub trait StrategyDefinition: Strategy + Sized + 'static {
    const IDENTIFIER: &'static str;
    const LABEL: &'static str;
    const SHORT_LABEL: &'static str;

    /// Declared parameters. An empty schema makes the registry infer
    /// definitions from a default-constructed instance.
    fn schema() -> ParameterSchema;

    /// Construct from overrides merged onto the schema defaults.
    fn from_params(overrides: &ParamMap) -> Result<Self, StrategyError>;

    /// Parameter sets for batch comparison. May contain invalid
    /// combinations; the registry filters them through `from_params`.
    fn predefined_configurations() -> Vec<ParamMap> {
        Vec::new()
    }
}

// ─── Parameter helpers ──────────────────────────────────────────────

/// Resolve `overrides` against `schema`, mapping failures to `ParameterValidation`.
pub fn resolve_params(
    schema: &ParameterSchema,
    overrides: &ParamMap,
) -> Result<ParamMap, StrategyError> {
    schema
        .resolve(overrides)
        .map_err(StrategyError::ParameterValidation)
}

/// `current` with `overrides` applied on top.
pub fn merge_params(current: &ParamMap, overrides: &ParamMap) -> ParamMap {
    let mut merged = current.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

pub(crate) fn param_usize(params: &ParamMap, name: &str) -> Result<usize, StrategyError> {
    params
        .get(name)
        .and_then(|v| v.as_usize())
        .ok_or_else(|| {
            StrategyError::ParameterValidation(format!(
                "Parameter '{name}' must be a non-negative integer"
            ))
        })
}

pub(crate) fn param_f64(params: &ParamMap, name: &str) -> Result<f64, StrategyError> {
    params.get(name).and_then(|v| v.as_f64()).ok_or_else(|| {
        StrategyError::ParameterValidation(format!("Parameter '{name}' must be numeric"))
    })
}

/// Fail with `DataValidation` when `data` is shorter than `required`.
pub fn ensure_sufficient_data(
    data: &MarketSeries,
    required: usize,
    label: &str,
) -> Result<(), StrategyError> {
    if data.len() < required {
        return Err(StrategyError::DataValidation(format!(
            "Insufficient data: {} rows available, but at least {required} rows required for {label}",
            data.len()
        )));
    }
    Ok(())
}

// ─── Crossing helpers ───────────────────────────────────────────────

fn defined(values: &[f64]) -> bool {
    values.iter().all(|v| !v.is_nan())
}

/// `a` crosses above `b`: `a[i] > b[i]` and `a[i-1] <= b[i-1]`.
pub fn crossed_above(a: &[f64], b: &[f64]) -> Vec<Option<bool>> {
    crossing(a, b, |cur_a, cur_b, prev_a, prev_b| {
        cur_a > cur_b && prev_a <= prev_b
    })
}

/// `a` crosses below `b`: `a[i] < b[i]` and `a[i-1] >= b[i-1]`.
pub fn crossed_below(a: &[f64], b: &[f64]) -> Vec<Option<bool>> {
    crossing(a, b, |cur_a, cur_b, prev_a, prev_b| {
        cur_a < cur_b && prev_a >= prev_b
    })
}

pub fn crossed_above_level(a: &[f64], level: f64) -> Vec<Option<bool>> {
    crossed_above(a, &vec![level; a.len()])
}

pub fn crossed_below_level(a: &[f64], level: f64) -> Vec<Option<bool>> {
    crossed_below(a, &vec![level; a.len()])
}

fn crossing(
    a: &[f64],
    b: &[f64],
    rule: impl Fn(f64, f64, f64, f64) -> bool,
) -> Vec<Option<bool>> {
    let n = a.len().min(b.len());
    let mut out = vec![None; n];
    for i in 1..n {
        if defined(&[a[i], b[i], a[i - 1], b[i - 1]]) {
            out[i] = Some(rule(a[i], b[i], a[i - 1], b[i - 1]));
        }
    }
    out
}

/// Level comparison per bar; undefined where the value is NaN.
pub fn compare_level(a: &[f64], level: f64, rule: impl Fn(f64, f64) -> bool) -> Vec<Option<bool>> {
    a.iter()
        .map(|&v| if v.is_nan() { None } else { Some(rule(v, level)) })
        .collect()
}

/// Three-valued AND: false wins over undefined.
pub fn and_signals(a: &[Option<bool>], b: &[Option<bool>]) -> Vec<Option<bool>> {
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        })
        .collect()
}

/// Three-valued OR: true wins over undefined.
pub fn or_signals(a: &[Option<bool>], b: &[Option<bool>]) -> Vec<Option<bool>> {
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        })
        .collect()
}
