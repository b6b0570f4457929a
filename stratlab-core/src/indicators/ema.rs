//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1],
//! alpha = 2 / (span + 1).
//! Seed: EMA[0] = close[0], so there is no warmup gap.

use crate::components::indicator::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    span: usize,
    name: String,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        let span = span.max(1);
        Self {
            span,
            name: format!("ema_{span}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ema_of_series(&closes, self.span)
    }
}

/// Smoothing factor for a span.
pub fn span_alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// EMA over a pre-extracted f64 slice, seeded with the first value.
///
/// A NaN input taints every value from that point on.
pub fn ema_of_series(values: &[f64], span: usize) -> Vec<f64> {
    ewm_of_series(values, span_alpha(span.max(1)))
}

/// Exponentially weighted mean with explicit alpha, seeded with the first value.
pub fn ewm_of_series(values: &[f64], alpha: f64) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    let Some(&first) = values.first() else {
        return result;
    };
    if first.is_nan() {
        return result;
    }
    result[0] = first;

    let mut prev = first;
    for i in 1..n {
        if values[i].is_nan() {
            return result;
        }
        let ema = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = ema;
        prev = ema;
    }
    result
}
