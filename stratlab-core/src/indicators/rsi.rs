//! Relative Strength Index (RSI).
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//!
//! Two smoothing modes for the average gain and loss:
//! - `Exponential`: EWM with alpha = 2/(period+1), seeded with zero change
//!   on the first bar. Valid from index 1.
//! - `Simple`: rolling mean over `period` changes. Valid from index `period`.
//!
//! Index 0 is always NaN (no change exists yet).
//! Edge cases: avg_loss == 0 with gains → 100; both zero (flat window) → 0.

use crate::components::indicator::Indicator;
use crate::domain::Bar;

use super::ema::span_alpha;
use super::sma::sma_of_series;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsiSmoothing {
    Exponential,
    Simple,
}

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    smoothing: RsiSmoothing,
    name: String,
}

impl Rsi {
    pub fn new(period: usize, smoothing: RsiSmoothing) -> Self {
        let period = period.max(1);
        Self {
            period,
            smoothing,
            name: format!("rsi_{period}"),
        }
    }

    pub fn exponential(period: usize) -> Self {
        Self::new(period, RsiSmoothing::Exponential)
    }

    pub fn simple(period: usize) -> Self {
        Self::new(period, RsiSmoothing::Simple)
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        match self.smoothing {
            RsiSmoothing::Exponential => 1,
            RsiSmoothing::Simple => self.period,
        }
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        rsi_of_series(&closes, self.period, self.smoothing)
    }
}

/// RSI over a pre-extracted close series.
pub fn rsi_of_series(values: &[f64], period: usize, smoothing: RsiSmoothing) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    let mut gains = vec![f64::NAN; n];
    let mut losses = vec![f64::NAN; n];
    for i in 1..n {
        let change = values[i] - values[i - 1];
        if change.is_nan() {
            continue;
        }
        gains[i] = change.max(0.0);
        losses[i] = (-change).max(0.0);
    }

    let (avg_gain, avg_loss) = match smoothing {
        RsiSmoothing::Exponential => {
            let alpha = span_alpha(period.max(1));
            (smooth_exponential(&gains, alpha), smooth_exponential(&losses, alpha))
        }
        RsiSmoothing::Simple => (
            sma_of_series(&gains, period.max(1)),
            sma_of_series(&losses, period.max(1)),
        ),
    };

    let mut result: Vec<f64> = avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&g, &l)| compute_rsi(g, l))
        .collect();
    result[0] = f64::NAN;
    result
}

/// EWM over changes with the undefined first change treated as zero.
/// A later NaN change taints the rest.
fn smooth_exponential(changes: &[f64], alpha: f64) -> Vec<f64> {
    let mut result = vec![f64::NAN; changes.len()];
    let mut prev = 0.0;
    for (i, &ch) in changes.iter().enumerate() {
        let ch = if i == 0 { 0.0 } else { ch };
        if ch.is_nan() {
            return result;
        }
        prev = if i == 0 { ch } else { alpha * ch + (1.0 - alpha) * prev };
        result[i] = prev;
    }
    result
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        f64::NAN
    } else if avg_loss == 0.0 && avg_gain == 0.0 {
        0.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        (100.0 - 100.0 / (1.0 + avg_gain / avg_loss)).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn rsi_all_gains() {
        let bars = make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
        let result = Rsi::exponential(3).compute(&bars);
        assert!(result[0].is_nan());
        assert_approx(result[1], 100.0, 1e-9);
        assert_approx(result[5], 100.0, 1e-9);
    }

    #[test]
    fn rsi_all_losses() {
        let bars = make_bars(&[105.0, 104.0, 103.0, 102.0, 101.0, 100.0]);
        let result = Rsi::simple(3).compute(&bars);
        assert_approx(result[3], 0.0, 1e-9);
    }

    #[test]
    fn rsi_simple_known_value() {
        // Changes: +0.34, -0.25, -0.48
        // avg_gain = 0.34/3, avg_loss = 0.73/3
        // RSI[3] = 100 - 100/(1 + 0.34/0.73)
        let result = rsi_of_series(&[44.0, 44.34, 44.09, 43.61], 3, RsiSmoothing::Simple);
        assert!(result[..3].iter().all(|v| v.is_nan()));
        assert_approx(result[3], 100.0 - 100.0 / (1.0 + 0.34 / 0.73), 1e-9);
    }

    #[test]
    fn rsi_exponential_known_value() {
        // alpha = 0.5
        // gains:  0, 2, 0   → avg 0, 1, 0.5
        // losses: 0, 0, 1   → avg 0, 0, 0.5
        let result = rsi_of_series(&[10.0, 12.0, 11.0], 3, RsiSmoothing::Exponential);
        assert!(result[0].is_nan());
        assert_approx(result[1], 100.0, 1e-9);
        assert_approx(result[2], 50.0, 1e-9);
    }

    #[test]
    fn rsi_flat_reads_zero() {
        let result = rsi_of_series(&[5.0, 5.0, 5.0], 2, RsiSmoothing::Exponential);
        assert_approx(result[1], 0.0, 1e-9);
        assert_approx(result[2], 0.0, 1e-9);
    }

    #[test]
    fn rsi_simple_flat_window_after_rally_reads_zero() {
        let mut closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        closes.extend(std::iter::repeat(119.0).take(20));
        let result = rsi_of_series(&closes, 14, RsiSmoothing::Simple);
        assert_approx(result[19], 100.0, 1e-9);
        // window still holds gains, no losses
        assert_approx(result[25], 100.0, 1e-9);
        assert_approx(result[39], 0.0, 1e-9);
    }

    #[test]
    fn rsi_bounds() {
        let closes = [100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0];
        for smoothing in [RsiSmoothing::Exponential, RsiSmoothing::Simple] {
            for (i, &v) in rsi_of_series(&closes, 3, smoothing).iter().enumerate() {
                if !v.is_nan() {
                    assert!((0.0..=100.0).contains(&v), "RSI out of bounds at bar {i}: {v}");
                }
            }
        }
    }

    #[test]
    fn rsi_lookback() {
        assert_eq!(Rsi::simple(14).lookback(), 14);
        assert_eq!(Rsi::exponential(14).lookback(), 1);
        assert_eq!(Rsi::simple(14).name(), "rsi_14");
    }
}
