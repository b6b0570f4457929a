//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! Three bands (separate Indicator instances):
//! - Middle: SMA(close, period)
//! - Upper: middle + mult * stddev(close, period)
//! - Lower: middle - mult * stddev(close, period)
//!
//! Uses sample stddev (divide by N-1). A period of 1 has no defined
//! deviation, so the outer bands are NaN.
//! Lookback: period - 1.

use crate::components::indicator::Indicator;
use crate::domain::Bar;

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn new(band: BollingerBand, period: usize, multiplier: f64) -> Self {
        let period = period.max(1);
        let label = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "middle",
            BollingerBand::Lower => "lower",
        };
        Self {
            period,
            multiplier,
            band,
            name: format!("bollinger_{label}_{period}_{multiplier}"),
        }
    }

    pub fn upper(period: usize, multiplier: f64) -> Self {
        Self::new(BollingerBand::Upper, period, multiplier)
    }

    pub fn middle(period: usize, multiplier: f64) -> Self {
        Self::new(BollingerBand::Middle, period, multiplier)
    }

    pub fn lower(period: usize, multiplier: f64) -> Self {
        Self::new(BollingerBand::Lower, period, multiplier)
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let (mean, std) = rolling_mean_std(&closes, self.period);
        match self.band {
            BollingerBand::Middle => mean,
            BollingerBand::Upper => mean
                .iter()
                .zip(&std)
                .map(|(m, s)| m + self.multiplier * s)
                .collect(),
            BollingerBand::Lower => mean
                .iter()
                .zip(&std)
                .map(|(m, s)| m - self.multiplier * s)
                .collect(),
        }
    }
}

/// Rolling mean and sample standard deviation. NaN in a window → NaN.
pub fn rolling_mean_std(values: &[f64], period: usize) -> (Vec<f64>, Vec<f64>) {
    let n = values.len();
    let mut mean = vec![f64::NAN; n];
    let mut std = vec![f64::NAN; n];
    if period == 0 || n < period {
        return (mean, std);
    }

    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let m = window.iter().sum::<f64>() / period as f64;
        mean[i] = m;
        if period > 1 {
            let ss: f64 = window.iter().map(|v| (v - m) * (v - m)).sum();
            std[i] = (ss / (period - 1) as f64).sqrt();
        }
    }
    (mean, std)
}

/// Band width as a percentage of the middle band: (upper - lower) / middle * 100.
pub fn bandwidth(upper: &[f64], middle: &[f64], lower: &[f64]) -> Vec<f64> {
    upper
        .iter()
        .zip(middle)
        .zip(lower)
        .map(|((u, m), l)| (u - l) / m * 100.0)
        .collect()
}

/// Position of close within the bands: (close - lower) / (upper - lower).
///
/// Zero-width bands yield NaN.
pub fn percent_b(closes: &[f64], upper: &[f64], lower: &[f64]) -> Vec<f64> {
    closes
        .iter()
        .zip(upper)
        .zip(lower)
        .map(|((c, u), l)| {
            let width = u - l;
            if width == 0.0 {
                f64::NAN
            } else {
                (c - l) / width
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn bollinger_middle_is_sma() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let result = Bollinger::middle(3, 2.0).compute(&bars);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_uses_sample_stddev() {
        // Window 10, 11, 12: mean 11, sample var = (1 + 0 + 1) / 2 = 1
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let upper = Bollinger::upper(3, 2.0).compute(&bars);
        let lower = Bollinger::lower(3, 2.0).compute(&bars);
        assert_approx(upper[2], 13.0, DEFAULT_EPSILON);
        assert_approx(lower[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_constant_price_zero_width() {
        let bars = make_bars(&[100.0, 100.0, 100.0, 100.0]);
        let upper = Bollinger::upper(3, 2.0).compute(&bars);
        let lower = Bollinger::lower(3, 2.0).compute(&bars);
        assert_approx(upper[2], 100.0, DEFAULT_EPSILON);
        assert_approx(lower[2], 100.0, DEFAULT_EPSILON);
        let pb = percent_b(&[100.0], &upper[2..3], &lower[2..3]);
        assert!(pb[0].is_nan());
    }

    #[test]
    fn bandwidth_and_percent_b() {
        let bw = bandwidth(&[110.0], &[100.0], &[90.0]);
        assert_approx(bw[0], 20.0, DEFAULT_EPSILON);
        let pb = percent_b(&[95.0], &[110.0], &[90.0]);
        assert_approx(pb[0], 0.25, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_nan_propagation() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        bars[2].close = f64::NAN;
        let result = Bollinger::upper(3, 2.0).compute(&bars);
        assert!(result[2].is_nan());
        assert!(result[3].is_nan());
        assert_eq!(Bollinger::upper(20, 2.0).lookback(), 19);
    }
}
