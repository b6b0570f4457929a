//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a lookback window.
//! Lookback: period - 1 (first valid value at index period-1).

use crate::components::indicator::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    /// A zero period is treated as 1.
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        sma_of_series(&closes, self.period)
    }
}

/// Rolling mean over `values`. Any NaN inside a window makes that window NaN.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let mut sum = 0.0;
    let mut nan_count = 0usize;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            nan_count += 1;
        } else {
            sum += v;
        }
        if i >= period {
            let leaving = values[i - period];
            if leaving.is_nan() {
                nan_count -= 1;
            } else {
                sum -= leaving;
            }
        }
        if i + 1 >= period && nan_count == 0 {
            result[i] = sum / period as f64;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
        let result = Sma::new(5).compute(&bars);

        assert_eq!(result.len(), 7);
        for v in &result[..4] {
            assert!(v.is_nan());
        }
        assert_approx(result[4], 12.0, DEFAULT_EPSILON);
        assert_approx(result[5], 13.0, DEFAULT_EPSILON);
        assert_approx(result[6], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_nan_propagation() {
        let result = sma_of_series(&[10.0, 11.0, f64::NAN, 13.0, 14.0, 15.0], 3);
        assert!(result[2].is_nan());
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
        assert_approx(result[5], 14.0, 1e-9);
    }

    #[test]
    fn sma_lookback_and_short_input() {
        assert_eq!(Sma::new(20).lookback(), 19);
        assert_eq!(Sma::new(0).lookback(), 0);
        let result = Sma::new(5).compute(&make_bars(&[10.0, 11.0]));
        assert!(result.iter().all(|v| v.is_nan()));
    }
}
