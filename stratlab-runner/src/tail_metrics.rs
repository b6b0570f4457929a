//! Tail risk metrics: VaR, CVaR, skewness, kurtosis.
//!
//! Distribution shape statistics over a per-period return sequence. All
//! functions are pure: returns in, scalar out.

use serde::{Deserialize, Serialize};

use crate::metrics::mean_f64;

/// Below this many observations skewness and kurtosis are reported as 0.
pub const MIN_MOMENT_OBSERVATIONS: usize = 4;

/// Tail risk statistics of a return sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailMetrics {
    /// 5th percentile of returns (a loss is negative).
    pub var_95: f64,
    /// 1st percentile of returns.
    pub var_99: f64,
    /// Mean of the returns at or below `var_95`.
    pub cvar_95: f64,
    /// Adjusted Fisher–Pearson sample skewness.
    pub skewness: f64,
    /// Bias-corrected excess kurtosis (0 for a normal distribution).
    pub kurtosis: f64,
    pub sample_size: usize,
}

/// Compute all tail metrics. An empty sequence yields all zeros.
pub fn compute_tail_metrics(returns: &[f64]) -> TailMetrics {
    if returns.is_empty() {
        return TailMetrics {
            var_95: 0.0,
            var_99: 0.0,
            cvar_95: 0.0,
            skewness: 0.0,
            kurtosis: 0.0,
            sample_size: 0,
        };
    }
    let var_95 = percentile(returns, 5.0);
    TailMetrics {
        var_95,
        var_99: percentile(returns, 1.0),
        cvar_95: cvar(returns, var_95),
        skewness: skewness(returns),
        kurtosis: excess_kurtosis(returns),
        sample_size: returns.len(),
    }
}

/// Percentile with linear interpolation between order statistics.
///
/// `q` is in percent (0–100). Returns 0.0 for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Mean of the returns at or below `threshold`.
pub fn cvar(returns: &[f64], threshold: f64) -> f64 {
    let tail: Vec<f64> = returns.iter().copied().filter(|&r| r <= threshold).collect();
    mean_f64(&tail)
}

/// Adjusted Fisher–Pearson standardized moment coefficient.
///
/// G1 = sqrt(n(n-1)) / (n-2) · m3 / m2^1.5
fn skewness(returns: &[f64]) -> f64 {
    let n = returns.len();
    if n < MIN_MOMENT_OBSERVATIONS {
        return 0.0;
    }
    let (m2, m3, _) = central_moments(returns);
    if m2 < 1e-30 {
        return 0.0;
    }
    let n = n as f64;
    let g1 = m3 / m2.powf(1.5);
    (n * (n - 1.0)).sqrt() / (n - 2.0) * g1
}

/// Bias-corrected excess kurtosis.
///
/// G2 = (n-1) / ((n-2)(n-3)) · ((n+1)·g2 + 6), with g2 = m4/m2² - 3
fn excess_kurtosis(returns: &[f64]) -> f64 {
    let n = returns.len();
    if n < MIN_MOMENT_OBSERVATIONS {
        return 0.0;
    }
    let (m2, _, m4) = central_moments(returns);
    if m2 < 1e-30 {
        return 0.0;
    }
    let n = n as f64;
    let g2 = m4 / (m2 * m2) - 3.0;
    (n - 1.0) / ((n - 2.0) * (n - 3.0)) * ((n + 1.0) * g2 + 6.0)
}

/// Population central moments (m2, m3, m4).
fn central_moments(values: &[f64]) -> (f64, f64, f64) {
    let n = values.len() as f64;
    let mean = mean_f64(values);
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (m2 / n, m3 / n, m4 / n)
}

// ─── Tests ───────────────────────────────────────────────────────────
