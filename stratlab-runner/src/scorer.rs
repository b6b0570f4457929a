//! Performance scoring: extended statistics, the profitability verdict,
//! composite scores and ranking.
//!
//! Everything here is a pure function over `MetricsBundle`s and
//! `BacktestResult`s. `PerformanceScorer` just bundles a criteria/weights
//! pair so callers don't thread both through every call.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::metrics::{keys, mean_f64, std_dev, MetricsBundle, TRADING_DAYS};
use crate::result::{BacktestResult, RankingAnnotation};
use crate::simulator::SimulationOutput;
use crate::tail_metrics::compute_tail_metrics;

/// Errors from scoring and comparison.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScoringError {
    #[error("at least {required} results are required for comparison, got {got}")]
    NotEnoughResults { required: usize, got: usize },

    #[error("result at index {index} has no metrics")]
    MissingMetrics { index: usize },
}

/// Thresholds a result must meet, all at once, to count as profitable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfitabilityCriteria {
    /// Minimum total return (0.10 = 10%).
    pub min_return: f64,
    pub min_sharpe: f64,
    /// Largest tolerated drawdown, as a positive fraction.
    pub max_drawdown: f64,
    pub min_trades: usize,
    pub min_win_rate: f64,
}

impl Default for ProfitabilityCriteria {
    fn default() -> Self {
        Self {
            min_return: 0.10,
            min_sharpe: 1.0,
            max_drawdown: 0.20,
            min_trades: 5,
            min_win_rate: 0.30,
        }
    }
}

/// Metric name → weight for the composite score.
///
/// Weights sum to 1.0 by convention; nothing enforces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankingWeights(BTreeMap<String, f64>);

impl Default for RankingWeights {
    fn default() -> Self {
        Self::from([
            (keys::TOTAL_RETURN, 0.30),
            (keys::SHARPE_RATIO, 0.25),
            (keys::MAX_DRAWDOWN, 0.20),
            (keys::WIN_RATE, 0.15),
            (keys::PROFIT_FACTOR, 0.10),
        ])
    }
}

impl RankingWeights {
    /// Weight for `key`, 0.0 when absent.
    pub fn get(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, key: &str, weight: f64) {
        self.0.insert(key.to_string(), weight);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<const N: usize> From<[(&str, f64); N]> for RankingWeights {
    fn from(pairs: [(&str, f64); N]) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

// ─── Extended statistics ─────────────────────────────────────────────

/// The base metrics of `result` plus risk, trade/portfolio and benchmark
/// statistics.
///
/// Each group degrades to zeros on its own when it cannot be computed; the
/// other groups are unaffected. Base keys are never overwritten.
pub fn compute_extended_stats(result: &BacktestResult) -> MetricsBundle {
    let mut metrics = result.metrics.clone();
    let sim = &result.simulation;

    if sim.returns.is_empty() {
        warn!(strategy = %result.strategy.label, "No returns data available for extended metrics");
        return metrics;
    }

    let risk = risk_metrics(&sim.returns, &result.metrics).unwrap_or_else(|e| {
        warn!(error = %e, "Risk metrics calculation failed");
        zeros(&RISK_KEYS)
    });
    let portfolio = portfolio_metrics(sim, &result.metrics).unwrap_or_else(|e| {
        warn!(error = %e, "Portfolio metrics calculation failed");
        zeros(&PORTFOLIO_KEYS)
    });
    let benchmark = benchmark_metrics(&result.closes, &sim.returns, &result.metrics)
        .unwrap_or_else(|e| {
            warn!(error = %e, "Benchmark metrics calculation failed");
            zeros(&BENCHMARK_KEYS)
        });

    metrics.extend(&risk);
    metrics.extend(&portfolio);
    metrics.extend(&benchmark);

    info!(
        volatility = metrics.get_or(keys::VOLATILITY, 0.0),
        sortino = metrics.get_or(keys::SORTINO_RATIO, 0.0),
        "Extended metrics calculated"
    );
    metrics
}

const RISK_KEYS: [&str; 10] = [
    keys::VOLATILITY,
    keys::ANNUALIZED_RETURN,
    keys::CALMAR_RATIO,
    keys::DOWNSIDE_DEVIATION,
    keys::SORTINO_RATIO,
    keys::VAR_95,
    keys::VAR_99,
    keys::CVAR_95,
    keys::SKEWNESS,
    keys::KURTOSIS,
];

const PORTFOLIO_KEYS: [&str; 9] = [
    keys::AVG_WIN,
    keys::AVG_LOSS,
    keys::LARGEST_WIN,
    keys::LARGEST_LOSS,
    keys::WIN_LOSS_RATIO,
    keys::MARKET_EXPOSURE,
    keys::AVG_DRAWDOWN,
    keys::MAX_DRAWDOWN_DURATION,
    keys::RECOVERY_FACTOR,
];

const BENCHMARK_KEYS: [&str; 3] = [
    keys::BENCHMARK_RETURN,
    keys::INFORMATION_RATIO,
    keys::BETA,
];

fn zeros(names: &[&str]) -> MetricsBundle {
    let mut m = MetricsBundle::new();
    for name in names {
        m.insert(name, 0.0);
    }
    m
}

/// Volatility, annualized return, Calmar, Sortino, VaR/CVaR and moments.
pub fn risk_metrics(returns: &[f64], base: &MetricsBundle) -> Result<MetricsBundle, String> {
    let n = returns.len();
    if n == 0 {
        return Err("empty return sequence".into());
    }
    if let Some(i) = returns.iter().position(|r| !r.is_finite()) {
        return Err(format!("non-finite return at period {i}"));
    }

    let total_return = base.get_or(keys::TOTAL_RETURN, 0.0);
    let max_dd = base.get_or(keys::MAX_DRAWDOWN, 0.0).abs();
    let annualized = total_return * TRADING_DAYS / n as f64;

    let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    let downside_deviation = std_dev(&downside) * TRADING_DAYS.sqrt();
    let tail = compute_tail_metrics(returns);

    let ratio = |num: f64, den: f64| if den > 0.0 { num / den } else { 0.0 };

    let mut m = MetricsBundle::new();
    m.insert(keys::VOLATILITY, std_dev(returns) * TRADING_DAYS.sqrt());
    m.insert(keys::ANNUALIZED_RETURN, annualized);
    m.insert(keys::CALMAR_RATIO, ratio(annualized, max_dd));
    m.insert(keys::DOWNSIDE_DEVIATION, downside_deviation);
    m.insert(keys::SORTINO_RATIO, ratio(annualized, downside_deviation));
    m.insert(keys::VAR_95, tail.var_95);
    m.insert(keys::VAR_99, tail.var_99);
    m.insert(keys::CVAR_95, tail.cvar_95);
    m.insert(keys::SKEWNESS, tail.skewness);
    m.insert(keys::KURTOSIS, tail.kurtosis);
    Ok(m)
}

/// Trade-derived averages and extremes, exposure and drawdown-episode
/// statistics. Drawdown statistics are zero when the equity never dipped.
pub fn portfolio_metrics(
    sim: &SimulationOutput,
    base: &MetricsBundle,
) -> Result<MetricsBundle, String> {
    if let Some(t) = sim.trades.iter().find(|t| t.exit_bar < t.entry_bar) {
        return Err(format!(
            "trade exits at bar {} before entering at bar {}",
            t.exit_bar, t.entry_bar
        ));
    }

    let wins: Vec<f64> = sim.trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl).collect();
    let losses: Vec<f64> = sim.trades.iter().filter(|t| t.is_loser()).map(|t| t.pnl).collect();
    let avg_win = mean_f64(&wins);
    let avg_loss = mean_f64(&losses);

    let mut m = MetricsBundle::new();
    m.insert(keys::AVG_WIN, avg_win);
    m.insert(keys::AVG_LOSS, avg_loss);
    m.insert(keys::LARGEST_WIN, wins.iter().copied().reduce(f64::max).unwrap_or(0.0));
    m.insert(keys::LARGEST_LOSS, losses.iter().copied().reduce(f64::min).unwrap_or(0.0));
    m.insert(
        keys::WIN_LOSS_RATIO,
        if avg_loss != 0.0 { (avg_win / avg_loss).abs() } else { 0.0 },
    );
    m.insert(keys::MARKET_EXPOSURE, sim.exposure);

    let depths: Vec<f64> = sim.drawdowns.iter().map(|d| d.depth).collect();
    m.insert(keys::AVG_DRAWDOWN, mean_f64(&depths));
    m.insert(
        keys::MAX_DRAWDOWN_DURATION,
        sim.drawdowns.iter().map(|d| d.duration()).max().unwrap_or(0) as f64,
    );
    let max_dd = base.get_or(keys::MAX_DRAWDOWN, 0.0).abs();
    let recovery = if max_dd > 0.0 {
        base.get_or(keys::TOTAL_RETURN, 0.0) / max_dd
    } else {
        0.0
    };
    m.insert(keys::RECOVERY_FACTOR, recovery);
    Ok(m)
}

/// Buy-and-hold return, information ratio and beta against the close series.
pub fn benchmark_metrics(
    closes: &[f64],
    returns: &[f64],
    base: &MetricsBundle,
) -> Result<MetricsBundle, String> {
    if closes.len() < 2 {
        return Ok(zeros(&BENCHMARK_KEYS));
    }
    if closes.len() != returns.len() {
        return Err(format!(
            "{} closes do not align with {} returns",
            closes.len(),
            returns.len()
        ));
    }
    let first = closes[0];
    if !(first.is_finite() && first > 0.0) {
        return Err(format!("first close {first} is not a positive price"));
    }

    let n = returns.len() as f64;
    let benchmark_return = closes[closes.len() - 1] / first - 1.0;
    let total_return = base.get_or(keys::TOTAL_RETURN, 0.0);

    let excess: Vec<f64> = returns.iter().map(|r| r - benchmark_return / n).collect();
    let tracking_error = std_dev(&excess) * TRADING_DAYS.sqrt();
    let information_ratio = if tracking_error > 0.0 {
        (total_return - benchmark_return) / tracking_error
    } else {
        0.0
    };

    let bench_returns: Vec<f64> = closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    let beta = beta(&returns[1..], &bench_returns);

    let mut m = MetricsBundle::new();
    m.insert(keys::BENCHMARK_RETURN, benchmark_return);
    m.insert(keys::INFORMATION_RATIO, information_ratio);
    m.insert(keys::BETA, beta);
    Ok(m)
}

/// Sample covariance over population variance of the benchmark; 0 when
/// fewer than two points or the benchmark is flat.
fn beta(strategy: &[f64], benchmark: &[f64]) -> f64 {
    let n = strategy.len().min(benchmark.len());
    if n < 2 {
        return 0.0;
    }
    let (s, b) = (&strategy[..n], &benchmark[..n]);
    let (ms, mb) = (mean_f64(s), mean_f64(b));
    let cov = s.iter().zip(b).map(|(x, y)| (x - ms) * (y - mb)).sum::<f64>() / (n - 1) as f64;
    let var = b.iter().map(|y| (y - mb).powi(2)).sum::<f64>() / n as f64;
    if var > 0.0 {
        cov / var
    } else {
        0.0
    }
}

// ─── Verdict, score, rank ────────────────────────────────────────────

/// True only when every criterion holds.
///
/// A missing `max_drawdown` reads as 1.0 (fails the drawdown check); any
/// other missing key reads as 0.0.
pub fn meets_profitability_criteria(metrics: &MetricsBundle, criteria: &ProfitabilityCriteria) -> bool {
    let return_ok = metrics.get_or(keys::TOTAL_RETURN, 0.0) >= criteria.min_return;
    let sharpe_ok = metrics.get_or(keys::SHARPE_RATIO, 0.0) >= criteria.min_sharpe;
    let drawdown_ok = metrics.get_or(keys::MAX_DRAWDOWN, 1.0).abs() <= criteria.max_drawdown;
    let trades_ok = metrics.get_or(keys::TOTAL_TRADES, 0.0) >= criteria.min_trades as f64;
    let win_rate_ok = metrics.get_or(keys::WIN_RATE, 0.0) >= criteria.min_win_rate;

    let profitable = return_ok && sharpe_ok && drawdown_ok && trades_ok && win_rate_ok;
    debug!(
        return_ok,
        sharpe_ok, drawdown_ok, trades_ok, win_rate_ok, profitable, "Profitability evaluation"
    );
    profitable
}

/// Weighted composite score, never negative.
///
/// Profit factor is capped at 5 before weighting. Fewer than 5 trades halves
/// the score; annualized volatility above 1.0 takes 20% off.
pub fn score(metrics: &MetricsBundle, weights: &RankingWeights) -> f64 {
    let mut s = metrics.get_or(keys::TOTAL_RETURN, 0.0) * weights.get(keys::TOTAL_RETURN)
        + metrics.get_or(keys::SHARPE_RATIO, 0.0) * weights.get(keys::SHARPE_RATIO)
        + (1.0 - metrics.get_or(keys::MAX_DRAWDOWN, 1.0).abs()) * weights.get(keys::MAX_DRAWDOWN)
        + metrics.get_or(keys::WIN_RATE, 0.0) * weights.get(keys::WIN_RATE)
        + metrics.get_or(keys::PROFIT_FACTOR, 0.0).min(5.0) / 5.0 * weights.get(keys::PROFIT_FACTOR);

    if metrics.get_or(keys::TOTAL_TRADES, 0.0) < 5.0 {
        s *= 0.5;
    }
    if metrics.get_or(keys::VOLATILITY, 0.0) > 1.0 {
        s *= 0.8;
    }
    // f64::max drops a NaN operand
    s.max(0.0)
}

/// Sort by score descending, ties in input order, and annotate each result
/// with its score and 1-based rank.
pub fn rank(
    results: Vec<BacktestResult>,
    weights: &RankingWeights,
) -> Result<Vec<BacktestResult>, ScoringError> {
    if let Some(index) = results.iter().position(|r| r.metrics.is_empty()) {
        return Err(ScoringError::MissingMetrics { index });
    }

    let mut scored: Vec<(f64, BacktestResult)> = results
        .into_iter()
        .map(|r| (score(&r.metrics, weights), r))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let ranked: Vec<BacktestResult> = scored
        .into_iter()
        .enumerate()
        .map(|(i, (score, mut r))| {
            r.ranking = Some(RankingAnnotation { score, rank: i + 1 });
            r
        })
        .collect();

    if let Some(best) = ranked.first().and_then(|r| r.score()) {
        info!(count = ranked.len(), best_score = best, "Strategies ranked");
    }
    Ok(ranked)
}

/// Reductions over a ranked set of at least two results.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonSummary {
    pub total: usize,
    pub profitable: usize,
    pub best: BacktestResult,
    pub worst: BacktestResult,
    pub average_return: f64,
    pub average_sharpe: f64,
    pub ranking: Vec<BacktestResult>,
}

impl ComparisonSummary {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.profitable as f64 / self.total as f64
        }
    }
}

pub fn compare_strategies_detailed(
    results: &[BacktestResult],
    criteria: &ProfitabilityCriteria,
    weights: &RankingWeights,
) -> Result<ComparisonSummary, ScoringError> {
    if results.len() < 2 {
        return Err(ScoringError::NotEnoughResults {
            required: 2,
            got: results.len(),
        });
    }
    let ranking = rank(results.to_vec(), weights)?;
    let profitable = results
        .iter()
        .filter(|r| meets_profitability_criteria(&r.metrics, criteria))
        .count();
    let returns: Vec<f64> = results.iter().map(|r| r.total_return()).collect();
    let sharpes: Vec<f64> = results.iter().map(|r| r.sharpe_ratio()).collect();

    let (Some(best), Some(worst)) = (ranking.first().cloned(), ranking.last().cloned()) else {
        return Err(ScoringError::NotEnoughResults {
            required: 2,
            got: 0,
        });
    };

    Ok(ComparisonSummary {
        total: results.len(),
        profitable,
        best,
        worst,
        average_return: mean_f64(&returns),
        average_sharpe: mean_f64(&sharpes),
        ranking,
    })
}

/// Pearson correlation of per-period returns on the dates both results share.
///
/// 0.0 with fewer than two common dates or when either side is flat.
pub fn portfolio_correlation(a: &BacktestResult, b: &BacktestResult) -> f64 {
    let by_date: HashMap<_, _> = b
        .simulation
        .dates
        .iter()
        .zip(&b.simulation.returns)
        .map(|(d, r)| (*d, *r))
        .collect();

    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .simulation
        .dates
        .iter()
        .zip(&a.simulation.returns)
        .filter_map(|(d, &x)| by_date.get(d).map(|&y| (x, y)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .unzip();

    pearson(&xs, &ys)
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() < 2 || xs.len() != ys.len() {
        return 0.0;
    }
    let (mx, my) = (mean_f64(xs), mean_f64(ys));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom > 0.0 && denom.is_finite() {
        sxy / denom
    } else {
        0.0
    }
}

/// A criteria/weights pair applied together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceScorer {
    #[serde(default)]
    pub criteria: ProfitabilityCriteria,
    #[serde(default)]
    pub weights: RankingWeights,
}

impl PerformanceScorer {
    pub fn new(criteria: ProfitabilityCriteria, weights: RankingWeights) -> Self {
        Self { criteria, weights }
    }

    pub fn is_profitable(&self, metrics: &MetricsBundle) -> bool {
        meets_profitability_criteria(metrics, &self.criteria)
    }

    pub fn score(&self, metrics: &MetricsBundle) -> f64 {
        score(metrics, &self.weights)
    }

    pub fn rank(&self, results: Vec<BacktestResult>) -> Result<Vec<BacktestResult>, ScoringError> {
        rank(results, &self.weights)
    }

    pub fn compare(&self, results: &[BacktestResult]) -> Result<ComparisonSummary, ScoringError> {
        compare_strategies_detailed(results, &self.criteria, &self.weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary() -> MetricsBundle {
        MetricsBundle::from([
            (keys::TOTAL_RETURN, 0.10),
            (keys::SHARPE_RATIO, 1.0),
            (keys::MAX_DRAWDOWN, -0.20),
            (keys::TOTAL_TRADES, 5.0),
            (keys::WIN_RATE, 0.30),
        ])
    }

    #[test]
    fn default_criteria_and_weights() {
        let c = ProfitabilityCriteria::default();
        assert_eq!(c.min_trades, 5);
        assert_eq!(c.max_drawdown, 0.20);
        let w = RankingWeights::default();
        let total: f64 = w.iter().map(|(_, v)| v).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(w.get("unknown"), 0.0);
    }

    #[test]
    fn boundary_metrics_are_profitable() {
        assert!(meets_profitability_criteria(&boundary(), &ProfitabilityCriteria::default()));
    }

    #[test]
    fn missing_drawdown_fails() {
        let mut m = MetricsBundle::from([
            (keys::TOTAL_RETURN, 0.5),
            (keys::SHARPE_RATIO, 2.0),
            (keys::TOTAL_TRADES, 10.0),
            (keys::WIN_RATE, 0.6),
        ]);
        assert!(!meets_profitability_criteria(&m, &ProfitabilityCriteria::default()));
        m.insert(keys::MAX_DRAWDOWN, -0.05);
        assert!(meets_profitability_criteria(&m, &ProfitabilityCriteria::default()));
    }

    #[test]
    fn criteria_overrides_via_struct_update() {
        let lenient = ProfitabilityCriteria {
            min_trades: 1,
            min_win_rate: 0.0,
            ..Default::default()
        };
        let mut m = boundary();
        m.insert(keys::TOTAL_TRADES, 1.0);
        m.insert(keys::WIN_RATE, 0.0);
        assert!(meets_profitability_criteria(&m, &lenient));
        assert!(!meets_profitability_criteria(&m, &ProfitabilityCriteria::default()));
    }

    #[test]
    fn recovery_factor_follows_max_drawdown_alone() {
        use crate::simulator::{PortfolioSimulator, SignalSimulator, SimulationRequest};

        let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates: Vec<_> = (0..10).map(|i| base_date + chrono::Duration::days(i)).collect();
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let mut entries = vec![false; 10];
        entries[0] = true;
        let mut sim = SignalSimulator
            .simulate(&SimulationRequest {
                dates: &dates,
                closes: &closes,
                entries: &entries,
                exits: &[false; 10],
                initial_cash: 10_000.0,
                commission: 0.001,
                slippage: 0.0001,
                frequency: "1D",
            })
            .unwrap();
        let base = MetricsBundle::from([
            (keys::TOTAL_RETURN, sim.total_return()),
            (keys::MAX_DRAWDOWN, sim.max_drawdown()),
        ]);
        let expected = sim.total_return() / sim.max_drawdown().abs();
        assert!(expected > 50.0);

        let m = portfolio_metrics(&sim, &base).unwrap();
        assert!((m.get_or(keys::RECOVERY_FACTOR, 0.0) - expected).abs() < 1e-9);

        // Outputs from other simulators may carry no episode list.
        sim.drawdowns.clear();
        let m = portfolio_metrics(&sim, &base).unwrap();
        assert!((m.get_or(keys::RECOVERY_FACTOR, 0.0) - expected).abs() < 1e-9);
        assert_eq!(m.get_or(keys::MAX_DRAWDOWN_DURATION, -1.0), 0.0);
    }

    #[test]
    fn score_formula() {
        let m = MetricsBundle::from([
            (keys::TOTAL_RETURN, 0.2),
            (keys::SHARPE_RATIO, 1.5),
            (keys::MAX_DRAWDOWN, -0.1),
            (keys::WIN_RATE, 0.5),
            (keys::PROFIT_FACTOR, 10.0),
            (keys::TOTAL_TRADES, 8.0),
            (keys::VOLATILITY, 0.2),
        ]);
        let expected = 0.2 * 0.30 + 1.5 * 0.25 + 0.9 * 0.20 + 0.5 * 0.15 + 1.0 * 0.10;
        assert!((score(&m, &RankingWeights::default()) - expected).abs() < 1e-12);
    }

    #[test]
    fn score_penalties_stack() {
        let m = MetricsBundle::from([
            (keys::TOTAL_RETURN, 1.0),
            (keys::MAX_DRAWDOWN, 0.0),
            (keys::TOTAL_TRADES, 2.0),
            (keys::VOLATILITY, 1.5),
        ]);
        let w = RankingWeights::from([(keys::TOTAL_RETURN, 1.0)]);
        assert!((score(&m, &w) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn score_is_never_negative() {
        let m = MetricsBundle::from([
            (keys::TOTAL_RETURN, -0.9),
            (keys::SHARPE_RATIO, -3.0),
            (keys::MAX_DRAWDOWN, -0.9),
            (keys::TOTAL_TRADES, 20.0),
        ]);
        assert_eq!(score(&m, &RankingWeights::default()), 0.0);
    }

    #[test]
    fn risk_metrics_formulas() {
        let returns = [0.01, -0.02, 0.015, -0.005, 0.0, 0.02];
        let base = MetricsBundle::from([(keys::TOTAL_RETURN, 0.06), (keys::MAX_DRAWDOWN, -0.03)]);
        let m = risk_metrics(&returns, &base).unwrap();
        let annualized = 0.06 * 252.0 / 6.0;
        assert!((m.get_or(keys::ANNUALIZED_RETURN, 0.0) - annualized).abs() < 1e-12);
        assert!((m.get_or(keys::CALMAR_RATIO, 0.0) - annualized / 0.03).abs() < 1e-9);
        assert!(m.get_or(keys::SORTINO_RATIO, 0.0) > 0.0);
        assert!(m.get_or(keys::VAR_99, 0.0) <= m.get_or(keys::VAR_95, 0.0));
    }

    #[test]
    fn sortino_is_zero_without_losses() {
        let base = MetricsBundle::from([(keys::TOTAL_RETURN, 0.05)]);
        let m = risk_metrics(&[0.01, 0.02, 0.0], &base).unwrap();
        assert_eq!(m.get(keys::SORTINO_RATIO), Some(0.0));
        assert_eq!(m.get(keys::CALMAR_RATIO), Some(0.0));
    }

    #[test]
    fn benchmark_metrics_beta_of_itself_is_near_one() {
        let closes = [100.0, 102.0, 101.0, 104.0, 103.0, 106.0];
        let mut returns = vec![0.0];
        returns.extend(closes.windows(2).map(|w| w[1] / w[0] - 1.0));
        let base = MetricsBundle::from([(keys::TOTAL_RETURN, 0.06)]);
        let m = benchmark_metrics(&closes, &returns, &base).unwrap();
        assert!((m.get_or(keys::BENCHMARK_RETURN, 0.0) - 0.06).abs() < 1e-12);
        // sample cov / population var = n / (n - 1)
        let n = 5.0;
        assert!((m.get_or(keys::BETA, 0.0) - n / (n - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn benchmark_metrics_reject_misaligned_series() {
        let base = MetricsBundle::new();
        assert!(benchmark_metrics(&[1.0, 2.0, 3.0], &[0.0, 0.1], &base).is_err());
        let short = benchmark_metrics(&[1.0], &[0.0], &base).unwrap();
        assert_eq!(short.get(keys::BETA), Some(0.0));
    }

    #[test]
    fn pearson_handles_degenerate_inputs() {
        assert_eq!(pearson(&[1.0], &[1.0]), 0.0);
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), 0.0);
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) + 1.0).abs() < 1e-12);
    }
}
