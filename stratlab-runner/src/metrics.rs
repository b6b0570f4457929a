//! Performance metrics: the `MetricsBundle` plus the pure functions behind it.
//!
//! Every metric is a pure function: equity curve, return sequence or trade
//! list in, scalar out. The bundle is a flat name → value map so extended
//! statistics can be merged in without changing its shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::simulator::{SimulationOutput, TradeRecord};

/// Metric names used across the runner.
pub mod keys {
    pub const TOTAL_RETURN: &str = "total_return";
    pub const SHARPE_RATIO: &str = "sharpe_ratio";
    pub const MAX_DRAWDOWN: &str = "max_drawdown";
    pub const WIN_RATE: &str = "win_rate";
    pub const TOTAL_TRADES: &str = "total_trades";
    pub const WINNING_TRADES: &str = "winning_trades";
    pub const LOSING_TRADES: &str = "losing_trades";
    pub const AVG_TRADE_DURATION: &str = "avg_trade_duration";
    pub const PROFIT_FACTOR: &str = "profit_factor";
    pub const BUY_HOLD_RETURN: &str = "buy_hold_return";
    pub const FINAL_VALUE: &str = "final_value";
    pub const ALPHA: &str = "alpha";
    pub const VOLATILITY: &str = "volatility";

    /// The keys every assembled result carries.
    pub const BASE: [&str; 13] = [
        TOTAL_RETURN,
        SHARPE_RATIO,
        MAX_DRAWDOWN,
        WIN_RATE,
        TOTAL_TRADES,
        WINNING_TRADES,
        LOSING_TRADES,
        AVG_TRADE_DURATION,
        PROFIT_FACTOR,
        BUY_HOLD_RETURN,
        FINAL_VALUE,
        ALPHA,
        VOLATILITY,
    ];

    // Extended statistics.
    pub const ANNUALIZED_RETURN: &str = "annualized_return";
    pub const CALMAR_RATIO: &str = "calmar_ratio";
    pub const DOWNSIDE_DEVIATION: &str = "downside_deviation";
    pub const SORTINO_RATIO: &str = "sortino_ratio";
    pub const VAR_95: &str = "var_95";
    pub const VAR_99: &str = "var_99";
    pub const CVAR_95: &str = "cvar_95";
    pub const SKEWNESS: &str = "skewness";
    pub const KURTOSIS: &str = "kurtosis";
    pub const AVG_WIN: &str = "avg_win";
    pub const AVG_LOSS: &str = "avg_loss";
    pub const LARGEST_WIN: &str = "largest_win";
    pub const LARGEST_LOSS: &str = "largest_loss";
    pub const WIN_LOSS_RATIO: &str = "win_loss_ratio";
    pub const MARKET_EXPOSURE: &str = "market_exposure";
    pub const AVG_DRAWDOWN: &str = "avg_drawdown";
    pub const MAX_DRAWDOWN_DURATION: &str = "max_drawdown_duration";
    pub const RECOVERY_FACTOR: &str = "recovery_factor";
    pub const BENCHMARK_RETURN: &str = "benchmark_return";
    pub const INFORMATION_RATIO: &str = "information_ratio";
    pub const BETA: &str = "beta";
}

/// Flat metric name → value mapping.
///
/// Values are always finite: `insert` stores 0.0 in place of NaN or ±inf.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsBundle(BTreeMap<String, f64>);

impl MetricsBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The degenerate bundle used when metric computation fails: every
    /// base key zero, except `final_value` which is the starting cash.
    pub fn defaults(initial_cash: f64) -> Self {
        let mut bundle = Self::new();
        for key in keys::BASE {
            bundle.insert(key, 0.0);
        }
        bundle.insert(keys::FINAL_VALUE, initial_cash);
        bundle
    }

    pub fn insert(&mut self, key: &str, value: f64) {
        let value = if value.is_finite() {
            value
        } else {
            debug!(metric = key, %value, "Non-finite metric replaced with 0.0");
            0.0
        };
        self.0.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn get_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Add every key of `other` that is not already present. Existing
    /// values are never overwritten. Returns the number of keys added.
    pub fn extend(&mut self, other: &MetricsBundle) -> usize {
        let mut added = 0;
        for (key, &value) in &other.0 {
            if !self.0.contains_key(key) {
                self.insert(key, value);
                added += 1;
            }
        }
        added
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[(&str, f64); N]> for MetricsBundle {
    fn from(pairs: [(&str, f64); N]) -> Self {
        let mut bundle = Self::new();
        for (k, v) in pairs {
            bundle.insert(k, v);
        }
        bundle
    }
}

/// Derive the 13 base metrics from a simulation and the close series it ran on.
///
/// Fails when the inputs cannot produce a meaningful benchmark or total
/// return; callers fall back to `MetricsBundle::defaults`.
pub fn compute_base_metrics(
    output: &SimulationOutput,
    closes: &[f64],
) -> Result<MetricsBundle, String> {
    if output.equity.is_empty() {
        return Err("simulation produced an empty equity curve".into());
    }
    if output.equity.len() != closes.len() {
        return Err(format!(
            "equity curve has {} points but the close series has {}",
            output.equity.len(),
            closes.len()
        ));
    }
    let buy_hold = buy_and_hold_return(closes)
        .ok_or_else(|| "buy-and-hold return is undefined for this close series".to_string())?;
    let total = output.total_return();
    if !total.is_finite() {
        return Err(format!("total return is not finite ({total})"));
    }

    let mut m = MetricsBundle::new();
    m.insert(keys::TOTAL_RETURN, total);
    m.insert(keys::SHARPE_RATIO, output.sharpe_ratio());
    m.insert(keys::MAX_DRAWDOWN, output.max_drawdown());
    m.insert(keys::WIN_RATE, output.win_rate());
    m.insert(keys::TOTAL_TRADES, output.trade_count() as f64);
    m.insert(keys::WINNING_TRADES, output.winning_trades() as f64);
    m.insert(keys::LOSING_TRADES, output.losing_trades() as f64);
    m.insert(keys::AVG_TRADE_DURATION, output.avg_trade_duration());
    m.insert(keys::PROFIT_FACTOR, output.profit_factor());
    m.insert(keys::BUY_HOLD_RETURN, buy_hold);
    m.insert(keys::FINAL_VALUE, output.final_value());
    m.insert(keys::ALPHA, total - buy_hold);
    m.insert(keys::VOLATILITY, volatility(&output.returns));
    Ok(m)
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&initial), Some(&last)) if equity_curve.len() >= 2 && initial > 0.0 => {
            (last - initial) / initial
        }
        _ => 0.0,
    }
}

/// `close[last] / close[first] - 1`, or `None` when the first close is not
/// a positive number.
pub fn buy_and_hold_return(closes: &[f64]) -> Option<f64> {
    let first = *closes.first()?;
    let last = *closes.last()?;
    if !(first.is_finite() && first > 0.0 && last.is_finite()) {
        return None;
    }
    Some(last / first - 1.0)
}

/// Annualized volatility: sample std of per-period returns times √252.
pub fn volatility(returns: &[f64]) -> f64 {
    std_dev(returns) * TRADING_DAYS.sqrt()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity is constant or monotonically increasing.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (eq - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Win rate: fraction of trades that were winners.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

// ─── Helpers ────────────────────────────────────────────────────────

pub const TRADING_DAYS: f64 = 252.0;

/// Annualization factor for a bar frequency label.
pub fn periods_per_year(frequency: &str) -> f64 {
    match frequency.trim().to_ascii_uppercase().as_str() {
        "1W" | "W" => 52.0,
        "1M" | "M" => 12.0,
        _ => TRADING_DAYS,
    }
}

/// Bar-over-bar returns of an equity curve.
pub fn daily_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

/// Per-period returns with the first period measured against `initial`.
/// Same length as the equity curve.
pub fn returns_from_equity(equity_curve: &[f64], initial: f64) -> Vec<f64> {
    let Some(&first) = equity_curve.first() else {
        return Vec::new();
    };
    let mut returns = Vec::with_capacity(equity_curve.len());
    returns.push(if initial > 0.0 { first / initial - 1.0 } else { 0.0 });
    returns.extend(daily_returns(equity_curve));
    returns
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1); 0 for fewer than two values.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
