//! Text reports and structured metric export.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::metrics::{keys, MetricsBundle};
use crate::result::BacktestResult;
use crate::scorer::{compute_extended_stats, meets_profitability_criteria, ComparisonSummary, ProfitabilityCriteria};

/// Rows shown in the ranking section of a comparison report.
const TOP_RANKINGS: usize = 5;

/// Four-step rating used in the evaluation section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Rating {
    /// > 20% Excellent, > 10% Good, > 0 Fair.
    pub fn for_return(total_return: f64) -> Self {
        Self::grade(total_return, 0.2, 0.1)
    }

    /// > 2 Excellent, > 1 Good, > 0 Fair.
    pub fn for_sharpe(sharpe: f64) -> Self {
        Self::grade(sharpe, 2.0, 1.0)
    }

    fn grade(value: f64, excellent: f64, good: f64) -> Self {
        if value > excellent {
            Rating::Excellent
        } else if value > good {
            Rating::Good
        } else if value > 0.0 {
            Rating::Fair
        } else {
            Rating::Poor
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rating::Excellent => "★★★ Excellent",
            Rating::Good => "★★ Good",
            Rating::Fair => "★ Fair",
            Rating::Poor => "Poor",
        };
        f.write_str(s)
    }
}

// ─── Formatting helpers ──────────────────────────────────────────────

fn pct(v: f64) -> String {
    format!("{:.2}%", v * 100.0)
}

/// `$12,345.67`, with a leading minus for negative amounts.
fn money(v: f64) -> String {
    let cents = format!("{:.2}", v.abs());
    let (whole, frac) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{frac}")
}

// ─── Detailed report ─────────────────────────────────────────────────

/// Multi-section text report for one result.
///
/// With `include_advanced` the extended statistics are computed first and
/// the advanced section is shown; `include_trades` adds trade statistics.
pub fn detailed_report(
    result: &BacktestResult,
    include_advanced: bool,
    include_trades: bool,
    criteria: &ProfitabilityCriteria,
) -> String {
    let metrics = if include_advanced {
        compute_extended_stats(result)
    } else {
        result.metrics.clone()
    };
    let m = |key: &str| metrics.get_or(key, 0.0);
    let period = &result.period;
    let initial = result.engine.initial_cash;

    let mut report = format!(
        "\n=== COMPREHENSIVE PERFORMANCE REPORT ===\n\n\
Strategy: {}\n\
Asset: {}\n\
Description: {}\n\
Period: {} to {} ({} days)\n\
Total Periods: {}\n",
        result.strategy.label,
        result.symbol,
        result.strategy.short_description,
        period.start,
        period.end,
        period.duration_days,
        period.bar_count,
    );

    report.push_str(&format!(
        "\n--- FINANCIAL PERFORMANCE ---\n\
Initial Capital: {}\n\
Final Value: {}\n\
Total Return: {}\n\
Alpha vs Buy & Hold: {}\n\
Benchmark Return: {}\n",
        money(initial),
        money(metrics.get_or(keys::FINAL_VALUE, initial)),
        pct(m(keys::TOTAL_RETURN)),
        pct(m(keys::ALPHA)),
        pct(m(keys::BENCHMARK_RETURN)),
    ));

    report.push_str(&format!(
        "\n--- RISK ANALYSIS ---\n\
Sharpe Ratio: {:.2}\n\
Sortino Ratio: {:.2}\n\
Calmar Ratio: {:.2}\n\
Maximum Drawdown: {}\n\
Volatility (Annualized): {}\n\
Value at Risk (95%): {}\n",
        m(keys::SHARPE_RATIO),
        m(keys::SORTINO_RATIO),
        m(keys::CALMAR_RATIO),
        pct(m(keys::MAX_DRAWDOWN)),
        pct(m(keys::VOLATILITY)),
        pct(m(keys::VAR_95)),
    ));

    if include_trades {
        report.push_str(&format!(
            "\n--- TRADING STATISTICS ---\n\
Total Trades: {}\n\
Win Rate: {}\n\
Average Trade Duration: {:.1} bars\n\
Profit Factor: {:.2}\n\
Average Win: {}\n\
Average Loss: {}\n\
Win/Loss Ratio: {:.2}\n\
Largest Win: {}\n\
Largest Loss: {}\n",
            m(keys::TOTAL_TRADES) as usize,
            pct(m(keys::WIN_RATE)),
            m(keys::AVG_TRADE_DURATION),
            m(keys::PROFIT_FACTOR),
            money(m(keys::AVG_WIN)),
            money(m(keys::AVG_LOSS)),
            m(keys::WIN_LOSS_RATIO),
            money(m(keys::LARGEST_WIN)),
            money(m(keys::LARGEST_LOSS)),
        ));
    }

    if include_advanced {
        report.push_str(&format!(
            "\n--- ADVANCED METRICS ---\n\
Information Ratio: {:.2}\n\
Beta: {:.2}\n\
Skewness: {:.2}\n\
Kurtosis: {:.2}\n\
Recovery Factor: {:.2}\n\
Market Exposure: {}\n\
Max Drawdown Duration: {:.0} bars\n",
            m(keys::INFORMATION_RATIO),
            m(keys::BETA),
            m(keys::SKEWNESS),
            m(keys::KURTOSIS),
            m(keys::RECOVERY_FACTOR),
            pct(m(keys::MARKET_EXPOSURE)),
            m(keys::MAX_DRAWDOWN_DURATION),
        ));
    }

    report.push_str("\n--- STRATEGY PARAMETERS ---\n");
    if result.strategy.parameters.is_empty() {
        report.push_str("No parameters configured\n");
    } else {
        for (name, value) in &result.strategy.parameters {
            report.push_str(&format!("{name}: {value}\n"));
        }
    }

    let profitable = meets_profitability_criteria(&metrics, criteria);
    report.push_str(&format!(
        "\n--- STRATEGY EVALUATION ---\n\
Profitable Strategy: {}\n\
Return Rating: {}\n\
Risk-Adjusted Rating: {}\n",
        if profitable { "YES" } else { "NO" },
        Rating::for_return(m(keys::TOTAL_RETURN)),
        Rating::for_sharpe(m(keys::SHARPE_RATIO)),
    ));

    if !result.warnings.is_empty() {
        report.push_str("\n--- WARNINGS ---\n");
        for w in &result.warnings {
            report.push_str(&format!("- {w}\n"));
        }
    }

    info!(strategy = %result.strategy.label, "Performance report generated");
    report
}

// ─── Comparison report ───────────────────────────────────────────────

pub fn comparison_report(summary: &ComparisonSummary) -> String {
    let best = &summary.best;
    let mut report = format!(
        "\n=== STRATEGY COMPARISON REPORT ===\n\n\
Total Strategies Analyzed: {}\n\
Profitable Strategies: {}\n\
Success Rate: {:.1}%\n\n\
Average Performance:\n\
- Return: {}\n\
- Sharpe Ratio: {:.2}\n\n\
--- TOP PERFORMING STRATEGY ---\n\
Strategy: {}\n\
Return: {}\n\
Sharpe: {:.2}\n\
Score: {:.3}\n\n\
--- STRATEGY RANKINGS ---\n",
        summary.total,
        summary.profitable,
        summary.success_rate() * 100.0,
        pct(summary.average_return),
        summary.average_sharpe,
        best.strategy.short_description,
        pct(best.total_return()),
        best.sharpe_ratio(),
        best.score().unwrap_or(0.0),
    );

    for (i, r) in summary.ranking.iter().take(TOP_RANKINGS).enumerate() {
        report.push_str(&format!(
            "{}. {}: Return={}, Sharpe={:.2}, Score={:.3}\n",
            i + 1,
            r.strategy.short_description,
            pct(r.total_return()),
            r.sharpe_ratio(),
            r.score().unwrap_or(0.0),
        ));
    }
    report
}

// ─── Structured export ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicPerformance {
    pub total_return: f64,
    pub final_value: f64,
    pub alpha: f64,
    pub benchmark_return: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSection {
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub max_drawdown: f64,
    pub volatility: f64,
    pub var_95: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingStats {
    pub total_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_trade_duration: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub win_loss_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSection {
    pub market_exposure: f64,
    pub recovery_factor: f64,
    pub max_drawdown_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub information_ratio: f64,
    pub beta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub strategy_name: String,
    pub symbol: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub duration_days: i64,
    pub is_profitable: bool,
}

/// All metrics of one result grouped by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsExport {
    pub basic_performance: BasicPerformance,
    pub risk_metrics: RiskSection,
    pub trading_stats: TradingStats,
    pub portfolio_metrics: PortfolioSection,
    pub benchmark_comparison: BenchmarkComparison,
    pub metadata: ExportMetadata,
}

/// Group the metrics of `result` by category. Absent keys export as 0.
pub fn export_metrics(
    result: &BacktestResult,
    include_advanced: bool,
    criteria: &ProfitabilityCriteria,
) -> MetricsExport {
    let metrics: MetricsBundle = if include_advanced {
        compute_extended_stats(result)
    } else {
        result.metrics.clone()
    };
    let m = |key: &str| metrics.get_or(key, 0.0);

    MetricsExport {
        basic_performance: BasicPerformance {
            total_return: m(keys::TOTAL_RETURN),
            final_value: m(keys::FINAL_VALUE),
            alpha: m(keys::ALPHA),
            benchmark_return: m(keys::BENCHMARK_RETURN),
        },
        risk_metrics: RiskSection {
            sharpe_ratio: m(keys::SHARPE_RATIO),
            sortino_ratio: m(keys::SORTINO_RATIO),
            calmar_ratio: m(keys::CALMAR_RATIO),
            max_drawdown: m(keys::MAX_DRAWDOWN),
            volatility: m(keys::VOLATILITY),
            var_95: m(keys::VAR_95),
            skewness: m(keys::SKEWNESS),
            kurtosis: m(keys::KURTOSIS),
        },
        trading_stats: TradingStats {
            total_trades: m(keys::TOTAL_TRADES) as usize,
            win_rate: m(keys::WIN_RATE),
            profit_factor: m(keys::PROFIT_FACTOR),
            avg_trade_duration: m(keys::AVG_TRADE_DURATION),
            avg_win: m(keys::AVG_WIN),
            avg_loss: m(keys::AVG_LOSS),
            win_loss_ratio: m(keys::WIN_LOSS_RATIO),
        },
        portfolio_metrics: PortfolioSection {
            market_exposure: m(keys::MARKET_EXPOSURE),
            recovery_factor: m(keys::RECOVERY_FACTOR),
            max_drawdown_duration: m(keys::MAX_DRAWDOWN_DURATION),
        },
        benchmark_comparison: BenchmarkComparison {
            information_ratio: m(keys::INFORMATION_RATIO),
            beta: m(keys::BETA),
        },
        metadata: ExportMetadata {
            strategy_name: result.strategy.label.clone(),
            symbol: result.symbol.clone(),
            period_start: result.period.start,
            period_end: result.period.end,
            duration_days: result.period.duration_days,
            is_profitable: meets_profitability_criteria(&metrics, criteria),
        },
    }
}
