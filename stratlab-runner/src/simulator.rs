//! Portfolio simulation: turns aligned entry/exit flags into trades and equity.
//!
//! The orchestrator only depends on the `PortfolioSimulator` trait. The
//! default `SignalSimulator` is a long-only, all-in model: one position at a
//! time, every entry spends all available cash, every exit liquidates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::{
    max_drawdown, mean_f64, periods_per_year, profit_factor, returns_from_equity, std_dev,
    win_rate,
};

/// Errors from the simulator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    #[error("no bars to simulate")]
    Empty,

    #[error("input length mismatch: {closes} closes, {dates} dates, {entries} entries, {exits} exits")]
    LengthMismatch {
        closes: usize,
        dates: usize,
        entries: usize,
        exits: usize,
    },

    #[error("invalid close price {value} at bar {index}")]
    InvalidPrice { index: usize, value: f64 },

    #[error("initial cash must be positive, got {0}")]
    InvalidCash(f64),
}

/// Everything a simulator needs for one run.
#[derive(Debug, Clone, Copy)]
pub struct SimulationRequest<'a> {
    pub dates: &'a [NaiveDate],
    pub closes: &'a [f64],
    pub entries: &'a [bool],
    pub exits: &'a [bool],
    pub initial_cash: f64,
    pub commission: f64,
    pub slippage: f64,
    pub frequency: &'a str,
}

impl SimulationRequest<'_> {
    pub fn validate(&self) -> Result<(), SimulationError> {
        let n = self.closes.len();
        if n == 0 {
            return Err(SimulationError::Empty);
        }
        if self.dates.len() != n || self.entries.len() != n || self.exits.len() != n {
            return Err(SimulationError::LengthMismatch {
                closes: n,
                dates: self.dates.len(),
                entries: self.entries.len(),
                exits: self.exits.len(),
            });
        }
        if let Some((index, &value)) = self
            .closes
            .iter()
            .enumerate()
            .find(|(_, c)| !c.is_finite() || **c <= 0.0)
        {
            return Err(SimulationError::InvalidPrice { index, value });
        }
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(SimulationError::InvalidCash(self.initial_cash));
        }
        Ok(())
    }
}

/// The portfolio simulation collaborator.
pub trait PortfolioSimulator: Send + Sync {
    fn simulate(&self, request: &SimulationRequest<'_>) -> Result<SimulationOutput, SimulationError>;
}

/// One round trip. An open position at the end of the data is reported
/// with `is_open = true`, marked to the last close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    // ── Entry ──
    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,

    // ── Size and PnL ──
    pub size: f64,
    /// Net of commissions on both sides.
    pub pnl: f64,
    /// PnL as a fraction of the cash committed at entry.
    pub return_pct: f64,

    pub is_open: bool,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }

    /// Holding period in bars.
    pub fn duration(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }
}

/// Peak → valley → recovery. Unrecovered episodes end at the last bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownEpisode {
    pub peak_bar: usize,
    pub valley_bar: usize,
    pub end_bar: usize,
    pub peak_date: NaiveDate,
    pub valley_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Valley relative to peak, as a negative fraction.
    pub depth: f64,
    pub recovered: bool,
}

impl DrawdownEpisode {
    pub fn duration(&self) -> usize {
        self.end_bar.saturating_sub(self.peak_bar)
    }
}

/// What the simulator hands back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub dates: Vec<NaiveDate>,
    pub initial_cash: f64,
    /// Per-period returns; the first is measured against the initial cash.
    pub returns: Vec<f64>,
    pub equity: Vec<f64>,
    pub trades: Vec<TradeRecord>,
    pub drawdowns: Vec<DrawdownEpisode>,
    /// Fraction of bars holding a position.
    pub exposure: f64,
    pub periods_per_year: f64,
}

impl SimulationOutput {
    /// Assemble an output from an equity curve and trade list, deriving
    /// returns and drawdown episodes.
    pub fn from_equity(
        dates: Vec<NaiveDate>,
        equity: Vec<f64>,
        trades: Vec<TradeRecord>,
        initial_cash: f64,
        exposure: f64,
        periods_per_year: f64,
    ) -> Self {
        let returns = returns_from_equity(&equity, initial_cash);
        let drawdowns = drawdown_episodes(&dates, &equity, initial_cash);
        Self {
            dates,
            initial_cash,
            returns,
            equity,
            trades,
            drawdowns,
            exposure,
            periods_per_year,
        }
    }

    pub fn value(&self) -> &[f64] {
        &self.equity
    }

    pub fn returns(&self) -> &[f64] {
        &self.returns
    }

    pub fn final_value(&self) -> f64 {
        self.equity.last().copied().unwrap_or(self.initial_cash)
    }

    pub fn total_return(&self) -> f64 {
        self.final_value() / self.initial_cash - 1.0
    }

    /// mean / sample std of per-period returns, annualized.
    pub fn sharpe_ratio(&self) -> f64 {
        let std = std_dev(&self.returns);
        if self.returns.len() < 2 || std < 1e-15 {
            return 0.0;
        }
        mean_f64(&self.returns) / std * self.periods_per_year.sqrt()
    }

    /// Negative fraction, measured against the running peak including the
    /// initial cash.
    pub fn max_drawdown(&self) -> f64 {
        let mut curve = Vec::with_capacity(self.equity.len() + 1);
        curve.push(self.initial_cash);
        curve.extend_from_slice(&self.equity);
        max_drawdown(&curve)
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    pub fn winning_trades(&self) -> usize {
        self.trades.iter().filter(|t| t.is_winner()).count()
    }

    pub fn losing_trades(&self) -> usize {
        self.trades.iter().filter(|t| t.is_loser()).count()
    }

    pub fn win_rate(&self) -> f64 {
        win_rate(&self.trades)
    }

    pub fn profit_factor(&self) -> f64 {
        profit_factor(&self.trades)
    }

    /// Mean holding period in bars; 0 without trades.
    pub fn avg_trade_duration(&self) -> f64 {
        if self.trades.is_empty() {
            return 0.0;
        }
        self.trades.iter().map(|t| t.duration() as f64).sum::<f64>() / self.trades.len() as f64
    }
}

/// Long-only, all-in signal simulator.
///
/// - Entry when flat, entry set and exit not set: buy at `close·(1+slippage)`
///   with all cash, commission included in the cost.
/// - Exit when long, exit set and entry not set: sell at `close·(1−slippage)`.
/// - Equity is marked at the close of every bar.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalSimulator;

struct OpenPosition {
    entry_bar: usize,
    entry_price: f64,
    size: f64,
    cost: f64,
}

impl PortfolioSimulator for SignalSimulator {
    fn simulate(&self, req: &SimulationRequest<'_>) -> Result<SimulationOutput, SimulationError> {
        req.validate()?;

        let n = req.closes.len();
        let mut cash = req.initial_cash;
        let mut position: Option<OpenPosition> = None;
        let mut trades = Vec::new();
        let mut equity = Vec::with_capacity(n);
        let mut bars_in_market = 0usize;

        for i in 0..n {
            let close = req.closes[i];
            let (entry, exit) = (req.entries[i], req.exits[i]);

            match position.take() {
                None if entry && !exit => {
                    let price = close * (1.0 + req.slippage);
                    let size = cash / (price * (1.0 + req.commission));
                    position = Some(OpenPosition {
                        entry_bar: i,
                        entry_price: price,
                        size,
                        cost: cash,
                    });
                    cash = 0.0;
                }
                Some(open) if exit && !entry => {
                    let price = close * (1.0 - req.slippage);
                    let proceeds = open.size * price * (1.0 - req.commission);
                    trades.push(close_trade(req, &open, i, price, proceeds, false));
                    cash += proceeds;
                }
                other => position = other,
            }

            if position.is_some() {
                bars_in_market += 1;
            }
            let held = position.as_ref().map_or(0.0, |p| p.size * close);
            equity.push(cash + held);
        }

        if let Some(open) = position {
            let last = n - 1;
            let close = req.closes[last];
            trades.push(close_trade(req, &open, last, close, open.size * close, true));
        }

        Ok(SimulationOutput::from_equity(
            req.dates.to_vec(),
            equity,
            trades,
            req.initial_cash,
            bars_in_market as f64 / n as f64,
            periods_per_year(req.frequency),
        ))
    }
}

fn close_trade(
    req: &SimulationRequest<'_>,
    open: &OpenPosition,
    exit_bar: usize,
    exit_price: f64,
    proceeds: f64,
    is_open: bool,
) -> TradeRecord {
    let pnl = proceeds - open.cost;
    TradeRecord {
        entry_bar: open.entry_bar,
        entry_date: req.dates[open.entry_bar],
        entry_price: open.entry_price,
        exit_bar,
        exit_date: req.dates[exit_bar],
        exit_price,
        size: open.size,
        pnl,
        return_pct: if open.cost > 0.0 { pnl / open.cost } else { 0.0 },
        is_open,
    }
}

/// Split an equity curve into drawdown episodes.
///
/// The running peak starts at `initial`, the capital held before the first
/// bar, so a loss on bar 0 opens an episode whose peak is bar 0. This is
/// the same curve `SimulationOutput::max_drawdown` measures.
pub fn drawdown_episodes(dates: &[NaiveDate], equity: &[f64], initial: f64) -> Vec<DrawdownEpisode> {
    let mut episodes = Vec::new();
    if equity.is_empty() || dates.len() != equity.len() {
        return episodes;
    }

    let mut peak_bar = 0;
    let mut peak = initial;
    let mut valley_bar: Option<usize> = None;

    let episode = |peak: f64, peak_bar: usize, valley_bar: usize, end_bar: usize, recovered: bool| {
        DrawdownEpisode {
            peak_bar,
            valley_bar,
            end_bar,
            peak_date: dates[peak_bar],
            valley_date: dates[valley_bar],
            end_date: dates[end_bar],
            depth: if peak > 0.0 {
                equity[valley_bar] / peak - 1.0
            } else {
                0.0
            },
            recovered,
        }
    };

    for (i, &value) in equity.iter().enumerate() {
        if value >= peak {
            if let Some(v) = valley_bar.take() {
                episodes.push(episode(peak, peak_bar, v, i, true));
            }
            peak = value;
            peak_bar = i;
        } else {
            match valley_bar {
                Some(v) if equity[v] <= value => {}
                _ => valley_bar = Some(i),
            }
        }
    }
    if let Some(v) = valley_bar {
        episodes.push(episode(peak, peak_bar, v, equity.len() - 1, false));
    }
    episodes
}
